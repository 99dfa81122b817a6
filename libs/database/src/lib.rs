//! Database connectors and utilities for the users service.
//!
//! # Features
//!
//! - `mongodb` (default) - MongoDB client bootstrap, retries and health checks
//! - `config` - `core_config::FromEnv` support for [`mongodb::MongoConfig`]
//! - `all` - All of the above
//!
//! # Example
//!
//! ```ignore
//! use database::mongodb::{self, MongoConfig};
//!
//! let config = MongoConfig::with_database("mongodb://localhost:27017", "users");
//! let client = mongodb::connect_from_config_with_retry(&config, None).await?;
//! let db = client.database(config.database());
//! ```

pub mod common;

#[cfg(feature = "mongodb")]
pub mod mongodb;

pub use common::{DatabaseError, DatabaseResult};
