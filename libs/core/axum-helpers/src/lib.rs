//! # Axum Helpers
//!
//! Shared HTTP plumbing for the service's Axum applications.
//!
//! ## Modules
//!
//! - **[`server`]**: Middleware stack, health checks, graceful shutdown
//! - **[`http`]**: HTTP middleware (CORS, security headers)
//! - **[`errors`]**: Structured error responses with error codes
//! - **[`extractors`]**: Validated JSON extractor
//! - **[`envelope`]**: `{ success, message, data }` success responses
//!
//! ## Quick Start
//!
//! ```ignore
//! use axum::Router;
//! use axum_helpers::server::{create_production_app, create_router, health_router};
//! use core_config::{app_info, server::ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let api_routes = Router::new(); // Add your routes
//!     let router = create_router(api_routes)?.merge(health_router(app_info!()));
//!
//!     create_production_app(router, &ServerConfig::default(), async {}).await
//! }
//! ```

pub mod envelope;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod server;

pub use envelope::ApiResponse;

pub use server::{
    HealthCheckFuture, HealthResponse, ShutdownCoordinator, create_production_app, create_router,
    health_router, run_health_checks,
};

pub use http::{cors_layer_from_env, create_cors_layer, security_headers};

pub use errors::{AppError, ErrorCode, ErrorResponse, error_response, violation_messages};

pub use extractors::ValidatedJson;
