//! Application state shared by the route builders.

use mongodb::{Client, Database};

/// Cloned per router (inexpensive: the client shares one connection pool).
#[derive(Clone)]
pub struct AppState {
    /// Application configuration loaded from environment variables
    pub config: crate::config::Config,
    pub mongo_client: Client,
    /// Database holding the `users` collection
    pub db: Database,
}
