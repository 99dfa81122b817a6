//! Users API routes
//!
//! Wires the users domain to its MongoDB repository.

use axum::Router;
use domain_users::{MongoUserRepository, UserService, handlers};

use crate::state::AppState;

pub fn router(state: &AppState) -> Router {
    let repository = MongoUserRepository::new(state.db.clone());
    handlers::router(UserService::new(repository))
}

/// Create the unique email index the uniqueness check relies on
pub async fn init_indexes(state: &AppState) -> eyre::Result<()> {
    MongoUserRepository::new(state.db.clone())
        .init_indexes()
        .await?;
    Ok(())
}
