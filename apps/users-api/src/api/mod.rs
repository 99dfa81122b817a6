//! API routes module

pub mod health;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// All application routes, before the shared middleware stack
pub fn routes(state: &AppState) -> Router {
    Router::new()
        .nest("/users", users::router(state))
        .merge(health::router(state.clone()))
}
