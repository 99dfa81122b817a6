use axum_helpers::server::{create_production_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use eyre::{Result, WrapErr};
use tracing::info;

mod api;
mod config;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    info!(
        url = %config.mongodb.redacted_url(),
        database = %config.mongodb.database(),
        "Connecting to MongoDB"
    );

    let client = database::mongodb::connect_from_config_with_retry(&config.mongodb, None)
        .await
        .wrap_err("Failed to connect to MongoDB")?;
    let db = client.database(config.mongodb.database());

    let state = AppState {
        config,
        mongo_client: client.clone(),
        db,
    };

    api::users::init_indexes(&state)
        .await
        .wrap_err("Failed to create user indexes")?;

    let router = create_router(api::routes(&state))?.merge(health_router(state.config.app));

    info!("Starting {} v{}", state.config.app.name, state.config.app.version);

    create_production_app(router, &state.config.server, async move {
        info!("Closing MongoDB connections");
        client.shutdown().await;
        info!("MongoDB connections closed");
    })
    .await
    .wrap_err("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
