use super::shutdown::{ShutdownCoordinator, shutdown_requested};
use crate::errors::handlers::not_found;
use crate::http::{cors_layer_from_env, security_headers};
use axum::{Router, middleware};
use core_config::server::ServerConfig;
use std::io;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};

/// Wrap the application routes with the shared middleware stack.
///
/// - 404 envelope fallback for unknown paths
/// - request spans via `TraceLayer`
/// - security headers
/// - CORS, only when `CORS_ALLOWED_ORIGIN` is set
/// - response compression (gzip, br, deflate, zstd)
///
/// Routes are mounted as given; domain routers apply their own state before
/// being passed in.
///
/// # Errors
/// Returns an error if `CORS_ALLOWED_ORIGIN` contains an invalid origin.
///
/// # Example
/// ```ignore
/// let api_routes = Router::new().nest("/users", domain_users::handlers::router(service));
/// let router = create_router(api_routes)?;
/// ```
pub fn create_router(apis: Router) -> io::Result<Router> {
    let router = apis.fallback(not_found).layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    let router = router.layer(middleware::from_fn(security_headers));

    let router = match cors_layer_from_env()? {
        Some(cors) => router.layer(cors),
        None => router,
    };

    Ok(router.layer(CompressionLayer::new()))
}

/// Serve `router` until SIGINT/SIGTERM, then run `cleanup`.
///
/// In-flight requests are drained before `serve` returns. `cleanup` is bounded
/// by `server_config.shutdown_timeout`; if it takes longer it is abandoned with
/// a warning.
///
/// # Example
/// ```ignore
/// let cleanup = async move {
///     client.shutdown().await;
/// };
///
/// create_production_app(router, &config.server, cleanup).await?;
/// ```
pub async fn create_production_app<F>(
    router: Router,
    server_config: &ServerConfig,
    cleanup: F,
) -> io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let (coordinator, server_rx) = ShutdownCoordinator::new();
    let cleanup_rx = coordinator.subscribe();
    let shutdown_timeout = server_config.shutdown_timeout;

    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server starting on {}", listener.local_addr()?);

    let signal_handle = coordinator.clone();
    tokio::spawn(async move { signal_handle.wait_for_signal().await });

    let cleanup_handle = tokio::spawn(async move {
        shutdown_requested(cleanup_rx).await;

        info!("Starting cleanup tasks (timeout: {:?})", shutdown_timeout);
        match tokio::time::timeout(shutdown_timeout, cleanup).await {
            Ok(()) => info!("Cleanup completed successfully"),
            Err(_) => warn!(
                "Cleanup exceeded timeout of {:?}, forcing shutdown",
                shutdown_timeout
            ),
        }
    });

    let serve_result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_requested(server_rx))
        .await
        .inspect_err(|e| {
            tracing::error!("Server encountered an error: {:?}", e);
        });

    // Runs cleanup even when the server stopped on its own.
    coordinator.shutdown();
    if let Err(e) = cleanup_handle.await {
        tracing::error!("Cleanup task failed: {}", e);
    }

    serve_result
}
