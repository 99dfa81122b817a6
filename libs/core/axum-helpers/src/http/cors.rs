use axum::http::{HeaderValue, Method, header};
use std::io;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

/// CORS layer for the given allowed origins.
///
/// - Methods: GET, POST, PATCH, DELETE, OPTIONS
/// - Headers: Content-Type, Accept
/// - 1 hour max age
pub fn create_cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// Build a CORS layer from the comma-separated `CORS_ALLOWED_ORIGIN` variable.
///
/// Returns `Ok(None)` when the variable is unset or empty; the service is then
/// same-origin only.
///
/// # Errors
/// Returns an error if any listed origin is not a valid header value.
pub fn cors_layer_from_env() -> io::Result<Option<CorsLayer>> {
    let origins = core_config::env_list("CORS_ALLOWED_ORIGIN");
    if origins.is_empty() {
        return Ok(None);
    }

    let allowed = origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid CORS_ALLOWED_ORIGIN value: {}", e),
            )
        })?;

    info!(origins = ?origins, "CORS configured");
    Ok(Some(create_cors_layer(allowed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_absent_when_unset() {
        temp_env::with_var_unset("CORS_ALLOWED_ORIGIN", || {
            assert!(cors_layer_from_env().unwrap().is_none());
        });
    }

    #[test]
    fn test_cors_layer_from_list() {
        temp_env::with_var(
            "CORS_ALLOWED_ORIGIN",
            Some("http://localhost:3000,https://example.com"),
            || {
                assert!(cors_layer_from_env().unwrap().is_some());
            },
        );
    }

    #[test]
    fn test_cors_layer_rejects_invalid_origin() {
        temp_env::with_var("CORS_ALLOWED_ORIGIN", Some("http://bad\norigin"), || {
            let err = cors_layer_from_env().unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        });
    }
}
