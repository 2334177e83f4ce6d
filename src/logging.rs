use std::time::Instant;

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Used when `RUST_LOG` is unset or unparseable.
const DEFAULT_DIRECTIVES: &str = "info";

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Emits one summary line per HTTP request, escalating auth failures and server errors.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let started_at = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let has_credentials = request.headers().contains_key(header::AUTHORIZATION);

    let response = next.run(request).await;
    let status = response.status();

    info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = started_at.elapsed().as_millis(),
        "request summary"
    );

    match status {
        StatusCode::UNAUTHORIZED => warn!(
            method = %method,
            path = %path,
            has_credentials,
            challenged = response.headers().contains_key(header::WWW_AUTHENTICATE),
            "authentication failure"
        ),
        status if status.is_server_error() => {
            error!(method = %method, path = %path, status = status.as_u16(), "request failed")
        }
        _ => {}
    }

    response
}
