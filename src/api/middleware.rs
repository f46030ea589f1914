use crate::api::error::ApiError;
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{error, info, warn};

const API_KEY_HEADER: &str = "x-api-key";

/// State for the API key middleware
#[derive(Clone)]
pub struct ApiKeyState {
    pub secret: String,
}

/// Reject requests whose `x-api-key` header does not match the configured
/// secret, short-circuiting before the handler runs.
pub async fn require_api_key(
    State(state): State<ApiKeyState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided != Some(state.secret.as_str()) {
        warn!("Rejected request with invalid or missing API key");
        return ApiError::InvalidApiKey.into_response();
    }

    next.run(req).await
}

/// Emit one access-log line per request: client address, method, path,
/// status, and latency in milliseconds. The event level follows the status
/// class so terminal output is severity-colored.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let started_at = Instant::now();
    let client = client_addr(&req);
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;
    let latency = format!("{elapsed_ms:.2}");

    if status.is_server_error() {
        // 5xx error
        error!(
            %client,
            %method,
            %path,
            status = status.as_u16(),
            latency_ms = %latency,
            "Request handled"
        );
    } else if status.is_client_error() {
        // 4xx error
        warn!(
            %client,
            %method,
            %path,
            status = status.as_u16(),
            latency_ms = %latency,
            "Request handled"
        );
    } else {
        info!(
            %client,
            %method,
            %path,
            status = status.as_u16(),
            latency_ms = %latency,
            "Request handled"
        );
    }

    response
}

fn client_addr(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_addr_uses_connect_info() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));

        assert_eq!(client_addr(&req), "127.0.0.1:9999");
    }

    #[test]
    fn test_client_addr_falls_back_to_unknown() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_addr(&req), "unknown");
    }
}
