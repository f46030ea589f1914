pub mod api;
pub mod app_state;
pub mod config;
pub mod sftp;
pub mod ytdlp;

use axum::Router;
use axum::extract::Extension;
use axum::routing::{get, post};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tracing::info;

//
// Re-export
//
pub use api::{ApiError, ApiKeyState, add_video, healthz, log_requests, require_api_key};
pub use app_state::AppState;
pub use config::{Config, SftpConfig};
pub use sftp::{SftpUploader, Uploader};
pub use ytdlp::{MediaFetcher, YtDlpFetcher};

/// Build the service router: the pipeline endpoint behind the API key check,
/// the open health aliases, and the access logger around everything.
pub fn router(state: AppState) -> Router {
    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Create key state for middleware
    let key_state = ApiKeyState {
        secret: state.secret.clone(),
    };

    Router::new()
        .route("/addvideo", post(add_video))
        .route_layer(axum::middleware::from_fn_with_state(
            key_state,
            require_api_key,
        ))
        .route("/", get(healthz))
        .route("/healthz", get(healthz))
        .layer(axum::middleware::from_fn(log_requests))
        .layer(cors)
        .layer(Extension(state))
}

pub async fn run(config: Config) {
    // Ensure we're in a proper async context by yielding once
    tokio::task::yield_now().await;

    // Extract configuration values
    let listen_on_port = config.listen_on_port;
    let workspace = config.workspace.clone();

    // Parse workspace path
    let workspace_path = PathBuf::from_str(&workspace).expect("Failed to parse workspace dir");

    let secret = config
        .secret
        .clone()
        .expect("API secret is required (set FIRECAST_SECRET or --secret)");
    let sftp_config = config
        .to_sftp_config()
        .expect("SFTP connection settings are required");

    let fetcher = Arc::new(YtDlpFetcher::new(config.yt_dlp_path.clone()));
    let uploader = Arc::new(SftpUploader::new(sftp_config));

    let state = AppState::new(&workspace_path, secret, fetcher, uploader)
        .await
        .expect("Failed to create app state");

    let addr = format!("0.0.0.0:{listen_on_port}");
    info!("API listening on {addr}");
    let listener = TcpListener::bind(&addr)
        .await
        .expect("Failed to bind API server");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("API server error");
}
