pub mod error;
pub mod middleware;
pub mod routes;

// Re-export public types and functions
pub use error::ApiError;
pub use middleware::{ApiKeyState, log_requests, require_api_key};
pub use routes::{AddVideoRequest, AddVideoResponse, add_video, healthz};
