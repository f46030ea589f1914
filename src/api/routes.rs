use crate::api::error::ApiError;
use crate::app_state::AppState;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tempfile::TempDir;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct AddVideoRequest {
    #[serde(default)]
    pub video_url: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct AddVideoResponse {
    pub message: String,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// Download the audio track of `video_url` as MP3, push it to the SFTP
/// server, and answer once both steps are done. The request-scoped working
/// directory is removed on every exit path.
#[axum::debug_handler]
pub async fn add_video(
    Extension(state): Extension<AppState>,
    Json(request): Json<AddVideoRequest>,
) -> Result<(StatusCode, Json<AddVideoResponse>), ApiError> {
    let video_url = match request.video_url {
        Some(url) if !url.is_empty() => url,
        _ => return Err(ApiError::MissingVideoUrl),
    };

    info!(%video_url, "Processing video");

    let workdir = TempDir::new_in(state.downloads_dir()).map_err(|error| {
        error!(?error, "Failed to create working directory");
        ApiError::Fetch(error.to_string())
    })?;

    let local_file = state
        .fetcher
        .fetch(&video_url, workdir.path())
        .await
        .map_err(|error| {
            error!(%video_url, ?error, "Download failed");
            ApiError::Fetch(format!("{error:#}"))
        })?;

    state.uploader.upload(&local_file).await.map_err(|error| {
        error!(path = %local_file.display(), ?error, "Upload failed");
        ApiError::Upload(format!("{error:#}"))
    })?;

    Ok((
        StatusCode::OK,
        Json(AddVideoResponse {
            message: format!(
                "File '{}' processed and uploaded successfully.",
                local_file.display()
            ),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_video_request_field_is_optional() {
        let request: AddVideoRequest = serde_json::from_str("{}").unwrap();
        assert!(request.video_url.is_none());

        let request: AddVideoRequest =
            serde_json::from_str(r#"{"video_url": "https://example.com/v"}"#).unwrap();
        assert_eq!(request.video_url.as_deref(), Some("https://example.com/v"));
    }
}
