use crate::{
    config::Config,
    media::{
        ArtifactDescriptor, DownloadRequest, MediaError, MediaService, ToolAvailability,
        VideoMetadata,
    },
    store::ArtifactStore,
};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

pub struct AppState {
    media: MediaService,
    store: Arc<ArtifactStore>,
}

/// Wire up the state and run the HTTP surface until shutdown. The sweep task
/// lives exactly as long as the server does.
pub async fn run(config: Config) -> Result<()> {
    let store = Arc::new(
        ArtifactStore::new(config.staging_dir.clone())
            .with_context(|| format!("Failed to prepare staging dir {:?}", config.staging_dir))?,
    );
    let media = MediaService::new(config.staging_dir.clone(), config.tool_path.clone());
    media.startup_check().await;

    let sweeper = store.spawn_sweeper();
    let state = Arc::new(AppState { media, store });

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    sweeper.abort();
    info!("Shutdown complete");
    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/info", post(get_info))
        .route("/api/download", post(start_download))
        .route("/downloads/{file_name}", get(fetch_file))
        .with_state(state)
        .layer(cors)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    tool: Option<&'static str>,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let tool = match state.media.availability().await {
        ToolAvailability::Available(tool) => Some(tool.command()),
        ToolAvailability::Unavailable => None,
    };
    Json(HealthResponse { status: "ok", tool })
}

#[derive(Debug, Deserialize)]
struct InfoRequest {
    url: String,
}

async fn get_info(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<InfoRequest>,
) -> Result<Json<VideoMetadata>, ApiError> {
    let metadata = state.media.get_info(payload.url.trim()).await?;
    Ok(Json(metadata))
}

async fn start_download(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DownloadRequest>,
) -> Result<Json<ArtifactDescriptor>, ApiError> {
    let artifact = state.media.start_download(&payload).await?;
    Ok(Json(artifact))
}

async fn fetch_file(
    State(state): State<Arc<AppState>>,
    Path(file_name): Path<String>,
) -> Result<Response, ApiError> {
    Ok(state.store.serve(&file_name).await?)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Boundary wrapper: every media failure becomes one generic message per
/// category; raw detail goes to the log only.
struct ApiError(MediaError);

impl From<MediaError> for ApiError {
    fn from(error: MediaError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MediaError::InvalidUrl | MediaError::UnsupportedSelector(_) => StatusCode::BAD_REQUEST,
            MediaError::ToolMissing => StatusCode::SERVICE_UNAVAILABLE,
            MediaError::ExtractionFailed(_) | MediaError::DownloadFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            MediaError::NotFound => StatusCode::NOT_FOUND,
            MediaError::ArtifactMissing | MediaError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        let body = Json(ErrorBody {
            error: self.0.user_message().to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn test_router(staging: &std::path::Path, tool_override: Option<String>) -> Router {
        let store = Arc::new(ArtifactStore::new(staging.to_path_buf()).unwrap());
        let media = MediaService::new(staging.to_path_buf(), tool_override);
        router(Arc::new(AppState { media, store }))
    }

    #[tokio::test]
    async fn test_info_rejects_bad_url() {
        let temp = tempfile::tempdir().unwrap();
        let app = test_router(temp.path(), None);

        let request = Request::builder()
            .method("POST")
            .uri("/api/info")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"url":"https://example.com/x"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["error"], "invalid or unsupported video URL");
    }

    #[tokio::test]
    async fn test_download_rejects_bad_selector() {
        let temp = tempfile::tempdir().unwrap();
        let app = test_router(temp.path(), None);

        let request = Request::builder()
            .method("POST")
            .uri("/api/download")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                r#"{"url":"https://youtu.be/dQw4w9WgXcQ","quality":"$(reboot)"}"#,
            ))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_fetch_unknown_file_is_404() {
        let temp = tempfile::tempdir().unwrap();
        let app = test_router(temp.path(), None);

        let request = Request::builder()
            .uri("/downloads/video_nope_1.mp4")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // Stand-in for yt-dlp: answers --version, finds the -o template, and
    // writes an mp3 where the template points.
    const STUB_TOOL: &str = r#"#!/usr/bin/env bash
set -eu
if [[ "${1:-}" == "--version" ]]; then
  echo "2025.01.01"
  exit 0
fi
template=""
while [[ $# -gt 0 ]]; do
  if [[ "$1" == "-o" ]]; then
    shift
    template="$1"
  fi
  shift
done
printf 'dummy audio content' > "${template/\%(ext)s/mp3}"
"#;

    fn install_stub(dir: &std::path::Path) -> String {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-yt-dlp");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(STUB_TOOL.as_bytes()).unwrap();
        let mut permissions = file.metadata().unwrap().permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(&path, permissions).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_download_fetch_and_reclaim_flow() {
        let temp = tempfile::tempdir().unwrap();
        let staging = temp.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        let stub = install_stub(temp.path());
        let app = test_router(&staging, Some(stub));

        // Start the download.
        let request = Request::builder()
            .method("POST")
            .uri("/api/download")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(
                r#"{"url":"https://www.youtube.com/watch?v=AAAAAAAAAAA","quality":"audio"}"#,
            ))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let artifact: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let file_name = artifact["file_name"].as_str().unwrap().to_string();
        assert!(file_name.starts_with("video_AAAAAAAAAAA_"));
        assert!(file_name.ends_with(".mp3"));
        assert_eq!(
            artifact["size_bytes"].as_u64().unwrap(),
            "dummy audio content".len() as u64
        );
        assert_eq!(
            artifact["download_url"].as_str().unwrap(),
            format!("/downloads/{file_name}")
        );

        // Fetch it back once.
        let request = Request::builder()
            .uri(format!("/downloads/{file_name}"))
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"dummy audio content");

        // The post-serve timer reclaims the file shortly after.
        let path = staging.join(&file_name);
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(8);
        while path.exists() && std::time::Instant::now() < deadline {
            tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        }
        assert!(!path.exists(), "artifact should be reclaimed after serving");

        // A second fetch finds nothing.
        let request = Request::builder()
            .uri(format!("/downloads/{file_name}"))
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_missing_tool() {
        let temp = tempfile::tempdir().unwrap();
        // Point the override at a binary that cannot exist.
        let app = test_router(
            temp.path(),
            Some("/nonexistent/definitely-not-a-tool".to_string()),
        );

        let request = Request::builder()
            .uri("/api/health")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert!(parsed["tool"].is_null());
    }
}
