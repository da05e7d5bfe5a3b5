use crate::media::MediaError;
use axum::{
    body::Body,
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        HeaderMap, HeaderValue,
    },
    response::{IntoResponse, Response},
};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime},
};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

const POST_SERVE_DELETE_DELAY: Duration = Duration::from_secs(5);
const SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);
const MAX_ARTIFACT_AGE: Duration = Duration::from_secs(60 * 60);

/// Owns the on-disk staging area. Nothing else in the process touches these
/// files directly; reclamation happens through the post-serve timer and the
/// periodic sweep, both of which treat an already-missing file as done.
pub struct ArtifactStore {
    staging_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(staging_dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&staging_dir)?;
        Ok(Self { staging_dir })
    }

    /// Stream a staged file back as an attachment and schedule its removal.
    pub async fn serve(&self, file_name: &str) -> Result<Response, MediaError> {
        if !is_safe_file_name(file_name) {
            return Err(MediaError::NotFound);
        }

        let path = self.staging_dir.join(file_name);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Err(MediaError::NotFound),
        };

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(MediaError::NotFound),
            Err(e) => return Err(MediaError::Io(e)),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        headers.insert(
            CONTENT_LENGTH,
            HeaderValue::from_str(&metadata.len().to_string())
                .map_err(|e| MediaError::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?,
        );
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\""))
                .map_err(|e| MediaError::Io(std::io::Error::new(ErrorKind::InvalidData, e)))?,
        );

        debug!("Serving artifact {} ({} bytes)", file_name, metadata.len());
        schedule_delete(path);

        let body = Body::from_stream(ReaderStream::new(file));
        Ok((headers, body).into_response())
    }

    /// Start the periodic sweep, owned by the caller's lifecycle. The first
    /// pass runs immediately to reclaim anything left over from a crash.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                ticker.tick().await;
                store.sweep_once(SystemTime::now()).await;
            }
        })
    }

    /// Delete every staged entry whose mtime is older than the retention
    /// threshold relative to `now`. Per-entry failures are logged and do not
    /// stop the rest of the sweep.
    pub async fn sweep_once(&self, now: SystemTime) {
        let mut entries = match tokio::fs::read_dir(&self.staging_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Sweep could not open {:?}: {}", self.staging_dir, e);
                return;
            }
        };

        let mut removed = 0usize;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!("Sweep could not advance in {:?}: {}", self.staging_dir, e);
                    break;
                }
            };

            let path = entry.path();
            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("Sweep could not stat {:?}: {}", path, e);
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age > MAX_ARTIFACT_AGE {
                remove_artifact(&path).await;
                removed += 1;
            }
        }

        if removed > 0 {
            info!("Sweep removed {} expired artifact(s)", removed);
        }
    }
}

fn schedule_delete(path: PathBuf) {
    tokio::spawn(async move {
        tokio::time::sleep(POST_SERVE_DELETE_DELAY).await;
        remove_artifact(&path).await;
    });
}

/// Idempotent delete: the post-serve timer and the sweep may race on the same
/// file, so a file that is already gone counts as success.
async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed artifact {:?}", path),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove artifact {:?}: {}", path, e),
    }
}

/// Plain file names only. Anything resembling a path escapes the staging
/// directory contract and is treated as nonexistent.
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}
