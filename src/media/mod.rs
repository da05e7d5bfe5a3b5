mod download;
mod error;
mod metadata;
mod tool;
mod types;
mod url;

pub use error::MediaError;
pub use tool::{ExtractorTool, ToolAvailability};
pub use types::{ArtifactDescriptor, DownloadRequest, FormatDescriptor, VideoMetadata};

use download::{DownloadOrchestrator, Quality};
use metadata::MetadataFetcher;
use self::url::parse_video_id;
use std::path::PathBuf;
use tracing::{info, warn};

/// Facade over the extraction pipeline. Owns no state beyond the staging
/// location and an optional tool override; tool availability is probed fresh
/// for every request.
pub struct MediaService {
    staging_dir: PathBuf,
    tool_override: Option<String>,
}

impl MediaService {
    pub fn new(staging_dir: PathBuf, tool_override: Option<String>) -> Self {
        Self {
            staging_dir,
            tool_override,
        }
    }

    /// Log which tool answered the probe. A missing tool is a warning rather
    /// than a startup failure since installs are probed per request.
    pub async fn startup_check(&self) {
        match self.availability().await {
            ToolAvailability::Available(tool) => {
                info!("Extraction tool ready: {}", tool.command());
            }
            ToolAvailability::Unavailable => {
                warn!("No extraction tool found. Install yt-dlp or youtube-dl.");
            }
        }
    }

    pub async fn availability(&self) -> ToolAvailability {
        if let Some(command) = &self.tool_override {
            if tool::version_check(command).await {
                // Overrides are treated as the primary variant.
                return ToolAvailability::Available(ExtractorTool::YtDlp);
            }
            return ToolAvailability::Unavailable;
        }
        tool::probe().await
    }

    async fn resolve_command(&self) -> Result<String, MediaError> {
        if let Some(command) = &self.tool_override {
            if tool::version_check(command).await {
                return Ok(command.clone());
            }
            return Err(MediaError::ToolMissing);
        }

        match tool::probe().await {
            ToolAvailability::Available(tool) => Ok(tool.command().to_string()),
            ToolAvailability::Unavailable => Err(MediaError::ToolMissing),
        }
    }

    /// Fetch metadata and the available encodings for a video URL.
    pub async fn get_info(&self, url: &str) -> Result<VideoMetadata, MediaError> {
        let video_id = parse_video_id(url)?;
        let command = self.resolve_command().await?;

        MetadataFetcher::new(command).fetch(url, &video_id).await
    }

    /// Validate a download request and run it to a staged artifact.
    pub async fn start_download(
        &self,
        request: &DownloadRequest,
    ) -> Result<ArtifactDescriptor, MediaError> {
        let video_id = parse_video_id(&request.url)?;
        let quality = Quality::parse(&request.quality)?;
        download::validate_container(&request.container)?;

        let command = self.resolve_command().await?;
        DownloadOrchestrator::new(command, self.staging_dir.clone())
            .download(&request.url, &video_id, quality, &request.container)
            .await
    }
}
