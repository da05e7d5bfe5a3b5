use super::{
    error::MediaError,
    types::{FormatDescriptor, VideoMetadata},
};
use serde_json::Value;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Containers worth surfacing from the format listing. Everything else
/// (storyboards, 3gp leftovers) is noise for this API.
const CONTAINER_MARKERS: [&str; 3] = ["mp4", "webm", "m4a"];

/// The listing is truncated to the first entries found; callers wanting the
/// full matrix should talk to the tool directly.
const MAX_FORMATS: usize = 10;

pub struct MetadataFetcher {
    command: String,
    timeout: Duration,
}

impl MetadataFetcher {
    pub fn new(command: String) -> Self {
        Self {
            command,
            timeout: METADATA_TIMEOUT,
        }
    }

    /// Fetch structured metadata plus the parsed format listing for a URL.
    /// Issues two tool invocations, each bounded by the metadata timeout.
    pub async fn fetch(&self, url: &str, video_id: &str) -> Result<VideoMetadata, MediaError> {
        let document = self.dump_json(url).await?;
        let listing = self.list_formats(url).await?;
        let formats = parse_format_listing(&listing);

        Ok(build_metadata(video_id, &document, formats))
    }

    async fn dump_json(&self, url: &str) -> Result<Value, MediaError> {
        debug!("Extracting metadata with {} for: {}", self.command, url);

        let output = self
            .run(&["--dump-json", "--no-download", "--no-warnings", url])
            .await?;

        serde_json::from_slice(&output.stdout)
            .map_err(|e| MediaError::ExtractionFailed(format!("unparseable metadata: {e}")))
    }

    async fn list_formats(&self, url: &str) -> Result<String, MediaError> {
        debug!("Listing formats with {} for: {}", self.command, url);

        let output = self.run(&["-F", "--no-warnings", url]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output, MediaError> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.command).args(args).output(),
        )
        .await
        .map_err(|_| MediaError::ExtractionFailed("metadata extraction timed out".to_string()))?
        .map_err(|e| MediaError::ExtractionFailed(format!("failed to run {}: {e}", self.command)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::ExtractionFailed(error.trim().to_string()));
        }

        Ok(output)
    }
}

/// Scan the human-readable format listing for lines mentioning a known
/// container. Columns are whitespace-separated: id, container, quality label,
/// then a free-text note. Header rows carry the literal word `format` in the
/// quality column and are skipped.
pub fn parse_format_listing(listing: &str) -> Vec<FormatDescriptor> {
    let mut formats = Vec::new();

    for line in listing.lines() {
        if !CONTAINER_MARKERS.iter().any(|marker| line.contains(marker)) {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let (Some(format_id), Some(container), Some(quality)) =
            (tokens.next(), tokens.next(), tokens.next())
        else {
            continue;
        };
        if quality == "format" {
            continue;
        }

        formats.push(FormatDescriptor {
            format_id: format_id.to_string(),
            container: container.to_string(),
            quality: quality.to_string(),
            note: tokens.collect::<Vec<_>>().join(" "),
        });

        if formats.len() == MAX_FORMATS {
            break;
        }
    }

    formats
}

/// Overlay tool-reported values onto the documented defaults.
fn build_metadata(video_id: &str, document: &Value, formats: Vec<FormatDescriptor>) -> VideoMetadata {
    VideoMetadata {
        title: document["title"]
            .as_str()
            .unwrap_or("Unknown Title")
            .to_string(),
        thumbnail: document["thumbnail"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")),
        duration: format_duration(document["duration"].as_f64().unwrap_or(0.0) as u64),
        uploader: document["uploader"].as_str().unwrap_or("Unknown").to_string(),
        view_count: document["view_count"].as_u64().unwrap_or(0),
        upload_date: document["upload_date"].as_str().unwrap_or("").to_string(),
        description: document["description"].as_str().unwrap_or("").to_string(),
        formats,
    }
}

fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}
