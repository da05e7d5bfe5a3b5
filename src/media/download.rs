use super::{error::MediaError, types::ArtifactDescriptor};
use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::process::Command;
use tracing::{debug, info};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Containers a caller may ask for. Anything outside this list never reaches
/// the subprocess argument vector.
const ALLOWED_CONTAINERS: [&str; 3] = ["mp4", "webm", "mkv"];

/// A validated quality selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Audio,
    Highest,
    MaxHeight(u32),
}

impl Quality {
    /// Parse an untrusted selector string. Exact membership only: `audio`,
    /// `highest`, or a height bound like `720p`.
    pub fn parse(selector: &str) -> Result<Self, MediaError> {
        match selector {
            "audio" => Ok(Self::Audio),
            "highest" => Ok(Self::Highest),
            _ => selector
                .strip_suffix('p')
                .filter(|digits| {
                    (3..=4).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
                })
                .and_then(|digits| digits.parse().ok())
                .map(Self::MaxHeight)
                .ok_or_else(|| MediaError::UnsupportedSelector(selector.to_string())),
        }
    }
}

pub fn validate_container(container: &str) -> Result<(), MediaError> {
    if ALLOWED_CONTAINERS.contains(&container) {
        Ok(())
    } else {
        Err(MediaError::UnsupportedSelector(container.to_string()))
    }
}

pub struct DownloadOrchestrator {
    command: String,
    staging_dir: PathBuf,
    timeout: Duration,
}

impl DownloadOrchestrator {
    pub fn new(command: String, staging_dir: PathBuf) -> Self {
        Self {
            command,
            staging_dir,
            timeout: DOWNLOAD_TIMEOUT,
        }
    }

    /// Run the extraction tool for a validated request and locate the file it
    /// produced. The prefix is reserved before the tool runs; the extension is
    /// only known after it exits.
    pub async fn download(
        &self,
        url: &str,
        video_id: &str,
        quality: Quality,
        container: &str,
    ) -> Result<ArtifactDescriptor, MediaError> {
        let prefix = artifact_prefix(video_id, SystemTime::now());
        let template = self
            .staging_dir
            .join(format!("{prefix}.%(ext)s"))
            .to_string_lossy()
            .into_owned();

        let args = build_args(quality, container, &template, url);
        info!("Downloading {} as {} with {}", video_id, prefix, self.command);
        debug!("{} args: {:?}", self.command, args);

        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.command).args(&args).output(),
        )
        .await
        .map_err(|_| MediaError::DownloadFailed("download timed out".to_string()))?
        .map_err(|e| MediaError::DownloadFailed(format!("failed to run {}: {e}", self.command)))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(MediaError::DownloadFailed(error.trim().to_string()));
        }

        let entries = list_file_names(&self.staging_dir).await?;
        let file_name = find_artifact(&entries, &prefix)
            .ok_or(MediaError::ArtifactMissing)?
            .to_string();

        let size_bytes = tokio::fs::metadata(self.staging_dir.join(&file_name))
            .await?
            .len();

        info!("Downloaded {} ({} bytes)", file_name, size_bytes);

        Ok(ArtifactDescriptor {
            download_url: format!("/downloads/{file_name}"),
            file_name,
            size_bytes,
        })
    }
}

/// Reserve a unique staging prefix for one request. Uniqueness across
/// near-simultaneous requests rides on the millisecond timestamp.
fn artifact_prefix(video_id: &str, now: SystemTime) -> String {
    let millis = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("video_{video_id}_{millis}")
}

/// Map a validated selector onto the tool's argument vector. Structured argv
/// only; nothing here passes through a shell.
fn build_args(quality: Quality, container: &str, output_template: &str, url: &str) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "-o".to_string(),
        output_template.to_string(),
    ];

    match quality {
        Quality::Audio => {
            args.extend(
                ["-x", "--audio-format", "mp3", "--audio-quality", "0"]
                    .into_iter()
                    .map(String::from),
            );
        }
        Quality::Highest => {
            args.push("-f".to_string());
            args.push(format!(
                "bestvideo[ext={container}]+bestaudio/best[ext={container}]/best"
            ));
            args.push("--merge-output-format".to_string());
            args.push(container.to_string());
        }
        Quality::MaxHeight(height) => {
            args.push("-f".to_string());
            args.push(format!(
                "bestvideo[height<={height}][ext={container}]+bestaudio/best[height<={height}][ext={container}]/best[height<={height}]"
            ));
            args.push("--merge-output-format".to_string());
            args.push(container.to_string());
        }
    }

    args.push(url.to_string());
    args
}

/// Pick the produced file out of a directory snapshot by prefix match.
pub fn find_artifact<'a>(entries: &'a [String], prefix: &str) -> Option<&'a str> {
    entries
        .iter()
        .map(String::as_str)
        .find(|name| name.contains(prefix))
}

async fn list_file_names(dir: &Path) -> Result<Vec<String>, MediaError> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    Ok(names)
}
