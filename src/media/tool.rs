use tokio::process::Command;
use tracing::{debug, warn};

/// The extraction tool variants this service knows how to drive. Both expose
/// the same command-line contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorTool {
    YtDlp,
    YoutubeDl,
}

impl ExtractorTool {
    pub fn command(&self) -> &'static str {
        match self {
            Self::YtDlp => "yt-dlp",
            Self::YoutubeDl => "youtube-dl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAvailability {
    Available(ExtractorTool),
    Unavailable,
}

/// Probe for a usable extraction tool, primary variant first. Computed fresh
/// on every call; an installation can appear or vanish between requests.
pub async fn probe() -> ToolAvailability {
    for tool in [ExtractorTool::YtDlp, ExtractorTool::YoutubeDl] {
        if version_check(tool.command()).await {
            return ToolAvailability::Available(tool);
        }
    }
    ToolAvailability::Unavailable
}

/// Run `<command> --version` and report whether it answered. A missing binary
/// is a normal outcome here, not a failure.
pub async fn version_check(command: &str) -> bool {
    match Command::new(command).arg("--version").output().await {
        Ok(output) => {
            if output.status.success() {
                let version = String::from_utf8_lossy(&output.stdout);
                debug!("{} is available, version: {}", command, version.trim());
                true
            } else {
                warn!("{} version check exited with an error", command);
                false
            }
        }
        Err(e) => {
            debug!("{} not found: {}", command, e);
            false
        }
    }
}
