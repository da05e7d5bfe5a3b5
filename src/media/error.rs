use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("unrecognized video URL")]
    InvalidUrl,

    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),

    #[error("no extraction tool is installed")]
    ToolMissing,

    #[error("metadata extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("extraction succeeded but no output file matched the reserved prefix")]
    ArtifactMissing,

    #[error("file not found")]
    NotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// The message exposed to API callers. Raw diagnostics stay in the logs.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidUrl => "invalid or unsupported video URL",
            Self::UnsupportedSelector(_) => "unsupported quality or container selection",
            Self::ToolMissing => "video extraction tool is not installed on the server",
            Self::ExtractionFailed(_) => "failed to get information, check URL and retry",
            Self::DownloadFailed(_) => "download failed, check URL and retry",
            Self::ArtifactMissing => "download did not produce a file",
            Self::NotFound => "file not found or already removed",
            Self::Io(_) => "internal server error",
        }
    }
}
