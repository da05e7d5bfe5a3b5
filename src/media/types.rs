use serde::{Deserialize, Serialize};

/// One encoding option reported by the extraction tool's format listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatDescriptor {
    pub format_id: String,
    pub container: String,
    pub quality: String,
    pub note: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail: String,
    pub duration: String,
    pub uploader: String,
    pub view_count: u64,
    pub upload_date: String,
    pub description: String,
    pub formats: Vec<FormatDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadRequest {
    pub url: String,
    #[serde(default = "default_quality")]
    pub quality: String,
    #[serde(default = "default_container")]
    pub container: String,
}

fn default_quality() -> String {
    "highest".to_string()
}

fn default_container() -> String {
    "mp4".to_string()
}

/// A staged download, named after the reserved request prefix. The extension
/// is whatever the extraction tool decided to write.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactDescriptor {
    pub file_name: String,
    pub size_bytes: u64,
    pub download_url: String,
}
