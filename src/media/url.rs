use super::error::MediaError;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

// Matches the watch, short-link, embed and shorts shapes in one pass. The id
// capture is exactly 11 characters and must be bounded by a non-id character
// or the end of the string.
static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:[^#]*&)?v=|embed/|shorts/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    )
    .expect("video id pattern compiles")
});

/// Extract the canonical 11-character video identifier from a submitted URL.
/// Purely syntactic; never touches the network.
pub fn parse_video_id(input: &str) -> Result<String, MediaError> {
    let parsed = Url::parse(input).map_err(|_| MediaError::InvalidUrl)?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(MediaError::InvalidUrl);
    }

    let host = parsed
        .host_str()
        .ok_or(MediaError::InvalidUrl)?
        .to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    if !matches!(
        host,
        "youtube.com" | "m.youtube.com" | "music.youtube.com" | "youtu.be"
    ) {
        return Err(MediaError::InvalidUrl);
    }

    VIDEO_ID
        .captures(input)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
        .ok_or(MediaError::InvalidUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recognized_shapes() {
        let expected = "dQw4w9WgXcQ";
        let urls = [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://www.youtube.com/watch?list=PL123&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abcdef",
        ];
        for url in urls {
            assert_eq!(parse_video_id(url).unwrap(), expected, "url: {url}");
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let urls = [
            "",
            "not a url",
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/",
            "https://www.youtube.com/watch?v=short",
            "ftp://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com.evil.com/watch?v=dQw4w9WgXcQ",
        ];
        for url in urls {
            assert!(
                matches!(parse_video_id(url), Err(MediaError::InvalidUrl)),
                "url: {url}"
            );
        }
    }

    #[test]
    fn test_parse_requires_exact_length() {
        // Twelve id characters in a row is not a valid id.
        let result = parse_video_id("https://youtu.be/dQw4w9WgXcQx");
        assert!(matches!(result, Err(MediaError::InvalidUrl)));
    }
}
