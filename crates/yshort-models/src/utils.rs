//! Utility functions for URL parsing and title handling.
//!
//! These helpers are shared by the acquisition, publishing and HTTP layers.

use url::Url;

/// Title used when the source metadata carries none.
pub const DEFAULT_TITLE: &str = "short";

/// Characters stripped from titles before they are used in object keys or filenames.
const UNSAFE_TITLE_CHARS: [char; 9] = ['|', '\\', '/', '<', '>', ':', '"', '?', '*'];

/// Extract the video identifier from a source URL.
///
/// - `https://youtu.be/VIDEO_ID` yields the path after the leading slash
/// - any other URL yields its `v` query parameter
/// - input that is not an absolute URL, or has no usable `v` parameter,
///   is returned unchanged
///
/// Never fails: anything unrecognised is treated as an identifier already.
pub fn extract_video_id(input: &str) -> String {
    let parsed = match Url::parse(input) {
        Ok(url) => url,
        Err(_) => return input.to_string(),
    };

    let is_short_link = parsed
        .host_str()
        .map(|host| host.contains("youtu.be"))
        .unwrap_or(false);

    if is_short_link {
        return parsed.path().strip_prefix('/').unwrap_or(parsed.path()).to_string();
    }

    parsed
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| input.to_string())
}

/// Remove filesystem-unsafe characters (`| \ / < > : " ? *`) from a title.
///
/// Every other character, including whitespace, is preserved.
pub fn sanitize_title(title: &str) -> String {
    title.chars().filter(|c| !UNSAFE_TITLE_CHARS.contains(c)).collect()
}

/// Keep at most `max_chars` characters of a title (character-based, never splits a code point).
pub fn truncate_title(title: &str, max_chars: usize) -> String {
    title.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id_watch_urls() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://youtube.com/watch?v=abc123&list=PLrAXtmRdnEQy4qtr"),
            "abc123"
        );
        assert_eq!(
            extract_video_id("https://m.youtube.com/watch?feature=share&v=xyz"),
            "xyz"
        );
    }

    #[test]
    fn test_extract_video_id_short_links() {
        assert_eq!(extract_video_id("https://youtu.be/abc123"), "abc123");
        assert_eq!(extract_video_id("https://youtu.be/abc123?t=30"), "abc123");
    }

    #[test]
    fn test_extract_video_id_falls_back_to_input() {
        // Not a URL at all
        assert_eq!(extract_video_id("abc123"), "abc123");
        assert_eq!(extract_video_id("not a url"), "not a url");

        // URL without a v parameter
        assert_eq!(
            extract_video_id("https://example.com/video"),
            "https://example.com/video"
        );

        // Empty v parameter
        assert_eq!(
            extract_video_id("https://youtube.com/watch?v="),
            "https://youtube.com/watch?v="
        );
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("My:Clip/2024?"), "MyClip2024");
        assert_eq!(sanitize_title(r#"a|b\c/d<e>f:g"h?i*j"#), "abcdefghij");
        assert_eq!(sanitize_title("Keep spaces - and_dots."), "Keep spaces - and_dots.");
        assert_eq!(sanitize_title("日本語 タイトル"), "日本語 タイトル");
        assert_eq!(sanitize_title(""), "");
    }

    #[test]
    fn test_truncate_title() {
        let long = "x".repeat(80);
        assert_eq!(truncate_title(&long, 50).len(), 50);
        assert_eq!(truncate_title("short", 50), "short");
        assert_eq!(truncate_title("ééééé", 3), "ééé");
    }
}
