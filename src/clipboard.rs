use url::Url;

/// Read-only access to the system clipboard.
pub trait ClipboardReader: Send + Sync {
    fn read_text(&self) -> Option<String>;
}

/// A clipboard that is always empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoClipboard;

impl ClipboardReader for NoClipboard {
    fn read_text(&self) -> Option<String> {
        None
    }
}

/// A clipboard holding fixed text, e.g. passed on the command line.
#[derive(Debug, Clone)]
pub struct TextClipboard(pub String);

impl ClipboardReader for TextClipboard {
    fn read_text(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// True when `text` is an absolute http(s) URL.
pub fn looks_like_url(text: &str) -> bool {
    Url::parse(text.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false)
}

/// The clipboard's content when it looks like a chapter URL.
pub fn clipboard_url(clipboard: &dyn ClipboardReader) -> Option<String> {
    clipboard
        .read_text()
        .map(|text| text.trim().to_string())
        .filter(|text| looks_like_url(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_http_urls_only() {
        assert!(looks_like_url("https://mangadex.org/chapter/abc"));
        assert!(looks_like_url("  http://x/c1 \n"));
        assert!(!looks_like_url("mailto:someone@example.com"));
        assert!(!looks_like_url("httpfoo"));
        assert!(!looks_like_url(""));
    }

    #[test]
    fn clipboard_url_trims_and_filters() {
        let clipboard = TextClipboard(" https://x/c1\n".to_string());
        assert_eq!(clipboard_url(&clipboard).as_deref(), Some("https://x/c1"));
        assert_eq!(clipboard_url(&TextClipboard("hello".to_string())), None);
        assert_eq!(clipboard_url(&NoClipboard), None);
    }
}
