use crate::error::{Result, YomiruError};
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Builds the shared reqwest client. The per-call timeout is applied on each
/// backend request instead of here, so page downloads keep their own bound.
pub fn build_http_client(user_agent: &str, connect_timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| YomiruError::transport(format!("failed to create HTTP client: {}", e)))
}

/// Parses a backend endpoint, accepting only absolute http(s) URLs.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(YomiruError::configuration("backend endpoint is not set"));
    }

    let url = Url::parse(trimmed)?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(YomiruError::configuration(format!(
            "unsupported endpoint scheme '{}'",
            other
        ))),
    }
}

/// `{endpoint}/{path}` with exactly one slash between them.
pub fn join_endpoint(endpoint: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        endpoint.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// File extension for a downloaded page, taken from the URL path when it is a
/// known image type.
pub fn image_extension(url: &str) -> &'static str {
    let extension = Url::parse(url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_string))
            .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()))
    });

    extension
        .and_then(|ext| IMAGE_EXTENSIONS.iter().find(|known| **known == ext).copied())
        .unwrap_or("jpg")
}
