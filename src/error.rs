use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum YomiruError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure reported by the backend envelope. Displayed verbatim.
    #[error("{0}")]
    Backend(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Failed to download page {page_id}: {reason}")]
    Download { page_id: String, reason: String },

    #[error("A chapter is already being processed")]
    Busy,

    #[error("Settings store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl YomiruError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn download(page_id: impl Into<String>, reason: impl ToString) -> Self {
        Self::Download {
            page_id: page_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Maps a reqwest failure on a backend call, keeping timeouts distinct.
    pub fn from_request(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Transport(err.to_string())
        }
    }

    /// True for failures raised before any network traffic.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, YomiruError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_error_displays_message_verbatim() {
        let err = YomiruError::backend("Chapter not found on source");
        assert_eq!(err.to_string(), "Chapter not found on source");
    }

    #[test]
    fn download_error_names_the_page() {
        let err = YomiruError::download("p3", "HTTP 404");
        assert_eq!(err.to_string(), "Failed to download page p3: HTTP 404");
    }

    #[test]
    fn configuration_errors_are_flagged() {
        assert!(YomiruError::configuration("no endpoint").is_configuration());
        assert!(!YomiruError::transport("refused").is_configuration());
        assert!(!YomiruError::Busy.is_configuration());
    }
}
