use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub chapter_url: String,
    pub translation: TranslationOptions,
    pub colorization: ColorizationOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TranslationOptions {
    pub source_language: String,
    pub target_language: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorizationOptions {
    pub enabled: bool,
}

/// One page descriptor, as returned by the backend and after local handling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub original_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(default)]
    pub is_processed: bool,
    #[serde(default)]
    pub is_loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Page {
    /// The location a viewer should render: the downloaded file when present,
    /// otherwise the original remote image.
    pub fn display_source(&self) -> &str {
        self.local_path.as_deref().unwrap_or(&self.original_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

impl ProgressEvent {
    pub fn page(current: usize, total: usize) -> Self {
        Self {
            current,
            total,
            message: format!("Processing page {} of {}", current, total),
        }
    }
}

/// Response envelope shared by every backend endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Backend failure text: `error` first, then `message`, then `fallback`.
    pub fn failure_text(&self, fallback: &str) -> String {
        fn non_empty(text: &Option<String>) -> Option<&str> {
            text.as_deref().filter(|t| !t.is_empty())
        }

        non_empty(&self.error)
            .or_else(|| non_empty(&self.message))
            .unwrap_or(fallback)
            .to_string()
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProcessData {
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// Chapter metadata from `/chapter-info`. Fields beyond the common ones are
/// backend-defined and kept in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterInfoData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub chapter_url: String,
    pub translation_enabled: bool,
    pub source_language: String,
    pub target_language: String,
    pub colorization_enabled: bool,
    pub api_key: String,
    pub backend_endpoint: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chapter_url: String::new(),
            translation_enabled: true,
            source_language: "ja".to_string(),
            target_language: "en".to_string(),
            colorization_enabled: false,
            api_key: String::new(),
            backend_endpoint: String::new(),
        }
    }
}

impl Settings {
    pub fn to_process_request(&self) -> ProcessRequest {
        ProcessRequest {
            chapter_url: self.chapter_url.clone(),
            translation: TranslationOptions {
                source_language: self.source_language.clone(),
                target_language: self.target_language.clone(),
                enabled: self.translation_enabled,
            },
            colorization: ColorizationOptions {
                enabled: self.colorization_enabled,
            },
        }
    }

    pub fn has_backend(&self) -> bool {
        !self.backend_endpoint.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.chapter_url {
            self.chapter_url = v;
        }
        if let Some(v) = patch.translation_enabled {
            self.translation_enabled = v;
        }
        if let Some(v) = patch.source_language {
            self.source_language = v;
        }
        if let Some(v) = patch.target_language {
            self.target_language = v;
        }
        if let Some(v) = patch.colorization_enabled {
            self.colorization_enabled = v;
        }
        if let Some(v) = patch.api_key {
            self.api_key = v;
        }
        if let Some(v) = patch.backend_endpoint {
            self.backend_endpoint = v;
        }
    }
}

/// Partial settings update; `None` fields are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colorization_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_endpoint: Option<String>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,
    pub chapter_name: String,
    pub url: String,
    pub pages: Vec<Page>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl Default for Chapter {
    fn default() -> Self {
        Self {
            title: "Yomiru".to_string(),
            chapter_name: String::new(),
            url: String::new(),
            pages: Vec::new(),
            processed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    #[default]
    Idle,
    Fetching,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingProgress {
    pub current_page: usize,
    pub total_pages: usize,
    pub status: ProcessingStatus,
    pub message: Option<String>,
}

impl ProcessingProgress {
    pub fn with_status(status: ProcessingStatus, message: impl Into<String>) -> Self {
        Self {
            current_page: 0,
            total_pages: 0,
            status,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { code: "ja", name: "Japanese" },
    Language { code: "en", name: "English" },
    Language { code: "zh", name: "Chinese" },
    Language { code: "ko", name: "Korean" },
    Language { code: "es", name: "Spanish" },
    Language { code: "fr", name: "French" },
    Language { code: "de", name: "German" },
    Language { code: "it", name: "Italian" },
    Language { code: "pt", name: "Portuguese" },
    Language { code: "ru", name: "Russian" },
];

pub fn find_language(code: &str) -> Option<&'static Language> {
    SUPPORTED_LANGUAGES.iter().find(|l| l.code.eq_ignore_ascii_case(code))
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStatus::Idle => write!(f, "Idle"),
            ProcessingStatus::Fetching => write!(f, "Fetching"),
            ProcessingStatus::Processing => write!(f, "Processing"),
            ProcessingStatus::Completed => write!(f, "Completed"),
            ProcessingStatus::Error => write!(f, "Error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn process_request_uses_backend_field_names() {
        let request = Settings {
            chapter_url: "https://x/c1".to_string(),
            ..Settings::default()
        }
        .to_process_request();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "chapterUrl": "https://x/c1",
                "translation": {"sourceLanguage": "ja", "targetLanguage": "en", "enabled": true},
                "colorization": {"enabled": false}
            })
        );
    }

    #[test]
    fn page_flags_default_when_absent() {
        let page: Page =
            serde_json::from_value(json!({"id": "p1", "originalUrl": "https://x/p1.jpg"})).unwrap();
        assert!(!page.is_processed);
        assert!(!page.is_loading);
        assert_eq!(page.processed_url, None);
        assert_eq!(page.display_source(), "https://x/p1.jpg");
    }

    #[test]
    fn failure_text_prefers_error_over_message() {
        let envelope: ApiEnvelope<ProcessData> = serde_json::from_value(json!({
            "success": false, "error": "bad url", "message": "ignored"
        }))
        .unwrap();
        assert_eq!(envelope.failure_text("fallback"), "bad url");

        let envelope: ApiEnvelope<ProcessData> =
            serde_json::from_value(json!({"success": false, "message": "try later"})).unwrap();
        assert_eq!(envelope.failure_text("fallback"), "try later");

        let envelope: ApiEnvelope<ProcessData> =
            serde_json::from_value(json!({"success": false})).unwrap();
        assert_eq!(envelope.failure_text("fallback"), "fallback");
    }

    #[test]
    fn empty_error_falls_through_to_message() {
        let envelope: ApiEnvelope<ProcessData> = serde_json::from_value(json!({
            "success": false, "error": "", "message": "quota exceeded"
        }))
        .unwrap();
        assert_eq!(envelope.failure_text("fallback"), "quota exceeded");

        let envelope: ApiEnvelope<ProcessData> =
            serde_json::from_value(json!({"success": false, "error": "", "message": ""})).unwrap();
        assert_eq!(envelope.failure_text("fallback"), "fallback");
    }

    #[test]
    fn chapter_info_keeps_unknown_fields() {
        let info: ChapterInfoData = serde_json::from_value(json!({
            "title": "One Piece", "chapterName": "Ch. 1", "pageCount": 19, "scanlator": "tcb"
        }))
        .unwrap();
        assert_eq!(info.title.as_deref(), Some("One Piece"));
        assert_eq!(info.page_count, Some(19));
        assert_eq!(info.extra.get("scanlator"), Some(&json!("tcb")));
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let mut settings = Settings::default();
        settings.apply(SettingsPatch {
            colorization_enabled: Some(true),
            ..SettingsPatch::default()
        });
        assert!(settings.colorization_enabled);
        assert!(settings.translation_enabled);
        assert_eq!(settings.source_language, "ja");
    }

    #[test]
    fn language_lookup_is_case_insensitive() {
        assert_eq!(find_language("KO").map(|l| l.name), Some("Korean"));
        assert!(find_language("xx").is_none());
    }
}
