use crate::config::Config;
use crate::error::{Result, YomiruError};
use crate::models::{
    ApiEnvelope, ChapterInfoData, Page, ProcessData, ProcessRequest, ProgressEvent, Settings,
};
use crate::storage::StorageManager;
use crate::traits::{ChapterProcessor, ProgressCallback};
use crate::utils::{build_http_client, join_endpoint, parse_endpoint};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

/// Everything needed to build an [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub images_dir: PathBuf,
}

impl ClientConfig {
    pub fn from_settings(settings: &Settings, config: &Config) -> Self {
        Self {
            endpoint: settings.backend_endpoint.clone(),
            api_key: settings.api_key.clone(),
            timeout: config.backend.timeout(),
            connect_timeout: config.backend.connect_timeout(),
            user_agent: config.backend.user_agent.clone(),
            images_dir: config.images_path(),
        }
    }
}

/// Client for the translation/colorization backend.
///
/// A client is immutable once built. Reconfiguring produces a new client, so
/// calls already running on the old one keep their endpoint and credential.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    endpoint: Url,
    api_key: String,
    timeout: Duration,
    storage: StorageManager,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let endpoint = parse_endpoint(&config.endpoint)?;
        let api_key = config.api_key.trim().to_string();
        if api_key.is_empty() {
            return Err(YomiruError::configuration("API key is not set"));
        }

        let http = build_http_client(&config.user_agent, config.connect_timeout)?;

        Ok(Self {
            http,
            endpoint,
            api_key,
            timeout: config.timeout,
            storage: StorageManager::new(config.images_dir.clone()),
            config,
        })
    }

    /// A new client pointed at another endpoint/credential pair.
    pub fn reconfigure(&self, endpoint: &str, api_key: &str) -> Result<Self> {
        Self::new(ClientConfig {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            ..self.config.clone()
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    /// Downloads one processed page image and returns its local path.
    ///
    /// Transport errors, any status other than 200 and write failures are all
    /// reported as [`YomiruError::Download`] for `page_id`.
    pub async fn download_image(&self, url: &str, page_id: &str) -> Result<String> {
        let path = self.storage.page_image_path(page_id, url);
        debug!("[API] Downloading page {} from {} to {:?}", page_id, url, path);

        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| YomiruError::download(page_id, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(YomiruError::download(page_id, format!("HTTP {}", status)));
        }

        self.storage
            .write_response(response, &path)
            .await
            .map_err(|e| YomiruError::download(page_id, e))?;

        Ok(path.to_string_lossy().to_string())
    }

    async fn post_envelope<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(join_endpoint(&self.endpoint, path)).json(body);
        self.send_envelope(request, fallback).await
    }

    /// Sends an authenticated backend request and unwraps the envelope.
    /// POST bodies set their own `Content-Type` through `json`.
    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<Option<T>> {
        let request_id = Uuid::new_v4();
        let response = request
            .bearer_auth(&self.api_key)
            .header("X-Request-Id", request_id.to_string())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| YomiruError::from_request(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| YomiruError::from_request(e, self.timeout))?;
        debug!("[API] Request {} answered HTTP {} ({} bytes)", request_id, status, body.len());

        let envelope: ApiEnvelope<T> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(YomiruError::transport(format!("backend returned HTTP {}", status)));
            }
            Err(e) => {
                return Err(YomiruError::transport(format!(
                    "malformed response from backend: {}",
                    e
                )));
            }
        };

        if !envelope.success {
            return Err(YomiruError::backend(envelope.failure_text(fallback)));
        }
        if !status.is_success() {
            return Err(YomiruError::transport(format!("backend returned HTTP {}", status)));
        }

        Ok(envelope.data)
    }
}

#[async_trait::async_trait]
impl ChapterProcessor for ApiClient {
    async fn process_chapter(
        &self,
        request: &ProcessRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<Vec<Page>> {
        if request.chapter_url.trim().is_empty() {
            return Err(YomiruError::configuration("chapter URL is empty"));
        }

        info!(
            "[API] Processing chapter {} (translation: {}, colorization: {})",
            request.chapter_url, request.translation.enabled, request.colorization.enabled
        );

        let data: Option<ProcessData> = self
            .post_envelope("process", request, "Failed to process chapter")
            .await?;
        let pages = data.map(|d| d.pages).unwrap_or_default();
        let total = pages.len();
        info!("[API] Backend returned {} pages", total);

        let mut processed = Vec::with_capacity(total);
        for (index, page) in pages.into_iter().enumerate() {
            on_progress(&ProgressEvent::page(index + 1, total));

            let processed_url = page.processed_url.clone().filter(|url| !url.is_empty());
            let page = match processed_url {
                Some(url) => {
                    let local_path = self.download_image(&url, &page.id).await?;
                    Page {
                        local_path: Some(local_path),
                        is_processed: true,
                        is_loading: false,
                        ..page
                    }
                }
                None => Page {
                    is_processed: false,
                    is_loading: false,
                    ..page
                },
            };
            processed.push(page);
        }

        info!("[API] Chapter ready: {} pages", processed.len());
        Ok(processed)
    }

    async fn fetch_chapter_info(&self, chapter_url: &str) -> Result<ChapterInfoData> {
        if chapter_url.trim().is_empty() {
            return Err(YomiruError::configuration("chapter URL is empty"));
        }

        info!("[API] Fetching chapter info for {}", chapter_url);
        let data: Option<ChapterInfoData> = self
            .post_envelope(
                "chapter-info",
                &json!({ "url": chapter_url }),
                "Failed to fetch chapter info",
            )
            .await?;

        Ok(data.unwrap_or_default())
    }

    async fn health_check(&self) -> bool {
        let request = self
            .http
            .get(join_endpoint(&self.endpoint, "health"))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        match self
            .send_envelope::<serde_json::Value>(request, "Health check failed")
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!("[API] Health check failed: {}", e);
                false
            }
        }
    }
}
