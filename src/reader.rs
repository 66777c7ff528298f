//! Headless reader session: settings, current chapter and processing state.
//!
//! Only one chapter can be processed at a time. A second `execute` while one
//! is running fails with [`YomiruError::Busy`] and leaves all state alone.

use crate::client::{ApiClient, ClientConfig};
use crate::clipboard::{clipboard_url, ClipboardReader};
use crate::config::Config;
use crate::error::{Result, YomiruError};
use crate::models::{
    Chapter, ProcessingProgress, ProcessingStatus, ProgressEvent, Settings, SettingsPatch,
};
use crate::settings::{KeyValueStore, SettingsStore};
use crate::traits::ChapterProcessor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// What `initialize` found at startup.
#[derive(Debug, Clone)]
pub struct StartupReport {
    pub settings: Settings,
    /// Set when the clipboard held a URL that replaced the chapter URL.
    pub clipboard_url: Option<String>,
    pub backend_configured: bool,
}

pub struct ReaderSession<S: KeyValueStore> {
    config: Config,
    store: Mutex<SettingsStore<S>>,
    settings: Mutex<Settings>,
    processor: Mutex<Option<Arc<dyn ChapterProcessor>>>,
    chapter: Mutex<Chapter>,
    progress: Mutex<ProcessingProgress>,
    processing: AtomicBool,
}

struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: KeyValueStore> ReaderSession<S> {
    pub fn new(config: Config, store: S) -> Self {
        Self {
            config,
            store: Mutex::new(SettingsStore::new(store)),
            settings: Mutex::new(Settings::default()),
            processor: Mutex::new(None),
            chapter: Mutex::new(Chapter::default()),
            progress: Mutex::new(ProcessingProgress::default()),
            processing: AtomicBool::new(false),
        }
    }

    /// Replaces the backend client, e.g. with a preconfigured one.
    pub fn with_processor(self, processor: Arc<dyn ChapterProcessor>) -> Self {
        *lock(&self.processor) = Some(processor);
        self
    }

    /// Loads settings, applies a clipboard URL if there is one and builds the
    /// backend client when endpoint and API key are both set.
    pub fn initialize(&self, clipboard: &dyn ClipboardReader) -> Result<StartupReport> {
        let mut settings = lock(&self.store).get_settings()?;

        let detected = clipboard_url(clipboard);
        if let Some(url) = &detected {
            info!("[READER] Clipboard URL loaded into settings: {}", url);
            settings.chapter_url = url.clone();
            lock(&self.store).save_settings(&settings)?;
        }

        if settings.has_backend() {
            match self.build_processor(&settings) {
                Ok(processor) => *lock(&self.processor) = Some(processor),
                Err(e) => warn!("[READER] Backend not usable: {}", e),
            }
        }

        lock(&self.chapter).url = settings.chapter_url.clone();
        *lock(&self.settings) = settings.clone();

        Ok(StartupReport {
            settings,
            clipboard_url: detected,
            backend_configured: self.has_processor(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn settings(&self) -> Settings {
        lock(&self.settings).clone()
    }

    pub fn chapter(&self) -> Chapter {
        lock(&self.chapter).clone()
    }

    pub fn progress(&self) -> ProcessingProgress {
        lock(&self.progress).clone()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub fn has_processor(&self) -> bool {
        lock(&self.processor).is_some()
    }

    pub fn processor(&self) -> Option<Arc<dyn ChapterProcessor>> {
        lock(&self.processor).clone()
    }

    /// The last processed chapter, as persisted.
    pub fn saved_chapter(&self) -> Result<Option<Chapter>> {
        lock(&self.store).get_chapter_data()
    }

    pub fn toggle_translation(&self) -> Result<bool> {
        let enabled = !self.settings().translation_enabled;
        self.persist_patch(SettingsPatch {
            translation_enabled: Some(enabled),
            ..SettingsPatch::default()
        })?;
        Ok(enabled)
    }

    pub fn toggle_colorization(&self) -> Result<bool> {
        let enabled = !self.settings().colorization_enabled;
        self.persist_patch(SettingsPatch {
            colorization_enabled: Some(enabled),
            ..SettingsPatch::default()
        })?;
        Ok(enabled)
    }

    /// Applies a partial update through [`save_settings`](Self::save_settings).
    pub fn update_settings(&self, patch: SettingsPatch) -> Result<Settings> {
        let mut settings = self.settings();
        settings.apply(patch);
        self.save_settings(settings.clone())?;
        Ok(settings)
    }

    /// Persists `settings` and, when endpoint and API key are set, swaps in a
    /// freshly built client. Calls already running keep the previous one.
    pub fn save_settings(&self, settings: Settings) -> Result<()> {
        let processor = if settings.has_backend() {
            Some(self.build_processor(&settings)?)
        } else {
            None
        };

        lock(&self.store).save_settings(&settings)?;

        if let Some(processor) = processor {
            info!("[READER] Backend client reconfigured for {}", settings.backend_endpoint);
            *lock(&self.processor) = Some(processor);
        }
        lock(&self.chapter).url = settings.chapter_url.clone();
        *lock(&self.settings) = settings;
        Ok(())
    }

    /// Restores default settings. The backend client is dropped with them,
    /// so nothing runs against the old endpoint until it is configured again.
    pub fn clear_settings(&self) -> Result<()> {
        lock(&self.store).clear_settings()?;
        let defaults = Settings::default();
        *lock(&self.processor) = None;
        lock(&self.chapter).url = defaults.chapter_url.clone();
        *lock(&self.settings) = defaults;
        info!("[READER] Settings restored to defaults, backend client dropped");
        Ok(())
    }

    /// Processes the configured chapter. On success the displayed chapter is
    /// replaced and persisted; on failure it is left as it was.
    pub async fn execute<F>(&self, mut observer: F) -> Result<Chapter>
    where
        F: FnMut(&ProgressEvent) + Send,
    {
        let _guard = self.begin_processing()?;

        let settings = self.settings();
        if settings.chapter_url.trim().is_empty() {
            return Err(YomiruError::configuration("No chapter URL configured"));
        }
        let processor = self.processor().ok_or_else(|| {
            YomiruError::configuration("Backend endpoint and API key are not configured")
        })?;

        *lock(&self.progress) =
            ProcessingProgress::with_status(ProcessingStatus::Fetching, "Fetching chapter...");

        let request = settings.to_process_request();
        let progress = &self.progress;
        let mut on_progress = |event: &ProgressEvent| {
            *lock(progress) = ProcessingProgress {
                current_page: event.current,
                total_pages: event.total,
                status: ProcessingStatus::Processing,
                message: Some(event.message.clone()),
            };
            observer(event);
        };

        match processor.process_chapter(&request, &mut on_progress).await {
            Ok(pages) => {
                let total = pages.len();
                let chapter = {
                    let mut chapter = lock(&self.chapter);
                    chapter.url = request.chapter_url.clone();
                    chapter.pages = pages;
                    chapter.processed_at = Some(chrono::Utc::now());
                    chapter.clone()
                };
                *lock(&self.progress) = ProcessingProgress {
                    current_page: total,
                    total_pages: total,
                    status: ProcessingStatus::Completed,
                    message: Some("Processing complete!".to_string()),
                };

                if let Err(e) = lock(&self.store).save_chapter_data(&chapter) {
                    warn!("[READER] Could not persist chapter data: {}", e);
                }
                info!("[READER] Processed {} pages", total);
                Ok(chapter)
            }
            Err(e) => {
                warn!("[READER] Processing failed: {}", e);
                *lock(&self.progress) =
                    ProcessingProgress::with_status(ProcessingStatus::Error, e.to_string());
                Err(e)
            }
        }
    }

    fn begin_processing(&self) -> Result<ProcessingGuard<'_>> {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| YomiruError::Busy)?;
        Ok(ProcessingGuard(&self.processing))
    }

    fn persist_patch(&self, patch: SettingsPatch) -> Result<()> {
        lock(&self.store).update_settings(patch.clone())?;
        lock(&self.settings).apply(patch);
        Ok(())
    }

    fn build_processor(&self, settings: &Settings) -> Result<Arc<dyn ChapterProcessor>> {
        let client = ApiClient::new(ClientConfig::from_settings(settings, &self.config))?;
        Ok(Arc::new(client))
    }
}
