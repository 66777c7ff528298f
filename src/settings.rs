//! Settings persistence on top of a small key-value store.
//!
//! The settings record is stored as one JSON document under a fixed key and
//! merged over [`Settings::default`] on read, so fields added later get their
//! defaults for records saved by older versions.

use crate::error::{Result, YomiruError};
use crate::models::{Chapter, Settings, SettingsPatch};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub const SETTINGS_KEY: &str = "@yomiru_settings";
pub const CHAPTER_DATA_KEY: &str = "@yomiru_chapter_data";

/// String-keyed, string-valued persistent store.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: String) -> Result<()>;
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    items: HashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<()> {
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.items.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object file. Every write rewrites the file.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(YomiruError::store(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    fn write_all(&self, items: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(items)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.read_all()?;
        Ok(items.get(key).and_then(|v| v.as_str()).map(str::to_string))
    }

    fn set_item(&mut self, key: &str, value: String) -> Result<()> {
        let mut items = self.read_all()?;
        items.insert(key.to_string(), Value::String(value));
        self.write_all(&items)
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }
}

/// Settings and last-chapter persistence.
pub struct SettingsStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> SettingsStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Stored settings merged over the defaults. A corrupt record is logged
    /// and treated as absent.
    pub fn get_settings(&self) -> Result<Settings> {
        let Some(raw) = self.store.get_item(SETTINGS_KEY)? else {
            return Ok(Settings::default());
        };

        match merge_over_defaults(&raw) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                error!("[SETTINGS] Stored settings are unreadable, using defaults: {}", e);
                Ok(Settings::default())
            }
        }
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        let json = serde_json::to_string(settings)?;
        self.store.set_item(SETTINGS_KEY, json)?;
        debug!("[SETTINGS] Settings saved");
        Ok(())
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<Settings> {
        let mut settings = self.get_settings()?;
        settings.apply(patch);
        self.save_settings(&settings)?;
        Ok(settings)
    }

    pub fn clear_settings(&mut self) -> Result<()> {
        self.store.remove_item(SETTINGS_KEY)?;
        info!("[SETTINGS] Settings cleared");
        Ok(())
    }

    pub fn save_chapter_data(&mut self, chapter: &Chapter) -> Result<()> {
        let json = serde_json::to_string(chapter)?;
        self.store.set_item(CHAPTER_DATA_KEY, json)
    }

    pub fn get_chapter_data(&self) -> Result<Option<Chapter>> {
        let Some(raw) = self.store.get_item(CHAPTER_DATA_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(chapter) => Ok(Some(chapter)),
            Err(e) => {
                warn!("[SETTINGS] Stored chapter data is unreadable: {}", e);
                Ok(None)
            }
        }
    }
}

fn merge_over_defaults(raw: &str) -> Result<Settings> {
    let stored: Value = serde_json::from_str(raw)?;
    let Value::Object(stored) = stored else {
        return Err(YomiruError::store("settings record is not a JSON object"));
    };

    let Value::Object(mut merged) = serde_json::to_value(Settings::default())? else {
        return Err(YomiruError::store("default settings are not a JSON object"));
    };

    // Fields are taken one at a time; a value of the wrong type keeps its default.
    for (key, value) in stored {
        let Some(default) = merged.insert(key.clone(), value) else {
            merged.remove(&key);
            continue;
        };
        if let Err(e) = serde_json::from_value::<Settings>(Value::Object(merged.clone())) {
            warn!("[SETTINGS] Ignoring stored {}: {}", key, e);
            merged.insert(key, default);
        }
    }

    Ok(serde_json::from_value(Value::Object(merged))?)
}
