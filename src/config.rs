use crate::error::{Result, YomiruError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Upper bound for a single backend call, page downloads included.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub base_path: String,
    pub settings_file: String,
    pub images_dir: String,
}

impl Config {
    /// Loads `path` if it exists, then applies `YOMIRU__SECTION__KEY`
    /// environment overrides on top of the built-in defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().to_string();
        let settings = config::Config::builder()
            .add_source(config::File::new(&path, config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix("YOMIRU")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Writes the default configuration, refusing to clobber an existing file.
    pub fn init<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(YomiruError::configuration(format!(
                "{} already exists",
                path.display()
            )));
        }
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn settings_path(&self) -> PathBuf {
        Path::new(&self.storage.base_path).join(&self.storage.settings_file)
    }

    pub fn images_path(&self) -> PathBuf {
        Path::new(&self.storage.base_path).join(&self.storage.images_dir)
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            connect_timeout_secs: 10,
            user_agent: format!("Yomiru/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: "./yomiru-data".to_string(),
            settings_file: "settings.json".to_string(),
            images_dir: "pages".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.backend.timeout_secs, 300);
        assert_eq!(config.storage.images_dir, "pages");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[backend]\ntimeout_secs = 42\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.backend.timeout(), Duration::from_secs(42));
        assert_eq!(config.backend.connect_timeout_secs, 10);
        assert_eq!(config.storage, StorageConfig::default());
    }

    #[test]
    fn init_writes_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let written = Config::init(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), written);
        assert!(Config::init(&path).unwrap_err().is_configuration());
    }

    #[test]
    fn derived_paths_live_under_base() {
        let mut config = Config::default();
        config.storage.base_path = "/data".to_string();
        assert_eq!(config.settings_path(), PathBuf::from("/data/settings.json"));
        assert_eq!(config.images_path(), PathBuf::from("/data/pages"));
    }
}
