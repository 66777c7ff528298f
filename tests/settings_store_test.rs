//! File-backed settings persistence.

use serde_json::json;
use tempfile::TempDir;
use yomiru::models::{Chapter, Settings, SettingsPatch};
use yomiru::settings::{FileKeyValueStore, KeyValueStore, SettingsStore, SETTINGS_KEY};

fn store_in(dir: &TempDir) -> SettingsStore<FileKeyValueStore> {
    SettingsStore::new(FileKeyValueStore::new(dir.path().join("nested").join("settings.json")))
}

#[test]
fn settings_survive_a_new_store_instance() {
    let dir = TempDir::new().unwrap();
    let settings = Settings {
        chapter_url: "https://x/c9".to_string(),
        target_language: "fr".to_string(),
        api_key: "k".to_string(),
        backend_endpoint: "https://api.example.com".to_string(),
        ..Settings::default()
    };

    store_in(&dir).save_settings(&settings).unwrap();

    assert_eq!(store_in(&dir).get_settings().unwrap(), settings);
}

#[test]
fn missing_file_reads_as_defaults() {
    let dir = TempDir::new().unwrap();
    assert_eq!(store_in(&dir).get_settings().unwrap(), Settings::default());
    assert_eq!(store_in(&dir).get_chapter_data().unwrap(), None);
}

#[test]
fn record_from_older_version_is_merged_with_defaults() {
    let dir = TempDir::new().unwrap();
    let mut kv = FileKeyValueStore::new(dir.path().join("settings.json"));
    kv.set_item(
        SETTINGS_KEY,
        json!({"chapterUrl": "https://x/old", "translationEnabled": false}).to_string(),
    )
    .unwrap();

    let settings = SettingsStore::new(kv).get_settings().unwrap();
    assert_eq!(settings.chapter_url, "https://x/old");
    assert!(!settings.translation_enabled);
    assert_eq!(settings.source_language, "ja");
    assert!(!settings.colorization_enabled);
}

#[test]
fn partial_update_and_clear() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    store
        .save_settings(&Settings {
            api_key: "k".to_string(),
            ..Settings::default()
        })
        .unwrap();

    store
        .update_settings(SettingsPatch {
            source_language: Some("ko".to_string()),
            ..SettingsPatch::default()
        })
        .unwrap();

    let reloaded = store_in(&dir).get_settings().unwrap();
    assert_eq!(reloaded.source_language, "ko");
    assert_eq!(reloaded.api_key, "k");

    store.clear_settings().unwrap();
    assert_eq!(store_in(&dir).get_settings().unwrap(), Settings::default());
}

#[test]
fn chapter_data_is_kept_alongside_settings() {
    let dir = TempDir::new().unwrap();
    let mut store = store_in(&dir);
    store.save_settings(&Settings::default()).unwrap();

    let chapter = Chapter {
        url: "https://x/c1".to_string(),
        ..Chapter::default()
    };
    store.save_chapter_data(&chapter).unwrap();
    store.clear_settings().unwrap();

    assert_eq!(store_in(&dir).get_chapter_data().unwrap(), Some(chapter));
}

#[test]
fn non_object_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();

    let store = SettingsStore::new(FileKeyValueStore::new(path));
    assert!(store.get_settings().is_err());
}
