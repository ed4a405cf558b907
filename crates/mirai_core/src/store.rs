//! Settings persistence.
//!
//! `SettingsStore` is the only owner of the persisted record. Every read goes
//! through validation; anything malformed is discarded and replaced by the
//! compiled-in defaults. Writes are best effort: a failing backend is logged,
//! never surfaced.

use crate::error::SettingsError;
use crate::settings::Settings;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Key under which the settings record is persisted.
pub const SETTINGS_KEY: &str = "ai-character-chat-settings";

/// Flat key-value persistence used by the store.
pub trait SettingsBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError>;
    fn write(&self, key: &str, value: &str) -> Result<(), SettingsError>;
    fn remove(&self, key: &str) -> Result<(), SettingsError>;
}

/// In-process backend for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw value, bypassing validation.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let backend = Self::default();
        backend
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        backend
    }
}

impl SettingsBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SettingsError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

fn backend_error(action: &str, path: &Path, e: std::io::Error) -> SettingsError {
    SettingsError::Backend(format!("failed to {} {}: {}", action, path.display(), e))
}

impl SettingsBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(backend_error("read", &path, e)),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| backend_error("create", &self.dir, e))?;
        let path = self.path_for(key);
        // Write-then-rename so a crash never leaves a half-written record.
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        std::fs::write(&tmp, value).map_err(|e| backend_error("write", &tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| backend_error("rename", &path, e))
    }

    fn remove(&self, key: &str) -> Result<(), SettingsError> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(backend_error("remove", &path, e)),
        }
    }
}

/// Process-wide settings state with load/save side effects made explicit.
pub struct SettingsStore {
    backend: Arc<dyn SettingsBackend>,
    current: watch::Sender<Settings>,
}

impl SettingsStore {
    /// Open the store and load the persisted settings (or defaults).
    pub fn open(backend: Arc<dyn SettingsBackend>) -> Self {
        let initial = load_from(backend.as_ref());
        let (current, _) = watch::channel(initial);
        Self { backend, current }
    }

    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryBackend::new()))
    }

    /// Read the persisted record; malformed or absent => defaults.
    pub fn load(&self) -> Settings {
        load_from(self.backend.as_ref())
    }

    /// Persist `settings`. A remote configuration without a URL is written
    /// as local. Failures are logged only.
    pub fn save(&self, settings: &Settings) {
        let settings = normalize(settings.clone());
        let json = match settings.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to serialize settings: {}", e);
                return;
            }
        };
        if let Err(e) = self.backend.write(SETTINGS_KEY, &json) {
            tracing::error!("Failed to save settings: {}", e);
        }
    }

    /// Current in-memory settings.
    pub fn get(&self) -> Settings {
        self.current.borrow().clone()
    }

    /// Replace the settings, persist them and notify subscribers.
    pub fn set(&self, settings: Settings) {
        let settings = normalize(settings);
        self.save(&settings);
        self.current.send_replace(settings);
    }

    /// Discard customization and go back to the compiled-in defaults.
    pub fn reset(&self) -> Settings {
        let defaults = Settings::default();
        tracing::info!("Resetting settings to defaults");
        self.set(defaults.clone());
        defaults
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.current.subscribe()
    }
}

fn normalize(settings: Settings) -> Settings {
    Settings {
        tts_settings: settings.tts_settings.normalized(),
        ..settings
    }
}

fn load_from(backend: &dyn SettingsBackend) -> Settings {
    match backend.read(SETTINGS_KEY) {
        Ok(Some(raw)) => match Settings::from_json(&raw) {
            Ok(settings) => return settings,
            Err(e) => {
                tracing::warn!("Discarding persisted settings ({}), using defaults", e);
                if let Err(e) = backend.remove(SETTINGS_KEY) {
                    tracing::error!("Failed to remove corrupt settings: {}", e);
                }
            }
        },
        Ok(None) => tracing::debug!("No persisted settings, using defaults"),
        Err(e) => tracing::error!("Failed to read settings: {}", e),
    }
    Settings::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Character;
    use crate::settings::TtsSettings;

    struct BrokenBackend;

    impl SettingsBackend for BrokenBackend {
        fn read(&self, _key: &str) -> Result<Option<String>, SettingsError> {
            Err(SettingsError::Backend("disk on fire".into()))
        }
        fn write(&self, _key: &str, _value: &str) -> Result<(), SettingsError> {
            Err(SettingsError::Backend("disk on fire".into()))
        }
        fn remove(&self, _key: &str) -> Result<(), SettingsError> {
            Err(SettingsError::Backend("disk on fire".into()))
        }
    }

    fn custom() -> Settings {
        Settings::new(
            Character::new("Hikari", "https://example.com/h.png", "Be cheerful."),
            TtsSettings::remote("https://tts.example.com/speak", Some("secret".into())),
        )
    }

    #[test]
    fn test_absent_record_loads_defaults() {
        let store = SettingsStore::in_memory();
        assert_eq!(store.load(), Settings::default());
        assert_eq!(store.get(), Settings::default());
    }

    #[test]
    fn test_save_then_load_round_trips() {
        let store = SettingsStore::in_memory();
        store.save(&custom());
        assert_eq!(store.load(), custom());
    }

    #[test]
    fn test_set_persists_and_publishes() {
        let store = SettingsStore::in_memory();
        let mut rx = store.subscribe();
        store.set(custom());
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), custom());
        assert_eq!(store.get(), custom());
        assert_eq!(store.load(), custom());
    }

    #[test]
    fn test_corrupt_record_is_discarded() {
        let backend = Arc::new(MemoryBackend::with_entry(SETTINGS_KEY, "{not json"));
        let store = SettingsStore::open(backend.clone());
        assert_eq!(store.get(), Settings::default());
        assert_eq!(backend.read(SETTINGS_KEY).unwrap(), None);
    }

    #[test]
    fn test_invalid_shape_is_discarded() {
        let raw = r#"{"character": {"name": "", "avatarUrl": "u", "systemInstruction": "i"},
                      "ttsSettings": {"type": "browser"}}"#;
        let backend = Arc::new(MemoryBackend::with_entry(SETTINGS_KEY, raw));
        let store = SettingsStore::open(backend.clone());
        assert_eq!(store.load(), Settings::default());
        assert_eq!(backend.read(SETTINGS_KEY).unwrap(), None);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let store = SettingsStore::in_memory();
        store.set(custom());
        assert_eq!(store.reset(), Settings::default());
        assert_eq!(store.get(), Settings::default());
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn test_blank_remote_url_is_persisted_as_local() {
        let store = SettingsStore::in_memory();
        store.set(Settings::default().with_tts(TtsSettings::remote("", None)));
        assert_eq!(store.get().tts_settings, TtsSettings::Local);
        assert_eq!(store.load().tts_settings, TtsSettings::Local);
    }

    #[test]
    fn test_save_writes_blank_remote_url_as_local() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SettingsStore::open(backend.clone());
        store.save(&Settings::default().with_tts(TtsSettings::remote("  ", None)));

        let raw = backend.read(SETTINGS_KEY).unwrap().unwrap();
        assert!(raw.contains(r#""type":"browser""#), "persisted: {}", raw);
        assert_eq!(store.load().tts_settings, TtsSettings::Local);
    }

    #[test]
    fn test_broken_backend_is_not_fatal() {
        let store = SettingsStore::open(Arc::new(BrokenBackend));
        assert_eq!(store.get(), Settings::default());
        store.set(custom());
        // The in-memory value still moves on even though nothing was persisted.
        assert_eq!(store.get(), custom());
        assert_eq!(store.load(), Settings::default());
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = Arc::new(FileBackend::new(dir.path().join("nested")));
        let store = SettingsStore::open(backend.clone());
        store.set(custom());
        assert!(backend.path_for(SETTINGS_KEY).exists());

        let reopened = SettingsStore::open(Arc::new(FileBackend::new(dir.path().join("nested"))));
        assert_eq!(reopened.get(), custom());
    }

    #[test]
    fn test_file_backend_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path());
        assert_eq!(backend.read(SETTINGS_KEY).unwrap(), None);
        assert!(backend.remove(SETTINGS_KEY).is_ok());
    }
}
