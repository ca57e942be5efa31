//! Client-side state: current snapshot, preferences, favorites and search history.
//!
//! Preferences and favorites are written through to a [`Storage`] before the
//! in-memory value changes, so the persisted value is always the last applied one.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::warn;

use crate::{
    error::StorageError,
    model::{HistoryEntry, Preferences, Theme, UnitSystem, WeatherSnapshot},
};

pub const FAVORITES_KEY: &str = "favorites";
pub const THEME_KEY: &str = "theme";
pub const UNITS_KEY: &str = "units";

/// Durable string key/value storage.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Volatile storage, for tests and for running without a data directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A single JSON object file holding every key. Each mutation rewrites the file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Opens the file at `path`, starting empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = if path.exists() {
            let contents = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
            serde_json::from_str(&contents)?
        } else {
            BTreeMap::new()
        };

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json).map_err(|source| io_error(&self.path, source))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        let mut next = self.entries.clone();
        next.remove(key);
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Owner of all client-side state.
#[derive(Debug)]
pub struct StateStore<S> {
    storage: S,
    snapshot: Option<Arc<WeatherSnapshot>>,
    preferences: Preferences,
    favorites: Vec<String>,
    history: Vec<HistoryEntry>,
}

impl<S: Storage> StateStore<S> {
    /// Reads preferences and favorites from `storage`. Unreadable values fall
    /// back to defaults.
    pub fn load(storage: S) -> Self {
        let theme = match storage.get(THEME_KEY).as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        };
        let unit = match storage.get(UNITS_KEY).as_deref() {
            Some("imperial") => UnitSystem::Imperial,
            _ => UnitSystem::Metric,
        };
        let favorites = storage
            .get(FAVORITES_KEY)
            .map(|raw| parse_favorites(&raw))
            .unwrap_or_default();

        Self {
            storage,
            snapshot: None,
            preferences: Preferences { unit, theme },
            favorites,
            history: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        self.snapshot.as_deref()
    }

    /// Replaces the snapshot wholesale.
    pub fn set_snapshot(&mut self, snapshot: WeatherSnapshot) {
        self.snapshot = Some(Arc::new(snapshot));
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences
    }

    pub fn set_unit(&mut self, unit: UnitSystem) -> Result<(), StorageError> {
        match unit {
            UnitSystem::Imperial => self.storage.set(UNITS_KEY, unit.as_str())?,
            UnitSystem::Metric => self.storage.remove(UNITS_KEY)?,
        }
        self.preferences.unit = unit;
        Ok(())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), StorageError> {
        match theme {
            Theme::Dark => self.storage.set(THEME_KEY, theme.as_str())?,
            Theme::Light => self.storage.remove(THEME_KEY)?,
        }
        self.preferences.theme = theme;
        Ok(())
    }

    /// Favorites in the order they were added.
    pub fn favorites(&self) -> &[String] {
        &self.favorites
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorites.iter().any(|f| f == name)
    }

    /// Adds `name` if absent, removes it if present. Returns whether it is a
    /// favorite afterwards.
    pub fn toggle_favorite(&mut self, name: &str) -> Result<bool, StorageError> {
        let mut next = self.favorites.clone();
        let added = if let Some(pos) = next.iter().position(|f| f == name) {
            next.remove(pos);
            false
        } else {
            next.push(name.to_string());
            true
        };
        self.commit_favorites(next)?;
        Ok(added)
    }

    /// Returns whether anything was removed.
    pub fn remove_favorite(&mut self, name: &str) -> Result<bool, StorageError> {
        if !self.is_favorite(name) {
            return Ok(false);
        }
        let next = self.favorites.iter().filter(|f| *f != name).cloned().collect();
        self.commit_favorites(next)?;
        Ok(true)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn set_history(&mut self, items: Vec<HistoryEntry>) {
        self.history = items;
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn commit_favorites(&mut self, next: Vec<String>) -> Result<(), StorageError> {
        let json = serde_json::to_string(&next)?;
        self.storage.set(FAVORITES_KEY, &json)?;
        self.favorites = next;
        Ok(())
    }
}

fn parse_favorites(raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(mut names) => {
            let mut seen = std::collections::HashSet::new();
            names.retain(|name| seen.insert(name.clone()));
            names
        }
        Err(err) => {
            warn!(error = %err, "ignoring malformed persisted favorites");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn empty_store() -> StateStore<MemoryStorage> {
        StateStore::load(MemoryStorage::default())
    }

    #[test]
    fn defaults_when_storage_is_empty() {
        let store = empty_store();

        assert_eq!(store.preferences(), Preferences::default());
        assert!(store.favorites().is_empty());
        assert!(store.snapshot().is_none());
        assert!(store.history().is_empty());
    }

    #[test]
    fn toggle_favorite_twice_restores_prior_state() {
        let mut store = empty_store();
        store.toggle_favorite("Berlin").unwrap();
        let before = store.favorites().to_vec();
        let persisted_before = store.storage().get(FAVORITES_KEY);

        assert!(store.toggle_favorite("Paris").unwrap());
        assert!(!store.toggle_favorite("Paris").unwrap());

        assert_eq!(store.favorites(), before.as_slice());
        assert_eq!(store.storage().get(FAVORITES_KEY), persisted_before);
    }

    #[test]
    fn favorites_keep_append_order_and_persist() {
        let mut store = empty_store();
        store.toggle_favorite("Paris").unwrap();
        store.toggle_favorite("Oslo").unwrap();
        store.toggle_favorite("Lima").unwrap();
        store.remove_favorite("Oslo").unwrap();

        assert_eq!(store.favorites(), ["Paris", "Lima"]);
        assert_eq!(
            store.storage().get(FAVORITES_KEY).as_deref(),
            Some(r#"["Paris","Lima"]"#)
        );
        assert!(!store.remove_favorite("Oslo").unwrap());
    }

    #[test]
    fn preferences_are_written_through() {
        let mut store = empty_store();

        store.set_theme(Theme::Dark).unwrap();
        store.set_unit(UnitSystem::Imperial).unwrap();
        assert_eq!(store.storage().get(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(store.storage().get(UNITS_KEY).as_deref(), Some("imperial"));

        store.set_theme(Theme::Light).unwrap();
        assert_eq!(store.storage().get(THEME_KEY), None);

        let reloaded = StateStore::load(store.storage().clone());
        assert_eq!(reloaded.preferences().theme, Theme::Light);
        assert_eq!(reloaded.preferences().unit, UnitSystem::Imperial);
    }

    #[test]
    fn malformed_favorites_fall_back_to_empty() {
        let mut storage = MemoryStorage::default();
        storage.set(FAVORITES_KEY, "{not json").unwrap();

        let store = StateStore::load(storage);
        assert!(store.favorites().is_empty());
    }

    #[test]
    fn duplicate_persisted_favorites_collapse() {
        let mut storage = MemoryStorage::default();
        storage.set(FAVORITES_KEY, r#"["Rome","Rome","Kyiv"]"#).unwrap();

        let store = StateStore::load(storage);
        assert_eq!(store.favorites(), ["Rome", "Kyiv"]);
    }

    #[test]
    fn snapshot_is_replaced_wholesale() {
        let mut store = empty_store();
        store.set_snapshot(fixtures::paris());

        let mut other = fixtures::paris();
        other.current.name = "Lyon".into();
        other.forecast.clear();
        store.set_snapshot(other);

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.location_name(), "Lyon");
        assert!(snapshot.forecast.is_empty());
    }

    #[test]
    fn file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let mut store = StateStore::load(FileStorage::open(&path).unwrap());
        store.toggle_favorite("Paris").unwrap();
        store.set_theme(Theme::Dark).unwrap();

        let reopened = StateStore::load(FileStorage::open(&path).unwrap());
        assert_eq!(reopened.favorites(), ["Paris"]);
        assert_eq!(reopened.preferences().theme, Theme::Dark);
    }

    #[test]
    fn corrupt_storage_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "[1, 2").unwrap();

        let err = FileStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }
}
