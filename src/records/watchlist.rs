use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use parking_lot::{Mutex, RwLock};

use crate::error::{AppError, Context, Result};
use crate::utils::{normalize_symbol, write_atomic};

/// Outcome of a watchlist mutation.
///
/// The in-memory change always sticks; `save_error` carries a failed persist so the caller
/// can surface it as a warning.
#[derive(Debug)]
pub struct WatchlistUpdate {
    pub symbol: String,
    pub changed: bool,
    pub save_error: Option<AppError>,
}

impl WatchlistUpdate {
    pub fn persisted(&self) -> bool {
        self.save_error.is_none()
    }
}

/// The user's watched symbols, persisted as a JSON array after every mutation.
pub struct WatchlistStore {
    path: PathBuf,
    symbols: RwLock<BTreeSet<String>>,
    save_lock: Mutex<()>,
}

impl WatchlistStore {
    /// Empty store bound to `path`; call [`WatchlistStore::load`] to restore it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            symbols: RwLock::new(BTreeSet::new()),
            save_lock: Mutex::new(()),
        }
    }

    /// Build a store and restore whatever `path` holds.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let store = Self::new(path);
        store.load();
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory set with the persisted one.
    ///
    /// A missing or unreadable file leaves the watchlist empty; returns the number restored.
    pub fn load(&self) -> usize {
        let restored = match read_symbols(&self.path) {
            Ok(symbols) => symbols,
            Err(err) => {
                warn!(
                    "Starting with an empty watchlist; could not load {}: {}",
                    self.path.display(),
                    err
                );
                BTreeSet::new()
            }
        };
        let count = restored.len();
        *self.symbols.write() = restored;
        count
    }

    /// Persist the full set.
    pub fn save(&self) -> Result<()> {
        // Serialise writers so the file always ends with the newest snapshot.
        let _guard = self.save_lock.lock();
        let snapshot = self.all();
        let json = serde_json::to_string_pretty(&snapshot)
            .context("Failed to serialize watchlist")?;
        write_atomic(&self.path, json.as_bytes())
    }

    pub fn add(&self, symbol: &str) -> Result<WatchlistUpdate> {
        let symbol = validate(symbol)?;
        let changed = self.symbols.write().insert(symbol.clone());
        Ok(self.persist(symbol, changed))
    }

    pub fn remove(&self, symbol: &str) -> Result<WatchlistUpdate> {
        let symbol = validate(symbol)?;
        let changed = self.symbols.write().remove(&symbol);
        Ok(self.persist(symbol, changed))
    }

    /// Copy of the watched symbols in ascending order.
    pub fn all(&self) -> Vec<String> {
        self.symbols.read().iter().cloned().collect()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        normalize_symbol(symbol).is_some_and(|s| self.symbols.read().contains(&s))
    }

    pub fn len(&self) -> usize {
        self.symbols.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.read().is_empty()
    }

    fn persist(&self, symbol: String, changed: bool) -> WatchlistUpdate {
        let save_error = match self.save() {
            Ok(()) => None,
            Err(err) => {
                warn!("Watchlist change kept in memory but not saved: {err}");
                Some(err)
            }
        };
        if changed {
            info!("watchlist now holds {} symbols", self.len());
        }
        WatchlistUpdate {
            symbol,
            changed,
            save_error,
        }
    }
}

fn validate(symbol: &str) -> Result<String> {
    normalize_symbol(symbol)
        .ok_or_else(|| AppError::message(format!("`{}` is not a valid symbol", symbol.trim())))
}

fn read_symbols(path: &Path) -> Result<BTreeSet<String>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            info!("No watchlist at {}; starting empty", path.display());
            return Ok(BTreeSet::new());
        }
        Err(err) => return Err(err.into()),
    };

    let raw: Vec<String> = serde_json::from_str(&data)
        .with_context(|| format!("Failed to parse watchlist file {}", path.display()))?;
    Ok(raw.iter().filter_map(|s| normalize_symbol(s)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn scratch_path(name: &str) -> PathBuf {
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir()
            .join(format!("stock-watch-{}-{}", std::process::id(), id))
            .join(name)
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = WatchlistStore::new(scratch_path("absent.json"));
        assert_eq!(store.load(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let path = scratch_path("corrupt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();

        let store = WatchlistStore::open(&path);
        assert!(store.is_empty());
    }

    #[test]
    fn mutations_persist_immediately() {
        let path = scratch_path("watchlist.json");
        let store = WatchlistStore::new(&path);

        let update = store.add("2330").expect("add");
        assert!(update.changed && update.persisted());
        store.add(" 2454 ").expect("add");

        let reopened = WatchlistStore::open(&path);
        assert_eq!(reopened.all(), vec!["2330".to_string(), "2454".to_string()]);

        store.remove("2330").expect("remove");
        let reopened = WatchlistStore::open(&path);
        assert_eq!(reopened.all(), vec!["2454".to_string()]);
    }

    #[test]
    fn add_is_idempotent_and_remove_of_absent_is_noop() {
        let store = WatchlistStore::new(scratch_path("idempotent.json"));
        assert!(store.add("2330").unwrap().changed);
        let again = store.add("2330").unwrap();
        assert!(!again.changed);
        assert!(again.persisted());
        assert_eq!(store.len(), 1);

        let absent = store.remove("9999").unwrap();
        assert!(!absent.changed);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn add_then_remove_restores_prior_set() {
        let store = WatchlistStore::new(scratch_path("roundtrip.json"));
        store.add("2330").unwrap();
        store.add("2454").unwrap();
        let before = store.all();

        store.add("1101").unwrap();
        store.remove("1101").unwrap();

        assert_eq!(store.all(), before);
    }

    #[test]
    fn rejects_blank_symbols() {
        let store = WatchlistStore::new(scratch_path("blank.json"));
        assert!(store.add("   ").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn save_failure_keeps_in_memory_change() {
        let dir = scratch_path("dir-as-file");
        fs::create_dir_all(&dir).unwrap();
        // The target path is a directory, so the rename cannot succeed.
        let store = WatchlistStore::new(&dir);

        let update = store.add("2330").expect("mutation still applies");
        assert!(update.changed);
        assert!(!update.persisted());
        assert!(store.contains("2330"));
    }
}
