//! Network-wide settings storage and rule snapshots
//!
//! The settings store is a key/value collaborator owned by the host. Rules
//! are read from it into an immutable [`Snapshot`]; [`RulesHandle`] swaps
//! whole snapshots so a reader never sees half of an update.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::engine::matcher::CompiledRules;
use crate::error::StoreError;
use crate::rules::RuleSet;

/// Key of the rules record in the settings store
pub const RULES_KEY: &str = "sitewide_comment_control";

/// A network-wide key/value settings store
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or replace the value under `key`
    fn update(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Remove `key`; returns whether it existed
    fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self.values.read().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn update(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        Ok(values.remove(key).is_some())
    }
}

/// A store backed by one JSON object file.
///
/// Writers take an exclusive lock on a `<path>.lock` sibling for the whole
/// read-modify-write, so several processes can share one file. Each write
/// goes to a uniquely named temporary file in the same directory and is
/// renamed over the store, so readers never need the lock.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn lock_path(&self) -> PathBuf {
        let mut lock = self.path.clone().into_os_string();
        lock.push(".lock");
        PathBuf::from(lock)
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::NotAnObject),
        }
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<(), StoreError> {
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        serde_json::to_writer_pretty(&mut tmp, map)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), "settings written");
        Ok(())
    }

    fn modify<T>(
        &self,
        f: impl FnOnce(&mut Map<String, Value>) -> T,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        fs::create_dir_all(self.dir())?;

        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.lock_path())?;
        lock_file.lock()?;

        let mut map = self.read_all()?;
        let result = f(&mut map);
        self.write_all(&map)?;
        // Released when `lock_file` is dropped
        Ok(result)
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn update(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.modify(|map| {
            map.insert(key.to_string(), value);
        })
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.modify(|map| map.remove(key).is_some())
    }
}

/// Read the rules record. Missing or unreadable rules mean "no rules".
pub fn load_rules(store: &dyn SettingsStore) -> RuleSet {
    let value = match store.get(RULES_KEY) {
        Ok(Some(value)) => value,
        Ok(None) => return RuleSet::default(),
        Err(e) => {
            warn!(error = %e, "settings store unavailable, no rules applied");
            return RuleSet::default();
        }
    };

    serde_json::from_value(value).unwrap_or_else(|e| {
        warn!(error = %e, key = RULES_KEY, "rules record unreadable, no rules applied");
        RuleSet::default()
    })
}

/// Persist the whole rules record in one write
pub fn save_rules(store: &dyn SettingsStore, rules: &RuleSet) -> Result<(), StoreError> {
    store.update(RULES_KEY, serde_json::to_value(rules)?)
}

/// An immutable, compiled rule snapshot
#[derive(Debug)]
pub struct Snapshot {
    version: u64,
    compiled: CompiledRules,
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn rules(&self) -> &RuleSet {
        self.compiled.rules()
    }

    pub fn compiled(&self) -> &CompiledRules {
        &self.compiled
    }
}

/// Shared handle to the current snapshot
#[derive(Debug)]
pub struct RulesHandle {
    current: RwLock<Arc<Snapshot>>,
}

impl RulesHandle {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot {
                version: 1,
                compiled: CompiledRules::new(rules),
            })),
        }
    }

    /// Build a handle from whatever the store currently holds
    pub fn from_store(store: &dyn SettingsStore) -> Self {
        Self::new(load_rules(store))
    }

    /// The current snapshot. Readers hold the lock only to clone the `Arc`.
    pub fn load(&self) -> Arc<Snapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            // The guarded value is a single Arc, so it is never half-written
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Swap in a new rule set; returns the new version
    pub fn replace(&self, rules: RuleSet) -> u64 {
        let compiled = CompiledRules::new(rules);

        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let version = guard.version + 1;
        *guard = Arc::new(Snapshot { version, compiled });
        version
    }

    /// Re-read the store and swap in its rules
    pub fn reload(&self, store: &dyn SettingsStore) -> u64 {
        self.replace(load_rules(store))
    }
}
