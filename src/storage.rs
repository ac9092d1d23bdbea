use crate::history::HistoryStore;
use crate::models::RatingEntry;
use crate::weights::WeightVector;
use anyhow::{Context, Result};
use chrono::Local;
use fs2::FileExt;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const WEIGHTS_KEY: &str = "categoryWeights";
pub const HISTORY_KEY: &str = "ratingHistory";
pub const THEME_KEY: &str = "theme";

/// String-keyed JSON blob storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;

    /// File holding the whole store, when there is one to back up.
    fn backing_file(&self) -> Option<&Path> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object file. Every write replaces the file through a
/// temporary sibling and a rename while holding an exclusive lock on
/// `<file>.lock`, so readers never observe a partial write.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JsonFileStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            lock_path: sibling(path, "lock"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)
            .with_context(|| format!("Failed to open {}", self.lock_path.display()))
    }

    fn read_contents(&self) -> Result<Contents> {
        if !self.path.exists() {
            return Ok(Contents::Parsed(Map::new()));
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(Contents::Parsed(Map::new()));
        }
        Ok(match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Contents::Parsed(map),
            Ok(_) | Err(_) => Contents::Corrupt,
        })
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        match self.read_contents()? {
            Contents::Parsed(map) => Ok(map),
            Contents::Corrupt => {
                log::warn!("{} is not a JSON object, reading as empty", self.path.display());
                Ok(Map::new())
            }
        }
    }

    /// Moves an unreadable store file out of the way so the next write does
    /// not destroy it.
    fn set_aside(&self) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y%m%d%H%M%S%3f");
        let target = sibling(&self.path, &format!("corrupt-{stamp}"));
        fs::rename(&self.path, &target).with_context(|| {
            format!("Failed to move {} to {}", self.path.display(), target.display())
        })?;
        log::warn!(
            "{} is not a JSON object, kept it as {}",
            self.path.display(),
            target.display()
        );
        Ok(target)
    }

    fn write_all(&self, map: &Map<String, Value>) -> Result<()> {
        let tmp = sibling(&self.path, "tmp");
        let data = serde_json::to_string_pretty(map)?;
        {
            let mut file = File::create(&tmp)
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            file.write_all(data.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn modify<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;
        let result = self.read_contents().and_then(|contents| {
            let mut map = match contents {
                Contents::Parsed(map) => map,
                Contents::Corrupt => {
                    self.set_aside()?;
                    Map::new()
                }
            };
            change(&mut map);
            self.write_all(&map)
        });
        FileExt::unlock(&lock)?;
        result
    }
}

enum Contents {
    Parsed(Map<String, Value>),
    Corrupt,
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let lock = self.lock_file()?;
        FileExt::lock_shared(&lock)?;
        let result = self.read_all().map(|mut map| map.remove(key));
        FileExt::unlock(&lock)?;
        result
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.modify(|map| {
            map.insert(key.to_string(), value);
        })
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.modify(|map| {
            map.remove(key);
        })
    }

    fn backing_file(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Current weights, or uniform ones when nothing usable is stored.
pub fn load_weights<S: KeyValueStore + ?Sized>(store: &S) -> Result<WeightVector> {
    let Some(value) = store.get(WEIGHTS_KEY)? else {
        return Ok(WeightVector::default());
    };
    match serde_json::from_value::<WeightVector>(value) {
        Ok(weights) if weights.fits_categories() => Ok(weights),
        Ok(weights) => {
            log::warn!("stored weights {:?} are unusable, using uniform", weights.values());
            Ok(WeightVector::default())
        }
        Err(err) => {
            log::warn!("stored weights are malformed ({err}), using uniform");
            Ok(WeightVector::default())
        }
    }
}

pub fn save_weights<S: KeyValueStore + ?Sized>(store: &mut S, weights: &WeightVector) -> Result<()> {
    store.set(WEIGHTS_KEY, serde_json::to_value(weights)?)
}

/// Stored history. A value that is not an array loads as empty; entries that
/// fail to parse are skipped.
pub fn load_history<S: KeyValueStore + ?Sized>(store: &S) -> Result<HistoryStore> {
    let Some(value) = store.get(HISTORY_KEY)? else {
        return Ok(HistoryStore::new());
    };
    let Value::Array(items) = value else {
        log::warn!("stored history is not a list, starting empty");
        return Ok(HistoryStore::new());
    };
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<RatingEntry>(item) {
            Ok(entry) => entries.push(entry),
            Err(err) => log::warn!("skipping malformed history entry: {err}"),
        }
    }
    Ok(HistoryStore::from_entries(entries))
}

pub fn save_history<S: KeyValueStore + ?Sized>(store: &mut S, history: &HistoryStore) -> Result<()> {
    store.set(HISTORY_KEY, serde_json::to_value(history.entries())?)
}

pub fn load_theme<S: KeyValueStore + ?Sized>(store: &S, default: &str) -> Result<String> {
    Ok(match store.get(THEME_KEY)? {
        Some(Value::String(theme)) if !theme.trim().is_empty() => theme,
        _ => default.to_string(),
    })
}

pub fn save_theme<S: KeyValueStore + ?Sized>(store: &mut S, theme: &str) -> Result<()> {
    store.set(THEME_KEY, Value::String(theme.to_string()))
}
