use std::{
    cell::RefCell,
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    rc::Rc,
};

use serde::{Serialize, de::DeserializeOwned};

use crate::error::StoreError;

pub const DATA_DIR_ENV: &str = "TWOFOLD_DATA_DIR";

/// Narrow persistence seam: string values under string keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Read `key` as JSON, falling back to `T::default()` when it is missing or corrupt.
pub fn load_json<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let Some(text) = store.get(key) else {
        return T::default();
    };
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(err) => {
            log::warn!("stored [{key}] is corrupt, using defaults: {err}");
            T::default()
        }
    }
}

pub fn save_json<T>(store: &mut dyn KeyValueStore, key: &str, value: &T) -> Result<(), StoreError>
where
    T: Serialize + ?Sized,
{
    let text = serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &text)
}

/// In-memory store. Clones share the same map, so a test can keep a handle
/// while a session owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_env() -> Self {
        if let Some(explicit) = std::env::var_os(DATA_DIR_ENV) {
            return Self::new(PathBuf::from(explicit));
        }

        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var_os("HOME").map(|home| {
                    let mut p = PathBuf::from(home);
                    p.push(".config");
                    p
                })
            })
            .unwrap_or_else(|| PathBuf::from("."));

        let mut dir = base;
        dir.push("twofold");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(text) => Some(text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("could not read [{key}] from {}: {err}", self.dir.display());
                None
            }
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if !self.dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.dir)?;
        }
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}
