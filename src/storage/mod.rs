//! Persistent key-value storage for cinescout
//!
//! Everything the application persists goes through [`KeyValueStore`]:
//!
//! ~/.local/share/cinescout/          # Default data directory
//! ├── favorites.json                 # key "favorites" -> JSON array of Movie
//! └── summary_{movie_id}.json        # key "summary_{id}" -> { text, timestamp }
//!
//! The adapter is deliberately dumb: string in, string out, one file per key.
//! There is no transactionality beyond the atomicity of a single file write,
//! and no coordination between processes (last writer wins).

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Data directory name under the platform data dir
const APP_DIR: &str = "cinescout";

/// String key-value store backing all persisted state.
///
/// Keys are restricted to `[A-Za-z0-9_-]` by callers (`favorites`,
/// `summary_{id}`), so they can be used verbatim as file names.
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`, or `None` if it was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// File-backed store: one JSON document per key under a data directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store at the default platform data directory.
    pub fn new() -> Result<Self> {
        let root = if let Some(proj_dirs) = directories::ProjectDirs::from("", "", APP_DIR) {
            proj_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from(".").join(format!(".{}", APP_DIR))
        };
        Self::at(root)
    }

    /// Open a store rooted at an explicit directory (used by `--data-dir`
    /// and by tests).
    pub fn at(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create data directory {}", root.display()))?;
        Ok(Self { root })
    }

    /// Root directory this store writes under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        std::fs::write(&path, value)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().expect("store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
