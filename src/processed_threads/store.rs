use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};

/// Durable settings: `set` only changes memory, `sync` makes it stick.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
    fn sync(&mut self) -> Result<()>;
}

/// The whole map lives in one JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                PipelineError::Store(format!("cannot parse {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(e) => {
                return Err(PipelineError::Store(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        Ok(Self { path, entries })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.entries.insert(key.to_string(), value);
    }

    fn sync(&mut self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| PipelineError::Store(e.to_string()))?;

        // Write aside then rename, so a crash never leaves half a file behind.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, text)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| PipelineError::Store(format!("cannot write {}: {}", self.path.display(), e)))
    }
}
