use super::Cache;
use crate::error::CacheError;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Keys longer than this are shortened and suffixed with a hash.
const MAX_FILE_NAME: usize = 160;

/// Cache persisted as one JSON file per key under `<root>/<namespace>/`.
#[derive(Debug, Clone)]
pub struct FileCache {
    namespace: String,
    directory: PathBuf,
}

impl FileCache {
    pub fn new(root: impl AsRef<Path>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let directory = root
            .as_ref()
            .join(file_name(namespace.trim_matches('/')));
        Self {
            namespace,
            directory,
        }
    }

    /// Directory holding this namespace's entries.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.directory.join(file_name(key))
    }

    fn ensure_directory(&self) -> Result<(), CacheError> {
        if !self.directory.is_dir() {
            debug!("📁 Creating cache directory {}", self.directory.display());
            fs::create_dir_all(&self.directory)?;
        }
        Ok(())
    }
}

impl Cache for FileCache {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn save(&self, key: &str, value: &Value) -> Result<(), CacheError> {
        self.ensure_directory()?;
        fs::write(self.entry_path(key), serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>, CacheError> {
        match fs::read(self.entry_path(key)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, key: &str) -> Result<bool, CacheError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self) -> Result<(), CacheError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn size(&self) -> Result<usize, CacheError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        for entry in entries {
            if entry?.path().is_file() {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Maps an arbitrary key onto a portable file name.
fn file_name(key: &str) -> String {
    let mut name = urlencoding::encode(key).into_owned();

    if name.is_empty() || name == "." || name == ".." {
        name = format!("%{}", name.len());
    }

    if name.len() > MAX_FILE_NAME {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        name.truncate(MAX_FILE_NAME - 17);
        name.push('-');
        name.push_str(&digest[..16]);
    }
    name
}
