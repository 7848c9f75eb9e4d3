//! Content-hash cache deciding which files need translating again

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::errors::{Result, TranslationError};

/// File name of the cache inside the project root
pub const CACHE_FILE_NAME: &str = ".translation_cache.json";

/// Hex SHA-256 of a file's raw bytes. Used for change detection only.
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Persisted mapping of source path to content fingerprint.
///
/// Not synchronized; the scheduler keeps it behind a single mutex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeCache {
    #[serde(skip)]
    path: PathBuf,
    #[serde(default)]
    hashes: BTreeMap<String, String>,
}

impl ChangeCache {
    /// Empty cache that will be stored at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            hashes: BTreeMap::new(),
        }
    }

    /// Open the cache of a project, reading the existing file if there is one
    pub fn open(project_root: &Path) -> Result<Self> {
        let mut cache = Self::new(project_root.join(CACHE_FILE_NAME));
        cache.load()?;
        Ok(cache)
    }

    /// Location of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory state with the file contents. A missing file
    /// leaves the cache empty.
    pub fn load(&mut self) -> Result<()> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache file at {}", self.path.display());
                self.hashes.clear();
                return Ok(());
            }
            Err(e) => {
                return Err(TranslationError::FileError {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };

        let stored: ChangeCache = serde_json::from_str(&content)?;
        self.hashes = stored.hashes;
        info!("Loaded {} cached fingerprints", self.hashes.len());
        Ok(())
    }

    /// Rewrite the whole cache file
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.path, content).map_err(|e| TranslationError::FileError {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!("Saved {} fingerprints to {}", self.hashes.len(), self.path.display());
        Ok(())
    }

    /// True when the path is unknown or its stored fingerprint differs
    pub fn is_changed(&self, path: &str, fingerprint: &str) -> bool {
        self.hashes
            .get(path)
            .map(|cached| cached != fingerprint)
            .unwrap_or(true)
    }

    /// Record the fingerprint of a path
    pub fn update(&mut self, path: impl Into<String>, fingerprint: impl Into<String>) {
        self.hashes.insert(path.into(), fingerprint.into());
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
