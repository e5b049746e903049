//! Local persistence: one JSON file per user, keyed by email.
//!
//! Files live in the data directory as `partner_app_data_<key>.json`, where
//! the key is the lower-cased email with anything outside `[a-z0-9]`
//! replaced by underscores. The local store is the record of truth; the
//! remote copy is best effort.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use crate::stats::UserStats;

const FILE_PREFIX: &str = "partner_app_data_";

/// Convert an email to a file-name safe storage key.
pub fn storage_key(email: &str) -> String {
    email
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect::<String>()
        .split('_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// File-backed key-value store of user aggregates.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Store { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `email`'s aggregate.
    pub fn path_for(&self, email: &str) -> PathBuf {
        self.dir.join(format!("{}{}.json", FILE_PREFIX, storage_key(email)))
    }

    pub fn exists(&self, email: &str) -> bool {
        self.path_for(email).exists()
    }

    /// Load a user's aggregate. A missing or unreadable file yields a fresh
    /// default aggregate; the email is always forced to the requested one.
    pub fn load(&self, email: &str) -> UserStats {
        let path = self.path_for(email);
        let mut stats = if !path.exists() {
            UserStats::default()
        } else {
            match fs::read_to_string(&path) {
                Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                    warn!(path = %path.display(), error = %e, "corrupt stats file, starting fresh");
                    UserStats::default()
                }),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable stats file, starting fresh");
                    UserStats::default()
                }
            }
        };
        stats.email = email.to_string();
        stats.ensure_data_bags();
        stats
    }

    /// Save via temp file + rename.
    pub fn save(&self, stats: &UserStats) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&stats.email);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(stats)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "saved stats");
        Ok(())
    }

    /// Remove a user's file. Missing files are not an error.
    pub fn remove(&self, email: &str) -> Result<bool> {
        let path = self.path_for(email);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(path)?;
        Ok(true)
    }

    /// Storage keys of every user with a file in the store, sorted.
    pub fn users(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        if !self.dir.exists() {
            return Ok(keys);
        }
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix(FILE_PREFIX));
            if let Some(key) = key {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
