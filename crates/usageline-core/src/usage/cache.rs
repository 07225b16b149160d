//! On-disk cache of the last known-good usage snapshot.
//!
//! Stored as `<config_dir>/.usage_cache.json`: the endpoint response plus a
//! `fetched_at` timestamp. Caches written without `fetched_at` fall back to
//! the file modification time for their age.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::CacheError;
use super::types::UsageSnapshot;
use crate::clock::{Clock, SystemClock};

/// Cache file name inside the Claude config directory
pub const CACHE_FILE: &str = ".usage_cache.json";

/// Persisted cache content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// When the snapshot was fetched from the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub snapshot: UsageSnapshot,
}

/// Single-entry snapshot cache with age-based freshness
#[derive(Debug, Clone)]
pub struct CacheStore<C = SystemClock> {
    path: PathBuf,
    clock: C,
}

impl CacheStore<SystemClock> {
    /// Cache at `<config_dir>/.usage_cache.json` using the system clock
    pub fn in_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join(CACHE_FILE), SystemClock)
    }
}

impl<C: Clock> CacheStore<C> {
    pub fn new(path: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Cached snapshot if it is younger than `ttl`.
    ///
    /// A missing or corrupt cache counts as "not fresh", and so does a
    /// timestamp more than `ttl` in the future (written under a clock that
    /// has since been set back).
    pub fn read_if_fresh(&self, ttl: Duration) -> Option<UsageSnapshot> {
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        let entry = self.load_logged()?;
        match self.age(&entry) {
            Ok(age) if age < -ttl => {
                debug!(
                    "Usage cache timestamp is {}s in the future",
                    -age.num_seconds()
                );
                None
            }
            Ok(age) if age < ttl => Some(entry.snapshot),
            Ok(age) => {
                debug!("Usage cache is stale ({}s old)", age.num_seconds());
                None
            }
            Err(e) => {
                debug!("Usage cache age unknown: {}", e);
                None
            }
        }
    }

    /// Cached snapshot regardless of age
    pub fn read_stale(&self) -> Option<UsageSnapshot> {
        self.load_logged().map(|entry| entry.snapshot)
    }

    /// Persist `snapshot` stamped with the current time.
    ///
    /// Written to a temp file and renamed over the cache so concurrent
    /// readers never see a partial file.
    pub fn write(&self, snapshot: &UsageSnapshot) -> Result<(), CacheError> {
        let entry = CacheEntry {
            fetched_at: Some(self.clock.now()),
            snapshot: snapshot.clone(),
        };
        let json = serde_json::to_string(&entry).map_err(CacheError::Serialize)?;

        let temp_path = self.temp_path();
        let write_err = |source: std::io::Error| CacheError::Write {
            path: temp_path.clone(),
            source,
        };

        // Leftover from a crashed writer with the same pid
        let _ = fs::remove_file(&temp_path);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .map_err(write_err)?;
        let written = file
            .write_all(json.as_bytes())
            .and_then(|()| file.sync_all());
        drop(file);
        if let Err(source) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(write_err(source));
        }

        fs::rename(&temp_path, &self.path).map_err(|source| {
            let _ = fs::remove_file(&temp_path);
            CacheError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }

    /// Read and parse the cache file
    pub fn load(&self) -> Result<CacheEntry, CacheError> {
        let content = fs::read_to_string(&self.path).map_err(|source| CacheError::Read {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| CacheError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn load_logged(&self) -> Option<CacheEntry> {
        match self.load() {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Usage cache unavailable: {}", e);
                None
            }
        }
    }

    /// Age of `entry`, negative when it was stamped in the future
    fn age(&self, entry: &CacheEntry) -> Result<TimeDelta, CacheError> {
        let written = match entry.fetched_at {
            Some(at) => at,
            None => {
                let modified = fs::metadata(&self.path)
                    .and_then(|m| m.modified())
                    .map_err(|source| CacheError::Read {
                        path: self.path.clone(),
                        source,
                    })?;
                DateTime::<Utc>::from(modified)
            }
        };
        Ok(self.clock.now() - written)
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| CACHE_FILE.to_string());
        self.path
            .with_file_name(format!("{}.{}.tmp", name, std::process::id()))
    }
}
