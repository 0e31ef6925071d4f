//! Durable checkpoints for interruptible runs.
//!
//! The checkpoint file is a JSON record of the run's parameter fingerprint,
//! the processed-path set, and the partial accumulator. Writes go to a
//! temporary file in the same directory followed by an atomic rename, so a
//! crash mid-write never corrupts the previous valid state.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use geosift_core::{Cluster, SearchHit};

use crate::error::{Error, Result};

/// The in-progress result set, routed by run mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", content = "items", rename_all = "snake_case")]
pub enum Accumulator {
    /// Partial search hits in accumulation order.
    Search(Vec<SearchHit>),
    /// In-progress cluster arena indexed by cluster id.
    Clusters(Vec<Cluster>),
}

/// Persisted progress state for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    /// Fingerprint of the parameters this state was computed under.
    pub fingerprint: String,
    /// Paths already extracted, filtered, and routed (including failures).
    pub processed: BTreeSet<String>,
    /// Partial results to re-seed the engine with on resume.
    pub accumulator: Accumulator,
    /// Last persist time.
    pub updated: DateTime<Utc>,
}

impl CheckpointState {
    /// Fresh state for a run starting from nothing.
    #[must_use]
    pub fn new(fingerprint: impl Into<String>, accumulator: Accumulator) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            processed: BTreeSet::new(),
            accumulator,
            updated: Utc::now(),
        }
    }

    /// Whether a path was already handled by a previous batch.
    #[must_use]
    pub fn is_processed(&self, path: &str) -> bool {
        self.processed.contains(path)
    }
}

/// Owns the checkpoint file for the duration of a run.
///
/// A sidecar lock file (created with `create_new`) rejects concurrent runs
/// against the same checkpoint path instead of letting them corrupt each
/// other. The lock is released on drop.
#[derive(Debug)]
pub struct CheckpointManager {
    path: PathBuf,
    lock_path: PathBuf,
}

impl CheckpointManager {
    /// Acquires exclusive ownership of the checkpoint at `path`.
    ///
    /// # Errors
    /// Returns [`Error::CheckpointLocked`] when another process holds the
    /// lock, or an I/O error when the lock file cannot be created.
    pub fn acquire(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let lock_path = lock_path_for(&path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(mut lock) => {
                // Record the owner for post-mortem debugging.
                let _ = writeln!(lock, "{}", std::process::id());
            }
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(Error::CheckpointLocked(path));
            }
            Err(err) => return Err(err.into()),
        }

        Ok(Self { path, lock_path })
    }

    /// Loads a previously persisted state when its fingerprint matches.
    ///
    /// A missing file, an unreadable file, or a fingerprint mismatch all
    /// report "no usable checkpoint": the run starts fresh rather than
    /// merging state computed under different parameters.
    ///
    /// # Errors
    /// Returns an error only for I/O failures other than the file being
    /// absent.
    pub fn load(&self, fingerprint: &str) -> Result<Option<CheckpointState>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let state: CheckpointState = match serde_json::from_slice(&data) {
            Ok(state) => state,
            Err(err) => {
                warn!(
                    "discarding unreadable checkpoint {}: {err}",
                    self.path.display()
                );
                return Ok(None);
            }
        };

        if state.fingerprint != fingerprint {
            warn!(
                "checkpoint {} was written for different parameters; starting fresh",
                self.path.display()
            );
            return Ok(None);
        }

        info!(
            "resuming from checkpoint of {} ({} files already processed)",
            state.updated,
            state.processed.len()
        );
        Ok(Some(state))
    }

    /// Merges a processed batch into the state and persists it atomically.
    ///
    /// # Errors
    /// Persist failures are returned to the caller and must abort the run;
    /// continuing without durability would silently break the resume
    /// contract.
    pub fn record(
        &self,
        state: &mut CheckpointState,
        batch: impl IntoIterator<Item = String>,
        accumulator: Accumulator,
    ) -> Result<()> {
        state.processed.extend(batch);
        state.accumulator = accumulator;
        state.updated = Utc::now();
        self.persist(state)
    }

    /// Deletes the checkpoint after a successful run.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be removed.
    pub fn finalize(self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("checkpoint {} cleared", self.path.display()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    fn persist(&self, state: &CheckpointState) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, state)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        debug!(
            "checkpoint saved: {} files processed",
            state.processed.len()
        );
        Ok(())
    }
}

impl Drop for CheckpointManager {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    path.with_file_name(name)
}
