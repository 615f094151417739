//! JSONL-backed run store with in-memory caching.
//!
//! One line per finished run. The file is append-only: a run record is
//! written exactly once, when its workflow reaches a terminal state. Lookups
//! by id return the most recently appended record for that id.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::domain::RunRecord;
use crate::error::{Result, SceneforgeError};

const RUNS_FILE: &str = "runs.jsonl";

/// Append-only store for terminal run records.
pub struct RunStore {
    path: PathBuf,
    cache: RwLock<Option<Vec<RunRecord>>>,
}

impl RunStore {
    /// Open (or create) a run store under the given directory.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        fs::create_dir_all(base_dir)?;
        Ok(Self {
            path: base_dir.join(RUNS_FILE),
            cache: RwLock::new(None),
        })
    }

    /// Load the file into cache if not already loaded.
    fn ensure_loaded(&self) -> Result<()> {
        {
            let cache = self.cache.read().map_err(|e| SceneforgeError::Storage(e.to_string()))?;
            if cache.is_some() {
                return Ok(());
            }
        }

        let mut cache = self.cache.write().map_err(|e| SceneforgeError::Storage(e.to_string()))?;
        if cache.is_some() {
            return Ok(());
        }

        let records = if self.path.exists() {
            let file = File::open(&self.path)?;
            let reader = BufReader::new(file);
            let mut records = Vec::new();
            for line in reader.lines() {
                let line = line?;
                if !line.trim().is_empty() {
                    let record: RunRecord = serde_json::from_str(&line)?;
                    records.push(record);
                }
            }
            records
        } else {
            Vec::new()
        };

        *cache = Some(records);
        Ok(())
    }

    /// Persist a finished run. File first (source of truth), then cache.
    pub fn save(&self, record: &RunRecord) -> Result<()> {
        self.ensure_loaded()?;

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;

        let mut cache = self.cache.write().map_err(|e| SceneforgeError::Storage(e.to_string()))?;
        cache
            .as_mut()
            .ok_or_else(|| SceneforgeError::Storage("cache not loaded".to_string()))?
            .push(record.clone());

        Ok(())
    }

    /// Fetch a run by request id. The latest record wins if an id was ever
    /// reused.
    pub fn get(&self, id: &str) -> Result<Option<RunRecord>> {
        self.ensure_loaded()?;

        let cache = self.cache.read().map_err(|e| SceneforgeError::Storage(e.to_string()))?;
        let records = cache
            .as_ref()
            .ok_or_else(|| SceneforgeError::Storage("cache not loaded".to_string()))?;

        Ok(records.iter().rev().find(|r| r.id == id).cloned())
    }

    /// All runs, most recent first.
    pub fn list(&self) -> Result<Vec<RunRecord>> {
        self.ensure_loaded()?;

        let cache = self.cache.read().map_err(|e| SceneforgeError::Storage(e.to_string()))?;
        let records = cache
            .as_ref()
            .ok_or_else(|| SceneforgeError::Storage("cache not loaded".to_string()))?;

        let mut all = records.clone();
        all.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
        Ok(all)
    }
}
