//! JSON file persistence for history entries and coarse agent state

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::history::HistoryEntry;

/// Timestamp layout used in history file names; sorts chronologically
const FILE_TIMESTAMP: &str = "%Y%m%dT%H%M%S%.6fZ";

/// One pretty-printed JSON file per history entry
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(entry: &HistoryEntry) -> String {
        format!(
            "{}_{:06}.json",
            entry.timestamp.format(FILE_TIMESTAMP),
            entry.step_number
        )
    }

    pub fn save(&self, entry: &HistoryEntry) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let path = self.dir.join(Self::file_name(entry));
        let content = serde_json::to_string_pretty(entry)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    /// The most recent `limit` entries (all when `None`), oldest first.
    /// A missing directory is an empty history.
    pub fn load(&self, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read {}", self.dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map(|e| e == "json").unwrap_or(false))
            .collect();
        paths.sort();

        if let Some(limit) = limit {
            let skip = paths.len().saturating_sub(limit);
            paths.drain(..skip);
        }

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            match serde_json::from_str(&content) {
                Ok(entry) => entries.push(entry),
                Err(e) => tracing::warn!("Skipping unreadable history file {}: {}", path.display(), e),
            }
        }
        Ok(entries)
    }
}

/// Serializable snapshot of an agent; the tool registry is not part of it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub agent_id: String,
    pub steps: Vec<HistoryEntry>,
    #[serde(default)]
    pub context: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentState {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write agent state to {}", path.display()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent state from {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse agent state")
    }
}
