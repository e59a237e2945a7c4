//! Bounded, append-only log of executed steps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

use crate::config::HistoryConfig;
use crate::persistence::HistoryStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1-based, increases across evictions
    pub step_number: u64,
    pub command: String,
    pub action: String,
    pub params: Value,
    pub result: Value,
    pub timestamp: DateTime<Utc>,
}

/// Session history; the oldest entry is evicted once `max_history` is exceeded.
/// A bound of 0 keeps nothing in memory; entries are still numbered and persisted.
pub struct History {
    entries: VecDeque<HistoryEntry>,
    max_history: usize,
    next_step: u64,
    store: Option<HistoryStore>,
}

impl History {
    pub fn new(max_history: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_history,
            next_step: 1,
            store: None,
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        let mut history = Self::new(config.max_history);
        history.store = config.persist_dir.as_ref().map(HistoryStore::new);
        history
    }

    pub fn with_store(mut self, store: HistoryStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Append an entry and return its step number
    pub fn add(
        &mut self,
        command: impl Into<String>,
        action: impl Into<String>,
        params: Value,
        result: Value,
    ) -> u64 {
        let entry = HistoryEntry {
            step_number: self.next_step,
            command: command.into(),
            action: action.into(),
            params,
            result,
            timestamp: Utc::now(),
        };
        self.next_step += 1;

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&entry) {
                tracing::warn!("Failed to persist history entry {}: {:#}", entry.step_number, e);
            }
        }

        let step_number = entry.step_number;
        self.entries.push_back(entry);
        while self.entries.len() > self.max_history {
            self.entries.pop_front();
        }

        step_number
    }

    /// The most recent `limit` entries (all when `None`), oldest first
    pub fn get(&self, limit: Option<usize>) -> Vec<&HistoryEntry> {
        let skip = limit
            .map(|l| self.entries.len().saturating_sub(l))
            .unwrap_or(0);
        self.entries.iter().skip(skip).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
