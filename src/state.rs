// src/state.rs
//! Durable cursor + dedup state backed by a single JSON file.
//!
//! Load never fails the caller; a missing or unreadable file starts fresh.
//! Every mutation is flushed through a temp-file rename so a crash mid-write
//! leaves the previous valid file in place. Save failures are logged and
//! swallowed — the in-memory state stays authoritative until the next
//! successful write.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

/// Dedup window: only the most recent ids are kept.
pub const MAX_PROCESSED_IDS: usize = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PollState {
    /// End of the previously fetched window, unix milliseconds.
    pub last_checked_at: Option<i64>,
    /// Processed article ids, oldest first, capped at [`MAX_PROCESSED_IDS`].
    pub processed_article_ids: Vec<String>,
}

#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    state: PollState,
}

impl StateStore {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "could not parse state file, starting fresh"
                    );
                    PollState::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => PollState::default(),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "could not read state file, starting fresh"
                );
                PollState::default()
            }
        };
        Self { path, state }
    }

    pub fn last_checked_at(&self) -> Option<i64> {
        self.state.last_checked_at
    }

    pub fn is_processed(&self, article_id: &str) -> bool {
        self.state.processed_article_ids.iter().any(|id| id == article_id)
    }

    /// Record `article_id` as processed and persist. No-op (and no write)
    /// when the id is already present.
    pub fn mark_processed(&mut self, article_id: &str) {
        if self.is_processed(article_id) {
            return;
        }
        self.state.processed_article_ids.push(article_id.to_string());
        let len = self.state.processed_article_ids.len();
        if len > MAX_PROCESSED_IDS {
            self.state.processed_article_ids.drain(0..len - MAX_PROCESSED_IDS);
        }
        self.save();
    }

    /// Unconditional cursor overwrite + persist.
    pub fn update_last_checked(&mut self, timestamp_ms: i64) {
        self.state.last_checked_at = Some(timestamp_ms);
        self.save();
    }

    /// Read-only view for summaries and tests.
    pub fn snapshot(&self) -> &PollState {
        &self.state
    }

    fn save(&self) {
        if let Err(e) = self.write_atomic() {
            warn!(
                path = %self.path.display(),
                error = ?e,
                "failed to save state"
            );
        }
    }

    fn write_atomic(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)
            .with_context(|| format!("creating state dir {}", dir.display()))?;

        let json = serde_json::to_vec_pretty(&self.state).context("serializing state")?;
        let mut tmp = NamedTempFile::new_in(dir).context("creating temp state file")?;
        tmp.write_all(&json).context("writing temp state file")?;
        tmp.flush().context("flushing temp state file")?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
