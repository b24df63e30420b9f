// src/handoff.rs
//! Write-once / read-once handoff between separately invoked stages.
//!
//! One JSON file per key. `get` leaves the entry in place; the reader calls
//! `ack` once it has finished with the value.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::persist::{persist_record, ObservationSink, PersistOutcome};
use crate::record::ObservationRecord;

/// Key the parse stage publishes its record under.
pub const PARSE_STAGE_KEY: &str = "parse_files";

#[derive(Debug, Clone)]
pub struct HandoffStore {
    dir: PathBuf,
}

impl HandoffStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Publish `value` under `key`, replacing anything left by an earlier run.
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating handoff dir {}", self.dir.display()))?;
        let json = serde_json::to_vec_pretty(value).context("serializing handoff value")?;
        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.part"));
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("publishing {}", path.display()))?;
        tracing::debug!(key, path = %path.display(), "handoff published");
        Ok(())
    }

    /// Read the value under `key` without removing it. `Ok(None)` when nothing
    /// was published.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        let value = serde_json::from_slice(&bytes)
            .with_context(|| format!("decoding handoff value {}", path.display()))?;
        Ok(Some(value))
    }

    /// Drop the value under `key` once its reader is done with it. Missing
    /// entries are fine.
    pub async fn ack(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key, path = %path.display(), "handoff consumed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("consuming {}", path.display())),
        }
    }
}

/// Persist the record the parse stage published. The entry is only removed
/// after the transaction commits, so a failed attempt can simply be re-run.
pub async fn persist_published(
    handoff: &HandoffStore,
    sink: &dyn ObservationSink,
) -> Result<PersistOutcome> {
    let record: Option<ObservationRecord> = handoff.get(PARSE_STAGE_KEY).await?;
    if record.is_none() {
        tracing::info!(dir = %handoff.dir().display(), "no published record");
    }
    let outcome = persist_record(sink, record.as_ref()).await?;
    handoff.ack(PARSE_STAGE_KEY).await?;
    Ok(outcome)
}
