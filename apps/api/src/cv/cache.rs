//! File-backed cache of the last local document.
//!
//! Lifecycle: `open` → `load_or_default` → (edits) → `flush`. Payloads are
//! version-tagged; `upgrade` migrates older layouts explicitly.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cv::model::CvDocument;

pub const CACHE_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("cache payload is not valid: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cache version {0} is newer than supported version {CACHE_VERSION}")]
    UnsupportedVersion(u64),
}

#[derive(Debug, Serialize, Deserialize)]
struct CachedState {
    version: u64,
    cv: CvDocument,
}

#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
}

impl LocalCache {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached document, or the empty default when nothing usable is cached.
    /// An unreadable cache is logged and treated as empty; it is overwritten on next flush.
    pub fn load_or_default(&self) -> CvDocument {
        match self.load() {
            Ok(Some(doc)) => doc,
            Ok(None) => CvDocument::default(),
            Err(e) => {
                warn!("Discarding local cache at {}: {e}", self.path.display());
                CvDocument::default()
            }
        }
    }

    pub fn load(&self) -> Result<Option<CvDocument>, CacheError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value: Value = serde_json::from_str(&raw)?;
        Ok(Some(upgrade(value)?))
    }

    /// Writes the document atomically (temp file + rename).
    pub fn flush(&self, doc: &CvDocument) -> Result<(), CacheError> {
        let state = CachedState {
            version: CACHE_VERSION,
            cv: doc.clone(),
        };
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(&state)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Flushed local cache to {}", self.path.display());
        Ok(())
    }
}

/// Flushes a `LocalCache` off the async runtime.
///
/// Writes run on the blocking pool one at a time. Documents submitted while a
/// write is in progress collapse to the newest. Dropping the writer lets the
/// pending write finish.
pub struct CacheWriter {
    latest: watch::Sender<Option<CvDocument>>,
}

impl CacheWriter {
    pub fn spawn(cache: LocalCache) -> Self {
        let (latest, mut rx) = watch::channel(None::<CvDocument>);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(doc) = rx.borrow_and_update().clone() else {
                    continue;
                };
                let cache = cache.clone();
                match tokio::task::spawn_blocking(move || cache.flush(&doc)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Failed to flush local CV cache: {e}"),
                    Err(e) => warn!("Local CV cache write aborted: {e}"),
                }
            }
        });
        Self { latest }
    }

    pub fn submit(&self, doc: CvDocument) {
        self.latest.send_replace(Some(doc));
    }
}

/// Migrates a stored payload to the current layout.
///
/// Version 0 is the untagged legacy form: a bare document at the top level.
pub fn upgrade(value: Value) -> Result<CvDocument, CacheError> {
    let version = value.get("version").and_then(Value::as_u64).unwrap_or(0);
    match version {
        0 => Ok(serde_json::from_value(value)?),
        CACHE_VERSION => {
            let state: CachedState = serde_json::from_value(value)?;
            Ok(state.cv)
        }
        newer => Err(CacheError::UnsupportedVersion(newer)),
    }
}
