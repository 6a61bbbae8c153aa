//! Offline staging: staged lines go to a local artifact instead of a device.
//!
//! The artifact is a plain text file holding one line per staged directive, in
//! staging order. Batches are appended, never rewritten.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};

/// One write lock per artifact path, shared by every sink in the process.
static WRITE_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn write_lock_for(path: &Path) -> Arc<Mutex<()>> {
    let key = lock_key(path);
    WRITE_LOCKS
        .lock()
        .entry(key)
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// Absolute form of `path`, so `out.set` and `./out.set` share a lock.
fn lock_key(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute
        .components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .collect()
}

/// Append-only writer for the offline artifact.
///
/// All sinks for the same path share one mutex, so batches never interleave
/// whether they go through clones of one sink or through separate sinks.
#[derive(Debug, Clone)]
pub struct OfflineSink {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl OfflineSink {
    /// Sink writing to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let write_lock = write_lock_for(&path);
        Self { path, write_lock }
    }

    /// Artifact path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a batch of lines.
    pub fn append<S: AsRef<str>>(&self, lines: &[S]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut batch = String::new();
        for line in lines {
            batch.push_str(line.as_ref());
            batch.push('\n');
        }

        let _guard = self.write_lock.lock();
        self.write_batch(batch.as_bytes()).map_err(|source| Error::OfflineWrite {
            path: self.path.clone(),
            source,
        })?;

        debug!(path = %self.path.display(), lines = lines.len(), "Wrote offline batch");
        Ok(())
    }

    fn write_batch(&self, batch: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(batch)?;
        file.flush()
    }
}
