use crate::error::{AppError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// On-disk storage for uploaded audio and visualization images, both keyed by
/// sanitized filename with overwrite semantics. Writes for the same key are
/// serialized through a per-key lock; two concurrent requests for the same
/// filename cannot interleave their artifact writes.
pub struct ArtifactStore {
    upload_dir: PathBuf,
    visualization_dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ArtifactStore {
    pub fn new(upload_dir: PathBuf, visualization_dir: PathBuf) -> Self {
        Self {
            upload_dir,
            visualization_dir,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the write lock for one filename key. Hold the guard across all
    /// artifact writes belonging to a single request. Entries no request
    /// holds any more are dropped here, so the map stays bounded by the
    /// number of in-flight keys.
    pub fn lock_key(&self, filename: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(filename.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn upload_path(&self, filename: &str) -> PathBuf {
        self.upload_dir.join(filename)
    }

    /// Deterministic visualization path for a filename key.
    pub fn visualization_path(&self, filename: &str) -> PathBuf {
        self.visualization_dir
            .join(format!("{}_analysis.png", filename))
    }

    /// Relative reference handed back to clients.
    pub fn visualization_ref(&self, filename: &str) -> String {
        format!("visualizations/{}_analysis.png", filename)
    }

    pub fn save_upload(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.upload_path(filename);
        write_atomic_enough(&path, bytes)?;
        debug!("Stored upload at {:?}", path);
        Ok(path)
    }

    /// Write or overwrite the visualization for this key. Re-analysis of the
    /// same filename replaces the prior image in place.
    pub fn write_visualization(&self, filename: &str, png: &[u8]) -> Result<PathBuf> {
        let path = self.visualization_path(filename);
        write_atomic_enough(&path, png)?;
        debug!("Stored visualization at {:?}", path);
        Ok(path)
    }
}

fn write_atomic_enough(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Persistence(format!("{}: {}", parent.display(), e)))?;
    }
    std::fs::write(path, bytes)
        .map_err(|e| AppError::Persistence(format!("{}: {}", path.display(), e)))
}

/// Reduce an uploaded filename to a safe storage key: path components are
/// dropped, whitespace becomes underscores, anything outside
/// `[A-Za-z0-9._-]` is removed. An empty result is invalid input.
pub fn sanitize_filename(name: &str) -> Result<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    let cleaned = cleaned.trim_matches(['.', '_']).to_string();
    if cleaned.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "unusable filename: {:?}",
            name
        )));
    }
    Ok(cleaned)
}
