use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::{fs, sync::Mutex};

use crate::models::Progress;

/// Key-value progress save backed by a JSON file.
///
/// Writes are serialised and merged with whatever is already on disk, so
/// `max_level_unlocked` and `high_score` never go backwards even with several
/// sessions saving at once.
#[derive(Debug)]
pub struct ProgressStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ProgressStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read saved progress. A missing file means a new player.
    pub async fn load(&self) -> Result<Progress> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn read(&self) -> Result<Progress> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Corrupt progress file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Progress::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read progress file {}", self.path.display())),
        }
    }

    /// Merge `progress` into the stored value and write it back. Returns the
    /// merged result.
    pub async fn save(&self, progress: &Progress) -> Result<Progress> {
        let _guard = self.lock.lock().await;

        let mut stored = match self.read().await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Overwriting unreadable progress file: {:#}", e);
                Progress::default()
            }
        };
        if !stored.merge(progress) && self.path.exists() {
            return Ok(stored);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&stored)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        tracing::debug!(
            "Saved progress: level {} unlocked, high score {}",
            stored.max_level_unlocked,
            stored.high_score
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("word-tiles-{}-{}", name, uuid::Uuid::new_v4()))
            .join("progress.json")
    }

    #[tokio::test]
    async fn test_missing_file_loads_defaults() {
        let store = ProgressStore::new(temp_path("missing"));
        assert_eq!(store.load().await.unwrap(), Progress::default());
    }

    #[tokio::test]
    async fn test_save_keeps_maximums() {
        let store = ProgressStore::new(temp_path("max"));

        let mut first = Progress::default();
        first.record(4, 900);
        store.save(&first).await.unwrap();

        let mut second = Progress::default();
        second.record(2, 1500);
        let merged = store.save(&second).await.unwrap();

        assert_eq!(merged.max_level_unlocked, 4);
        assert_eq!(merged.high_score, 1500);

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.max_level_unlocked, 4);
        assert_eq!(loaded.high_score, 1500);

        let _ = fs::remove_dir_all(store.path().parent().unwrap()).await;
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let store = ProgressStore::new(temp_path("corrupt"));
        fs::create_dir_all(store.path().parent().unwrap()).await.unwrap();
        fs::write(store.path(), "not json").await.unwrap();

        assert!(store.load().await.is_err());

        // Saving recovers by writing fresh progress
        let mut progress = Progress::default();
        progress.record(3, 10);
        let saved = store.save(&progress).await.unwrap();
        assert_eq!(saved.max_level_unlocked, 3);

        let _ = fs::remove_dir_all(store.path().parent().unwrap()).await;
    }
}
