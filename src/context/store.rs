//! Context cache and backups on disk

use super::model::Context;
use crate::error::AppError;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CACHE_FILE: &str = "context.json";
const BACKUP_PREFIX: &str = "context-";

pub struct ContextStore {
    cache_dir: PathBuf,
    backup_dir: PathBuf,
    max_backups: usize,
}

impl ContextStore {
    pub fn new(cache_dir: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>, max_backups: usize) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            backup_dir: backup_dir.into(),
            max_backups,
        }
    }

    pub fn cache_path(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE)
    }

    /// Cached context, or `None` if there is no cache file yet
    pub async fn load_cache(&self) -> Result<Option<Context>, AppError> {
        let path = self.cache_path();
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Writes via a temp file so a crash never leaves a torn cache
    pub async fn save_cache(&self, context: &Context) -> Result<(), AppError> {
        fs::create_dir_all(&self.cache_dir).await?;
        let path = self.cache_path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(context)?).await?;
        fs::rename(&tmp, &path).await?;
        debug!("Cached context {} at {}", context.version(), path.display());
        Ok(())
    }

    /// Copies `context` into the backup directory, then prunes old backups
    pub async fn backup(&self, context: &Context) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.backup_dir).await?;
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3fZ");
        let path = self
            .backup_dir
            .join(format!("{}{}-{}.json", BACKUP_PREFIX, context.version(), stamp));
        fs::write(&path, serde_json::to_vec_pretty(context)?).await?;
        info!("💾 Backed up context {} to {}", context.version(), path.display());

        self.prune_backups().await?;
        Ok(path)
    }

    /// Backup files, newest first
    pub async fn list_backups(&self) -> Result<Vec<PathBuf>, AppError> {
        let mut entries = match fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_backup = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(".json"));
            if is_backup {
                backups.push(path);
            }
        }

        backups.sort_by(|a, b| backup_stamp(b).cmp(backup_stamp(a)));
        Ok(backups)
    }

    /// Deletes all but the newest `max_backups`. Returns how many were removed.
    pub async fn prune_backups(&self) -> Result<usize, AppError> {
        let backups = self.list_backups().await?;
        if backups.len() <= self.max_backups {
            return Ok(0);
        }

        let mut removed = 0;
        for path in backups.into_iter().skip(self.max_backups) {
            fs::remove_file(&path).await?;
            removed += 1;
        }
        info!("Pruned {} old context backups", removed);
        Ok(removed)
    }
}

/// Timestamp suffix of a backup file name; orders backups chronologically
fn backup_stamp(path: &Path) -> &str {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|s| s.rsplit_once('-'))
        .map(|(_, stamp)| stamp)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::model::ContextContent;

    fn context(sequence: u64) -> Context {
        Context::build(sequence, Utc::now(), ContextContent::default(), vec![], vec![])
    }

    #[tokio::test]
    async fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContextStore::new(dir.path().join("cache"), dir.path().join("backups"), 3);

        assert!(store.load_cache().await.unwrap().is_none());

        let ctx = context(4);
        tokio_test::assert_ok!(store.save_cache(&ctx).await);
        let loaded = store.load_cache().await.unwrap().unwrap();
        assert_eq!(loaded, ctx);
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContextStore::new(dir.path(), dir.path().join("backups"), 3);
        std::fs::write(store.cache_path(), "{not json").unwrap();
        assert!(matches!(store.load_cache().await, Err(AppError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_backups_are_pruned_to_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContextStore::new(dir.path().join("cache"), dir.path().join("backups"), 2);

        for sequence in 1..=4 {
            store.backup(&context(sequence)).await.unwrap();
            // Millisecond stamps must differ
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let backups = store.list_backups().await.unwrap();
        assert_eq!(backups.len(), 2);
        let newest = backups[0].file_name().unwrap().to_str().unwrap();
        assert!(newest.starts_with("context-2.0.4-"), "{}", newest);
    }
}
