use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::store::{next_version, ThreadStore};
use crate::workflow::Checkpoint;

/// One pretty-printed JSON file per thread under a base directory
#[derive(Debug)]
pub struct FileStore {
    base_path: PathBuf,
    /// Serializes the read-compare-write of saves within this process
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Create a new file store with the given base path
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Directory the checkpoints live in
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn thread_path(&self, thread_id: &str) -> Result<PathBuf> {
        Self::validate_thread_id(thread_id)?;
        Ok(self.base_path.join(format!("{}.json", thread_id)))
    }

    /// Reject ids that are unsafe as file names: path separators, `..`,
    /// and control characters.
    fn validate_thread_id(thread_id: &str) -> Result<()> {
        if thread_id.is_empty() {
            return Err(Error::InvalidRequest("thread id cannot be empty".to_string()));
        }
        if thread_id.contains('/')
            || thread_id.contains('\\')
            || thread_id.contains("..")
            || thread_id.contains('\0')
        {
            return Err(Error::InvalidRequest(format!(
                "thread id contains invalid characters: {:?}",
                thread_id
            )));
        }
        if thread_id.chars().any(|c| c.is_control()) {
            return Err(Error::InvalidRequest(format!(
                "thread id contains control characters: {:?}",
                thread_id
            )));
        }
        Ok(())
    }

    async fn read_checkpoint(&self, path: &Path) -> Result<Option<Checkpoint>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let checkpoint = serde_json::from_str(&content)
            .map_err(|e| Error::Store(format!("corrupt checkpoint {}: {}", path.display(), e)))?;
        Ok(Some(checkpoint))
    }

    /// Write through a temporary file and rename it into place
    async fn write_checkpoint(&self, path: &Path, checkpoint: &Checkpoint) -> Result<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        let content = serde_json::to_string_pretty(checkpoint)?;

        let tmp_path = self.base_path.join(format!(
            ".{}.{}.tmp",
            checkpoint.thread_id,
            uuid::Uuid::new_v4().simple()
        ));

        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, path).await
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl ThreadStore for FileStore {
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let path = self.thread_path(thread_id)?;
        self.read_checkpoint(&path).await
    }

    async fn save(&self, checkpoint: &Checkpoint, expected: Option<u64>) -> Result<u64> {
        let path = self.thread_path(&checkpoint.thread_id)?;
        let _guard = self.write_lock.lock().await;

        let actual = self.read_checkpoint(&path).await?.map(|c| c.version);
        if actual != expected {
            return Err(Error::VersionConflict {
                thread_id: checkpoint.thread_id.clone(),
                expected,
                actual,
            });
        }

        let version = next_version(expected);
        let mut stored = checkpoint.clone();
        stored.version = version;
        self.write_checkpoint(&path, &stored).await?;
        debug!("Saved thread {} at version {}", stored.thread_id, version);
        Ok(version)
    }

    async fn list(&self) -> Result<Vec<String>> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}
