use super::traits::{SignalKey, SignalStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub const DEFAULT_FILE_PREFIX: &str = ".silibot_";

/// File-backed signal store: one file per key
///
/// Layout (defaults):
///   <dir>/.silibot_signal
///   <dir>/.silibot_command_cmdlogs
///   <dir>/.silibot_command_lastsession
///   <dir>/.silibot_history_records
pub struct FileSignalStore {
    dir: PathBuf,
    prefix: String,
}

impl FileSignalStore {
    pub fn new(dir: &Path) -> Self {
        Self::with_prefix(dir, DEFAULT_FILE_PREFIX)
    }

    pub fn with_prefix(dir: &Path, prefix: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            prefix: prefix.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: SignalKey) -> PathBuf {
        self.dir.join(format!("{}{}", self.prefix, key.as_str()))
    }
}

#[async_trait]
impl SignalStore for FileSignalStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn write(&self, key: SignalKey, text: &str) -> Result<()> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create store directory: {}", self.dir.display()))?;

        let file_name = path
            .file_name()
            .and_then(|v| v.to_str())
            .unwrap_or("signal");
        let temp_path = self
            .dir
            .join(format!("{file_name}.tmp-{}", uuid::Uuid::new_v4()));

        let mut temp_file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("Failed to create temporary file: {}", temp_path.display()))?;
        temp_file
            .write_all(text.as_bytes())
            .await
            .with_context(|| format!("Failed to write {key}"))?;
        temp_file
            .sync_all()
            .await
            .with_context(|| format!("Failed to fsync {key}"))?;
        drop(temp_file);

        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            anyhow::bail!("Failed to replace {}: {e}", path.display());
        }

        tracing::debug!(key = %key, path = %path.display(), bytes = text.len(), "signal key written");
        Ok(())
    }

    async fn read(&self, key: SignalKey) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(content) => {
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(key = %key, path = %path.display(), "Failed to read signal key: {e}");
                None
            }
        }
    }

    async fn clear(&self, key: SignalKey) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}
