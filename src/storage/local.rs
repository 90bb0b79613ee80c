//! Local filesystem storage implementation.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::HistoricalBase;
use crate::storage::{BaseFile, StateStore};

const BASE_KEY: &str = "base.json";
const MARKER_KEY: &str = "last_run.txt";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl StateStore for LocalStorage {
    async fn load_base(&self) -> Result<Option<HistoricalBase>> {
        match self.read_json::<BaseFile>(BASE_KEY).await? {
            Some(file) => {
                log::debug!("Loaded base with {} record(s)", file.count);
                Ok(Some(HistoricalBase::from_records(file.records)))
            }
            None => Ok(None),
        }
    }

    async fn save_base(&self, base: &HistoricalBase) -> Result<()> {
        let file = BaseFile::new(base);
        self.write_json(BASE_KEY, &file).await?;
        log::info!("Persisted base with {} record(s)", file.count);
        Ok(())
    }

    async fn load_marker(&self) -> Result<Option<DateTime<Utc>>> {
        match self.read_bytes(MARKER_KEY).await? {
            None => Ok(None),
            Some(bytes) => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    AppError::validation(format!("Run marker is not valid UTF-8: {e}"))
                })?;
                let marker = DateTime::parse_from_rfc3339(text.trim()).map_err(|e| {
                    AppError::validation(format!("Run marker is not a valid timestamp: {e}"))
                })?;
                Ok(Some(marker.with_timezone(&Utc)))
            }
        }
    }

    async fn save_marker(&self, marker: DateTime<Utc>) -> Result<()> {
        self.write_bytes(MARKER_KEY, marker.to_rfc3339().as_bytes())
            .await
    }
}
