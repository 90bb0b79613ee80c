//! Snapshot publishing.
//!
//! The pipeline hands the publisher the complete snapshot every run; the
//! destination is cleared first, then rows are appended in chunks.

use async_trait::async_trait;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::SheetsConfig;
use crate::pipeline::SnapshotRow;

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com";

/// Destination for the published snapshot.
#[async_trait]
pub trait SnapshotPublisher: Send + Sync {
    /// Replace the destination content with the given rows.
    async fn publish(&self, rows: &[SnapshotRow]) -> Result<()>;
}

/// Publishes the snapshot to a Google Sheets range.
pub struct SheetsPublisher {
    client: reqwest::Client,
    spreadsheet_id: String,
    range: String,
    chunk_size: usize,
    token: String,
}

impl SheetsPublisher {
    /// Create a publisher for the configured destination.
    pub fn new(config: &SheetsConfig, token: impl Into<String>) -> Result<Self> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err(AppError::config("sheets.spreadsheet_id is not set"));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            chunk_size: config.chunk_size.max(1),
            token: token.into(),
        })
    }

    /// Build a values-API URL; the range goes in a path segment and needs
    /// percent-encoding.
    fn values_url(&self, verb: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(SHEETS_API_BASE)
            .map_err(|e| AppError::publish(format!("Bad API base URL: {e}")))?;
        let range_segment = format!("{}:{verb}", self.range);
        url.path_segments_mut()
            .map_err(|_| AppError::publish("Bad API base URL"))?
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                range_segment.as_str(),
            ]);
        Ok(url)
    }

    async fn clear(&self) -> Result<()> {
        let url = self.values_url("clear")?;
        self.client
            .post(url)
            .bearer_auth(&self.token)
            .json(&json!({}))
            .send()
            .await?
            .error_for_status()?;
        log::info!("Cleared destination range {}", self.range);
        Ok(())
    }

    async fn append(&self, rows: &[SnapshotRow]) -> Result<()> {
        let mut url = self.values_url("append")?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW");

        for chunk in rows.chunks(self.chunk_size) {
            let values: Vec<Vec<String>> = chunk.iter().map(SnapshotRow::values).collect();
            self.client
                .post(url.clone())
                .bearer_auth(&self.token)
                .json(&json!({ "values": values }))
                .send()
                .await?
                .error_for_status()?;
            log::debug!("Appended {} row(s)", chunk.len());
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotPublisher for SheetsPublisher {
    async fn publish(&self, rows: &[SnapshotRow]) -> Result<()> {
        self.clear().await?;
        self.append(rows).await?;
        log::info!(
            "Published {} row(s) to spreadsheet {}",
            rows.len(),
            self.spreadsheet_id
        );
        Ok(())
    }
}

/// Publisher that only logs; used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPublisher;

#[async_trait]
impl SnapshotPublisher for LogPublisher {
    async fn publish(&self, rows: &[SnapshotRow]) -> Result<()> {
        log::info!("Dry run: skipping publish of {} row(s)", rows.len());
        Ok(())
    }
}
