//! Tracking API client.
//!
//! Authenticates against the logistics API and fetches occurrence pages
//! for a time window. Page 0 reports the page count; remaining pages are
//! fetched concurrently, bounded by the configured concurrency.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::{ApiConfig, Credentials, DeliveryStatus, RawOccurrence};
use crate::pipeline::FetchWindow;

const LOGIN_PATH: &str = "/login/login";
const OCCURRENCE_PATH: &str = "/filter/ocorrencia";
const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_SECS: u64 = 1;
const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Source of raw occurrence records for a fetch window.
#[async_trait]
pub trait OccurrenceSource: Send + Sync {
    /// Fetch all raw records in the window as one finite batch.
    async fn fetch(&self, window: &FetchWindow) -> Result<Vec<RawOccurrence>>;
}

/// Authenticated client for the tracking API.
pub struct TrackingClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    page_size: usize,
    max_concurrent: usize,
    status_codes: String,
}

/// One page of the occurrence listing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FetchPage {
    #[serde(rename = "totalPages")]
    total_pages: u64,
    respostas: Vec<RawOccurrence>,
}

/// Login response envelope.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginResponse {
    resposta: LoginBody,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoginBody {
    token: Option<String>,
}

impl TrackingClient {
    /// Build a client and authenticate.
    pub async fn connect(config: &ApiConfig, credentials: &Credentials) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let login_url = format!("{base_url}{LOGIN_PATH}");

        let response = client
            .post(&login_url)
            .json(&json!({
                "email": credentials.email,
                "senha": credentials.password,
                "idcliente": config.client_id,
                "idproduto": config.product_id,
            }))
            .send()
            .await?
            .error_for_status()?;

        let login: LoginResponse = response.json().await?;
        let token = login
            .resposta
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::config("Authentication failed: no token returned"))?;

        log::info!("Authenticated against {}", base_url);

        Ok(Self {
            client,
            base_url,
            token,
            page_size: config.page_size,
            max_concurrent: config.max_concurrent.max(1),
            status_codes: DeliveryStatus::known_codes().join(","),
        })
    }

    /// Fetch one page of the occurrence listing, with retry.
    async fn fetch_page(&self, window: &FetchWindow, page: u64) -> Result<FetchPage> {
        let url = format!("{}{OCCURRENCE_PATH}", self.base_url);
        let query = [
            ("page", page.to_string()),
            ("size", self.page_size.to_string()),
            ("serie", "1,4".to_string()),
            ("de", window.since.format(DATE_FORMAT).to_string()),
            ("ate", window.until.format(DATE_FORMAT).to_string()),
            ("codigoOcorrencia", self.status_codes.clone()),
            ("tipoData", "OCORRENCIA".to_string()),
        ];

        let context = format!("occurrence page {page}");
        let mut attempt = 0;
        loop {
            attempt += 1;
            let result = self
                .client
                .get(&url)
                .header("Authorization", &self.token)
                .header("accept", "application/json")
                .query(&query)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.json().await?);
                }
                Ok(response) => {
                    let status = response.status();
                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if !retryable || attempt >= MAX_ATTEMPTS {
                        return Err(AppError::fetch(context, format!("status {status}")));
                    }
                    log::warn!("{context}: status {status}, retrying (attempt {attempt})");
                }
                Err(e) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(AppError::Http(e));
                    }
                    log::warn!("{context}: {e}, retrying (attempt {attempt})");
                }
            }

            tokio::time::sleep(Duration::from_secs(BACKOFF_SECS * u64::from(attempt))).await;
        }
    }
}

#[async_trait]
impl OccurrenceSource for TrackingClient {
    async fn fetch(&self, window: &FetchWindow) -> Result<Vec<RawOccurrence>> {
        let first = self.fetch_page(window, 0).await?;
        let total_pages = first.total_pages;
        let mut records = first.respostas;

        log::info!(
            "Window {} .. {}: page 0 returned {} record(s), {} page(s) total",
            window.since,
            window.until,
            records.len(),
            total_pages
        );

        if total_pages > 1 {
            let mut pages = stream::iter(1..total_pages)
                .map(|page| self.fetch_page(window, page))
                .buffer_unordered(self.max_concurrent);

            while let Some(result) = pages.next().await {
                records.extend(result?.respostas);
            }
        }

        log::info!("Fetched {} raw record(s)", records.len());
        Ok(records)
    }
}
