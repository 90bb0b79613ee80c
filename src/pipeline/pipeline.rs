// src/pipeline/pipeline.rs

//! Full reconciliation run.
//!
//! Wires the pure stages together: window → fetch → normalize → dedup →
//! merge → mapping → snapshot → publish. I/O happens only at the two
//! ends, through the store, source, and publisher collaborators.

use std::time::Instant;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, RunContext};
use crate::services::{OccurrenceSource, SnapshotPublisher};
use crate::storage::StateStore;

use super::dedup::dedup;
use super::mapping::{CarrierMap, apply_mapping};
use super::merge::{MergeStats, merge_batch};
use super::normalize::{NormalizeStats, normalize_batch};
use super::snapshot::build_snapshot;
use super::window::{FetchWindow, compute_window};

/// Per-run knobs from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Override the configured cold-start lookback
    pub lookback_override: Option<i64>,
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub window: FetchWindow,
    pub fetched: usize,
    pub normalize: NormalizeStats,
    pub merge: MergeStats,
    pub base_size: usize,
    pub unmapped_carriers: Vec<String>,
    pub published_rows: usize,
}

/// Run the full pipeline once.
///
/// The run marker is advanced only after the base has been persisted and
/// the snapshot published; any failure before that leaves the previous
/// marker in place so the next run retries the same window.
pub async fn run_pipeline(
    config: &Config,
    store: &dyn StateStore,
    source: &dyn OccurrenceSource,
    publisher: &dyn SnapshotPublisher,
    options: &RunOptions,
) -> Result<RunReport> {
    let started = Instant::now();

    // Mapping problems are configuration errors; surface them before
    // anything is fetched or merged.
    let carrier_map = CarrierMap::load(&config.paths.mapping_path)?;
    log::info!(
        "Loaded carrier mapping with {} entries from {:?}",
        carrier_map.len(),
        config.paths.mapping_path
    );

    let marker = store.load_marker().await?;
    let base = store.load_base().await?;
    let context = RunContext::new(marker, base.is_some());
    let mut base = base.unwrap_or_default();

    let lookback = options
        .lookback_override
        .unwrap_or(config.window.lookback_days);
    let window = compute_window(&context, lookback, Utc::now());

    let raws = if window.is_empty() {
        log::info!("Window {} .. {} is empty, skipping fetch", window.since, window.until);
        Vec::new()
    } else {
        log::info!("Fetching window {} .. {}", window.since, window.until);
        source.fetch(&window).await?
    };
    let fetched = raws.len();

    let (occurrences, normalize) = normalize_batch(&raws);
    let batch = dedup(occurrences);
    log::info!(
        "{} raw record(s) -> {} deduplicated occurrence(s)",
        fetched,
        batch.len()
    );

    let merge = merge_batch(&mut base, batch);
    let unmapped_carriers = apply_mapping(&mut base, &carrier_map);

    store.save_base(&base).await?;

    let rows = build_snapshot(&base);
    publisher.publish(&rows).await?;

    store.save_marker(window.until).await?;

    let report = RunReport {
        window,
        fetched,
        normalize,
        merge,
        base_size: base.len(),
        unmapped_carriers,
        published_rows: rows.len(),
    };

    log::info!(
        "Run complete in {:.1}s: {} fetched, {} skipped, {} inserted, {} upgraded, {} refreshed, {} regression(s) discarded, base holds {} record(s)",
        started.elapsed().as_secs_f64(),
        report.fetched,
        report.normalize.skipped(),
        report.merge.inserted,
        report.merge.upgraded,
        report.merge.refreshed,
        report.merge.regressions_discarded,
        report.base_size
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Config, DeliveryStatus, RawOccurrence};
    use crate::pipeline::SnapshotRow;
    use crate::storage::LocalStorage;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    struct FixtureSource {
        raws: Vec<RawOccurrence>,
        called: AtomicBool,
    }

    impl FixtureSource {
        fn new(json: &str) -> Self {
            Self {
                raws: serde_json::from_str(json).unwrap(),
                called: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl OccurrenceSource for FixtureSource {
        async fn fetch(&self, _window: &FetchWindow) -> Result<Vec<RawOccurrence>> {
            self.called.store(true, Ordering::SeqCst);
            Ok(self.raws.clone())
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<Vec<SnapshotRow>>>,
    }

    #[async_trait]
    impl SnapshotPublisher for RecordingPublisher {
        async fn publish(&self, rows: &[SnapshotRow]) -> Result<()> {
            self.published.lock().unwrap().push(rows.to_vec());
            Ok(())
        }
    }

    /// Store that can be switched to reject base writes mid-test.
    struct FlakyStore {
        inner: LocalStorage,
        fail_base_saves: AtomicBool,
    }

    impl FlakyStore {
        fn new(inner: LocalStorage) -> Self {
            Self {
                inner,
                fail_base_saves: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl crate::storage::StateStore for FlakyStore {
        async fn load_base(&self) -> Result<Option<crate::models::HistoricalBase>> {
            self.inner.load_base().await
        }

        async fn save_base(&self, base: &crate::models::HistoricalBase) -> Result<()> {
            if self.fail_base_saves.load(Ordering::SeqCst) {
                return Err(AppError::Io(std::io::Error::other("disk full")));
            }
            self.inner.save_base(base).await
        }

        async fn load_marker(&self) -> Result<Option<chrono::DateTime<Utc>>> {
            self.inner.load_marker().await
        }

        async fn save_marker(&self, marker: chrono::DateTime<Utc>) -> Result<()> {
            self.inner.save_marker(marker).await
        }
    }

    struct FailingPublisher;

    #[async_trait]
    impl SnapshotPublisher for FailingPublisher {
        async fn publish(&self, _rows: &[SnapshotRow]) -> Result<()> {
            Err(AppError::publish("destination unavailable"))
        }
    }

    fn config_for(dir: &TempDir) -> Config {
        let mapping_path = dir.path().join("carriers.toml");
        std::fs::write(&mapping_path, "[carriers]\n\"Carrier X\" = \"CarrierCo\"\n").unwrap();

        let mut config = Config::default();
        config.paths.state_dir = dir.path().join("state");
        config.paths.mapping_path = mapping_path;
        config
    }

    fn batch_json() -> &'static str {
        r#"[
            {
                "data": "2024-03-01T10:00:00",
                "tipoOcorrencia": {"codigo": "200"},
                "embarque": {
                    "chave": "A1", "numero": "10", "serie": "1",
                    "transportadora": {"nome": "Carrier X"}
                }
            },
            {
                "data": "2024-02-28T09:00:00",
                "tipoOcorrencia": {"codigo": "1"},
                "embarque": {
                    "chave": "A1", "numero": "10", "serie": "1",
                    "transportadora": {"nome": "Carrier X"}
                }
            },
            {
                "data": "2024-03-02T12:00:00",
                "tipoOcorrencia": {"codigo": "7"},
                "embarque": {
                    "chave": "B2", "numero": "11", "serie": "4",
                    "transportadora": {"nome": "Carrier Y"}
                }
            }
        ]"#
    }

    #[tokio::test]
    async fn cold_start_run_publishes_full_mapped_snapshot() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        let store = LocalStorage::new(&config.paths.state_dir);
        let source = FixtureSource::new(batch_json());
        let publisher = RecordingPublisher::default();

        let report = run_pipeline(&config, &store, &source, &publisher, &RunOptions::default())
            .await
            .unwrap();

        assert_eq!(report.fetched, 3);
        assert_eq!(report.base_size, 2);
        assert_eq!(report.merge.inserted, 2);
        assert_eq!(report.published_rows, 2);
        assert_eq!(report.unmapped_carriers, vec!["Carrier Y"]);

        // Dedup kept the delivered record for A1 despite its older date.
        let published = publisher.published.lock().unwrap();
        let rows = &published[0];
        assert_eq!(rows[0].key, "A1");
        assert_eq!(rows[0].status, "ENTREGUE");
        assert_eq!(rows[0].carrier, "CarrierCo");
        assert_eq!(rows[1].carrier, "Carrier Y");

        // Marker advanced to the end of the window.
        assert_eq!(store.load_marker().await.unwrap(), Some(report.window.until));
    }

    #[tokio::test]
    async fn rerun_of_same_batch_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        let store = LocalStorage::new(&config.paths.state_dir);
        let source = FixtureSource::new(batch_json());
        let publisher = RecordingPublisher::default();
        let options = RunOptions::default();

        run_pipeline(&config, &store, &source, &publisher, &options)
            .await
            .unwrap();
        let base_after_first = store.load_base().await.unwrap().unwrap();

        // Rewind the marker so the second run actually refetches the batch.
        store
            .save_marker(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
            .await
            .unwrap();

        let report = run_pipeline(&config, &store, &source, &publisher, &options)
            .await
            .unwrap();
        let base_after_second = store.load_base().await.unwrap().unwrap();

        assert_eq!(base_after_first, base_after_second);
        assert_eq!(report.merge.applied(), 0);
        // A1 already carries the canonical "CarrierCo"; only the genuinely
        // unmapped name is reported on the rerun.
        assert_eq!(report.unmapped_carriers, vec!["Carrier Y"]);
    }

    #[tokio::test]
    async fn stale_refetch_does_not_regress_the_base() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        let store = LocalStorage::new(&config.paths.state_dir);
        let publisher = RecordingPublisher::default();
        let options = RunOptions::default();

        let delivered = FixtureSource::new(
            r#"[{
                "data": "2024-03-01T10:00:00",
                "tipoOcorrencia": {"codigo": "1"},
                "embarque": {"chave": "B2", "numero": "10", "serie": "1",
                             "transportadora": {"nome": "Carrier X"}}
            }]"#,
        );
        run_pipeline(&config, &store, &delivered, &publisher, &options)
            .await
            .unwrap();

        // Rewind the marker so the stale batch is refetched.
        store
            .save_marker(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
            .await
            .unwrap();

        let stale = FixtureSource::new(
            r#"[{
                "data": "2024-03-05T10:00:00",
                "tipoOcorrencia": {"codigo": "200"},
                "embarque": {"chave": "B2", "numero": "10", "serie": "1",
                             "transportadora": {"nome": "Carrier X"}}
            }]"#,
        );
        let report = run_pipeline(&config, &store, &stale, &publisher, &options)
            .await
            .unwrap();

        assert_eq!(report.merge.regressions_discarded, 1);
        let base = store.load_base().await.unwrap().unwrap();
        assert_eq!(base.get("B2").unwrap().status, DeliveryStatus::Delivered);
    }

    #[tokio::test]
    async fn base_persist_failure_leaves_previous_state_intact() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        let store = FlakyStore::new(LocalStorage::new(&config.paths.state_dir));
        let source = FixtureSource::new(batch_json());
        let publisher = RecordingPublisher::default();
        let options = RunOptions::default();

        run_pipeline(&config, &store, &source, &publisher, &options)
            .await
            .unwrap();
        let base_after_first = store.inner.load_base().await.unwrap().unwrap();

        // Rewind so the second run refetches, then make its persist fail.
        let rewound = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        store.inner.save_marker(rewound).await.unwrap();
        store.fail_base_saves.store(true, Ordering::SeqCst);

        let result = run_pipeline(&config, &store, &source, &publisher, &options).await;

        assert!(result.is_err());
        // The previously persisted base survives untouched and the marker
        // stays where it was, so the next run retries the same window.
        assert_eq!(store.inner.load_base().await.unwrap().unwrap(), base_after_first);
        assert_eq!(store.inner.load_marker().await.unwrap(), Some(rewound));
        // Nothing was published after the failed persist.
        assert_eq!(publisher.published.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn publish_failure_leaves_marker_unadvanced() {
        let dir = TempDir::new().unwrap();
        let config = config_for(&dir);
        let store = LocalStorage::new(&config.paths.state_dir);
        let source = FixtureSource::new(batch_json());

        let result =
            run_pipeline(&config, &store, &source, &FailingPublisher, &RunOptions::default())
                .await;

        assert!(result.is_err());
        assert!(store.load_marker().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_mapping_aborts_before_any_fetch() {
        let dir = TempDir::new().unwrap();
        let mut config = config_for(&dir);
        config.paths.mapping_path = dir.path().join("missing.toml");
        let store = LocalStorage::new(&config.paths.state_dir);
        let source = FixtureSource::new("[]");
        let publisher = RecordingPublisher::default();

        let result =
            run_pipeline(&config, &store, &source, &publisher, &RunOptions::default()).await;

        assert!(result.is_err());
        assert!(!source.called.load(Ordering::SeqCst));
        assert!(store.load_base().await.unwrap().is_none());
    }
}
