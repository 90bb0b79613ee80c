//! Occurrence normalization.
//!
//! Converts loosely typed raw API records into canonical [`Occurrence`]
//! values. Records that cannot be normalized are excluded and counted,
//! never fatal to the run.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::{DeliveryStatus, Occurrence, RawOccurrence};

/// Invoice series excluded from reconciliation.
const FILTERED_SERIES: &str = "3";

/// Why a raw record was excluded from the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// No delivery key on the record
    MissingKey,
    /// Invoice series is filtered out
    FilteredSeries,
    /// Status code not in the known total order
    UnknownStatus,
    /// Occurrence date missing or unparseable
    BadDate,
}

/// Per-batch normalization counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub total: usize,
    pub missing_key: usize,
    pub filtered_series: usize,
    pub unknown_status: usize,
    pub bad_date: usize,
}

impl NormalizeStats {
    /// Records excluded for any reason.
    pub fn skipped(&self) -> usize {
        self.missing_key + self.filtered_series + self.unknown_status + self.bad_date
    }

    fn record(&mut self, skip: Skip) {
        match skip {
            Skip::MissingKey => self.missing_key += 1,
            Skip::FilteredSeries => self.filtered_series += 1,
            Skip::UnknownStatus => self.unknown_status += 1,
            Skip::BadDate => self.bad_date += 1,
        }
    }
}

/// Normalize a batch of raw records, absorbing per-record failures.
pub fn normalize_batch(raws: &[RawOccurrence]) -> (Vec<Occurrence>, NormalizeStats) {
    let mut stats = NormalizeStats {
        total: raws.len(),
        ..NormalizeStats::default()
    };
    let mut occurrences = Vec::with_capacity(raws.len());

    for raw in raws {
        match normalize_one(raw) {
            Ok(occurrence) => occurrences.push(occurrence),
            Err(skip) => {
                stats.record(skip);
                log::debug!("Skipping record: {:?}", skip);
            }
        }
    }

    if stats.skipped() > 0 {
        log::warn!(
            "Normalization skipped {} of {} records (missing key: {}, filtered series: {}, unknown status: {}, bad date: {})",
            stats.skipped(),
            stats.total,
            stats.missing_key,
            stats.filtered_series,
            stats.unknown_status,
            stats.bad_date
        );
    }

    (occurrences, stats)
}

/// Normalize one raw record.
pub fn normalize_one(raw: &RawOccurrence) -> Result<Occurrence, Skip> {
    let key = normalize_key(&text(&raw.shipment.chave));
    if key.is_empty() {
        return Err(Skip::MissingKey);
    }

    let series = text(&raw.shipment.serie).trim().to_string();
    if series == FILTERED_SERIES {
        return Err(Skip::FilteredSeries);
    }

    let code = text(&raw.occurrence_type.codigo);
    let status = DeliveryStatus::from_code(code.trim()).ok_or(Skip::UnknownStatus)?;

    let occurred_at = parse_occurrence_date(&text(&raw.data)).ok_or(Skip::BadDate)?;

    Ok(Occurrence {
        key,
        status,
        occurred_at,
        carrier: text(&raw.shipment.carrier.nome).trim().to_string(),
        invoice: text(&raw.shipment.numero).trim().to_string(),
        series,
        order: text(&raw.shipment.order.numero).trim().to_string(),
    })
}

/// Canonical form of the delivery key: whitespace stripped, uppercased.
///
/// Two raw records with the same natural identity must yield the same
/// key regardless of formatting differences.
pub fn normalize_key(raw: &str) -> String {
    raw.split_whitespace().collect::<String>().to_uppercase()
}

/// Extract a string from a loosely typed API field.
fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse the occurrence timestamp, which arrives with or without an
/// offset depending on the endpoint.
fn parse_occurrence_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let cleaned = raw.trim_end_matches('Z').replace('T', " ");
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(naive.and_utc());
        }
    }

    None
}
