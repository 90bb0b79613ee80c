//! Carrier-name mapping.
//!
//! Loads the static origin → canonical carrier table and rewrites the
//! carrier field across the full base. Unmapped names pass through
//! unchanged (fail-open) and are reported for diagnostics.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::HistoricalBase;

/// Static carrier-name lookup table, keyed by the normalized origin name.
#[derive(Debug, Clone, Default)]
pub struct CarrierMap {
    entries: HashMap<String, String>,
    canonical: HashSet<String>,
}

/// On-disk shape of the mapping table.
#[derive(Debug, Deserialize)]
struct CarrierMapFile {
    #[serde(default)]
    carriers: HashMap<String, String>,
}

impl CarrierMap {
    /// Load the mapping table from a TOML file.
    ///
    /// Fails fast if the file is missing or malformed; a run must not
    /// start with an unusable table.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Cannot read carrier mapping {path:?}: {e}"))
        })?;
        let file: CarrierMapFile = toml::from_str(&content)?;
        Ok(Self::from_entries(file.carriers))
    }

    /// Build a map from origin → canonical pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        let entries: HashMap<String, String> = entries
            .into_iter()
            .filter(|(origin, _)| !origin.trim().is_empty())
            .map(|(origin, canonical)| (normalize_origin(&origin), canonical.trim().to_string()))
            .collect();
        let canonical = entries.values().map(|name| normalize_origin(name)).collect();
        Self { entries, canonical }
    }

    /// Number of mapping entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve an origin carrier name, if mapped.
    pub fn resolve(&self, origin: &str) -> Option<&str> {
        self.entries
            .get(&normalize_origin(origin))
            .map(String::as_str)
    }

    /// Whether a name is already one of the table's canonical targets.
    ///
    /// The base is persisted after mapping, so from the second run on
    /// every record carries a canonical name; those must not show up in
    /// the unmapped report.
    pub fn is_canonical(&self, name: &str) -> bool {
        self.canonical.contains(&normalize_origin(name))
    }
}

/// Lookup form of a carrier name: trimmed and uppercased.
fn normalize_origin(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Rewrite carrier names across the full base, in place.
///
/// Applied to every record, not just the incremental batch, so
/// historical rows reflect the current table. Returns the distinct
/// unmapped names encountered, sorted; names already rewritten to a
/// canonical target on a previous run are not reported again.
pub fn apply_mapping(base: &mut HistoricalBase, map: &CarrierMap) -> Vec<String> {
    let mut unmapped = BTreeSet::new();

    for record in base.iter_mut() {
        match map.resolve(&record.carrier) {
            Some(canonical) => record.carrier = canonical.to_string(),
            None => {
                if !record.carrier.trim().is_empty() && !map.is_canonical(&record.carrier) {
                    unmapped.insert(record.carrier.clone());
                }
            }
        }
    }

    let unmapped: Vec<String> = unmapped.into_iter().collect();
    if !unmapped.is_empty() {
        log::warn!(
            "{} carrier name(s) have no mapping entry: {}",
            unmapped.len(),
            unmapped.join(", ")
        );
    }
    unmapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryStatus, Occurrence};
    use chrono::{TimeZone, Utc};

    fn occ(key: &str, carrier: &str) -> Occurrence {
        Occurrence {
            key: key.to_string(),
            status: DeliveryStatus::Delivered,
            occurred_at: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            carrier: carrier.to_string(),
            invoice: "1".to_string(),
            series: "1".to_string(),
            order: String::new(),
        }
    }

    fn map() -> CarrierMap {
        CarrierMap::from_entries(vec![("Carrier X".to_string(), "CarrierCo".to_string())])
    }

    #[test]
    fn mapped_name_is_rewritten() {
        let mut base = HistoricalBase::new();
        base.insert(occ("A", "Carrier X"));
        let unmapped = apply_mapping(&mut base, &map());
        assert_eq!(base.get("A").unwrap().carrier, "CarrierCo");
        assert!(unmapped.is_empty());
    }

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        let mut base = HistoricalBase::new();
        base.insert(occ("A", "  carrier x "));
        apply_mapping(&mut base, &map());
        assert_eq!(base.get("A").unwrap().carrier, "CarrierCo");
    }

    #[test]
    fn unmapped_name_passes_through_and_is_reported() {
        let mut base = HistoricalBase::new();
        base.insert(occ("A", "Carrier Y"));
        let unmapped = apply_mapping(&mut base, &map());
        assert_eq!(base.get("A").unwrap().carrier, "Carrier Y");
        assert_eq!(unmapped, vec!["Carrier Y"]);
    }

    #[test]
    fn canonical_names_from_a_previous_run_are_not_reported() {
        // The persisted base already holds the mapping's target name.
        let mut base = HistoricalBase::new();
        base.insert(occ("A", "CarrierCo"));
        base.insert(occ("B", "Carrier Y"));
        let unmapped = apply_mapping(&mut base, &map());
        assert_eq!(base.get("A").unwrap().carrier, "CarrierCo");
        assert_eq!(unmapped, vec!["Carrier Y"]);
    }

    #[test]
    fn unmapped_report_is_distinct_and_sorted() {
        let mut base = HistoricalBase::new();
        base.insert(occ("A", "Zeta"));
        base.insert(occ("B", "Alpha"));
        base.insert(occ("C", "Zeta"));
        let unmapped = apply_mapping(&mut base, &CarrierMap::default());
        assert_eq!(unmapped, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn empty_origin_entries_are_dropped_on_load() {
        let map = CarrierMap::from_entries(vec![
            ("  ".to_string(), "Nope".to_string()),
            ("Real".to_string(), "Canonical".to_string()),
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.resolve("real"), Some("Canonical"));
    }

    #[test]
    fn load_parses_toml_table() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("carriers.toml");
        std::fs::write(
            &path,
            "[carriers]\n\"Carrier X\" = \"CarrierCo\"\n\"Outro\" = \"Other Co\"\n",
        )
        .unwrap();

        let map = CarrierMap::load(&path).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve("CARRIER X"), Some("CarrierCo"));
    }

    #[test]
    fn load_missing_file_fails_fast() {
        assert!(CarrierMap::load("does/not/exist.toml").is_err());
    }
}
