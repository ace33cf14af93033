//! Externally computed per-bin results and their rollups.
//!
//! A result set is a JSON object of the form
//!
//! ```text
//! {
//!   "displayName": "fixed_200__bin",
//!   "data": { "0": {"count": 356}, "17": {"count": 12, "displayName": "..."} }
//! }
//! ```
//!
//! where `displayName` names the bin layout the results were computed for.
//! [`ResultSet::from_value`] checks this shape before anything touches the
//! bins.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::bins::BinError;
use crate::file::InputFile;
use crate::genomes::{Bin, BinIdx};
use crate::stats::GlobalStats;

/// The results of a single bin. Fields beyond `count` are kept as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BinResult {
    pub count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BinResult {
    pub fn new(count: u64) -> Self {
        Self {
            count,
            extra: Map::new(),
        }
    }
}

/// Counts rolled up from bins to a region, genome or the whole collection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RollupResults {
    /// The sum of the bins' result counts.
    pub count: u64,
    /// The number of bins with a non-zero count in the last attached set.
    pub bins: usize,
    /// The sum of the bins' total counts.
    pub total: u64,
}

fn checked_sum(left: u64, right: u64) -> Result<u64, BinError> {
    left.checked_add(right).ok_or(BinError::CountOverflow(left, right))
}

impl RollupResults {
    /// Roll up `bins`. Only bins whose `total` (if `is_total`) or `results`
    /// count is non-zero are tallied in `bins`.
    pub fn from_bins(bins: &[Bin], is_total: bool) -> Result<Self, BinError> {
        let mut rollup = Self::default();
        for bin in bins {
            let count = bin.results.as_ref().map_or(0, |r| r.count);
            let total = bin.total.as_ref().map_or(0, |r| r.count);
            rollup.count = checked_sum(rollup.count, count)?;
            rollup.total = checked_sum(rollup.total, total)?;
            let tallied = if is_total { total } else { count };
            if tallied > 0 {
                rollup.bins += 1;
            }
        }
        Ok(rollup)
    }

    pub fn add(&mut self, other: &RollupResults) -> Result<(), BinError> {
        self.count = checked_sum(self.count, other.count)?;
        self.total = checked_sum(self.total, other.total)?;
        self.bins += other.bins;
        Ok(())
    }
}

/// What [`Genomes::set_results`](crate::genomes::Genomes::set_results)
/// returns: the collection-wide rollup, its statistics and the generation
/// of this attachment.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Rollup {
    pub generation: u64,
    pub results: RollupResults,
    pub stats: GlobalStats,
}

/// A validated result set.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResultSet {
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub data: BTreeMap<BinIdx, BinResult>,
}

fn invalid(reason: &str) -> BinError {
    BinError::InvalidResults(reason.to_string())
}

impl ResultSet {
    pub fn new(display_name: &str, data: BTreeMap<BinIdx, BinResult>) -> Self {
        Self {
            display_name: display_name.to_string(),
            data,
        }
    }

    /// Check the shape of a JSON result set and convert it.
    ///
    /// The value must be an object with a non-empty string `displayName`
    /// and an object `data`, whose keys are bin indices and whose values
    /// are objects with an integer `count`.
    pub fn from_value(value: &Value) -> Result<ResultSet, BinError> {
        let object = value.as_object().ok_or_else(|| invalid("not an object"))?;
        let display_name = object
            .get("displayName")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| invalid("missing displayName"))?;
        let raw_data = object
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| invalid("missing data"))?;

        let mut data = BTreeMap::new();
        for (key, entry) in raw_data {
            let idx: BinIdx = key
                .trim()
                .parse()
                .map_err(|_| invalid(&format!("bin key '{}' is not an index", key)))?;
            let result: BinResult = serde_json::from_value(entry.clone())
                .map_err(|e| invalid(&format!("bin {}: {}", key, e)))?;
            data.insert(idx, result);
        }
        Ok(ResultSet::new(display_name, data))
    }

    /// Read a result set from a JSON file, which may be gzip-compressed.
    pub fn from_json_file(filepath: &str) -> Result<ResultSet, BinError> {
        let reader = InputFile::new(filepath).reader()?;
        let value: Value = serde_json::from_reader(reader)?;
        ResultSet::from_value(&value)
    }

    pub fn get(&self, idx: BinIdx) -> Option<&BinResult> {
        self.data.get(&idx)
    }

    /// The largest bin index with results.
    pub fn max_bin(&self) -> Option<BinIdx> {
        self.data.keys().next_back().copied()
    }

    /// Check these results can be attached to a layout named
    /// `expected_name` (if it has a name) with `bin_count` bins.
    pub fn check_compatible(
        &self,
        expected_name: Option<&str>,
        bin_count: usize,
    ) -> Result<(), BinError> {
        if let Some(expected) = expected_name {
            if self.display_name != expected {
                return Err(BinError::ResultsLayoutMismatch {
                    found: self.display_name.clone(),
                    expected: expected.to_string(),
                });
            }
        }
        match self.max_bin() {
            Some(max_bin) if max_bin > bin_count => {
                Err(BinError::BinCountMismatch(max_bin, bin_count))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        let value = json!({
            "displayName": "fixed_200__bin",
            "data": {"0": {"count": 356}, "12": {"count": 2, "note": "x"}}
        });
        let results = ResultSet::from_value(&value).unwrap();
        assert_eq!(results.display_name, "fixed_200__bin");
        assert_eq!(results.get(0), Some(&BinResult::new(356)));
        assert_eq!(results.get(12).unwrap().extra.get("note"), Some(&json!("x")));
        assert_eq!(results.max_bin(), Some(12));
    }

    #[test]
    fn test_from_value_rejects_bad_shapes() {
        for value in [
            Value::Null,
            json!(-1),
            json!("hello"),
            json!([1, 2]),
            json!({}),
            json!({"displayName": "fixed_200__bin"}),
            json!({"data": {}}),
            json!({"displayName": "", "data": {}}),
            json!({"displayName": "x", "data": {"a": {"count": 1}}}),
            json!({"displayName": "x", "data": {"1": {"count": -1}}}),
            json!({"displayName": "x", "data": {"1": 4}}),
        ] {
            assert!(
                matches!(ResultSet::from_value(&value), Err(BinError::InvalidResults(_))),
                "accepted {}",
                value
            );
        }
    }

    #[test]
    fn test_check_compatible() {
        let results = ResultSet::from_value(&json!({
            "displayName": "fixed_1000__bin",
            "data": {"10": {"count": 1}}
        }))
        .unwrap();
        assert!(results.check_compatible(Some("fixed_1000__bin"), 10).is_ok());
        assert!(results.check_compatible(None, 11).is_ok());
        assert!(matches!(
            results.check_compatible(Some("fixed_200__bin"), 11),
            Err(BinError::ResultsLayoutMismatch { .. })
        ));
        assert!(matches!(
            results.check_compatible(None, 9),
            Err(BinError::BinCountMismatch(10, 9))
        ));
    }

    #[test]
    fn test_error_messages() {
        let err = BinError::ResultsLayoutMismatch {
            found: "fixed_1000__bin".to_string(),
            expected: "fixed_200__bin".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Results are for fixed_1000__bin bins. Should be fixed_200__bin"
        );
        assert_eq!(
            invalid("x").to_string(),
            "Please supply valid results parameter (x)"
        );
    }

    fn bin(idx: BinIdx, results: Option<u64>, total: Option<u64>) -> Bin {
        Bin {
            taxon_id: 1,
            region: "1".to_string(),
            start: 1 + idx as u64 * 10,
            end: 10 + idx as u64 * 10,
            idx,
            results: results.map(BinResult::new),
            total: total.map(BinResult::new),
        }
    }

    #[test]
    fn test_rollup_tallies_only_attached_field() {
        let bins = [bin(0, Some(0), Some(5)), bin(1, Some(0), Some(5)), bin(2, Some(1), None)];

        let rollup = RollupResults::from_bins(&bins, false).unwrap();
        assert_eq!(
            rollup,
            RollupResults {
                count: 1,
                bins: 1,
                total: 10
            }
        );

        let rollup = RollupResults::from_bins(&bins, true).unwrap();
        assert_eq!(rollup.bins, 2);
    }

    #[test]
    fn test_rollup_overflow() {
        let bins = [bin(0, Some(u64::MAX), None), bin(1, Some(1), None)];
        assert!(matches!(
            RollupResults::from_bins(&bins, false),
            Err(BinError::CountOverflow(u64::MAX, 1))
        ));

        let mut rollup = RollupResults {
            count: u64::MAX,
            bins: 1,
            total: 0,
        };
        let err = rollup.add(&RollupResults::from_bins(&bins[1..], false).unwrap());
        assert!(matches!(err, Err(BinError::CountOverflow(_, 1))));
    }
}
