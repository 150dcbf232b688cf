//! Structured rejection records for diagnosing a scheduling attempt.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::Serialize;

use super::counter::{Action, FilterType};
use super::status::{Status, StatusCode};
use crate::store::StoreId;

/// Why one store was dropped by one filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterRecord {
    /// Side the store was evaluated for.
    pub action: Action,
    /// Scope of the rejecting filter.
    pub scope: String,
    /// Rule that rejected the store.
    pub filter_type: FilterType,
    /// Rejected store.
    pub store_id: StoreId,
    /// Source store of a comparing filter.
    pub source_id: Option<StoreId>,
    /// Rejection status.
    pub status: Status,
    /// Human-readable rejection.
    pub reason: String,
}

/// Collects [`FilterRecord`]s from concurrent selection calls.
#[derive(Debug, Default)]
pub struct Collector {
    records: Mutex<Vec<FilterRecord>>,
}

impl Collector {
    /// Empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record.
    pub fn collect(&self, record: FilterRecord) {
        self.records.lock().push(record);
    }

    /// Copy of all records, in collection order.
    pub fn records(&self) -> Vec<FilterRecord> {
        self.records.lock().clone()
    }

    /// Records concerning a single store, in collection order.
    pub fn records_for(&self, store_id: StoreId) -> Vec<FilterRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.store_id == store_id)
            .cloned()
            .collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing was rejected.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Number of rejections per status code.
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        let mut summary = BTreeMap::new();
        for record in self.records.lock().iter() {
            *summary.entry(record.status.code().as_str()).or_insert(0) += 1;
        }
        summary
    }

    /// Returns true if any record carries `code`.
    pub fn contains(&self, code: StatusCode) -> bool {
        self.records.lock().iter().any(|r| r.status.code() == code)
    }

    /// Drops all records.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(store_id: StoreId, code: StatusCode) -> FilterRecord {
        let status = Status::new(code);
        FilterRecord {
            action: Action::Target,
            scope: "test".to_string(),
            filter_type: FilterType::StorageThreshold,
            store_id,
            source_id: None,
            status,
            reason: status.to_string(),
        }
    }

    #[test]
    fn test_collect_and_query() {
        let collector = Collector::new();
        assert!(collector.is_empty());

        collector.collect(record(1, StatusCode::StoreLowSpace));
        collector.collect(record(2, StatusCode::StoreBusy));
        collector.collect(record(1, StatusCode::StoreBusy));

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.records_for(1).len(), 2);
        assert!(collector.contains(StatusCode::StoreLowSpace));
        assert!(!collector.contains(StatusCode::StoreDown));
    }

    #[test]
    fn test_summary_counts_by_status() {
        let collector = Collector::new();
        collector.collect(record(1, StatusCode::StoreBusy));
        collector.collect(record(2, StatusCode::StoreBusy));
        collector.collect(record(3, StatusCode::StoreDown));

        let summary = collector.summary();
        assert_eq!(summary.get("store-busy"), Some(&2));
        assert_eq!(summary.get("store-down"), Some(&1));
    }

    #[test]
    fn test_clear() {
        let collector = Collector::new();
        collector.collect(record(1, StatusCode::StoreBusy));
        collector.clear();
        assert!(collector.is_empty());
    }
}
