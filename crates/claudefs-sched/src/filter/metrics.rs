//! Filter rejection metrics registry with Prometheus text export.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::counter::{Action, FilterType};
use crate::store::StoreId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct MetricKey {
    action: Action,
    scope: String,
    filter_type: FilterType,
    source_id: StoreId,
    target_id: StoreId,
}

/// Thread-safe registry of rejection totals, shared by every scheduler.
#[derive(Debug, Default)]
pub struct FilterMetrics {
    counters: DashMap<MetricKey, AtomicU64>,
}

impl FilterMetrics {
    /// Empty series set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the series identified by the labels.
    pub fn add(
        &self,
        action: Action,
        scope: &str,
        filter_type: FilterType,
        source_id: StoreId,
        target_id: StoreId,
        value: u64,
    ) {
        let key = MetricKey {
            action,
            scope: scope.to_string(),
            filter_type,
            source_id,
            target_id,
        };
        self.counters
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    /// Current value of one series; 0 if never added.
    pub fn get(
        &self,
        action: Action,
        scope: &str,
        filter_type: FilterType,
        source_id: StoreId,
        target_id: StoreId,
    ) -> u64 {
        let key = MetricKey {
            action,
            scope: scope.to_string(),
            filter_type,
            source_id,
            target_id,
        };
        self.counters
            .get(&key)
            .map(|v| v.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Number of distinct series.
    pub fn series_count(&self) -> usize {
        self.counters.len()
    }

    /// Renders every series in Prometheus text exposition format, sorted by label set.
    pub fn to_prometheus(&self) -> String {
        let mut series: Vec<(MetricKey, u64)> = self
            .counters
            .iter()
            .map(|e| (e.key().clone(), e.value().load(Ordering::Relaxed)))
            .collect();
        series.sort();

        let mut output = String::new();
        output.push_str("# HELP cfs_sched_filter_total Stores rejected by scheduler filters\n");
        output.push_str("# TYPE cfs_sched_filter_total counter\n");
        for (key, value) in series {
            output.push_str(&format!(
                "cfs_sched_filter_total{{action=\"{}\",scope=\"{}\",type=\"{}\",source=\"{}\",target=\"{}\"}} {}\n",
                key.action,
                escape_label_value(&key.scope),
                key.filter_type,
                store_label(key.source_id),
                store_label(key.target_id),
                value
            ));
        }
        output
    }
}

// Backslash, double quote and newline must be escaped inside label values.
fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

// Store id 0 means "no store" and renders as an empty label.
fn store_label(id: StoreId) -> String {
    if id == 0 {
        String::new()
    } else {
        id.to_string()
    }
}
