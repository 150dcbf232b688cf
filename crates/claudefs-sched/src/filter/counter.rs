//! Rejection counters.
//!
//! Counting is injected into the selection functions through
//! [`FilterCounter`]; nothing here influences which stores are selected.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::metrics::FilterMetrics;
use crate::store::StoreId;

/// Kind of rule a filter (or a store-state condition) enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilterType {
    /// Explicit store exclusion.
    Excluded,
    /// Low-space guard.
    StorageThreshold,
    /// Location-label distinct score.
    DistinctScore,
    /// Label constraint list.
    LabelConstraint,
    /// Placement-rule fit for a replica move.
    RuleFit,
    /// Placement-rule fit for a leader transfer.
    RuleLeader,
    /// Storage engine label.
    Engine,
    /// Special-use store guard.
    SpecialUse,
    /// Isolation level.
    Isolation,
    /// Store state filter as a whole.
    StoreStateOk,
    /// Store is removed.
    StoreStateTombstone,
    /// Store is down.
    StoreStateDown,
    /// Store is being removed.
    StoreStateOffline,
    /// Leader transfer is paused.
    StoreStatePauseLeader,
    /// Store was evicted as slow.
    StoreStateSlow,
    /// Store is disconnected.
    StoreStateDisconnected,
    /// Store is busy.
    StoreStateBusy,
    /// Remove-peer limit exhausted.
    StoreStateExceedRemoveLimit,
    /// Add-peer limit exhausted.
    StoreStateExceedAddLimit,
    /// Too many snapshots.
    StoreStateTooManySnapshot,
    /// Too many pending peers.
    StoreStateTooManyPendingPeer,
    /// Store carries the reject-leader label.
    StoreStateRejectLeader,
}

impl FilterType {
    /// Stable name used in metrics and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::Excluded => "exclude-filter",
            FilterType::StorageThreshold => "storage-threshold-filter",
            FilterType::DistinctScore => "distinct-filter",
            FilterType::LabelConstraint => "label-constraint-filter",
            FilterType::RuleFit => "rule-fit-filter",
            FilterType::RuleLeader => "rule-fit-leader-filter",
            FilterType::Engine => "engine-filter",
            FilterType::SpecialUse => "special-use-filter",
            FilterType::Isolation => "isolation-filter",
            FilterType::StoreStateOk => "store-state-ok-filter",
            FilterType::StoreStateTombstone => "store-state-tombstone-filter",
            FilterType::StoreStateDown => "store-state-down-filter",
            FilterType::StoreStateOffline => "store-state-offline-filter",
            FilterType::StoreStatePauseLeader => "store-state-pause-leader-filter",
            FilterType::StoreStateSlow => "store-state-slow-filter",
            FilterType::StoreStateDisconnected => "store-state-disconnect-filter",
            FilterType::StoreStateBusy => "store-state-busy-filter",
            FilterType::StoreStateExceedRemoveLimit => "store-state-exceed-remove-limit-filter",
            FilterType::StoreStateExceedAddLimit => "store-state-exceed-add-limit-filter",
            FilterType::StoreStateTooManySnapshot => "store-state-too-many-snapshots-filter",
            FilterType::StoreStateTooManyPendingPeer => "store-state-too-many-pending-peers-filter",
            FilterType::StoreStateRejectLeader => "store-state-reject-leader-filter",
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of a scheduling operation a store was evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Store giving up a replica or leader.
    Source,
    /// Store receiving a replica or leader.
    Target,
}

impl Action {
    /// Metric label value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Source => "filter-source",
            Action::Target => "filter-target",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink for rejection counts. `source_id` is 0 when no comparison store applies.
pub trait FilterCounter: Send + Sync {
    /// Records one rejection.
    fn inc(&self, action: Action, filter_type: FilterType, source_id: StoreId, target_id: StoreId);
}

/// Counter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCounter;

impl FilterCounter for NoopCounter {
    fn inc(&self, _: Action, _: FilterType, _: StoreId, _: StoreId) {}
}

type CounterKey = (Action, FilterType, StoreId, StoreId);

/// Per-scope rejection counts, flushed periodically into [`FilterMetrics`].
#[derive(Debug)]
pub struct Counter {
    scope: String,
    counts: Mutex<HashMap<CounterKey, u64>>,
}

impl Counter {
    /// Empty counter for `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Scheduler or checker owning this counter.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Count accumulated since the last flush for one key.
    pub fn get(&self, action: Action, filter_type: FilterType, source_id: StoreId, target_id: StoreId) -> u64 {
        self.counts
            .lock()
            .get(&(action, filter_type, source_id, target_id))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all counts accumulated since the last flush.
    pub fn total(&self) -> u64 {
        self.counts.lock().values().sum()
    }

    /// Moves every non-zero count into `metrics` under this counter's scope
    /// and resets the counter.
    pub fn flush(&self, metrics: &FilterMetrics) {
        let drained: Vec<_> = self.counts.lock().drain().collect();
        for ((action, filter_type, source_id, target_id), value) in drained {
            if value > 0 {
                metrics.add(action, &self.scope, filter_type, source_id, target_id, value);
            }
        }
    }
}

impl FilterCounter for Counter {
    fn inc(&self, action: Action, filter_type: FilterType, source_id: StoreId, target_id: StoreId) {
        *self
            .counts
            .lock()
            .entry((action, filter_type, source_id, target_id))
            .or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_filter_type_names() {
        assert_eq!(FilterType::Excluded.as_str(), "exclude-filter");
        assert_eq!(FilterType::RuleLeader.to_string(), "rule-fit-leader-filter");
        assert_eq!(
            FilterType::StoreStateTooManyPendingPeer.as_str(),
            "store-state-too-many-pending-peers-filter"
        );
    }

    #[test]
    fn test_counter_inc_and_get() {
        let counter = Counter::new("balance-region");
        counter.inc(Action::Source, FilterType::StoreStateBusy, 1, 0);
        counter.inc(Action::Source, FilterType::StoreStateBusy, 1, 0);
        counter.inc(Action::Target, FilterType::DistinctScore, 1, 4);

        assert_eq!(counter.get(Action::Source, FilterType::StoreStateBusy, 1, 0), 2);
        assert_eq!(counter.get(Action::Target, FilterType::DistinctScore, 1, 4), 1);
        assert_eq!(counter.get(Action::Target, FilterType::DistinctScore, 4, 1), 0);
        assert_eq!(counter.total(), 3);
    }

    #[test]
    fn test_counter_flush_resets() {
        let counter = Counter::new("balance-leader");
        let metrics = FilterMetrics::new();
        counter.inc(Action::Target, FilterType::RuleFit, 2, 5);
        counter.inc(Action::Target, FilterType::RuleFit, 2, 5);

        counter.flush(&metrics);
        assert_eq!(counter.total(), 0);
        assert_eq!(metrics.get(Action::Target, "balance-leader", FilterType::RuleFit, 2, 5), 2);

        counter.inc(Action::Target, FilterType::RuleFit, 2, 5);
        counter.flush(&metrics);
        assert_eq!(metrics.get(Action::Target, "balance-leader", FilterType::RuleFit, 2, 5), 3);
    }

    #[test]
    fn test_counter_concurrent_inc() {
        let counter = Arc::new(Counter::new("scatter"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..100 {
                        counter.inc(Action::Target, FilterType::Isolation, 0, 7);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(counter.get(Action::Target, FilterType::Isolation, 0, 7), 800);
    }

    #[test]
    fn test_noop_counter() {
        let counter = NoopCounter;
        counter.inc(Action::Source, FilterType::Excluded, 1, 0);
    }
}
