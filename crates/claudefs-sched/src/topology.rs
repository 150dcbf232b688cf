//! Location-label scoring of replica placement.
//!
//! Used when placement rules are disabled: replicas should spread over as many
//! distinct values of the configured location labels as possible, with earlier
//! labels (e.g. zone) weighing more than later ones (e.g. host).

use std::sync::Arc;

use crate::store::StoreInfo;

/// Base of the per-level weight in [`distinct_score`].
pub const REPLICA_BASE_SCORE: f64 = 100.0;

/// Scores how well `other` is separated from `stores` over `labels`.
///
/// Every store that first differs from `other` at level `i` adds
/// `REPLICA_BASE_SCORE ^ (labels.len() - i - 1)`; a store at the same
/// location adds nothing. `other` itself is skipped if present in `stores`.
pub fn distinct_score(labels: &[String], stores: &[Arc<StoreInfo>], other: &StoreInfo) -> f64 {
    stores
        .iter()
        .filter(|s| s.id != other.id)
        .filter_map(|s| s.compare_location(other, labels))
        .map(|level| REPLICA_BASE_SCORE.powi((labels.len() - level - 1) as i32))
        .sum()
}

/// Collects the label values of `store` from the first label down to `level`
/// inclusive.
pub fn location_tuple(store: &StoreInfo, labels: &[String], level: usize) -> Vec<String> {
    labels
        .iter()
        .take(level + 1)
        .map(|key| store.label_value(key).to_string())
        .collect()
}
