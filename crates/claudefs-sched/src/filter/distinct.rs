//! Location-label safeguard used when placement rules are disabled.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::counter::FilterType;
use super::status::{Status, StatusCode};
use super::Filter;
use crate::config::ScheduleOptions;
use crate::store::{StoreId, StoreInfo};
use crate::topology::distinct_score;

/// How a candidate's score must compare with the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationPolicy {
    /// The replacement must not be worse than the source.
    Safeguard,
    /// The replacement must be strictly better than the source.
    Improve,
}

/// Rejects targets that would lower (or, for [`LocationPolicy::Improve`],
/// fail to raise) the distinct score of the region's replicas.
#[derive(Debug, Clone)]
pub struct DistinctScoreFilter {
    scope: String,
    labels: Vec<String>,
    stores: Vec<Arc<StoreInfo>>,
    policy: LocationPolicy,
    safe_score: f64,
    src_store: StoreId,
}

impl DistinctScoreFilter {
    /// `stores` are the stores hosting the region; `source` is the replica
    /// being moved away. The baseline is computed once, here.
    pub fn new(
        scope: impl Into<String>,
        labels: Vec<String>,
        stores: &[Arc<StoreInfo>],
        source: &StoreInfo,
        policy: LocationPolicy,
    ) -> Self {
        let stores: Vec<_> = stores
            .iter()
            .filter(|s| s.id != source.id)
            .cloned()
            .collect();
        let safe_score = distinct_score(&labels, &stores, source);
        Self {
            scope: scope.into(),
            labels,
            stores,
            policy,
            safe_score,
            src_store: source.id,
        }
    }

    /// Baseline score of the source store.
    pub fn safe_score(&self) -> f64 {
        self.safe_score
    }
}

/// Filter admitting targets no worse than `source`.
pub fn location_safeguard(
    scope: impl Into<String>,
    labels: Vec<String>,
    stores: &[Arc<StoreInfo>],
    source: &StoreInfo,
) -> DistinctScoreFilter {
    DistinctScoreFilter::new(scope, labels, stores, source, LocationPolicy::Safeguard)
}

/// Filter admitting only targets strictly better than `source`.
pub fn location_improver(
    scope: impl Into<String>,
    labels: Vec<String>,
    stores: &[Arc<StoreInfo>],
    source: &StoreInfo,
) -> DistinctScoreFilter {
    DistinctScoreFilter::new(scope, labels, stores, source, LocationPolicy::Improve)
}

impl Filter for DistinctScoreFilter {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn filter_type(&self) -> FilterType {
        FilterType::DistinctScore
    }

    fn source(&self, _: &ScheduleOptions, _: &StoreInfo) -> Status {
        Status::OK
    }

    fn target(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        let score = distinct_score(&self.labels, &self.stores, store);
        let acceptable = match self.policy {
            LocationPolicy::Safeguard => score >= self.safe_score,
            LocationPolicy::Improve => score > self.safe_score,
        };
        if acceptable {
            Status::OK
        } else {
            StatusCode::StoreNotMatchIsolation.into()
        }
    }

    fn source_store_id(&self) -> Option<StoreId> {
        Some(self.src_store)
    }
}
