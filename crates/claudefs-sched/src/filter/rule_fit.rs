//! Placement-rule safeguards.
//!
//! These are the rule-aware counterparts of [`DistinctScoreFilter`]: a target
//! is acceptable only if swapping it in for the source keeps the region's
//! placement-rule fit intact. The fit is computed once when the filter is
//! built and every query runs against that same baseline.

use std::sync::Arc;

use tracing::warn;

use super::counter::FilterType;
use super::distinct::{location_safeguard, DistinctScoreFilter};
use super::status::{Status, StatusCode};
use super::Filter;
use crate::cluster::BasicCluster;
use crate::config::ScheduleOptions;
use crate::placement::{RegionFit, RuleManager};
use crate::region::RegionInfo;
use crate::store::{StoreId, StoreInfo};

/// Rejects targets that would break the region's rule fit when replacing the
/// peer on the source store.
///
/// For region [1, 2, 3], moving the peer on 1 to 2 is rejected because the
/// peer count would no longer match the rule.
#[derive(Debug, Clone)]
pub struct RuleFitFilter {
    scope: String,
    region: Arc<RegionInfo>,
    old_fit: Arc<dyn RegionFit>,
    src_store: StoreId,
}

impl RuleFitFilter {
    /// Uses `old_fit` as the baseline when given, otherwise fits the region now.
    pub fn new(
        scope: impl Into<String>,
        cluster: &BasicCluster,
        rule_manager: &dyn RuleManager,
        region: Arc<RegionInfo>,
        old_fit: Option<Arc<dyn RegionFit>>,
        src_store: StoreId,
    ) -> Self {
        let old_fit = old_fit.unwrap_or_else(|| rule_manager.fit_region(cluster, &region));
        Self {
            scope: scope.into(),
            region,
            old_fit,
            src_store,
        }
    }
}

impl Filter for RuleFitFilter {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn filter_type(&self) -> FilterType {
        FilterType::RuleFit
    }

    fn source(&self, _: &ScheduleOptions, _: &StoreInfo) -> Status {
        Status::OK
    }

    fn target(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        if self.old_fit.replace(self.src_store, store, &self.region) {
            Status::OK
        } else {
            StatusCode::StoreNotMatchRule.into()
        }
    }

    fn source_store_id(&self) -> Option<StoreId> {
        Some(self.src_store)
    }
}

/// Rejects leader-transfer targets that would break the region's rule fit.
///
/// Unless `allow_move_leader` is set, the target must already hold a peer of
/// the region.
#[derive(Debug, Clone)]
pub struct RuleLeaderFitFilter {
    scope: String,
    region: Arc<RegionInfo>,
    old_fit: Arc<dyn RegionFit>,
    src_leader_store: StoreId,
    allow_move_leader: bool,
}

impl RuleLeaderFitFilter {
    /// Fits the region now; that fit is the baseline for every query.
    pub fn new(
        scope: impl Into<String>,
        cluster: &BasicCluster,
        rule_manager: &dyn RuleManager,
        region: Arc<RegionInfo>,
        src_leader_store: StoreId,
        allow_move_leader: bool,
    ) -> Self {
        let old_fit = rule_manager.fit_region(cluster, &region);
        Self {
            scope: scope.into(),
            region,
            old_fit,
            src_leader_store,
            allow_move_leader,
        }
    }
}

impl Filter for RuleLeaderFitFilter {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn filter_type(&self) -> FilterType {
        FilterType::RuleLeader
    }

    fn source(&self, _: &ScheduleOptions, _: &StoreInfo) -> Status {
        Status::OK
    }

    fn target(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        if self.region.store_peer(store.id).is_none() && !self.allow_move_leader {
            warn!(
                "Rule leader fit filter found no peer of region {} on target store {}",
                self.region.id, store.id
            );
            return StatusCode::StoreNotMatchRule.into();
        }
        if self.old_fit.replace(self.src_leader_store, store, &self.region) {
            Status::OK
        } else {
            StatusCode::StoreNotMatchRule.into()
        }
    }

    fn source_store_id(&self) -> Option<StoreId> {
        Some(self.src_leader_store)
    }
}

/// Filter ensuring that replacing the peer on `source_store` does not make
/// placement worse: rule fit when placement rules are enabled, location-label
/// distinct score otherwise.
pub fn placement_safeguard(
    scope: impl Into<String>,
    opts: &ScheduleOptions,
    cluster: &BasicCluster,
    rule_manager: &dyn RuleManager,
    region: Arc<RegionInfo>,
    source_store: &StoreInfo,
    old_fit: Option<Arc<dyn RegionFit>>,
) -> Box<dyn Filter> {
    if opts.is_placement_rules_enabled() {
        return Box::new(RuleFitFilter::new(
            scope,
            cluster,
            rule_manager,
            region,
            old_fit,
            source_store.id,
        ));
    }
    let region_stores = cluster.get_region_stores(&region);
    let filter: DistinctScoreFilter =
        location_safeguard(scope, opts.location_labels().to_vec(), &region_stores, source_store);
    Box::new(filter)
}

/// Filter ensuring a leader transfer away from `source_store` keeps the rule
/// fit. Without placement rules there is nothing to check and `None` is returned.
pub fn placement_leader_safeguard(
    scope: impl Into<String>,
    opts: &ScheduleOptions,
    cluster: &BasicCluster,
    rule_manager: &dyn RuleManager,
    region: Arc<RegionInfo>,
    source_store: &StoreInfo,
    allow_move_leader: bool,
) -> Option<Box<dyn Filter>> {
    if !opts.is_placement_rules_enabled() {
        return None;
    }
    Some(Box::new(RuleLeaderFitFilter::new(
        scope,
        cluster,
        rule_manager,
        region,
        source_store.id,
        allow_move_leader,
    )))
}
