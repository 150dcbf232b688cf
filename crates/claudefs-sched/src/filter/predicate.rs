//! Stateless predicate filters.

use std::collections::HashSet;

use super::counter::FilterType;
use super::status::{Status, StatusCode};
use super::Filter;
use crate::config::ScheduleOptions;
use crate::placement::{match_label_constraints, LabelConstraint, LabelConstraintOp, ALL_SPECIAL_USES, SPECIAL_USE_KEY};
use crate::store::{StoreId, StoreInfo};

/// Drops explicitly listed stores, with separate lists per direction.
#[derive(Debug, Clone)]
pub struct ExcludedFilter {
    scope: String,
    sources: HashSet<StoreId>,
    targets: HashSet<StoreId>,
}

impl ExcludedFilter {
    /// Excludes `sources` as sources and `targets` as targets.
    pub fn new(scope: impl Into<String>, sources: HashSet<StoreId>, targets: HashSet<StoreId>) -> Self {
        Self {
            scope: scope.into(),
            sources,
            targets,
        }
    }
}

impl Filter for ExcludedFilter {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Excluded
    }

    fn source(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        if self.sources.contains(&store.id) {
            return StatusCode::StoreAlreadyHasPeer.into();
        }
        Status::OK
    }

    fn target(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        if self.targets.contains(&store.id) {
            return StatusCode::StoreAlreadyHasPeer.into();
        }
        Status::OK
    }
}

/// Keeps nearly full stores from receiving replicas.
#[derive(Debug, Clone)]
pub struct StorageThresholdFilter {
    scope: String,
}

impl StorageThresholdFilter {
    /// Creates the filter for `scope`.
    pub fn new(scope: impl Into<String>) -> Self {
        Self { scope: scope.into() }
    }
}

impl Filter for StorageThresholdFilter {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn filter_type(&self) -> FilterType {
        FilterType::StorageThreshold
    }

    fn source(&self, _: &ScheduleOptions, _: &StoreInfo) -> Status {
        Status::OK
    }

    fn target(&self, opts: &ScheduleOptions, store: &StoreInfo) -> Status {
        if store.is_low_space(opts.low_space_ratio()) {
            return StatusCode::StoreLowSpace.into();
        }
        Status::OK
    }
}

/// Keeps only stores satisfying every label constraint, in both directions.
#[derive(Debug, Clone)]
pub struct LabelConstraintFilter {
    scope: String,
    constraints: Vec<LabelConstraint>,
}

impl LabelConstraintFilter {
    /// Admits stores matching every constraint.
    pub fn new(scope: impl Into<String>, constraints: Vec<LabelConstraint>) -> Self {
        Self {
            scope: scope.into(),
            constraints,
        }
    }

    fn check(&self, store: &StoreInfo) -> Status {
        if match_label_constraints(store, &self.constraints) {
            Status::OK
        } else {
            StatusCode::StoreNotMatchRule.into()
        }
    }
}

impl Filter for LabelConstraintFilter {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn filter_type(&self) -> FilterType {
        FilterType::LabelConstraint
    }

    fn source(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        self.check(store)
    }

    fn target(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        self.check(store)
    }
}

/// Keeps only stores running an approved storage engine.
#[derive(Debug, Clone)]
pub struct EngineFilter {
    scope: String,
    constraint: LabelConstraint,
}

impl EngineFilter {
    /// Admits stores whose engine label satisfies `constraint`.
    pub fn new(scope: impl Into<String>, constraint: LabelConstraint) -> Self {
        Self {
            scope: scope.into(),
            constraint,
        }
    }

    fn check(&self, store: &StoreInfo) -> Status {
        if self.constraint.match_store(store) {
            Status::OK
        } else {
            StatusCode::StoreNotMatchRule.into()
        }
    }
}

impl Filter for EngineFilter {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Engine
    }

    fn source(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        self.check(store)
    }

    fn target(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        self.check(store)
    }
}

/// Keeps special-use stores out of ordinary scheduling.
///
/// A special-use store may still act as a source once it runs low on space,
/// so it can shed replicas. Uses named in `allow_uses` are not treated as
/// special.
#[derive(Debug, Clone)]
pub struct SpecialUseFilter {
    scope: String,
    constraint: LabelConstraint,
}

impl SpecialUseFilter {
    /// Treats every special use except `allow_uses` as special.
    pub fn new(scope: impl Into<String>, allow_uses: &[&str]) -> Self {
        let values: Vec<&str> = ALL_SPECIAL_USES
            .iter()
            .copied()
            .filter(|v| !allow_uses.contains(v))
            .collect();
        Self {
            scope: scope.into(),
            constraint: LabelConstraint::new(SPECIAL_USE_KEY, LabelConstraintOp::In, values),
        }
    }
}

impl Filter for SpecialUseFilter {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn filter_type(&self) -> FilterType {
        FilterType::SpecialUse
    }

    fn source(&self, opts: &ScheduleOptions, store: &StoreInfo) -> Status {
        if store.is_low_space(opts.low_space_ratio()) || !self.constraint.match_store(store) {
            return Status::OK;
        }
        StatusCode::StoreNotMatchRule.into()
    }

    fn target(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        if !self.constraint.match_store(store) {
            return Status::OK;
        }
        StatusCode::StoreNotMatchRule.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::{not_special_engines, ENGINE_COLUMNAR, ENGINE_KEY, SPECIAL_USE_HOT_REGION, SPECIAL_USE_RESERVED};
    use crate::store::StoreStats;

    fn opts() -> ScheduleOptions {
        ScheduleOptions::default()
    }

    fn low_space_store(id: StoreId) -> StoreInfo {
        StoreInfo::new(id)
            .with_stats(StoreStats {
                capacity: 100,
                available: 5,
                ..Default::default()
            })
            .with_region_count(1000)
    }

    #[test]
    fn test_excluded_filter_directions_independent() {
        let f = ExcludedFilter::new("test", HashSet::from([1]), HashSet::from([2]));
        let s1 = StoreInfo::new(1);
        let s2 = StoreInfo::new(2);

        assert_eq!(f.source(&opts(), &s1).code(), StatusCode::StoreAlreadyHasPeer);
        assert!(f.target(&opts(), &s1).is_ok());
        assert!(f.source(&opts(), &s2).is_ok());
        assert_eq!(f.target(&opts(), &s2).code(), StatusCode::StoreAlreadyHasPeer);
        assert_eq!(f.filter_type(), FilterType::Excluded);
        assert_eq!(f.scope(), "test");
    }

    #[test]
    fn test_storage_threshold_filter() {
        let f = StorageThresholdFilter::new("test");
        let full = low_space_store(1);
        let empty = StoreInfo::new(2);

        assert!(f.source(&opts(), &full).is_ok());
        assert_eq!(f.target(&opts(), &full).code(), StatusCode::StoreLowSpace);
        assert!(f.target(&opts(), &empty).is_ok());
    }

    #[test]
    fn test_label_constraint_filter() {
        let f = LabelConstraintFilter::new(
            "test",
            vec![LabelConstraint::new("zone", LabelConstraintOp::In, ["z1"])],
        );
        let z1 = StoreInfo::new(1).with_labels([("zone", "z1")]);
        let z2 = StoreInfo::new(2).with_labels([("zone", "z2")]);

        assert!(f.source(&opts(), &z1).is_ok());
        assert!(f.target(&opts(), &z1).is_ok());
        assert_eq!(f.source(&opts(), &z2).code(), StatusCode::StoreNotMatchRule);
        assert_eq!(f.target(&opts(), &z2).code(), StatusCode::StoreNotMatchRule);
    }

    #[test]
    fn test_engine_filter() {
        let f = EngineFilter::new("test", not_special_engines());
        let row = StoreInfo::new(1);
        let columnar = StoreInfo::new(2).with_labels([(ENGINE_KEY, ENGINE_COLUMNAR)]);

        assert!(f.source(&opts(), &row).is_ok());
        assert!(f.target(&opts(), &row).is_ok());
        assert_eq!(f.source(&opts(), &columnar).code(), StatusCode::StoreNotMatchRule);
        assert_eq!(f.target(&opts(), &columnar).code(), StatusCode::StoreNotMatchRule);
    }

    #[test]
    fn test_special_use_filter_rejects_special_stores() {
        let f = SpecialUseFilter::new("test", &[]);
        let normal = StoreInfo::new(1);
        let hot = StoreInfo::new(2).with_labels([(SPECIAL_USE_KEY, SPECIAL_USE_HOT_REGION)]);

        assert!(f.source(&opts(), &normal).is_ok());
        assert!(f.target(&opts(), &normal).is_ok());
        assert_eq!(f.source(&opts(), &hot).code(), StatusCode::StoreNotMatchRule);
        assert_eq!(f.target(&opts(), &hot).code(), StatusCode::StoreNotMatchRule);
    }

    #[test]
    fn test_special_use_low_space_source_bypass() {
        let f = SpecialUseFilter::new("test", &[]);
        let reserved = low_space_store(3).with_labels([(SPECIAL_USE_KEY, SPECIAL_USE_RESERVED)]);

        assert!(f.source(&opts(), &reserved).is_ok());
        assert_eq!(f.target(&opts(), &reserved).code(), StatusCode::StoreNotMatchRule);
    }

    #[test]
    fn test_special_use_allowed_category() {
        let f = SpecialUseFilter::new("test", &[SPECIAL_USE_HOT_REGION]);
        let hot = StoreInfo::new(2).with_labels([(SPECIAL_USE_KEY, SPECIAL_USE_HOT_REGION)]);
        let reserved = StoreInfo::new(3).with_labels([(SPECIAL_USE_KEY, SPECIAL_USE_RESERVED)]);

        assert!(f.source(&opts(), &hot).is_ok());
        assert!(f.target(&opts(), &hot).is_ok());
        assert!(!f.target(&opts(), &reserved).is_ok());
    }
}
