//! Placement-rule collaborator surface.
//!
//! Computing whether a region satisfies its placement rules happens outside
//! this crate. Filters only need label-constraint matching and the
//! [`RegionFit::replace`] query exposed by a [`RuleManager`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cluster::BasicCluster;
use crate::region::RegionInfo;
use crate::store::{StoreId, StoreInfo};

/// Label marking a store reserved for a special purpose.
pub const SPECIAL_USE_KEY: &str = "specialUse";
/// Special-use value for stores dedicated to hot regions.
pub const SPECIAL_USE_HOT_REGION: &str = "hotRegion";
/// Special-use value for reserved capacity.
pub const SPECIAL_USE_RESERVED: &str = "reserved";
/// Every known special-use value.
pub const ALL_SPECIAL_USES: [&str; 2] = [SPECIAL_USE_HOT_REGION, SPECIAL_USE_RESERVED];

/// Label naming the storage engine of a store.
pub const ENGINE_KEY: &str = "engine";
/// Column-store engine; its stores only take replicas through explicit rules.
pub const ENGINE_COLUMNAR: &str = "columnar";
/// Engines excluded from ordinary row-replica scheduling.
pub const ALL_SPECIAL_ENGINES: [&str; 1] = [ENGINE_COLUMNAR];

/// Comparison applied by a [`LabelConstraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LabelConstraintOp {
    /// The label is set and its value is one of `values`.
    In,
    /// The label is unset or its value is none of `values`.
    NotIn,
    /// The label is set.
    Exists,
    /// The label is unset.
    NotExists,
}

/// A predicate over one store label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelConstraint {
    /// Label key.
    pub key: String,
    /// Comparison applied to the value.
    pub op: LabelConstraintOp,
    /// Values compared against; unused by the existence ops.
    #[serde(default)]
    pub values: Vec<String>,
}

impl LabelConstraint {
    /// Builds a constraint from any string-like values.
    pub fn new<V: Into<String>>(key: impl Into<String>, op: LabelConstraintOp, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            key: key.into(),
            op,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if `store` satisfies this constraint.
    pub fn match_store(&self, store: &StoreInfo) -> bool {
        let label = store.label_value(&self.key);
        let listed = || self.values.iter().any(|v| v == label);
        match self.op {
            LabelConstraintOp::In => !label.is_empty() && listed(),
            LabelConstraintOp::NotIn => label.is_empty() || !listed(),
            LabelConstraintOp::Exists => !label.is_empty(),
            LabelConstraintOp::NotExists => label.is_empty(),
        }
    }
}

/// Returns true if `store` satisfies every constraint in the list.
pub fn match_label_constraints(store: &StoreInfo, constraints: &[LabelConstraint]) -> bool {
    constraints.iter().all(|c| c.match_store(store))
}

/// Constraint admitting only stores that do not run a special engine.
pub fn not_special_engines() -> LabelConstraint {
    LabelConstraint::new(ENGINE_KEY, LabelConstraintOp::NotIn, ALL_SPECIAL_ENGINES)
}

/// Fit of a region's current peers against the placement rules.
///
/// Implementations must be pure: `replace` answers a hypothetical and never
/// mutates the fit or the region.
pub trait RegionFit: Send + Sync + fmt::Debug {
    /// Would the region still satisfy its rules if the replica on
    /// `src_store_id` were placed on `dst` instead?
    fn replace(&self, src_store_id: StoreId, dst: &StoreInfo, region: &RegionInfo) -> bool;
}

/// Computes region fits against the active placement rules.
pub trait RuleManager: Send + Sync {
    /// Fits `region` against the rules using the store snapshots in `cluster`.
    fn fit_region(&self, cluster: &BasicCluster, region: &RegionInfo) -> Arc<dyn RegionFit>;
}
