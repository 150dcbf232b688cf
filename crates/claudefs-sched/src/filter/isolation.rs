//! Isolation-level filter.
//!
//! A region with replicas in zones z1, z2 and z3 that loses the z1 replica
//! must place the new one in z1 or a fresh zone when isolated at zone level:
//! z2 and z3 already host a replica.

use std::sync::Arc;

use tracing::warn;

use super::counter::FilterType;
use super::status::{Status, StatusCode};
use super::Filter;
use crate::config::ScheduleOptions;
use crate::store::StoreInfo;
use crate::topology::location_tuple;

/// Rejects targets sharing a topology unit, at or above the isolation level,
/// with any existing replica.
#[derive(Debug, Clone)]
pub struct IsolationFilter {
    scope: String,
    location_labels: Vec<String>,
    constraint_set: Vec<Vec<String>>,
}

impl IsolationFilter {
    /// Records the location tuple of every store in `region_stores`, from the
    /// most significant label down to `isolation_level`.
    ///
    /// An `isolation_level` missing from `location_labels` falls back to the
    /// first label.
    pub fn new(
        scope: impl Into<String>,
        isolation_level: &str,
        location_labels: Vec<String>,
        region_stores: &[Arc<StoreInfo>],
    ) -> Self {
        let level = location_labels
            .iter()
            .position(|l| l == isolation_level)
            .unwrap_or_else(|| {
                warn!(
                    "Isolation level {:?} not in location labels {:?}, using first label",
                    isolation_level, location_labels
                );
                0
            });
        let constraint_set = if location_labels.is_empty() {
            Vec::new()
        } else {
            region_stores
                .iter()
                .map(|s| location_tuple(s, &location_labels, level))
                .collect()
        };
        Self {
            scope: scope.into(),
            location_labels,
            constraint_set,
        }
    }
}

impl Filter for IsolationFilter {
    fn scope(&self) -> &str {
        &self.scope
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Isolation
    }

    fn source(&self, _: &ScheduleOptions, _: &StoreInfo) -> Status {
        Status::OK
    }

    fn target(&self, _: &ScheduleOptions, store: &StoreInfo) -> Status {
        // Nothing recorded means isolation cannot be verified.
        if self.constraint_set.is_empty() {
            return StatusCode::StoreNotMatchIsolation.into();
        }
        let shares_unit = self.constraint_set.iter().any(|constraints| {
            !constraints.is_empty()
                && constraints
                    .iter()
                    .zip(&self.location_labels)
                    .all(|(value, key)| store.label_value(key) == value.as_str())
        });
        if shares_unit {
            return StatusCode::StoreNotMatchIsolation.into();
        }
        Status::OK
    }
}
