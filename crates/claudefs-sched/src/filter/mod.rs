//! Store filters for replica scheduling.
//!
//! A scheduler builds a chain of [`Filter`]s for one operation (transfer a
//! leader, move a replica, scatter a region) and hands it, together with the
//! candidate stores, to [`select_source_stores`], [`select_target_stores`] or
//! [`select_unavailable_target_stores`]. Filters are built per attempt and
//! only read store snapshots.

pub mod collector;
pub mod counter;
pub mod distinct;
pub mod isolation;
pub mod metrics;
pub mod predicate;
pub mod rule_fit;
pub mod select;
pub mod status;
pub mod store_state;

use crate::config::ScheduleOptions;
use crate::store::{StoreId, StoreInfo};

pub use collector::{Collector, FilterRecord};
pub use counter::{Action, Counter, FilterCounter, FilterType, NoopCounter};
pub use distinct::{location_improver, location_safeguard, DistinctScoreFilter, LocationPolicy};
pub use isolation::IsolationFilter;
pub use metrics::FilterMetrics;
pub use predicate::{EngineFilter, ExcludedFilter, LabelConstraintFilter, SpecialUseFilter, StorageThresholdFilter};
pub use rule_fit::{placement_leader_safeguard, placement_safeguard, RuleFitFilter, RuleLeaderFitFilter};
pub use select::{select_source_stores, select_target_stores, select_unavailable_target_stores, target};
pub use status::{Status, StatusCode};
pub use store_state::{Condition, Scenario, StoreStateFilter};

/// Decides whether a store may give up or receive a replica.
pub trait Filter: Send + Sync {
    /// Scheduler or checker the filter acts for, used in diagnostics.
    fn scope(&self) -> &str;

    /// Kind of rule this filter enforces.
    fn filter_type(&self) -> FilterType;

    /// Whether `store` may act as the source of the operation.
    fn source(&self, opts: &ScheduleOptions, store: &StoreInfo) -> Status;

    /// Whether `store` may act as the target of the operation.
    fn target(&self, opts: &ScheduleOptions, store: &StoreInfo) -> Status;

    /// Comparing filters judge targets relative to a source store and return
    /// its id here. Plain filters return `None`.
    fn source_store_id(&self) -> Option<StoreId> {
        None
    }
}
