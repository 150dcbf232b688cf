#![warn(missing_docs)]

//! ClaudeFS scheduler subsystem: store eligibility filters for replica placement
//!
//! This crate decides which stores may give up or receive a replica or a
//! leader during a scheduling attempt. Filters judge store snapshots against
//! operational health, capacity, explicit exclusions, label constraints,
//! location isolation and placement rules. Chains of filters are evaluated by
//! the selection functions in [`filter`], which report every rejection to an
//! optional collector and counter.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod filter;
pub mod placement;
pub mod region;
pub mod store;
pub mod topology;

pub use cluster::BasicCluster;
pub use config::{ScheduleOptions, REJECT_LEADER};
pub use error::{SchedError, SchedResult};
pub use filter::{
    select_source_stores, select_target_stores, select_unavailable_target_stores, Action, Collector, Counter,
    Filter, FilterCounter, FilterMetrics, FilterRecord, FilterType, Status, StatusCode,
};
pub use placement::{LabelConstraint, LabelConstraintOp, RegionFit, RuleManager};
pub use region::{Peer, PeerRole, RegionInfo};
pub use store::{StoreId, StoreInfo, StoreLabel, StoreLimit, StoreLimitType, StoreState, StoreStats};
pub use topology::distinct_score;
