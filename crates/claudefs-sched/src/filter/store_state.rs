//! Operational-health filter driven by a condition table.
//!
//! Condition     Down Offline Tomb Pause Slow Disconn Busy RmLimit AddLimit Snap Pending Reject
//! IsTemporary   N    N       N    N     N    Y       Y    Y       Y        Y    Y       N
//!
//! LeaderSource  X            X    X          X
//! RegionSource                                       X    X                X
//! LeaderTarget  X    X       X    X     X    X       X                                  X
//! RegionTarget  X    X       X               X       X            X        X    X
//! ScatterTarget X    X       X               X       X
//!
//! X: when the condition holds the store cannot be selected. Temporary
//! conditions are expected to clear on their own and are skipped when the
//! filter allows temporary states.

use serde::{Deserialize, Serialize};

use super::counter::FilterType;
use super::status::{Status, StatusCode};
use super::Filter;
use crate::config::{ScheduleOptions, REJECT_LEADER};
use crate::store::{StoreInfo, StoreLimitType};

/// One health predicate over a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    /// Store is tombstoned.
    IsRemoved,
    /// Store has been silent longer than the max down time.
    IsDown,
    /// Store is being decommissioned.
    IsRemoving,
    /// Leader transfer is paused on the store.
    PauseLeaderTransfer,
    /// Store was evicted as slow.
    SlowStoreEvicted,
    /// Store matches the reject-leader label property.
    HasRejectLeaderProperty,
    /// Store missed recent heartbeats.
    IsDisconnected,
    /// Store reported itself busy.
    IsBusy,
    /// Remove-peer limit exhausted.
    ExceedRemoveLimit,
    /// Add-peer limit exhausted.
    ExceedAddLimit,
    /// Sending or receiving snapshots above the limit.
    TooManySnapshots,
    /// Pending peers above the limit.
    TooManyPendingPeers,
}

impl Condition {
    /// Temporary conditions represent transient states expected to self-resolve.
    pub fn is_temporary(&self) -> bool {
        matches!(
            self,
            Condition::IsDisconnected
                | Condition::IsBusy
                | Condition::ExceedRemoveLimit
                | Condition::ExceedAddLimit
                | Condition::TooManySnapshots
                | Condition::TooManyPendingPeers
        )
    }

    /// Evaluates the condition. A rejection carries the matching store-state reason.
    pub fn check(&self, opts: &ScheduleOptions, store: &StoreInfo) -> Status {
        let rejected = match self {
            Condition::IsRemoved => store.is_removed(),
            Condition::IsDown => store.down_time() > opts.max_store_down_time(),
            Condition::IsRemoving => store.is_removing(),
            Condition::PauseLeaderTransfer => !store.allow_leader_transfer(),
            Condition::SlowStoreEvicted => store.evicted_as_slow,
            Condition::HasRejectLeaderProperty => opts.check_label_property(REJECT_LEADER, &store.labels),
            Condition::IsDisconnected => store.is_disconnected(),
            Condition::IsBusy => store.is_busy(),
            Condition::ExceedRemoveLimit => !store.is_available(StoreLimitType::RemovePeer),
            Condition::ExceedAddLimit => !store.is_available(StoreLimitType::AddPeer),
            Condition::TooManySnapshots => {
                store.sending_snap_count() > opts.max_snapshot_count()
                    || store.receiving_snap_count() > opts.max_snapshot_count()
            }
            Condition::TooManyPendingPeers => {
                opts.max_pending_peer_count() > 0 && store.pending_peer_count > opts.max_pending_peer_count()
            }
        };
        if rejected {
            Status::new(self.status_code()).with_reason(self.reason())
        } else {
            Status::OK
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Condition::IsRemoved => StatusCode::StoreRemoved,
            Condition::IsDown => StatusCode::StoreDown,
            Condition::IsRemoving => StatusCode::StoreRemoving,
            Condition::PauseLeaderTransfer
            | Condition::SlowStoreEvicted
            | Condition::HasRejectLeaderProperty => StatusCode::StoreRejectLeader,
            Condition::IsDisconnected => StatusCode::StoreDisconnected,
            Condition::IsBusy => StatusCode::StoreBusy,
            Condition::ExceedRemoveLimit => StatusCode::StoreRemoveLimit,
            Condition::ExceedAddLimit => StatusCode::StoreAddLimit,
            Condition::TooManySnapshots => StatusCode::StoreSnapshotThrottled,
            Condition::TooManyPendingPeers => StatusCode::StorePendingPeerThrottled,
        }
    }

    /// Store-state filter type reported when this condition rejects a store.
    pub fn reason(&self) -> FilterType {
        match self {
            Condition::IsRemoved => FilterType::StoreStateTombstone,
            Condition::IsDown => FilterType::StoreStateDown,
            Condition::IsRemoving => FilterType::StoreStateOffline,
            Condition::PauseLeaderTransfer => FilterType::StoreStatePauseLeader,
            Condition::SlowStoreEvicted => FilterType::StoreStateSlow,
            Condition::HasRejectLeaderProperty => FilterType::StoreStateRejectLeader,
            Condition::IsDisconnected => FilterType::StoreStateDisconnected,
            Condition::IsBusy => FilterType::StoreStateBusy,
            Condition::ExceedRemoveLimit => FilterType::StoreStateExceedRemoveLimit,
            Condition::ExceedAddLimit => FilterType::StoreStateExceedAddLimit,
            Condition::TooManySnapshots => FilterType::StoreStateTooManySnapshot,
            Condition::TooManyPendingPeers => FilterType::StoreStateTooManyPendingPeer,
        }
    }
}

/// Usage scenario selecting a row of the condition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scenario {
    /// Store giving up a leader.
    LeaderSource,
    /// Store giving up a replica.
    RegionSource,
    /// Store receiving a leader.
    LeaderTarget,
    /// Store receiving a replica.
    RegionTarget,
    /// Store receiving a replica during a scatter.
    ScatterRegionTarget,
}

impl Scenario {
    /// Conditions checked for this scenario, in evaluation order.
    pub fn conditions(&self) -> &'static [Condition] {
        use Condition::*;
        match self {
            Scenario::LeaderSource => &[IsRemoved, IsDown, PauseLeaderTransfer, IsDisconnected],
            Scenario::RegionSource => &[IsBusy, ExceedRemoveLimit, TooManySnapshots],
            Scenario::LeaderTarget => &[
                IsRemoved,
                IsRemoving,
                IsDown,
                PauseLeaderTransfer,
                SlowStoreEvicted,
                IsDisconnected,
                IsBusy,
                HasRejectLeaderProperty,
            ],
            Scenario::RegionTarget => &[
                IsRemoved,
                IsRemoving,
                IsDown,
                IsDisconnected,
                IsBusy,
                ExceedAddLimit,
                TooManySnapshots,
                TooManyPendingPeers,
            ],
            Scenario::ScatterRegionTarget => &[IsRemoved, IsRemoving, IsDown, IsDisconnected, IsBusy],
        }
    }
}

/// Decides whether a store is healthy enough to act as source or target.
///
/// With no scenario switch set, both directions admit every store.
#[derive(Debug, Clone, Default)]
pub struct StoreStateFilter {
    /// Scheduler or checker the filter acts for.
    pub action_scope: String,
    /// The schedule involves a leader transfer.
    pub transfer_leader: bool,
    /// The schedule involves moving a region replica.
    pub move_region: bool,
    /// The move is part of a scatter.
    pub scatter_region: bool,
    /// Skip temporary conditions.
    pub allow_temporary_states: bool,
}

impl StoreStateFilter {
    /// Runs the conditions of `scenario` in order and returns the first rejection.
    pub fn any_condition_match(&self, scenario: Scenario, opts: &ScheduleOptions, store: &StoreInfo) -> Status {
        scenario
            .conditions()
            .iter()
            .filter(|c| !(self.allow_temporary_states && c.is_temporary()))
            .map(|c| c.check(opts, store))
            .find(|status| !status.is_ok())
            .unwrap_or(Status::OK)
    }
}

impl Filter for StoreStateFilter {
    fn scope(&self) -> &str {
        &self.action_scope
    }

    fn filter_type(&self) -> FilterType {
        FilterType::StoreStateOk
    }

    fn source(&self, opts: &ScheduleOptions, store: &StoreInfo) -> Status {
        if self.transfer_leader {
            let status = self.any_condition_match(Scenario::LeaderSource, opts, store);
            if !status.is_ok() {
                return status;
            }
        }
        if self.move_region {
            let status = self.any_condition_match(Scenario::RegionSource, opts, store);
            if !status.is_ok() {
                return status;
            }
        }
        Status::OK
    }

    fn target(&self, opts: &ScheduleOptions, store: &StoreInfo) -> Status {
        if self.transfer_leader {
            let status = self.any_condition_match(Scenario::LeaderTarget, opts, store);
            if !status.is_ok() {
                return status;
            }
        }
        if self.move_region {
            let scenario = if self.scatter_region {
                Scenario::ScatterRegionTarget
            } else {
                Scenario::RegionTarget
            };
            let status = self.any_condition_match(scenario, opts, store);
            if !status.is_ok() {
                return status;
            }
        }
        Status::OK
    }
}
