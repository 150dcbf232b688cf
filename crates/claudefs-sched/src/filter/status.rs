//! Outcome of a single filter evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::counter::FilterType;

/// Why a store was admitted or rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// The store is acceptable.
    Ok,
    /// The store is tombstoned.
    StoreRemoved,
    /// The store is being decommissioned.
    StoreRemoving,
    /// The store has been silent longer than the max down time.
    StoreDown,
    /// The store missed recent heartbeats.
    StoreDisconnected,
    /// The store reported itself busy.
    StoreBusy,
    /// The store does not accept leaders.
    StoreRejectLeader,
    /// The add-peer limit is exhausted.
    StoreAddLimit,
    /// The remove-peer limit is exhausted.
    StoreRemoveLimit,
    /// Too many snapshots in flight.
    StoreSnapshotThrottled,
    /// Too many pending peers.
    StorePendingPeerThrottled,
    /// The store is explicitly excluded.
    StoreAlreadyHasPeer,
    /// The store is nearly out of space.
    StoreLowSpace,
    /// The store breaks a placement or label rule.
    StoreNotMatchRule,
    /// The store breaks location isolation.
    StoreNotMatchIsolation,
}

impl StatusCode {
    /// Stable kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "ok",
            StatusCode::StoreRemoved => "store-removed",
            StatusCode::StoreRemoving => "store-removing",
            StatusCode::StoreDown => "store-down",
            StatusCode::StoreDisconnected => "store-disconnected",
            StatusCode::StoreBusy => "store-busy",
            StatusCode::StoreRejectLeader => "store-reject-leader",
            StatusCode::StoreAddLimit => "store-add-limit",
            StatusCode::StoreRemoveLimit => "store-remove-limit",
            StatusCode::StoreSnapshotThrottled => "store-snapshot-throttled",
            StatusCode::StorePendingPeerThrottled => "store-pending-peer-throttled",
            StatusCode::StoreAlreadyHasPeer => "store-already-has-peer",
            StatusCode::StoreLowSpace => "store-low-space",
            StatusCode::StoreNotMatchRule => "store-not-match-rule",
            StatusCode::StoreNotMatchIsolation => "store-not-match-isolation",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating one filter against one store.
///
/// Store-state rejections also carry the condition that fired, so the caller
/// can attribute the rejection without reading mutable filter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Status {
    code: StatusCode,
    reason: Option<FilterType>,
}

impl Status {
    /// Acceptance.
    pub const OK: Status = Status::new(StatusCode::Ok);

    /// Status with no attached reason.
    pub const fn new(code: StatusCode) -> Self {
        Self { code, reason: None }
    }

    /// Attaches the precise condition that produced this status.
    pub const fn with_reason(self, reason: FilterType) -> Self {
        Self {
            code: self.code,
            reason: Some(reason),
        }
    }

    /// Returns true if the store was admitted.
    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok
    }

    /// Rejection kind.
    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// Condition that produced the rejection, when known.
    pub fn reason(&self) -> Option<FilterType> {
        self.reason
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::OK
    }
}

impl From<StatusCode> for Status {
    fn from(code: StatusCode) -> Self {
        Status::new(code)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            Some(reason) => write!(f, "{} ({})", self.code, reason),
            None => write!(f, "{}", self.code),
        }
    }
}
