//! Store snapshots consumed by the filter engine.
//!
//! A [`StoreInfo`] is a read-only view of one storage node as last reported by
//! heartbeats. The heartbeat layer replaces snapshots wholesale; filters never
//! mutate them.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// Unique identifier for a storage node.
pub type StoreId = u64;

/// A store is considered disconnected once its last heartbeat is older than this.
pub const STORE_DISCONNECT_DURATION: Duration = Duration::from_secs(20);

/// Stores with fewer regions than this are still warming up a new cluster.
pub const INIT_CLUSTER_REGION_THRESHOLD: u64 = 100;

/// Free space below which a warming-up store may still be reported low on space.
pub const INITIAL_MIN_SPACE: u64 = 8 * 1024 * 1024 * 1024;

/// Tokens one region operation consumes from a store limit.
pub const REGION_INFLUENCE: f64 = 1000.0;

/// A single location or property label attached to a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreLabel {
    /// Label key, e.g. "zone".
    pub key: String,
    /// Label value, e.g. "us-east-1a".
    pub value: String,
}

impl StoreLabel {
    /// Creates a label from a key/value pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Lifecycle state of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StoreState {
    /// Normal operation.
    #[default]
    Serving,
    /// Being decommissioned; replicas are drained away.
    Removing,
    /// Tombstoned; never schedulable again.
    Removed,
}

/// Statistics carried by the latest store heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total capacity in bytes.
    pub capacity: u64,
    /// Available bytes.
    pub available: u64,
    /// Bytes used by region data.
    pub used_size: u64,
    /// Store reported itself as busy.
    pub is_busy: bool,
    /// Snapshots currently being sent.
    pub sending_snap_count: u32,
    /// Snapshots currently being received.
    pub receiving_snap_count: u32,
}

/// Kind of peer operation a store limit throttles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreLimitType {
    /// Adding a peer onto the store.
    AddPeer,
    /// Removing a peer from the store.
    RemovePeer,
}

/// Remaining operation budget of a store for one limit type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoreLimit {
    /// Refill rate in region operations per minute.
    pub rate_per_min: f64,
    /// Tokens currently available.
    pub available_tokens: f64,
}

impl StoreLimit {
    /// Returns true when at least one more region operation fits the budget.
    pub fn is_available(&self) -> bool {
        self.available_tokens >= REGION_INFLUENCE
    }
}

/// Snapshot of a storage node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreInfo {
    /// Store identifier.
    pub id: StoreId,
    /// Location and property labels.
    #[serde(default)]
    pub labels: Vec<StoreLabel>,
    /// Lifecycle state.
    #[serde(default)]
    pub state: StoreState,
    /// Time of the last heartbeat.
    #[serde(default = "SystemTime::now")]
    pub last_heartbeat: SystemTime,
    /// Heartbeat statistics, absent until the first full heartbeat.
    #[serde(default)]
    pub stats: Option<StoreStats>,
    /// Regions with a replica on the store.
    #[serde(default)]
    pub region_count: u64,
    /// Replicas still catching up on the store.
    #[serde(default)]
    pub pending_peer_count: u64,
    /// Leader transfers to and from the store are paused.
    #[serde(default)]
    pub pause_leader_transfer: bool,
    /// Leaders were evicted because the store is slow.
    #[serde(default)]
    pub evicted_as_slow: bool,
    /// Budget for adding peers; `None` is unlimited.
    #[serde(default)]
    pub add_peer_limit: Option<StoreLimit>,
    /// Budget for removing peers; `None` is unlimited.
    #[serde(default)]
    pub remove_peer_limit: Option<StoreLimit>,
}

impl StoreInfo {
    /// Creates a healthy, serving store that just sent a heartbeat.
    pub fn new(id: StoreId) -> Self {
        Self {
            id,
            labels: Vec::new(),
            state: StoreState::Serving,
            last_heartbeat: SystemTime::now(),
            stats: None,
            region_count: 0,
            pending_peer_count: 0,
            pause_leader_transfer: false,
            evicted_as_slow: false,
            add_peer_limit: None,
            remove_peer_limit: None,
        }
    }

    /// Replaces the labels.
    pub fn with_labels<K, V>(mut self, labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.labels = labels
            .into_iter()
            .map(|(k, v)| StoreLabel::new(k, v))
            .collect();
        self
    }

    /// Sets the lifecycle state.
    pub fn with_state(mut self, state: StoreState) -> Self {
        self.state = state;
        self
    }

    /// Backdates the last heartbeat so that [`down_time`](Self::down_time) is at least `down`.
    pub fn with_down_time(mut self, down: Duration) -> Self {
        self.last_heartbeat = SystemTime::now()
            .checked_sub(down)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        self
    }

    /// Attaches heartbeat statistics.
    pub fn with_stats(mut self, stats: StoreStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Sets the region count.
    pub fn with_region_count(mut self, count: u64) -> Self {
        self.region_count = count;
        self
    }

    /// Sets the pending peer count.
    pub fn with_pending_peer_count(mut self, count: u64) -> Self {
        self.pending_peer_count = count;
        self
    }

    /// Pauses or resumes leader transfer.
    pub fn with_pause_leader_transfer(mut self, paused: bool) -> Self {
        self.pause_leader_transfer = paused;
        self
    }

    /// Marks the store as evicted for slowness.
    pub fn with_evicted_as_slow(mut self, evicted: bool) -> Self {
        self.evicted_as_slow = evicted;
        self
    }

    /// Sets the budget for one limit type.
    pub fn with_limit(mut self, limit_type: StoreLimitType, limit: StoreLimit) -> Self {
        match limit_type {
            StoreLimitType::AddPeer => self.add_peer_limit = Some(limit),
            StoreLimitType::RemovePeer => self.remove_peer_limit = Some(limit),
        }
        self
    }

    /// Returns the value of the label with the given key, or "" when unset.
    /// Keys compare case-insensitively.
    pub fn label_value(&self, key: &str) -> &str {
        self.labels
            .iter()
            .find(|l| l.key.eq_ignore_ascii_case(key))
            .map(|l| l.value.as_str())
            .unwrap_or("")
    }

    /// Returns true if the store is tombstoned.
    pub fn is_removed(&self) -> bool {
        self.state == StoreState::Removed
    }

    /// Returns true if the store is being decommissioned.
    pub fn is_removing(&self) -> bool {
        self.state == StoreState::Removing
    }

    /// Time elapsed since the last heartbeat.
    pub fn down_time(&self) -> Duration {
        SystemTime::now()
            .duration_since(self.last_heartbeat)
            .unwrap_or_default()
    }

    /// Returns true after [`STORE_DISCONNECT_DURATION`] without a heartbeat.
    pub fn is_disconnected(&self) -> bool {
        self.down_time() > STORE_DISCONNECT_DURATION
    }

    /// Returns true if the last heartbeat reported the store busy.
    pub fn is_busy(&self) -> bool {
        self.stats.as_ref().is_some_and(|s| s.is_busy)
    }

    /// Returns false while leader transfer is paused.
    pub fn allow_leader_transfer(&self) -> bool {
        !self.pause_leader_transfer
    }

    /// Snapshots being sent; 0 without stats.
    pub fn sending_snap_count(&self) -> u64 {
        self.stats.as_ref().map_or(0, |s| s.sending_snap_count as u64)
    }

    /// Snapshots being received; 0 without stats.
    pub fn receiving_snap_count(&self) -> u64 {
        self.stats.as_ref().map_or(0, |s| s.receiving_snap_count as u64)
    }

    /// Fraction of capacity still free; 0 when capacity is unknown.
    pub fn available_ratio(&self) -> f64 {
        match &self.stats {
            Some(s) if s.capacity > 0 => s.available as f64 / s.capacity as f64,
            _ => 0.0,
        }
    }

    /// Returns true if the store is nearly out of space.
    ///
    /// Stores without heartbeat stats are never low on space. A store that
    /// still holds fewer than [`INIT_CLUSTER_REGION_THRESHOLD`] regions and has
    /// more than [`INITIAL_MIN_SPACE`] free is exempt while the cluster warms up.
    pub fn is_low_space(&self, low_space_ratio: f64) -> bool {
        let Some(stats) = &self.stats else {
            return false;
        };
        if self.region_count < INIT_CLUSTER_REGION_THRESHOLD && stats.available > INITIAL_MIN_SPACE {
            return false;
        }
        self.available_ratio() < 1.0 - low_space_ratio
    }

    /// Returns false only when a configured limit has run out of tokens.
    pub fn is_available(&self, limit_type: StoreLimitType) -> bool {
        let limit = match limit_type {
            StoreLimitType::AddPeer => self.add_peer_limit.as_ref(),
            StoreLimitType::RemovePeer => self.remove_peer_limit.as_ref(),
        };
        limit.map_or(true, StoreLimit::is_available)
    }

    /// Returns the first level in `labels` at which the two stores sit in
    /// different locations, or `None` when they share a location.
    ///
    /// An unset label on either side matches anything.
    pub fn compare_location(&self, other: &StoreInfo, labels: &[String]) -> Option<usize> {
        labels.iter().position(|key| {
            let v1 = self.label_value(key);
            let v2 = other.label_value(key);
            !v1.is_empty() && !v2.is_empty() && !v1.eq_ignore_ascii_case(v2)
        })
    }
}
