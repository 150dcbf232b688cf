//! Region snapshots: a key range and the peers replicating it.

use serde::{Deserialize, Serialize};

use crate::store::StoreId;

/// Replica role of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PeerRole {
    /// Votes in the region's consensus group.
    #[default]
    Voter,
    /// Receives the log but does not vote.
    Learner,
}

/// One replica of a region, hosted on a store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    /// Peer identifier, unique within the cluster.
    pub id: u64,
    /// Store hosting this replica.
    pub store_id: StoreId,
    /// Replica role.
    #[serde(default)]
    pub role: PeerRole,
}

impl Peer {
    /// Creates a voter peer.
    pub fn new(id: u64, store_id: StoreId) -> Self {
        Self {
            id,
            store_id,
            role: PeerRole::Voter,
        }
    }

    /// Creates a learner peer.
    pub fn learner(id: u64, store_id: StoreId) -> Self {
        Self {
            id,
            store_id,
            role: PeerRole::Learner,
        }
    }
}

/// Snapshot of a region: the relocatable unit of data placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionInfo {
    /// Region identifier.
    pub id: u64,
    /// Inclusive start of the key range.
    pub start_key: Vec<u8>,
    /// Exclusive end of the key range; empty means unbounded.
    pub end_key: Vec<u8>,
    /// Replicas of the region.
    pub peers: Vec<Peer>,
    /// Peer currently leading the region, if elected.
    pub leader: Option<Peer>,
}

impl RegionInfo {
    /// Creates a region snapshot.
    pub fn new(id: u64, start_key: Vec<u8>, end_key: Vec<u8>, peers: Vec<Peer>, leader: Option<Peer>) -> Self {
        Self {
            id,
            start_key,
            end_key,
            peers,
            leader,
        }
    }

    /// Returns the peer hosted on `store_id`, if any.
    pub fn store_peer(&self, store_id: StoreId) -> Option<&Peer> {
        self.peers.iter().find(|p| p.store_id == store_id)
    }

    /// Store ids of all peers, in peer order.
    pub fn store_ids(&self) -> Vec<StoreId> {
        self.peers.iter().map(|p| p.store_id).collect()
    }

    /// Store hosting the leader, if any.
    pub fn leader_store_id(&self) -> Option<StoreId> {
        self.leader.as_ref().map(|l| l.store_id)
    }

    /// Builds an independent copy of the key range, peers and leader for
    /// probing placement fit. The copy shares nothing with `self`.
    pub fn clone_for_rule_fit(&self) -> RegionInfo {
        let peers = self
            .peers
            .iter()
            .map(|p| Peer {
                id: p.id,
                store_id: p.store_id,
                role: p.role,
            })
            .collect();
        RegionInfo {
            id: self.id,
            start_key: self.start_key.clone(),
            end_key: self.end_key.clone(),
            peers,
            leader: self.leader.clone(),
        }
    }

    /// Hypothetical copy in which the replica on `old` now lives on `new`.
    /// The leader follows its peer.
    pub fn with_store_replaced(&self, old: StoreId, new: StoreId) -> RegionInfo {
        let mut region = self.clone_for_rule_fit();
        for peer in region.peers.iter_mut().filter(|p| p.store_id == old) {
            peer.store_id = new;
        }
        if let Some(leader) = region.leader.as_mut().filter(|l| l.store_id == old) {
            leader.store_id = new;
        }
        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_123() -> RegionInfo {
        let peers = vec![Peer::new(11, 1), Peer::new(12, 2), Peer::learner(13, 3)];
        let leader = Some(peers[0].clone());
        RegionInfo::new(100, b"a".to_vec(), b"z".to_vec(), peers, leader)
    }

    #[test]
    fn test_store_peer_lookup() {
        let region = region_123();
        assert_eq!(region.store_peer(2).map(|p| p.id), Some(12));
        assert!(region.store_peer(4).is_none());
        assert_eq!(region.store_ids(), vec![1, 2, 3]);
        assert_eq!(region.leader_store_id(), Some(1));
    }

    #[test]
    fn test_clone_for_rule_fit_is_identical() {
        let region = region_123();
        let clone = region.clone_for_rule_fit();
        assert_eq!(clone, region);
    }

    #[test]
    fn test_with_store_replaced_leaves_region_intact() {
        let region = region_123();
        let moved = region.with_store_replaced(1, 4);

        assert_eq!(moved.store_ids(), vec![4, 2, 3]);
        assert_eq!(moved.leader_store_id(), Some(4));
        assert_eq!(region.store_ids(), vec![1, 2, 3]);
        assert_eq!(region.leader_store_id(), Some(1));
    }

    #[test]
    fn test_with_store_replaced_keeps_role() {
        let region = region_123();
        let moved = region.with_store_replaced(3, 9);
        assert_eq!(moved.store_peer(9).map(|p| p.role), Some(PeerRole::Learner));
        assert_eq!(moved.leader_store_id(), Some(1));
    }
}
