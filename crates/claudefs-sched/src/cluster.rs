//! Shared cluster view: the current snapshot of every known store.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::region::RegionInfo;
use crate::store::{StoreId, StoreInfo};

/// Concurrent map of store snapshots.
///
/// The heartbeat layer swaps whole snapshots in; readers clone the `Arc` and
/// never observe a partially updated store.
#[derive(Debug, Default)]
pub struct BasicCluster {
    stores: DashMap<StoreId, Arc<StoreInfo>>,
}

impl BasicCluster {
    /// Empty cluster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a cluster from a list of snapshots.
    pub fn from_stores(stores: impl IntoIterator<Item = StoreInfo>) -> Self {
        let cluster = Self::new();
        for store in stores {
            cluster.put_store(store);
        }
        cluster
    }

    /// Inserts or replaces a store snapshot.
    pub fn put_store(&self, store: StoreInfo) {
        debug!("Updating store {} snapshot", store.id);
        self.stores.insert(store.id, Arc::new(store));
    }

    /// Drops a store, returning its last snapshot.
    pub fn remove_store(&self, id: StoreId) -> Option<Arc<StoreInfo>> {
        self.stores.remove(&id).map(|(_, s)| s)
    }

    /// Latest snapshot of one store.
    pub fn get_store(&self, id: StoreId) -> Option<Arc<StoreInfo>> {
        self.stores.get(&id).map(|s| Arc::clone(s.value()))
    }

    /// All stores, ordered by id.
    pub fn get_stores(&self) -> Vec<Arc<StoreInfo>> {
        let mut stores: Vec<_> = self.stores.iter().map(|s| Arc::clone(s.value())).collect();
        stores.sort_by_key(|s| s.id);
        stores
    }

    /// Stores hosting a replica of `region`, in peer order. Peers whose store
    /// is unknown to the cluster are skipped.
    pub fn get_region_stores(&self, region: &RegionInfo) -> Vec<Arc<StoreInfo>> {
        region
            .peers
            .iter()
            .filter_map(|p| self.get_store(p.store_id))
            .collect()
    }

    /// Number of known stores.
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Peer;

    #[test]
    fn test_put_and_get_store() {
        let cluster = BasicCluster::new();
        cluster.put_store(StoreInfo::new(1));
        assert_eq!(cluster.store_count(), 1);
        assert_eq!(cluster.get_store(1).map(|s| s.id), Some(1));
        assert!(cluster.get_store(2).is_none());
    }

    #[test]
    fn test_put_store_replaces_snapshot() {
        let cluster = BasicCluster::new();
        cluster.put_store(StoreInfo::new(1));
        cluster.put_store(StoreInfo::new(1).with_pending_peer_count(9));
        assert_eq!(cluster.store_count(), 1);
        assert_eq!(cluster.get_store(1).map(|s| s.pending_peer_count), Some(9));
    }

    #[test]
    fn test_get_stores_sorted() {
        let cluster = BasicCluster::from_stores([StoreInfo::new(3), StoreInfo::new(1), StoreInfo::new(2)]);
        let ids: Vec<_> = cluster.get_stores().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_get_region_stores_skips_unknown() {
        let cluster = BasicCluster::from_stores([StoreInfo::new(1), StoreInfo::new(3)]);
        let region = RegionInfo::new(
            1,
            vec![],
            vec![],
            vec![Peer::new(1, 1), Peer::new(2, 2), Peer::new(3, 3)],
            None,
        );
        let ids: Vec<_> = cluster.get_region_stores(&region).iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_remove_store() {
        let cluster = BasicCluster::from_stores([StoreInfo::new(1)]);
        assert!(cluster.remove_store(1).is_some());
        assert!(cluster.remove_store(1).is_none());
        assert_eq!(cluster.store_count(), 0);
    }
}
