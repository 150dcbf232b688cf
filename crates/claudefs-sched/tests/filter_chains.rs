//! End-to-end filter chains over a small three-zone cluster.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use claudefs_sched::filter::{
    location_safeguard, placement_safeguard, select_target_stores, select_unavailable_target_stores, Collector,
    Counter, ExcludedFilter, Filter, FilterMetrics, FilterType, IsolationFilter, StorageThresholdFilter,
    StoreStateFilter,
};
use claudefs_sched::{
    Action, BasicCluster, Peer, RegionFit, RegionInfo, RuleManager, ScheduleOptions, StatusCode, StoreId, StoreInfo,
    StoreStats,
};

/// Rule requiring every replica in a different zone.
#[derive(Debug)]
struct DistinctZoneFit {
    zones: HashMap<StoreId, String>,
}

impl RegionFit for DistinctZoneFit {
    fn replace(&self, src_store_id: StoreId, dst: &StoreInfo, region: &RegionInfo) -> bool {
        let moved = region.with_store_replaced(src_store_id, dst.id);
        let mut seen = HashSet::new();
        moved.store_ids().into_iter().all(|id| {
            let zone = if id == dst.id {
                dst.label_value("zone").to_string()
            } else {
                self.zones.get(&id).cloned().unwrap_or_default()
            };
            seen.insert(zone)
        })
    }
}

struct ZoneRules;

impl RuleManager for ZoneRules {
    fn fit_region(&self, cluster: &BasicCluster, region: &RegionInfo) -> Arc<dyn RegionFit> {
        let zones = cluster
            .get_region_stores(region)
            .iter()
            .map(|s| (s.id, s.label_value("zone").to_string()))
            .collect();
        Arc::new(DistinctZoneFit { zones })
    }
}

fn zone_store(id: StoreId, zone: &str) -> StoreInfo {
    StoreInfo::new(id).with_labels([("zone", zone.to_string()), ("host", format!("h{}", id))])
}

fn cluster() -> BasicCluster {
    BasicCluster::from_stores([
        zone_store(1, "z1"),
        zone_store(2, "z2"),
        zone_store(3, "z3"),
        zone_store(4, "z4"),
        zone_store(5, "z2"),
    ])
}

fn region() -> Arc<RegionInfo> {
    let peers = vec![Peer::new(11, 1), Peer::new(12, 2), Peer::new(13, 3)];
    let leader = Some(peers[0].clone());
    Arc::new(RegionInfo::new(7, b"a".to_vec(), b"m".to_vec(), peers, leader))
}

fn zone_opts() -> ScheduleOptions {
    ScheduleOptions {
        location_labels: vec!["zone".into(), "host".into()],
        isolation_level: "zone".into(),
        ..Default::default()
    }
}

#[test]
fn test_rule_fit_replacement_does_not_mutate_region() {
    let cluster = cluster();
    let region = region();
    let before = (*region).clone();
    let opts = ScheduleOptions::default();
    let source = cluster.get_store(1).unwrap();

    let filter = placement_safeguard("balance-region", &opts, &cluster, &ZoneRules, region.clone(), &source, None);
    assert_eq!(filter.filter_type(), FilterType::RuleFit);

    let store4 = cluster.get_store(4).unwrap();
    let store5 = cluster.get_store(5).unwrap();
    assert!(filter.target(&opts, &store4).is_ok());
    assert_eq!(filter.target(&opts, &store5).code(), StatusCode::StoreNotMatchRule);

    assert_eq!(*region, before);
}

#[test]
fn test_down_leader_target_stops_at_first_condition() {
    let opts = ScheduleOptions::default();
    let store = StoreInfo::new(9)
        .with_down_time(opts.max_store_down_time() + Duration::from_secs(1))
        .with_pause_leader_transfer(true);
    let filter = StoreStateFilter {
        action_scope: "transfer-leader".into(),
        transfer_leader: true,
        ..Default::default()
    };

    let status = filter.target(&opts, &store);
    assert_eq!(status.code(), StatusCode::StoreDown);
    assert_eq!(status.reason(), Some(FilterType::StoreStateDown));
}

#[test]
fn test_replica_checker_chain() {
    let cluster = cluster();
    let region = region();
    let opts = zone_opts();
    let region_stores = cluster.get_region_stores(&region);
    let source = cluster.get_store(1).unwrap();

    // store 1 is being replaced, so only stores 2 and 3 constrain isolation
    let remaining: Vec<_> = region_stores.iter().filter(|s| s.id != 1).cloned().collect();
    let filters: Vec<Box<dyn Filter>> = vec![
        Box::new(StoreStateFilter {
            action_scope: "replica-checker".into(),
            move_region: true,
            ..Default::default()
        }),
        Box::new(ExcludedFilter::new(
            "replica-checker",
            HashSet::new(),
            region.store_ids().into_iter().collect(),
        )),
        Box::new(StorageThresholdFilter::new("replica-checker")),
        Box::new(IsolationFilter::new(
            "replica-checker",
            opts.isolation_level.as_str(),
            opts.location_labels.clone(),
            &remaining,
        )),
        Box::new(location_safeguard(
            "replica-checker",
            opts.location_labels.clone(),
            &region_stores,
            &source,
        )),
    ];

    let mut candidates = cluster.get_stores();
    candidates.push(Arc::new(zone_store(6, "z4").with_stats(StoreStats {
        capacity: 100 << 30,
        available: 1 << 30,
        ..Default::default()
    })
    .with_region_count(500)));

    let collector = Collector::new();
    let counter = Counter::new("replica-checker");
    let selected = select_target_stores(&candidates, &filters, &opts, Some(&collector), Some(&counter));
    let unavailable = select_unavailable_target_stores(&candidates, &filters, &opts, None, None);

    assert_eq!(selected.iter().map(|s| s.id).collect::<Vec<_>>(), vec![4]);
    assert_eq!(unavailable.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2, 3, 5, 6]);

    assert_eq!(collector.records_for(5)[0].status.code(), StatusCode::StoreNotMatchIsolation);
    assert_eq!(collector.records_for(5)[0].filter_type, FilterType::Isolation);
    assert_eq!(collector.records_for(6)[0].status.code(), StatusCode::StoreLowSpace);
    assert_eq!(collector.summary().get("store-already-has-peer"), Some(&3));

    let metrics = FilterMetrics::new();
    counter.flush(&metrics);
    assert_eq!(counter.total(), 0);
    assert_eq!(
        metrics.get(Action::Target, "replica-checker", FilterType::Isolation, 0, 5),
        1
    );
    let text = metrics.to_prometheus();
    assert!(text.contains("type=\"storage-threshold-filter\""));
}

#[test]
fn test_isolation_without_replicas_rejects_everything() {
    let opts = zone_opts();
    let filter = IsolationFilter::new("test", "zone", opts.location_labels.clone(), &[]);
    let stores = cluster().get_stores();

    let selected = select_target_stores(&stores, &[Box::new(filter) as Box<dyn Filter>], &opts, None, None);
    assert!(selected.is_empty());
}
