//! Selection of eligible and ineligible stores through a filter chain.
//!
//! Every function evaluates filters in chain order and stops at the first
//! rejection for a store. Rejections are reported to the optional collector
//! and counter; neither affects the result.

use std::sync::Arc;

use tracing::debug;

use super::collector::{Collector, FilterRecord};
use super::counter::{Action, FilterCounter};
use super::status::{Status, StatusCode};
use super::Filter;
use crate::config::ScheduleOptions;
use crate::store::StoreInfo;

/// Stores that pass every filter as a source, in input order.
pub fn select_source_stores(
    stores: &[Arc<StoreInfo>],
    filters: &[Box<dyn Filter>],
    opts: &ScheduleOptions,
    collector: Option<&Collector>,
    counter: Option<&dyn FilterCounter>,
) -> Vec<Arc<StoreInfo>> {
    filter_stores_by(stores, |s| {
        filters.iter().all(|f| {
            let status = f.source(opts, s);
            if status.is_ok() {
                return true;
            }
            report(Action::Source, f.as_ref(), s, status, collector, counter);
            false
        })
    })
}

/// Stores that pass every filter as a target, in input order. An empty chain
/// admits every store.
pub fn select_target_stores(
    stores: &[Arc<StoreInfo>],
    filters: &[Box<dyn Filter>],
    opts: &ScheduleOptions,
    collector: Option<&Collector>,
    counter: Option<&dyn FilterCounter>,
) -> Vec<Arc<StoreInfo>> {
    if filters.is_empty() {
        return stores.to_vec();
    }
    filter_stores_by(stores, |s| {
        filters.iter().all(|f| {
            let status = f.target(opts, s);
            if status.is_ok() {
                return true;
            }
            report(Action::Target, f.as_ref(), s, status, collector, counter);
            false
        })
    })
}

/// Stores rejected as a target by at least one filter, in input order.
pub fn select_unavailable_target_stores(
    stores: &[Arc<StoreInfo>],
    filters: &[Box<dyn Filter>],
    opts: &ScheduleOptions,
    collector: Option<&Collector>,
    counter: Option<&dyn FilterCounter>,
) -> Vec<Arc<StoreInfo>> {
    filter_stores_by(stores, |s| {
        filters.iter().any(|f| {
            let status = f.target(opts, s);
            if status.is_ok() {
                return false;
            }
            report(Action::Target, f.as_ref(), s, status, collector, counter);
            true
        })
    })
}

/// Checks a single store against `filters` as a target.
///
/// Rejections of removed stores are not counted.
pub fn target(
    opts: &ScheduleOptions,
    store: &StoreInfo,
    filters: &[Box<dyn Filter>],
    counter: Option<&dyn FilterCounter>,
) -> bool {
    for f in filters {
        let status = f.target(opts, store);
        if status.is_ok() {
            continue;
        }
        if status.code() != StatusCode::StoreRemoved {
            report(Action::Target, f.as_ref(), store, status, None, counter);
        }
        return false;
    }
    true
}

fn filter_stores_by<P>(stores: &[Arc<StoreInfo>], mut keep: P) -> Vec<Arc<StoreInfo>>
where
    P: FnMut(&StoreInfo) -> bool,
{
    stores.iter().filter(|s| keep(s)).cloned().collect()
}

fn report(
    action: Action,
    filter: &dyn Filter,
    store: &StoreInfo,
    status: Status,
    collector: Option<&Collector>,
    counter: Option<&dyn FilterCounter>,
) {
    let filter_type = status.reason().unwrap_or_else(|| filter.filter_type());
    let source_id = match action {
        Action::Source => None,
        Action::Target => filter.source_store_id(),
    };
    debug!(
        "{} rejected store {} as {:?} (source {:?}): {}",
        filter_type,
        store.id,
        action,
        source_id,
        status
    );

    if let Some(counter) = counter {
        match action {
            Action::Source => counter.inc(action, filter_type, store.id, 0),
            Action::Target => counter.inc(action, filter_type, source_id.unwrap_or(0), store.id),
        }
    }
    if let Some(collector) = collector {
        collector.collect(FilterRecord {
            action,
            scope: filter.scope().to_string(),
            filter_type,
            store_id: store.id,
            source_id,
            status,
            reason: status.to_string(),
        });
    }
}
