//! `cfs-sched` command line: runs a filter chain over a store snapshot.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ScheduleOptions;
use crate::filter::{
    select_source_stores, select_target_stores, Collector, Counter, ExcludedFilter, Filter, FilterMetrics,
    FilterRecord, SpecialUseFilter, StorageThresholdFilter, StoreStateFilter,
};
use crate::store::{StoreId, StoreInfo};

/// Top-level command line.
#[derive(Parser)]
#[command(name = "cfs-sched")]
#[command(about = "ClaudeFS scheduler store filter CLI", long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands of `cfs-sched`.
#[derive(Subcommand)]
pub enum Command {
    /// Select eligible stores for one scheduling scenario.
    Select {
        /// Schedule options file (.toml or .json); defaults apply when omitted.
        #[arg(short, long, env = "CFS_SCHED_OPTIONS")]
        options: Option<PathBuf>,
        /// JSON array of store snapshots.
        #[arg(short, long)]
        stores: PathBuf,
        /// Scheduling scenario.
        #[arg(long, value_enum)]
        scenario: SelectScenario,
        /// Store ids excluded from the selection.
        #[arg(short, long, value_delimiter = ',')]
        exclude: Vec<StoreId>,
        /// Skip transient health conditions.
        #[arg(long)]
        allow_temporary_states: bool,
        /// Print rejection counters in Prometheus text format after the report.
        #[arg(long)]
        metrics: bool,
    },
}

/// Scheduling scenario selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SelectScenario {
    /// Stores that may give up a leader.
    LeaderSource,
    /// Stores that may give up a replica.
    RegionSource,
    /// Stores that may receive a leader.
    LeaderTarget,
    /// Stores that may receive a replica.
    RegionTarget,
    /// Stores that may receive a scattered replica.
    ScatterTarget,
}

impl SelectScenario {
    fn is_source(&self) -> bool {
        matches!(self, SelectScenario::LeaderSource | SelectScenario::RegionSource)
    }

    fn scope(&self) -> &'static str {
        match self {
            SelectScenario::LeaderSource => "cli-leader-source",
            SelectScenario::RegionSource => "cli-region-source",
            SelectScenario::LeaderTarget => "cli-leader-target",
            SelectScenario::RegionTarget => "cli-region-target",
            SelectScenario::ScatterTarget => "cli-scatter-target",
        }
    }

    fn store_state_filter(&self, allow_temporary_states: bool) -> StoreStateFilter {
        StoreStateFilter {
            action_scope: self.scope().to_string(),
            transfer_leader: matches!(self, SelectScenario::LeaderSource | SelectScenario::LeaderTarget),
            move_region: !matches!(self, SelectScenario::LeaderSource | SelectScenario::LeaderTarget),
            scatter_region: *self == SelectScenario::ScatterTarget,
            allow_temporary_states,
        }
    }
}

/// Result of one selection run.
#[derive(Debug, Serialize)]
pub struct SelectionReport {
    /// Scope the filters ran under.
    pub scope: String,
    /// Selected store ids, in input order.
    pub selected: Vec<StoreId>,
    /// One record per rejected store.
    pub rejected: Vec<FilterRecord>,
    /// Rejections per status code.
    pub summary: BTreeMap<&'static str, usize>,
}

/// Builds the filter chain for `scenario` and runs it over `stores`.
pub fn run_selection(
    opts: &ScheduleOptions,
    stores: &[Arc<StoreInfo>],
    scenario: SelectScenario,
    exclude: &[StoreId],
    allow_temporary_states: bool,
    counter: &Counter,
) -> SelectionReport {
    let scope = scenario.scope();
    let excluded: HashSet<StoreId> = exclude.iter().copied().collect();

    let mut filters: Vec<Box<dyn Filter>> = vec![Box::new(scenario.store_state_filter(allow_temporary_states))];
    if !scenario.is_source() {
        filters.push(Box::new(StorageThresholdFilter::new(scope)));
    }
    filters.push(Box::new(SpecialUseFilter::new(scope, &[])));
    if !excluded.is_empty() {
        let filter = if scenario.is_source() {
            ExcludedFilter::new(scope, excluded, HashSet::new())
        } else {
            ExcludedFilter::new(scope, HashSet::new(), excluded)
        };
        filters.push(Box::new(filter));
    }

    let collector = Collector::new();
    let selected = if scenario.is_source() {
        select_source_stores(stores, &filters, opts, Some(&collector), Some(counter))
    } else {
        select_target_stores(stores, &filters, opts, Some(&collector), Some(counter))
    };

    SelectionReport {
        scope: scope.to_string(),
        selected: selected.iter().map(|s| s.id).collect(),
        summary: collector.summary(),
        rejected: collector.records(),
    }
}

/// One entry of the stores file: a store snapshot plus an optional
/// `down_time_secs`, which backdates `last_heartbeat` by that many seconds.
#[derive(Debug, Deserialize)]
struct StoreEntry {
    #[serde(flatten)]
    store: StoreInfo,
    #[serde(default)]
    down_time_secs: Option<u64>,
}

impl StoreEntry {
    fn into_store(self) -> StoreInfo {
        match self.down_time_secs {
            Some(secs) => self.store.with_down_time(Duration::from_secs(secs)),
            None => self.store,
        }
    }
}

/// Reads a JSON array of store snapshots.
pub fn load_stores(path: &Path) -> Result<Vec<Arc<StoreInfo>>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading stores from {}", path.display()))?;
    let entries: Vec<StoreEntry> =
        serde_json::from_str(&content).with_context(|| format!("parsing stores from {}", path.display()))?;
    Ok(entries.into_iter().map(|e| Arc::new(e.into_store())).collect())
}

impl Cli {
    /// Executes the parsed command.
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::Select {
                options,
                stores,
                scenario,
                exclude,
                allow_temporary_states,
                metrics,
            } => {
                let opts = match options {
                    Some(path) => ScheduleOptions::from_file(&path)
                        .with_context(|| format!("loading options from {}", path.display()))?,
                    None => ScheduleOptions::default(),
                };
                let stores = load_stores(&stores)?;
                info!("Selecting {:?} over {} stores", scenario, stores.len());

                let counter = Counter::new(scenario.scope());
                let report = run_selection(&opts, &stores, scenario, &exclude, allow_temporary_states, &counter);
                info!(
                    "{} of {} stores selected, {} rejected",
                    report.selected.len(),
                    stores.len(),
                    report.rejected.len()
                );
                println!("{}", serde_json::to_string_pretty(&report)?);

                if metrics {
                    let filter_metrics = FilterMetrics::new();
                    counter.flush(&filter_metrics);
                    print!("{}", filter_metrics.to_prometheus());
                }
                Ok(())
            }
        }
    }
}
