//! Scheduling options shared by every filter evaluation.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SchedError, SchedResult};
use crate::store::StoreLabel;

/// Label property marking stores that must never hold region leaders.
pub const REJECT_LEADER: &str = "reject-leader";

/// Global scheduling options, read-only during a selection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleOptions {
    /// A store silent for longer than this is treated as down.
    pub max_store_down_time_secs: u64,
    /// Maximum snapshots a store may send or receive concurrently.
    pub max_snapshot_count: u64,
    /// Maximum pending peers on a target store; 0 disables the check.
    pub max_pending_peer_count: u64,
    /// Used-space ratio above which a store is low on space.
    pub low_space_ratio: f64,
    /// Ordered topology labels, most significant first.
    pub location_labels: Vec<String>,
    /// Location label at which replicas must be isolated; empty for none.
    pub isolation_level: String,
    /// Whether placement rules replace location-label scoring.
    pub placement_rules_enabled: bool,
    /// Label properties, e.g. `reject-leader` → labels whose stores reject leaders.
    pub label_properties: HashMap<String, Vec<StoreLabel>>,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            max_store_down_time_secs: 30 * 60,
            max_snapshot_count: 64,
            max_pending_peer_count: 64,
            low_space_ratio: 0.8,
            location_labels: Vec::new(),
            isolation_level: String::new(),
            placement_rules_enabled: true,
            label_properties: HashMap::new(),
        }
    }
}

impl ScheduleOptions {
    /// Loads options from a `.toml` or `.json` file and validates them.
    pub fn from_file(path: &Path) -> SchedResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();

        let opts: ScheduleOptions = match ext.as_str() {
            "toml" => toml::from_str(&contents)?,
            "json" => serde_json::from_str(&contents)?,
            _ => return Err(SchedError::UnsupportedFormat { ext }),
        };
        opts.validate()?;
        debug!("Loaded schedule options from {}", path.display());
        Ok(opts)
    }

    /// Checks internal consistency of the options.
    pub fn validate(&self) -> SchedResult<()> {
        if !(self.low_space_ratio > 0.0 && self.low_space_ratio <= 1.0) {
            return Err(SchedError::InvalidConfig {
                field: "low_space_ratio",
                reason: format!("{} is not in (0, 1]", self.low_space_ratio),
            });
        }
        for (i, label) in self.location_labels.iter().enumerate() {
            if label.is_empty() {
                return Err(SchedError::InvalidConfig {
                    field: "location_labels",
                    reason: format!("label at position {} is empty", i),
                });
            }
            if self.location_labels[..i].contains(label) {
                return Err(SchedError::InvalidConfig {
                    field: "location_labels",
                    reason: format!("duplicate label {:?}", label),
                });
            }
        }
        if !self.isolation_level.is_empty() && !self.location_labels.contains(&self.isolation_level) {
            return Err(SchedError::InvalidConfig {
                field: "isolation_level",
                reason: format!("{:?} is not a location label", self.isolation_level),
            });
        }
        Ok(())
    }

    /// Silence after which a store counts as down.
    pub fn max_store_down_time(&self) -> Duration {
        Duration::from_secs(self.max_store_down_time_secs)
    }

    /// Snapshot limit per direction.
    pub fn max_snapshot_count(&self) -> u64 {
        self.max_snapshot_count
    }

    /// Pending peer limit; 0 disables it.
    pub fn max_pending_peer_count(&self) -> u64 {
        self.max_pending_peer_count
    }

    /// Used-space ratio marking a store low on space.
    pub fn low_space_ratio(&self) -> f64 {
        self.low_space_ratio
    }

    /// Topology labels, most significant first.
    pub fn location_labels(&self) -> &[String] {
        &self.location_labels
    }

    /// Whether placement rules drive replica safeguards.
    pub fn is_placement_rules_enabled(&self) -> bool {
        self.placement_rules_enabled
    }

    /// Returns true if any of `labels` is registered under property `kind`.
    pub fn check_label_property(&self, kind: &str, labels: &[StoreLabel]) -> bool {
        self.label_properties
            .get(kind)
            .is_some_and(|props| props.iter().any(|p| labels.contains(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_default_values() {
        let opts = ScheduleOptions::default();
        assert_eq!(opts.max_store_down_time(), Duration::from_secs(1800));
        assert_eq!(opts.max_snapshot_count(), 64);
        assert_eq!(opts.max_pending_peer_count(), 64);
        assert_eq!(opts.low_space_ratio(), 0.8);
        assert!(opts.location_labels().is_empty());
        assert!(opts.is_placement_rules_enabled());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_validate_low_space_ratio() {
        let opts = ScheduleOptions {
            low_space_ratio: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(SchedError::InvalidConfig { field: "low_space_ratio", .. })
        ));

        let opts = ScheduleOptions {
            low_space_ratio: 0.0,
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_location_label() {
        let opts = ScheduleOptions {
            location_labels: vec!["zone".into(), "host".into(), "zone".into()],
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(SchedError::InvalidConfig { field: "location_labels", .. })
        ));
    }

    #[test]
    fn test_validate_isolation_level() {
        let mut opts = ScheduleOptions {
            location_labels: vec!["zone".into(), "host".into()],
            isolation_level: "rack".into(),
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(SchedError::InvalidConfig { field: "isolation_level", .. })
        ));

        opts.isolation_level = "zone".into();
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_check_label_property() {
        let mut opts = ScheduleOptions::default();
        opts.label_properties
            .insert(REJECT_LEADER.to_string(), vec![StoreLabel::new("zone", "z9")]);

        assert!(opts.check_label_property(REJECT_LEADER, &[StoreLabel::new("zone", "z9")]));
        assert!(!opts.check_label_property(REJECT_LEADER, &[StoreLabel::new("zone", "z1")]));
        assert!(!opts.check_label_property("other", &[StoreLabel::new("zone", "z9")]));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
max_snapshot_count = 3
location_labels = ["zone", "rack", "host"]
isolation_level = "rack"

[[label_properties.reject-leader]]
key = "zone"
value = "z3"
"#
        )
        .unwrap();

        let opts = ScheduleOptions::from_file(file.path()).unwrap();
        assert_eq!(opts.max_snapshot_count, 3);
        assert_eq!(opts.max_pending_peer_count, 64);
        assert_eq!(opts.location_labels.len(), 3);
        assert!(opts.check_label_property(REJECT_LEADER, &[StoreLabel::new("zone", "z3")]));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"low_space_ratio": 0.9, "placement_rules_enabled": false}}"#).unwrap();

        let opts = ScheduleOptions::from_file(file.path()).unwrap();
        assert_eq!(opts.low_space_ratio, 0.9);
        assert!(!opts.placement_rules_enabled);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"low_space_ratio": 2.0}}"#).unwrap();
        assert!(ScheduleOptions::from_file(file.path()).is_err());
    }

    #[test]
    fn test_from_file_unsupported_extension() {
        let file = Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            ScheduleOptions::from_file(file.path()),
            Err(SchedError::UnsupportedFormat { .. })
        ));
    }
}
