use serde::{Deserialize, Serialize};

use crate::Config;
use crate::shared::{
    BackfillConfig, DestinationConfig, MappingRuleConfig, MigratorConfig, ValidationError,
};

/// Complete configuration of the replicator binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicatorConfig {
    /// Batching and retry configuration for the destination table.
    pub migrator: MigratorConfig,
    pub destination: DestinationConfig,
    /// Mapping rules applied to every image, in order. No rules means identity.
    #[serde(default)]
    pub mapping: Vec<MappingRuleConfig>,
    /// Backfill settings, required by the `backfill` command only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backfill: Option<BackfillConfig>,
    /// Port of the Prometheus metrics listener. Metrics are disabled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_port: Option<u16>,
}

impl ReplicatorConfig {
    /// Validates every section of the configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.migrator.validate()?;
        self.destination.validate()?;

        for rule in &self.mapping {
            rule.validate()?;
        }

        if let Some(backfill) = &self.backfill {
            backfill.validate()?;
        }

        Ok(())
    }
}

impl Config for ReplicatorConfig {
    const LIST_PARSE_KEYS: &'static [&'static str] =
        &["migrator.key_fields", "destination.memory.key_fields"];
}
