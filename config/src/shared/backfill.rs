use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration of the backfill scan that marks every source row as migrated.
///
/// Touching a row makes the change source emit a modification for it, which the batcher then
/// replicates like any other change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BackfillConfig {
    /// Name of the source table to scan.
    pub source_table: String,
    /// Primary key attribute names of the source table.
    pub key_fields: Vec<String>,
    /// Number of keys requested per scan page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Attribute receiving the migration timestamp.
    #[serde(default = "default_migrated_attribute")]
    pub migrated_attribute: String,
    /// Time after which no new page is started.
    ///
    /// The scan returns its last evaluated key so that a later run can resume from it.
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
}

impl BackfillConfig {
    pub const DEFAULT_PAGE_SIZE: usize = 25;

    pub const DEFAULT_MIGRATED_ATTRIBUTE: &'static str = "_migrated";

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source_table.trim().is_empty() {
            return Err(ValidationError::EmptyField("backfill.source_table".to_string()));
        }

        if self.key_fields.is_empty() {
            return Err(ValidationError::EmptyField("backfill.key_fields".to_string()));
        }

        if self.page_size == 0 {
            return Err(ValidationError::invalid(
                "backfill.page_size",
                "must be greater than 0",
            ));
        }

        if self.migrated_attribute.is_empty() || self.key_fields.contains(&self.migrated_attribute)
        {
            return Err(ValidationError::invalid(
                "backfill.migrated_attribute",
                "must be a non-empty attribute outside of the key",
            ));
        }

        Ok(())
    }
}

fn default_page_size() -> usize {
    BackfillConfig::DEFAULT_PAGE_SIZE
}

fn default_migrated_attribute() -> String {
    BackfillConfig::DEFAULT_MIGRATED_ATTRIBUTE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BackfillConfig {
        serde_json::from_str(r#"{"source_table": "source", "key_fields": ["PartitionKey"]}"#)
            .unwrap()
    }

    #[test]
    fn applies_defaults() {
        let config = config();

        assert_eq!(config.page_size, 25);
        assert_eq!(config.migrated_attribute, "_migrated");
        assert_eq!(config.time_budget(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_marker_inside_key() {
        let mut config = config();
        config.migrated_attribute = "PartitionKey".to_string();

        assert!(config.validate().is_err());
    }
}
