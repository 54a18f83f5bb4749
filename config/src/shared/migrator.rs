use serde::{Deserialize, Serialize};

use crate::shared::{BatchConfig, RetryConfig, ValidationError};

/// How two projected destination keys are compared when deduplicating a batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMatchMode {
    /// Only the attributes of the first key are checked against the second one.
    ///
    /// An attribute present in the second key but absent from the first one is not detected.
    #[default]
    FirstOperand,
    /// Both keys must carry the same attribute names with equal scalar payloads.
    Symmetric,
}

/// Configuration of the change batcher writing into one destination table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MigratorConfig {
    /// Name of the destination table receiving the batch writes.
    pub table_name: String,
    /// Attribute names forming the destination primary key.
    ///
    /// When absent, the key attribute names reported by the change source are used for every
    /// record.
    #[serde(default)]
    pub key_fields: Option<Vec<String>>,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub key_match: KeyMatchMode,
}

impl MigratorConfig {
    /// Creates a configuration with default batching and retry settings.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            key_fields: None,
            batch: BatchConfig::default(),
            retry: RetryConfig::default(),
            key_match: KeyMatchMode::default(),
        }
    }

    /// Validates the table name, the declared key fields and the nested settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.table_name.trim().is_empty() {
            return Err(ValidationError::EmptyField("migrator.table_name".to_string()));
        }

        if let Some(key_fields) = &self.key_fields {
            if key_fields.is_empty() {
                return Err(ValidationError::EmptyField("migrator.key_fields".to_string()));
            }

            if key_fields.iter().any(|field| field.is_empty()) {
                return Err(ValidationError::invalid(
                    "migrator.key_fields",
                    "attribute names cannot be empty",
                ));
            }
        }

        self.batch.validate()?;
        self.retry.validate()
    }
}
