use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Destination store receiving the batch writes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationConfig {
    /// Process-local tables, useful for dry runs and tests.
    Memory {
        /// Primary key attribute names of the in-memory destination table.
        key_fields: Vec<String>,
    },
    /// A DynamoDB table reached through the default AWS credential chain.
    #[serde(rename = "dynamodb")]
    DynamoDb {
        /// Region override; the default provider chain is used when absent.
        #[serde(default)]
        region: Option<String>,
        /// Endpoint override, for example a local DynamoDB instance.
        #[serde(default)]
        endpoint_url: Option<String>,
    },
}

impl DestinationConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            DestinationConfig::Memory { key_fields } if key_fields.is_empty() => Err(
                ValidationError::EmptyField("destination.memory.key_fields".to_string()),
            ),
            _ => Ok(()),
        }
    }
}
