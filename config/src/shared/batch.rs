use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Limits applied while accumulating write requests into one physical batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Maximum number of write requests in a batch.
    ///
    /// The destination store rejects batch writes with more than 25 requests.
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Estimated serialized size, in bytes, above which a batch is flushed early.
    ///
    /// `None` disables the byte ceiling and only [`BatchConfig::max_entries`] applies.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: Option<usize>,
    /// Whether the accumulated batch is submitted before a mapping failure is returned.
    #[serde(default)]
    pub flush_before_failure: bool,
}

impl BatchConfig {
    /// Batch write request ceiling of the destination store.
    pub const MAX_ENTRIES: usize = 25;

    /// Batch write payload ceiling of the destination store (16 MiB).
    pub const MAX_BYTES: usize = 16 * 1024 * 1024;

    /// Validates batch limits.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_entries == 0 || self.max_entries > Self::MAX_ENTRIES {
            return Err(ValidationError::invalid(
                "batch.max_entries",
                "must be between 1 and 25",
            ));
        }

        if let Some(max_bytes) = self.max_bytes
            && (max_bytes == 0 || max_bytes > Self::MAX_BYTES)
        {
            return Err(ValidationError::invalid(
                "batch.max_bytes",
                "must be between 1 and 16777216",
            ));
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            max_bytes: default_max_bytes(),
            flush_before_failure: false,
        }
    }
}

fn default_max_entries() -> usize {
    BatchConfig::MAX_ENTRIES
}

fn default_max_bytes() -> Option<usize> {
    Some(BatchConfig::MAX_BYTES)
}
