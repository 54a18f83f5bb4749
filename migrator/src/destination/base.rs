use std::future::Future;

use crate::error::MigratorResult;
use crate::types::WriteRequest;

/// Requests of a batch write that the destination did not apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteOutput {
    pub unprocessed: Vec<WriteRequest>,
}

impl BatchWriteOutput {
    /// Returns an output where every request was applied.
    pub fn complete() -> Self {
        Self::default()
    }

    pub fn is_complete(&self) -> bool {
        self.unprocessed.is_empty()
    }
}

/// Trait for key-value stores that accept batched puts and deletes.
///
/// A call to [`Destination::batch_write`] receives at most 25 requests, none of which share a
/// primary key. The destination may apply only a subset of them, for example when throttled, and
/// must then return exactly the requests it skipped in [`BatchWriteOutput::unprocessed`]. Any
/// other failure is returned as an error and aborts the current invocation.
///
/// Deleting a missing item must succeed, so that replaying change records is idempotent.
pub trait Destination {
    /// Returns the name of the destination.
    fn name() -> &'static str;

    /// Applies a batch of write requests to `table_name`.
    fn batch_write(
        &self,
        table_name: &str,
        requests: Vec<WriteRequest>,
    ) -> impl Future<Output = MigratorResult<BatchWriteOutput>> + Send;
}
