use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::destination::{BatchWriteOutput, Destination};
use crate::error::MigratorResult;
use crate::types::{Image, WriteRequest};

#[derive(Debug)]
struct Inner {
    batches: Vec<Vec<WriteRequest>>,
    table_names: Vec<String>,
    failed_calls: usize,
}

/// Test wrapper for [`Destination`] implementations that records every batch write call.
///
/// Each call is recorded with its requests before being forwarded, so resubmissions of
/// unprocessed requests show up as separate batches.
#[derive(Debug, Clone)]
pub struct TestDestinationWrapper<D> {
    wrapped_destination: D,
    inner: Arc<RwLock<Inner>>,
}

impl<D> TestDestinationWrapper<D> {
    pub fn wrap(destination: D) -> Self {
        Self {
            wrapped_destination: destination,
            inner: Arc::new(RwLock::new(Inner {
                batches: Vec::new(),
                table_names: Vec::new(),
                failed_calls: 0,
            })),
        }
    }

    /// Returns the wrapped destination.
    pub fn inner(&self) -> &D {
        &self.wrapped_destination
    }

    /// Returns the requests of every batch write call in call order.
    pub async fn batches(&self) -> Vec<Vec<WriteRequest>> {
        self.inner.read().await.batches.clone()
    }

    /// Returns the table name of every batch write call in call order.
    pub async fn table_names(&self) -> Vec<String> {
        self.inner.read().await.table_names.clone()
    }

    /// Returns the number of batch write calls that returned an error.
    pub async fn failed_calls(&self) -> usize {
        self.inner.read().await.failed_calls
    }

    /// Returns the index of the first batch containing two requests for the same key, projected
    /// with `key_of`.
    pub async fn first_batch_with_duplicate_keys<F>(&self, key_of: F) -> Option<usize>
    where
        F: Fn(&WriteRequest) -> Image,
    {
        let inner = self.inner.read().await;
        inner.batches.iter().position(|batch| {
            let mut seen = BTreeSet::new();
            batch.iter().any(|request| !seen.insert(key_of(request)))
        })
    }
}

impl<D> Destination for TestDestinationWrapper<D>
where
    D: Destination + Send + Sync,
{
    fn name() -> &'static str {
        D::name()
    }

    async fn batch_write(
        &self,
        table_name: &str,
        requests: Vec<WriteRequest>,
    ) -> MigratorResult<BatchWriteOutput> {
        {
            let mut inner = self.inner.write().await;
            inner.batches.push(requests.clone());
            inner.table_names.push(table_name.to_owned());
        }

        let result = self
            .wrapped_destination
            .batch_write(table_name, requests)
            .await;

        if result.is_err() {
            self.inner.write().await.failed_calls += 1;
        }

        result
    }
}
