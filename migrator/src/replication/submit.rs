use std::time::{Duration, Instant};

use config::shared::RetryConfig;
use metrics::{counter, histogram};
use rand::Rng;
use tracing::{debug, warn};

use crate::bail;
use crate::destination::Destination;
use crate::error::{ErrorKind, MigratorResult};
use crate::failpoints::{BATCH_SUBMIT__BEFORE_WRITE, migrator_fail_point};
use crate::metrics::{
    ERROR_KIND_LABEL, MIGRATOR_BATCH_WRITE_DURATION_SECONDS, MIGRATOR_SUBMIT_FAILURES_TOTAL,
    MIGRATOR_SUBMIT_RETRIES_TOTAL, MIGRATOR_UNPROCESSED_REQUESTS_TOTAL, TABLE_NAME_LABEL,
};
use crate::types::WriteRequest;

/// Maximum fraction of a delay added as random jitter.
const JITTER_FACTOR: f64 = 0.3;

/// Exponential backoff between resubmissions of unprocessed requests.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    retries: u32,
}

impl Backoff {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, retries: 0 }
    }

    /// Returns the delay before the next retry, without jitter.
    ///
    /// The first retry waits `initial_delay_ms`, each following retry multiplies the delay by
    /// `backoff_factor` until `max_delay_ms` is reached.
    pub fn base_delay(&self) -> Duration {
        let multiplier = self.config.backoff_factor.powi(self.retries as i32);
        let delay_ms = self.config.initial_delay_ms as f64 * multiplier;

        Duration::from_millis(delay_ms.min(self.config.max_delay_ms as f64) as u64)
    }

    /// Returns the jittered delay before the next retry and advances the backoff.
    ///
    /// Jitter adds up to 30% to the base delay, never exceeding `max_delay_ms`.
    pub fn next_delay(&mut self) -> Duration {
        let base_delay = self.base_delay();
        self.retries = self.retries.saturating_add(1);

        let jitter_factor = rand::rng().random::<f64>() * JITTER_FACTOR;
        let jittered = base_delay.mul_f64(1.0 + jitter_factor);

        jittered.min(self.config.max_delay())
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}

/// Outcome of a batch submission that completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReport {
    /// Number of requests in the batch.
    pub requests: usize,
    /// Number of batch write calls, including the first one.
    pub attempts: u32,
}

/// Submits `requests` to `table_name`, resubmitting unprocessed requests until none remain.
///
/// Only the requests reported as unprocessed are resubmitted, after a backoff delay. When
/// requests are still unprocessed after `retry.max_attempts` calls the submission fails with
/// [`ErrorKind::SubmitRetriesExhausted`]. Any error returned by the destination aborts the
/// submission immediately.
pub async fn submit_batch<D>(
    destination: &D,
    table_name: &str,
    requests: Vec<WriteRequest>,
    retry: &RetryConfig,
) -> MigratorResult<SubmitReport>
where
    D: Destination,
{
    let total = requests.len();
    let mut pending = requests;
    let mut backoff = Backoff::new(retry.clone());
    let mut attempts = 0;

    loop {
        attempts += 1;

        let started = Instant::now();
        let result = match migrator_fail_point(BATCH_SUBMIT__BEFORE_WRITE) {
            Ok(()) => destination.batch_write(table_name, pending).await,
            Err(err) => Err(err),
        };
        histogram!(
            MIGRATOR_BATCH_WRITE_DURATION_SECONDS,
            TABLE_NAME_LABEL => table_name.to_owned()
        )
        .record(started.elapsed().as_secs_f64());

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                counter!(
                    MIGRATOR_SUBMIT_FAILURES_TOTAL,
                    TABLE_NAME_LABEL => table_name.to_owned(),
                    ERROR_KIND_LABEL => format!("{:?}", err.kind())
                )
                .increment(1);

                return Err(err);
            }
        };

        if output.unprocessed.is_empty() {
            debug!(
                table_name,
                requests = total,
                attempts,
                destination = D::name(),
                "batch submitted"
            );

            return Ok(SubmitReport {
                requests: total,
                attempts,
            });
        }

        let outstanding = output.unprocessed.len();
        counter!(
            MIGRATOR_UNPROCESSED_REQUESTS_TOTAL,
            TABLE_NAME_LABEL => table_name.to_owned()
        )
        .increment(outstanding as u64);

        if attempts >= retry.max_attempts {
            counter!(
                MIGRATOR_SUBMIT_FAILURES_TOTAL,
                TABLE_NAME_LABEL => table_name.to_owned(),
                ERROR_KIND_LABEL => format!("{:?}", ErrorKind::SubmitRetriesExhausted)
            )
            .increment(1);

            bail!(
                ErrorKind::SubmitRetriesExhausted,
                "Batch write retries exhausted",
                format!(
                    "{outstanding} of {total} write requests for table '{table_name}' were still unprocessed after {attempts} attempts"
                )
            );
        }

        let delay = backoff.next_delay();
        warn!(
            table_name,
            outstanding,
            attempt = attempts,
            delay_ms = delay.as_millis() as u64,
            "destination left write requests unprocessed, retrying"
        );
        counter!(
            MIGRATOR_SUBMIT_RETRIES_TOTAL,
            TABLE_NAME_LABEL => table_name.to_owned()
        )
        .increment(1);

        tokio::time::sleep(delay).await;
        pending = output.unprocessed;
    }
}
