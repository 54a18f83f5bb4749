use config::shared::{MigratorConfig, RetryConfig};
use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use crate::destination::Destination;
use crate::error::{MigratorError, MigratorResult};
use crate::key::{KeyFields, keys_match, missing_key_fields, project_key};
use crate::mapping::ImageMapper;
use crate::metrics::{
    FLUSH_REASON_LABEL, MIGRATOR_BATCH_SIZE, MIGRATOR_BATCHES_FLUSHED_TOTAL,
    MIGRATOR_CHANGE_RECORDS_TOTAL, MIGRATOR_KEY_CHANGES_TOTAL, RECORD_KIND_LABEL,
    TABLE_NAME_LABEL,
};
use crate::replication::WriteBatch;
use crate::replication::submit::submit_batch;
use crate::types::{BatchEntry, ChangeRecord, Image};

/// Why the open batch was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushReason {
    DuplicateKey,
    Size,
    Bytes,
    Final,
    BeforeFailure,
}

impl FlushReason {
    fn as_str(&self) -> &'static str {
        match self {
            FlushReason::DuplicateKey => "duplicate_key",
            FlushReason::Size => "size",
            FlushReason::Bytes => "bytes",
            FlushReason::Final => "final",
            FlushReason::BeforeFailure => "before_failure",
        }
    }
}

/// Counters describing one call to [`ChangeBatcher::process_changes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Change records consumed.
    pub records: usize,
    /// Batches submitted to the destination.
    pub batches: usize,
    /// Put requests written.
    pub puts: usize,
    /// Delete requests written.
    pub deletes: usize,
    /// Modifications whose destination key changed.
    pub key_changes: usize,
    /// Batch write calls, including resubmissions of unprocessed requests.
    pub write_calls: usize,
}

/// Turns ordered change records into key-deduplicated batch writes.
///
/// Records are processed strictly in order and batches are submitted one at a time. For every
/// record the effective image is mapped, its destination key is projected, and a put or delete is
/// appended to the open batch. The batch is submitted:
///
/// - before an append whose key matches an entry already in the batch,
/// - before an append that would exceed the byte ceiling,
/// - as soon as it holds the maximum number of entries,
/// - once more at the end of the invocation.
///
/// A modification whose mapped key differs from the mapped key of its old image appends a put of
/// the new item followed by a delete of the old key.
#[derive(Debug)]
pub struct ChangeBatcher<D, M> {
    config: MigratorConfig,
    key_fields: Option<KeyFields>,
    destination: D,
    mapper: M,
}

impl<D, M> ChangeBatcher<D, M>
where
    D: Destination + Sync,
    M: ImageMapper + Sync,
{
    pub fn new(config: MigratorConfig, destination: D, mapper: M) -> Self {
        let key_fields = config.key_fields.as_ref().map(KeyFields::new);

        Self {
            config,
            key_fields,
            destination,
            mapper,
        }
    }

    pub fn destination(&self) -> &D {
        &self.destination
    }

    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    /// Processes all change records of one invocation.
    ///
    /// Returns after the last batch has been fully applied. The first mapping or submission
    /// error aborts processing; batches submitted before it stay applied and the remaining
    /// records must be redelivered by the change source.
    pub async fn process_changes(
        &self,
        records: Vec<ChangeRecord>,
    ) -> MigratorResult<ProcessSummary> {
        let mut writer = BatchWriter {
            destination: &self.destination,
            table_name: &self.config.table_name,
            retry: &self.config.retry,
            batch: WriteBatch::new(&self.config.batch, self.config.key_match),
            summary: ProcessSummary::default(),
        };

        for record in records {
            let kind = record.kind();
            counter!(
                MIGRATOR_CHANGE_RECORDS_TOTAL,
                TABLE_NAME_LABEL => self.config.table_name.clone(),
                RECORD_KIND_LABEL => kind.as_str()
            )
            .increment(1);

            let key_fields = KeyFields::resolve(self.key_fields.as_ref(), record.source_key());

            let item = self.map_image(&mut writer, record.effective_image()).await?;
            let key = self.project(&item, &key_fields);

            match record {
                ChangeRecord::Inserted { .. } => {
                    writer.append(BatchEntry::put(key, item)).await?;
                }
                ChangeRecord::Modified { old_image, .. } => {
                    writer.append(BatchEntry::put(key.clone(), item)).await?;

                    let old_item = self.map_image(&mut writer, &old_image).await?;
                    let old_key = self.project(&old_item, &key_fields);

                    if !keys_match(self.config.key_match, &key, &old_key) {
                        debug!(?key, ?old_key, "modification changed the destination key");
                        counter!(
                            MIGRATOR_KEY_CHANGES_TOTAL,
                            TABLE_NAME_LABEL => self.config.table_name.clone()
                        )
                        .increment(1);

                        writer.summary.key_changes += 1;
                        writer.append(BatchEntry::delete(old_key)).await?;
                    }
                }
                ChangeRecord::Removed { .. } => {
                    writer.append(BatchEntry::delete(key)).await?;
                }
            }

            writer.summary.records += 1;
        }

        writer.flush(FlushReason::Final).await?;

        let summary = writer.summary;
        info!(
            table_name = %self.config.table_name,
            records = summary.records,
            batches = summary.batches,
            puts = summary.puts,
            deletes = summary.deletes,
            key_changes = summary.key_changes,
            write_calls = summary.write_calls,
            "processed change records"
        );

        Ok(summary)
    }

    /// Maps an image, optionally flushing the open batch before reporting a failure.
    async fn map_image(
        &self,
        writer: &mut BatchWriter<'_, D>,
        image: &Image,
    ) -> MigratorResult<Image> {
        let err = match self.mapper.map_image(image) {
            Ok(mapped) => return Ok(mapped),
            Err(err) => err,
        };

        if self.config.batch.flush_before_failure
            && let Err(flush_err) = writer.flush(FlushReason::BeforeFailure).await
        {
            return Err(MigratorError::from(vec![err, flush_err]));
        }

        Err(err)
    }

    fn project(&self, item: &Image, key_fields: &KeyFields) -> Image {
        let missing = missing_key_fields(item, key_fields);
        if !missing.is_empty() {
            warn!(
                table_name = %self.config.table_name,
                ?missing,
                "mapped image is missing destination key attributes"
            );
        }

        project_key(item, key_fields)
    }
}

/// The open batch of one invocation together with everything needed to submit it.
struct BatchWriter<'a, D> {
    destination: &'a D,
    table_name: &'a str,
    retry: &'a RetryConfig,
    batch: WriteBatch,
    summary: ProcessSummary,
}

impl<D> BatchWriter<'_, D>
where
    D: Destination + Sync,
{
    async fn append(&mut self, entry: BatchEntry) -> MigratorResult<()> {
        if self.batch.contains_key(&entry.key) {
            self.flush(FlushReason::DuplicateKey).await?;
        } else if self.batch.is_full() {
            self.flush(FlushReason::Size).await?;
        } else if self.batch.exceeds_bytes_with(&entry) {
            self.flush(FlushReason::Bytes).await?;
        }

        self.batch.push(entry);

        if self.batch.is_full() {
            self.flush(FlushReason::Size).await?;
        }

        Ok(())
    }

    async fn flush(&mut self, reason: FlushReason) -> MigratorResult<()> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let size_bytes = self.batch.size_bytes();
        let requests = self.batch.take_requests();
        let puts = requests.iter().filter(|request| request.is_put()).count();
        let deletes = requests.len() - puts;

        debug!(
            table_name = self.table_name,
            requests = requests.len(),
            puts,
            deletes,
            size_bytes,
            reason = reason.as_str(),
            "flushing batch"
        );
        histogram!(
            MIGRATOR_BATCH_SIZE,
            TABLE_NAME_LABEL => self.table_name.to_owned()
        )
        .record(requests.len() as f64);
        counter!(
            MIGRATOR_BATCHES_FLUSHED_TOTAL,
            TABLE_NAME_LABEL => self.table_name.to_owned(),
            FLUSH_REASON_LABEL => reason.as_str()
        )
        .increment(1);

        let report = submit_batch(self.destination, self.table_name, requests, self.retry).await?;

        self.summary.batches += 1;
        self.summary.puts += puts;
        self.summary.deletes += deletes;
        self.summary.write_calls += report.attempts as usize;

        Ok(())
    }
}
