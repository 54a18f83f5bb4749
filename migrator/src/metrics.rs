//! Metrics definitions for change migration monitoring.

/// Label for the destination table name in metrics.
pub const TABLE_NAME_LABEL: &str = "table_name";

/// Label for the change record kind (`insert`, `modify`, `remove`) in metrics.
pub const RECORD_KIND_LABEL: &str = "record_kind";

/// Label for the reason a batch was flushed (`duplicate_key`, `size`, `final`, `before_failure`).
pub const FLUSH_REASON_LABEL: &str = "flush_reason";

/// Label for error kind in metrics.
pub const ERROR_KIND_LABEL: &str = "error_kind";

// Change batching metrics

/// Counter for change records processed by the batcher.
pub const MIGRATOR_CHANGE_RECORDS_TOTAL: &str = "migrator_change_records_total";

/// Counter for key-changing modifications turned into a put and a delete.
pub const MIGRATOR_KEY_CHANGES_TOTAL: &str = "migrator_key_changes_total";

/// Counter for batches flushed, labelled with the flush reason.
pub const MIGRATOR_BATCHES_FLUSHED_TOTAL: &str = "migrator_batches_flushed_total";

/// Histogram for the number of write requests per flushed batch.
pub const MIGRATOR_BATCH_SIZE: &str = "migrator_batch_size";

// Submission metrics

/// Histogram for the duration of a single batch write call, in seconds.
pub const MIGRATOR_BATCH_WRITE_DURATION_SECONDS: &str = "migrator_batch_write_duration_seconds";

/// Counter for resubmissions of unprocessed write requests.
pub const MIGRATOR_SUBMIT_RETRIES_TOTAL: &str = "migrator_submit_retries_total";

/// Counter for write requests returned as unprocessed by the destination.
pub const MIGRATOR_UNPROCESSED_REQUESTS_TOTAL: &str = "migrator_unprocessed_requests_total";

/// Counter for batch submissions that failed, labelled with the error kind.
pub const MIGRATOR_SUBMIT_FAILURES_TOTAL: &str = "migrator_submit_failures_total";

// Backfill metrics

/// Counter for source table pages scanned by the backfill.
pub const MIGRATOR_BACKFILL_PAGES_TOTAL: &str = "migrator_backfill_pages_total";

/// Counter for items stamped with the migration marker.
pub const MIGRATOR_BACKFILL_ITEMS_MARKED_TOTAL: &str = "migrator_backfill_items_marked_total";

/// Counter for scanned items that vanished before they could be stamped.
pub const MIGRATOR_BACKFILL_ITEMS_MISSING_TOTAL: &str = "migrator_backfill_items_missing_total";
