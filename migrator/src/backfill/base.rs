use std::future::Future;

use crate::error::MigratorResult;
use crate::key::KeyFields;
use crate::types::Image;

/// One page of a key scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Keys of the scanned items, projected to the requested key fields.
    pub items: Vec<Image>,
    /// Key to resume the scan from, absent once the whole table has been scanned.
    pub last_evaluated_key: Option<Image>,
}

/// Result of stamping a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    Marked,
    /// The item was deleted between the scan and the update.
    Missing,
}

/// Trait for source tables that can be scanned and stamped by a backfill.
pub trait SourceTable {
    /// Returns the name of the source implementation.
    fn name() -> &'static str;

    /// Returns up to `limit` item keys following `exclusive_start_key`.
    fn scan_keys(
        &self,
        table_name: &str,
        key_fields: &KeyFields,
        limit: usize,
        exclusive_start_key: Option<&Image>,
    ) -> impl Future<Output = MigratorResult<ScanPage>> + Send;

    /// Sets `attribute` to `timestamp` on the item with `key`, only if the item still exists.
    fn mark_migrated(
        &self,
        table_name: &str,
        key: &Image,
        attribute: &str,
        timestamp: &str,
    ) -> impl Future<Output = MigratorResult<MarkOutcome>> + Send;
}
