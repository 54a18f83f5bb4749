use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::ops::Bound;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backfill::{MarkOutcome, ScanPage, SourceTable};
use crate::bail;
use crate::error::{ErrorKind, MigratorError, MigratorResult};
use crate::key::{KeyFields, project_key};
use crate::types::{AttributeValue, ChangeRecord, Image};

#[derive(Debug)]
struct SourceData {
    key_fields: KeyFields,
    items: BTreeMap<Image, Image>,
    vanishing_keys: BTreeSet<Image>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, SourceData>,
    changes: Vec<ChangeRecord>,
    mark_failures: VecDeque<MigratorError>,
}

impl Inner {
    fn table_mut(&mut self, table_name: &str) -> MigratorResult<&mut SourceData> {
        match self.tables.get_mut(table_name) {
            Some(table) => Ok(table),
            None => bail!(
                ErrorKind::SourceError,
                "Requested resource not found",
                format!("The source table '{table_name}' does not exist")
            ),
        }
    }
}

/// In-memory source table that captures a change record for every write.
///
/// Writes made through [`MemorySourceTable::put_item`], [`MemorySourceTable::delete_item`] and
/// by a backfill stamping items are appended to a change log, in the shape a change stream with
/// new and old images would deliver them. [`MemorySourceTable::take_changes`] drains that log.
#[derive(Debug, Clone)]
pub struct MemorySourceTable {
    inner: Arc<Mutex<Inner>>,
}

impl MemorySourceTable {
    /// Creates a source with a single empty table.
    pub fn with_table(table_name: impl Into<String>, key_fields: KeyFields) -> Self {
        let mut inner = Inner::default();
        inner.tables.insert(
            table_name.into(),
            SourceData {
                key_fields,
                items: BTreeMap::new(),
                vanishing_keys: BTreeSet::new(),
            },
        );

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Creates or replaces an item, capturing an insert or a modification.
    pub async fn put_item(&self, table_name: &str, item: Image) -> MigratorResult<()> {
        let mut inner = self.inner.lock().await;
        let table = inner.table_mut(table_name)?;
        let source_key = project_key(&item, &table.key_fields);
        if source_key.len() != table.key_fields.len() {
            bail!(
                ErrorKind::InvalidData,
                "Item is missing key attributes",
                format!("The item {item:?} does not contain every key attribute")
            );
        }

        let change = match table.items.insert(source_key.clone(), item.clone()) {
            Some(old_image) => ChangeRecord::Modified {
                new_image: item,
                old_image,
                source_key,
            },
            None => ChangeRecord::Inserted {
                new_image: item,
                source_key,
            },
        };
        inner.changes.push(change);

        Ok(())
    }

    /// Deletes an item, capturing a removal if it existed.
    pub async fn delete_item(&self, table_name: &str, key: &Image) -> MigratorResult<()> {
        let mut inner = self.inner.lock().await;
        let table = inner.table_mut(table_name)?;
        let source_key = project_key(key, &table.key_fields);

        if let Some(old_image) = table.items.remove(&source_key) {
            inner.changes.push(ChangeRecord::Removed {
                old_image,
                source_key,
            });
        }

        Ok(())
    }

    /// Returns all items ordered by key.
    pub async fn items(&self, table_name: &str) -> MigratorResult<Vec<Image>> {
        let mut inner = self.inner.lock().await;
        let table = inner.table_mut(table_name)?;

        Ok(table.items.values().cloned().collect())
    }

    /// Drains the captured change records in write order.
    pub async fn take_changes(&self) -> Vec<ChangeRecord> {
        let mut inner = self.inner.lock().await;
        std::mem::take(&mut inner.changes)
    }

    /// Makes the item with `key` get deleted right after a scan returns it.
    pub async fn vanish_after_scan(&self, table_name: &str, key: &Image) -> MigratorResult<()> {
        let mut inner = self.inner.lock().await;
        let table = inner.table_mut(table_name)?;
        let key = project_key(key, &table.key_fields);
        table.vanishing_keys.insert(key);

        Ok(())
    }

    /// Makes the next item update fail with `error`.
    pub async fn fail_next_mark(&self, error: MigratorError) {
        let mut inner = self.inner.lock().await;
        inner.mark_failures.push_back(error);
    }
}

impl SourceTable for MemorySourceTable {
    fn name() -> &'static str {
        "memory"
    }

    async fn scan_keys(
        &self,
        table_name: &str,
        key_fields: &KeyFields,
        limit: usize,
        exclusive_start_key: Option<&Image>,
    ) -> MigratorResult<ScanPage> {
        let mut inner = self.inner.lock().await;
        let table = inner.table_mut(table_name)?;

        let lower = match exclusive_start_key {
            Some(key) => Bound::Excluded(project_key(key, &table.key_fields)),
            None => Bound::Unbounded,
        };
        let mut remaining = table.items.range((lower, Bound::Unbounded)).map(|(key, _)| key);

        let keys = remaining.by_ref().take(limit).cloned().collect::<Vec<_>>();
        let last_evaluated_key = match remaining.next() {
            Some(_) => keys.last().cloned(),
            None => None,
        };

        let items = keys
            .iter()
            .map(|key| project_key(key, key_fields))
            .collect::<Vec<_>>();

        let vanished = keys
            .iter()
            .filter(|key| table.vanishing_keys.remove(*key))
            .filter_map(|key| {
                table
                    .items
                    .remove(key)
                    .map(|old_image| ChangeRecord::Removed {
                        old_image,
                        source_key: key.clone(),
                    })
            })
            .collect::<Vec<_>>();
        inner.changes.extend(vanished);

        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }

    async fn mark_migrated(
        &self,
        table_name: &str,
        key: &Image,
        attribute: &str,
        timestamp: &str,
    ) -> MigratorResult<MarkOutcome> {
        let mut inner = self.inner.lock().await;
        if let Some(error) = inner.mark_failures.pop_front() {
            return Err(error);
        }

        let table = inner.table_mut(table_name)?;
        let source_key = project_key(key, &table.key_fields);

        let Some(item) = table.items.get_mut(&source_key) else {
            return Ok(MarkOutcome::Missing);
        };

        let old_image = item.clone();
        item.insert(attribute, AttributeValue::S(timestamp.to_owned()));
        let new_image = item.clone();

        inner.changes.push(ChangeRecord::Modified {
            new_image,
            old_image,
            source_key,
        });

        Ok(MarkOutcome::Marked)
    }
}
