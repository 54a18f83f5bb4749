use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::bail;
use crate::destination::{BatchWriteOutput, Destination};
use crate::error::{ErrorKind, MigratorError, MigratorResult};
use crate::key::{KeyFields, project_key};
use crate::types::{Image, WriteRequest};

/// Maximum number of requests accepted by a single batch write.
const MAX_BATCH_WRITE_REQUESTS: usize = 25;

#[derive(Debug)]
struct MemoryTable {
    key_fields: KeyFields,
    items: BTreeMap<Image, Image>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, MemoryTable>,
    unprocessed_script: VecDeque<usize>,
    failure_script: VecDeque<MigratorError>,
}

/// In-memory destination honoring the batch write contract of a managed key-value store.
///
/// Tables must be created with their primary key fields before they are written to. Each batch
/// is validated like the real store does: at most 25 requests, every key complete and made of
/// string, number or binary values, and no primary key appearing twice.
///
/// Throttling and outright failures can be scripted to exercise the retry path:
/// [`MemoryDestination::leave_unprocessed`] makes the next batch writes skip their last requests
/// and [`MemoryDestination::fail_next`] makes them return an error.
#[derive(Debug, Clone)]
pub struct MemoryDestination {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryDestination {
    /// Creates a destination without tables.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Creates a destination with a single empty table.
    pub fn with_table(table_name: impl Into<String>, key_fields: KeyFields) -> Self {
        let mut inner = Inner::default();
        inner.tables.insert(
            table_name.into(),
            MemoryTable {
                key_fields,
                items: BTreeMap::new(),
            },
        );

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Creates an empty table, replacing any existing table with the same name.
    pub async fn create_table(&self, table_name: impl Into<String>, key_fields: KeyFields) {
        let mut inner = self.inner.lock().await;
        inner.tables.insert(
            table_name.into(),
            MemoryTable {
                key_fields,
                items: BTreeMap::new(),
            },
        );
    }

    /// Returns all items of a table ordered by primary key, or [`None`] if it does not exist.
    pub async fn items(&self, table_name: &str) -> Option<Vec<Image>> {
        let inner = self.inner.lock().await;
        inner
            .tables
            .get(table_name)
            .map(|table| table.items.values().cloned().collect())
    }

    /// Returns the item stored under the primary key of `key`.
    pub async fn get_item(&self, table_name: &str, key: &Image) -> Option<Image> {
        let inner = self.inner.lock().await;
        let table = inner.tables.get(table_name)?;
        table
            .items
            .get(&project_key(key, &table.key_fields))
            .cloned()
    }

    /// Makes the next batch writes leave their last `counts[i]` requests unprocessed.
    pub async fn leave_unprocessed(&self, counts: impl IntoIterator<Item = usize>) {
        let mut inner = self.inner.lock().await;
        inner.unprocessed_script.extend(counts);
    }

    /// Makes the next batch write fail with `error` without applying anything.
    pub async fn fail_next(&self, error: MigratorError) {
        let mut inner = self.inner.lock().await;
        inner.failure_script.push_back(error);
    }
}

impl Default for MemoryDestination {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the primary key of a request after checking it against the table's key schema.
fn request_key(table: &MemoryTable, request: &WriteRequest) -> MigratorResult<Image> {
    let image = request.image();
    let key = project_key(image, &table.key_fields);

    if key.len() != table.key_fields.len() {
        bail!(
            ErrorKind::DestinationValidationFailed,
            "The provided key element does not match the schema",
            format!(
                "Expected key attributes {:?}, found {:?}",
                table.key_fields.iter().collect::<Vec<_>>(),
                key.attribute_names().collect::<Vec<_>>()
            )
        );
    }

    if request.is_delete() && image.len() != key.len() {
        bail!(
            ErrorKind::DestinationValidationFailed,
            "The provided key element does not match the schema",
            "Delete keys must only contain primary key attributes"
        );
    }

    if let Some((name, value)) = key.iter().find(|(_, value)| value.key_scalar().is_none()) {
        bail!(
            ErrorKind::DestinationValidationFailed,
            "The provided key element does not match the schema",
            format!(
                "Key attribute '{name}' has type {}, expected S, N or B",
                value.type_tag()
            )
        );
    }

    Ok(key)
}

impl Destination for MemoryDestination {
    fn name() -> &'static str {
        "memory"
    }

    async fn batch_write(
        &self,
        table_name: &str,
        requests: Vec<WriteRequest>,
    ) -> MigratorResult<BatchWriteOutput> {
        let mut inner = self.inner.lock().await;

        if let Some(error) = inner.failure_script.pop_front() {
            return Err(error);
        }

        if requests.is_empty() || requests.len() > MAX_BATCH_WRITE_REQUESTS {
            bail!(
                ErrorKind::DestinationValidationFailed,
                "Invalid number of write requests",
                format!(
                    "A batch write needs between 1 and {MAX_BATCH_WRITE_REQUESTS} requests, got {}",
                    requests.len()
                )
            );
        }

        let unprocessed_count = inner
            .unprocessed_script
            .pop_front()
            .unwrap_or(0)
            .min(requests.len());

        let Some(table) = inner.tables.get_mut(table_name) else {
            bail!(
                ErrorKind::DestinationValidationFailed,
                "Requested resource not found",
                format!("The table '{table_name}' does not exist")
            );
        };

        let mut seen = BTreeSet::new();
        let mut keyed = Vec::with_capacity(requests.len());
        for request in requests {
            let key = request_key(table, &request)?;
            if !seen.insert(key.clone()) {
                bail!(
                    ErrorKind::DestinationValidationFailed,
                    "Provided list of item keys contains duplicates",
                    format!("The key {key:?} appears more than once in the batch")
                );
            }
            keyed.push((key, request));
        }

        let unprocessed = keyed
            .split_off(keyed.len() - unprocessed_count)
            .into_iter()
            .map(|(_, request)| request)
            .collect::<Vec<_>>();

        info!(
            "applying {} write requests to table '{}' ({} unprocessed)",
            keyed.len(),
            table_name,
            unprocessed.len()
        );

        for (key, request) in keyed {
            debug!("  {:?}", request);
            match request {
                WriteRequest::Put { item } => {
                    table.items.insert(key, item);
                }
                WriteRequest::Delete { .. } => {
                    table.items.remove(&key);
                }
            }
        }

        Ok(BatchWriteOutput { unprocessed })
    }
}
