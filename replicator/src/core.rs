use std::path::PathBuf;

use config::shared::{DestinationConfig, ReplicatorConfig};
use migrator::backfill::Backfill;
use migrator::backfill::dynamodb::DynamoDbSourceTable;
use migrator::conversions::stream::StreamEvent;
use migrator::destination::Destination;
use migrator::destination::dynamodb::DynamoDbDestination;
use migrator::destination::memory::MemoryDestination;
use migrator::error::MigratorError;
use migrator::key::KeyFields;
use migrator::mapping::{ImageMapper, RuleMapper};
use migrator::replication::{ChangeBatcher, ProcessSummary};
use migrator::types::Image;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::error::{ReplicatorError, ReplicatorResult};

/// Where stream events are read from.
#[derive(Debug, Clone)]
pub enum EventSource {
    /// A single stream event stored as JSON.
    File(PathBuf),
    /// Newline-delimited stream events, one invocation per line.
    Stdin,
}

/// Replays the stream events of `source` into the configured destination.
///
/// Each event is processed as one invocation. Processing stops at the first failing event so
/// that it can be redelivered as a whole.
pub async fn start_replicator_with_config(
    replicator_config: ReplicatorConfig,
    source: EventSource,
) -> ReplicatorResult<()> {
    info!("starting replicator");

    log_config(&replicator_config);

    let mapper = RuleMapper::new(&replicator_config.mapping)?;
    let migrator_config = replicator_config.migrator.clone();

    // Static dispatch per destination.
    match &replicator_config.destination {
        DestinationConfig::Memory { key_fields } => {
            let destination = MemoryDestination::with_table(
                migrator_config.table_name.clone(),
                KeyFields::new(key_fields),
            );
            let batcher = ChangeBatcher::new(migrator_config, destination, mapper);
            replicate_events(&batcher, source).await
        }
        DestinationConfig::DynamoDb {
            region,
            endpoint_url,
        } => {
            let destination =
                DynamoDbDestination::new(region.as_deref(), endpoint_url.as_deref()).await;
            let batcher = ChangeBatcher::new(migrator_config, destination, mapper);
            replicate_events(&batcher, source).await
        }
    }
}

/// Runs one backfill pass and prints its progress as JSON to stdout.
///
/// `start_key` is the `last_evaluated_key` printed by a previous pass that stopped early.
pub async fn start_backfill_with_config(
    replicator_config: ReplicatorConfig,
    start_key: Option<String>,
) -> ReplicatorResult<()> {
    let Some(backfill_config) = replicator_config.backfill.clone() else {
        return Err(ReplicatorError::invalid_config(
            "the `backfill` section is required to run a backfill",
        ));
    };

    let DestinationConfig::DynamoDb {
        region,
        endpoint_url,
    } = &replicator_config.destination
    else {
        return Err(ReplicatorError::invalid_config(
            "a backfill reads the source table from DynamoDB and needs a `dynamodb` destination",
        ));
    };

    let start_key = start_key
        .map(|json| serde_json::from_str::<Image>(&json))
        .transpose()
        .map_err(MigratorError::from)?;

    info!(
        source_table = %backfill_config.source_table,
        page_size = backfill_config.page_size,
        migrated_attribute = %backfill_config.migrated_attribute,
        time_budget_ms = ?backfill_config.time_budget_ms,
        "starting backfill"
    );

    let source = DynamoDbSourceTable::new(region.as_deref(), endpoint_url.as_deref()).await;
    let backfill = Backfill::new(backfill_config, source);
    let progress = backfill.run(start_key).await?;

    let output = serde_json::to_string_pretty(&progress).map_err(MigratorError::from)?;
    println!("{output}");

    Ok(())
}

async fn replicate_events<D, M>(
    batcher: &ChangeBatcher<D, M>,
    source: EventSource,
) -> ReplicatorResult<()>
where
    D: Destination + Sync,
    M: ImageMapper + Sync,
{
    match source {
        EventSource::File(path) => {
            let json = tokio::fs::read_to_string(&path).await?;
            process_event(batcher, &json).await?;
        }
        EventSource::Stdin => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let mut invocations = 0usize;

            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }

                process_event(batcher, &line).await?;
                invocations += 1;
            }

            info!(invocations, "stream input closed");
        }
    }

    Ok(())
}

async fn process_event<D, M>(
    batcher: &ChangeBatcher<D, M>,
    json: &str,
) -> ReplicatorResult<ProcessSummary>
where
    D: Destination + Sync,
    M: ImageMapper + Sync,
{
    let records = StreamEvent::from_json(json)?.into_change_records()?;
    debug!(
        records = records.len(),
        destination = D::name(),
        "decoded stream event"
    );

    Ok(batcher.process_changes(records).await?)
}

fn log_config(config: &ReplicatorConfig) {
    let destination = match &config.destination {
        DestinationConfig::Memory { .. } => "memory",
        DestinationConfig::DynamoDb { .. } => "dynamodb",
    };

    info!(
        table_name = %config.migrator.table_name,
        key_fields = ?config.migrator.key_fields,
        key_match = ?config.migrator.key_match,
        max_entries = config.migrator.batch.max_entries,
        max_bytes = ?config.migrator.batch.max_bytes,
        max_attempts = config.migrator.retry.max_attempts,
        mapping_rules = config.mapping.len(),
        destination,
        "replicator configuration"
    );
}
