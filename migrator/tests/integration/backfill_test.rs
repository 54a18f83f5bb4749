use config::shared::{BackfillConfig, MappingRuleConfig, MigratorConfig};
use migrator::backfill::Backfill;
use migrator::backfill::memory::MemorySourceTable;
use migrator::destination::memory::MemoryDestination;
use migrator::error::ErrorKind;
use migrator::key::KeyFields;
use migrator::mapping::RuleMapper;
use migrator::migrator_error;
use migrator::replication::ChangeBatcher;
use migrator::types::{AttributeValue, ChangeRecord, Image};
use telemetry::init_test_tracing;

const SOURCE_TABLE: &str = "legacy";
const DESTINATION_TABLE: &str = "single_table";

fn source_key_fields() -> KeyFields {
    KeyFields::new(["PartitionKey", "SortKey"])
}

fn backfill_config(page_size: usize, time_budget_ms: Option<u64>) -> BackfillConfig {
    BackfillConfig {
        source_table: SOURCE_TABLE.to_string(),
        key_fields: vec!["PartitionKey".to_string(), "SortKey".to_string()],
        page_size,
        migrated_attribute: BackfillConfig::DEFAULT_MIGRATED_ATTRIBUTE.to_string(),
        time_budget_ms,
    }
}

fn legacy_item(index: usize) -> Image {
    Image::new()
        .with("PartitionKey", format!("user#{index}"))
        .with("SortKey", "profile")
        .with("someKey", AttributeValue::N(index.to_string()))
}

fn legacy_key(index: usize) -> Image {
    Image::new()
        .with("PartitionKey", format!("user#{index}"))
        .with("SortKey", "profile")
}

/// Creates a source holding `count` legacy items written before the migration started.
async fn seeded_source(count: usize) -> MemorySourceTable {
    let source = MemorySourceTable::with_table(SOURCE_TABLE, source_key_fields());
    for index in 0..count {
        source
            .put_item(SOURCE_TABLE, legacy_item(index))
            .await
            .unwrap();
    }
    // These writes predate the change stream.
    source.take_changes().await;

    source
}

fn migrate_batcher() -> ChangeBatcher<MemoryDestination, RuleMapper> {
    let rules = vec![
        MappingRuleConfig::Copy {
            from: "SortKey".to_string(),
            to: "gsi1_pk".to_string(),
        },
        MappingRuleConfig::Format {
            to: "gsi1_sk".to_string(),
            template: "new-{someKey}".to_string(),
        },
        MappingRuleConfig::Rename {
            from: "PartitionKey".to_string(),
            to: "pk".to_string(),
        },
        MappingRuleConfig::Rename {
            from: "SortKey".to_string(),
            to: "sk".to_string(),
        },
    ];
    let config = MigratorConfig {
        key_fields: Some(vec!["pk".to_string(), "sk".to_string()]),
        ..MigratorConfig::new(DESTINATION_TABLE)
    };
    let destination =
        MemoryDestination::with_table(DESTINATION_TABLE, KeyFields::new(["pk", "sk"]));

    ChangeBatcher::new(config, destination, RuleMapper::new(&rules).unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn backfill_replays_existing_items_through_the_batcher() {
    init_test_tracing();
    let source = seeded_source(5).await;
    let backfill = Backfill::new(backfill_config(2, None), source.clone());

    let progress = backfill.run(None).await.unwrap();

    assert!(progress.is_complete());
    assert_eq!(progress.pages, 3);
    assert_eq!(progress.items_marked, 5);
    assert_eq!(progress.items_missing, 0);

    let changes = source.take_changes().await;
    assert_eq!(changes.len(), 5);
    assert!(
        changes
            .iter()
            .all(|change| matches!(change, ChangeRecord::Modified { .. }))
    );

    let batcher = migrate_batcher();
    let summary = batcher.process_changes(changes).await.unwrap();
    assert_eq!(summary.puts, 5);
    assert_eq!(summary.key_changes, 0);

    let migrated = batcher
        .destination()
        .get_item(
            DESTINATION_TABLE,
            &Image::new().with("pk", "user#3").with("sk", "profile"),
        )
        .await
        .unwrap();
    assert_eq!(migrated.get("gsi1_pk"), Some(&AttributeValue::from("profile")));
    assert_eq!(migrated.get("gsi1_sk"), Some(&AttributeValue::from("new-3")));
    assert!(migrated.contains(BackfillConfig::DEFAULT_MIGRATED_ATTRIBUTE));
    assert!(!migrated.contains("PartitionKey"));
    assert_eq!(
        batcher
            .destination()
            .items(DESTINATION_TABLE)
            .await
            .unwrap()
            .len(),
        5
    );
}

#[tokio::test(start_paused = true)]
async fn exhausted_time_budget_stops_after_a_page_and_resumes() {
    init_test_tracing();
    let source = seeded_source(5).await;
    let backfill = Backfill::new(backfill_config(2, Some(0)), source.clone());

    let first = backfill.run(None).await.unwrap();
    assert_eq!(first.pages, 1);
    assert_eq!(first.items_marked, 2);
    assert_eq!(first.last_evaluated_key, Some(legacy_key(1)));

    let mut start_key = first.last_evaluated_key;
    let mut runs = 1;
    let mut marked = first.items_marked;
    while let Some(key) = start_key {
        let progress = backfill.run(Some(key)).await.unwrap();
        runs += 1;
        marked += progress.items_marked;
        start_key = progress.last_evaluated_key;
    }

    assert_eq!(runs, 3);
    assert_eq!(marked, 5);
    assert_eq!(source.take_changes().await.len(), 5);
}

#[tokio::test(flavor = "multi_thread")]
async fn items_deleted_after_the_scan_are_counted_as_missing() {
    init_test_tracing();
    let source = seeded_source(3).await;
    source
        .vanish_after_scan(SOURCE_TABLE, &legacy_key(1))
        .await
        .unwrap();
    let backfill = Backfill::new(backfill_config(25, None), source.clone());

    let progress = backfill.run(None).await.unwrap();

    assert_eq!(progress.items_marked, 2);
    assert_eq!(progress.items_missing, 1);

    let changes = source.take_changes().await;
    assert!(matches!(changes[0], ChangeRecord::Removed { .. }));

    let batcher = migrate_batcher();
    let summary = batcher.process_changes(changes).await.unwrap();
    assert_eq!(summary.deletes, 1);
    assert_eq!(
        batcher
            .destination()
            .items(DESTINATION_TABLE)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_stamps_are_aggregated_and_the_page_can_be_retried() {
    init_test_tracing();
    let source = seeded_source(3).await;
    source
        .fail_next_mark(migrator_error!(
            ErrorKind::SourceConnectionFailed,
            "Connection reset by peer"
        ))
        .await;
    source
        .fail_next_mark(migrator_error!(ErrorKind::SourceError, "Throughput exceeded"))
        .await;
    let backfill = Backfill::new(backfill_config(25, None), source.clone());

    let err = backfill.run(None).await.unwrap_err();

    let mut kinds = err.kinds();
    kinds.sort_by_key(|kind| format!("{kind:?}"));
    assert_eq!(
        kinds,
        vec![ErrorKind::SourceConnectionFailed, ErrorKind::SourceError]
    );

    let progress = backfill.run(None).await.unwrap();
    assert!(progress.is_complete());
    assert_eq!(progress.items_marked, 3);
}
