use config::shared::{BatchConfig, MappingRuleConfig, MigratorConfig, RetryConfig};
use migrator::destination::memory::MemoryDestination;
use migrator::error::ErrorKind;
use migrator::key::{KeyFields, project_key};
use migrator::mapping::{IdentityMapper, ImageMapper, RuleMapper};
use migrator::replication::{ChangeBatcher, ProcessSummary};
use migrator::test_utils::record::{distinct_inserts, image, inserted, modified, removed};
use migrator::test_utils::test_destination_wrapper::TestDestinationWrapper;
use migrator::types::{AttributeValue, ChangeRecord, Image, WriteRequest};
use telemetry::init_test_tracing;

const TABLE_NAME: &str = "items";

type TestBatcher<M> = ChangeBatcher<TestDestinationWrapper<MemoryDestination>, M>;

fn create_batcher<M>(config: MigratorConfig, key_fields: &[&str], mapper: M) -> TestBatcher<M>
where
    M: ImageMapper + Sync,
{
    let memory = MemoryDestination::with_table(
        config.table_name.clone(),
        KeyFields::new(key_fields.iter().copied()),
    );

    ChangeBatcher::new(config, TestDestinationWrapper::wrap(memory), mapper)
}

async fn batch_sizes<M>(batcher: &TestBatcher<M>) -> Vec<usize>
where
    M: ImageMapper + Sync,
{
    batcher
        .destination()
        .batches()
        .await
        .iter()
        .map(Vec::len)
        .collect()
}

async fn stored_items<M>(batcher: &TestBatcher<M>) -> Vec<Image>
where
    M: ImageMapper + Sync,
{
    batcher
        .destination()
        .inner()
        .items(TABLE_NAME)
        .await
        .unwrap()
}

fn pk_of(request: &WriteRequest) -> Image {
    project_key(request.image(), &KeyFields::new(["pk"]))
}

/// Rules reshaping the legacy `PartitionKey`/`SortKey` layout into the single-table layout.
fn legacy_rules() -> Vec<MappingRuleConfig> {
    vec![
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
    ]
}

#[tokio::test(flavor = "multi_thread")]
async fn batches_never_contain_the_same_key_twice() {
    init_test_tracing();
    let batcher = create_batcher(MigratorConfig::new(TABLE_NAME), &["pk"], IdentityMapper);

    batcher
        .process_changes(vec![
            inserted(&[("pk", "a"), ("v", "1")]),
            inserted(&[("pk", "b"), ("v", "1")]),
            modified(&[("pk", "a"), ("v", "2")], &[("pk", "a"), ("v", "1")]),
            removed(&[("pk", "b"), ("v", "1")]),
            inserted(&[("pk", "c"), ("v", "1")]),
            modified(&[("pk", "a"), ("v", "3")], &[("pk", "a"), ("v", "2")]),
        ])
        .await
        .unwrap();

    assert_eq!(
        batcher
            .destination()
            .first_batch_with_duplicate_keys(pk_of)
            .await,
        None
    );
    assert_eq!(batch_sizes(&batcher).await, vec![2, 3, 1]);
}

#[tokio::test(flavor = "multi_thread")]
async fn last_write_to_a_key_wins() {
    init_test_tracing();
    let batcher = create_batcher(MigratorConfig::new(TABLE_NAME), &["pk"], IdentityMapper);

    batcher
        .process_changes(vec![
            inserted(&[("pk", "a"), ("v", "1")]),
            modified(&[("pk", "a"), ("v", "2")], &[("pk", "a"), ("v", "1")]),
            inserted(&[("pk", "b"), ("v", "1")]),
            removed(&[("pk", "b"), ("v", "1")]),
            modified(&[("pk", "a"), ("v", "3")], &[("pk", "a"), ("v", "2")]),
        ])
        .await
        .unwrap();

    assert_eq!(
        stored_items(&batcher).await,
        vec![image(&[("pk", "a"), ("v", "3")])]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn distinct_inserts_are_split_at_the_entry_ceiling() {
    init_test_tracing();
    let batcher = create_batcher(MigratorConfig::new(TABLE_NAME), &["pk"], IdentityMapper);

    let summary = batcher.process_changes(distinct_inserts(51)).await.unwrap();

    assert_eq!(batch_sizes(&batcher).await, vec![25, 25, 1]);
    assert_eq!(summary.batches, 3);
    assert_eq!(summary.puts, 51);
    assert_eq!(stored_items(&batcher).await.len(), 51);
}

#[tokio::test(flavor = "multi_thread")]
async fn configured_entry_ceiling_is_honored() {
    init_test_tracing();
    let config = MigratorConfig {
        batch: BatchConfig {
            max_entries: 10,
            ..BatchConfig::default()
        },
        ..MigratorConfig::new(TABLE_NAME)
    };
    let batcher = create_batcher(config, &["pk"], IdentityMapper);

    batcher.process_changes(distinct_inserts(23)).await.unwrap();

    assert_eq!(batch_sizes(&batcher).await, vec![10, 10, 3]);
}

#[tokio::test(flavor = "multi_thread")]
async fn key_changing_modification_deletes_the_old_item() {
    init_test_tracing();
    let batcher = create_batcher(MigratorConfig::new(TABLE_NAME), &["pk"], IdentityMapper);
    batcher
        .process_changes(vec![inserted(&[("pk", "old"), ("v", "1")])])
        .await
        .unwrap();

    // The source key stays the same while the destination key moves.
    let record = ChangeRecord::Modified {
        new_image: image(&[("pk", "new"), ("v", "2")]),
        old_image: image(&[("pk", "old"), ("v", "1")]),
        source_key: image(&[("id", "1")]),
    };
    let config = MigratorConfig {
        key_fields: Some(vec!["pk".to_string()]),
        ..MigratorConfig::new(TABLE_NAME)
    };
    let batcher = ChangeBatcher::new(config, batcher.destination().clone(), IdentityMapper);

    let summary = batcher.process_changes(vec![record]).await.unwrap();

    assert_eq!(summary.key_changes, 1);
    assert_eq!(
        batcher.destination().batches().await.last().cloned(),
        Some(vec![
            WriteRequest::Put {
                item: image(&[("pk", "new"), ("v", "2")]),
            },
            WriteRequest::Delete {
                key: image(&[("pk", "old")]),
            },
        ])
    );
    assert_eq!(
        batcher.destination().inner().items(TABLE_NAME).await.unwrap(),
        vec![image(&[("pk", "new"), ("v", "2")])]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn key_preserving_modification_writes_a_single_put() {
    init_test_tracing();
    let batcher = create_batcher(MigratorConfig::new(TABLE_NAME), &["pk"], IdentityMapper);

    let summary = batcher
        .process_changes(vec![modified(
            &[("pk", "a"), ("v", "2")],
            &[("pk", "a"), ("v", "1")],
        )])
        .await
        .unwrap();

    assert_eq!(
        summary,
        ProcessSummary {
            records: 1,
            batches: 1,
            puts: 1,
            deletes: 0,
            key_changes: 0,
            write_calls: 1,
        }
    );
    assert_eq!(
        batcher.destination().batches().await,
        vec![vec![WriteRequest::Put {
            item: image(&[("pk", "a"), ("v", "2")]),
        }]]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn removing_an_absent_item_succeeds() {
    init_test_tracing();
    let batcher = create_batcher(MigratorConfig::new(TABLE_NAME), &["pk"], IdentityMapper);

    let summary = batcher
        .process_changes(vec![removed(&[("pk", "never-written"), ("v", "1")])])
        .await
        .unwrap();

    assert_eq!(summary.deletes, 1);
    assert_eq!(batcher.destination().failed_calls().await, 0);
    assert!(stored_items(&batcher).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn declared_key_fields_override_the_source_key() {
    init_test_tracing();
    let config = MigratorConfig {
        key_fields: Some(vec!["tenant".to_string(), "id".to_string()]),
        ..MigratorConfig::new(TABLE_NAME)
    };
    let batcher = create_batcher(config, &["tenant", "id"], IdentityMapper);

    // Both records share the source key `tenant = acme`, but not the declared key.
    batcher
        .process_changes(vec![
            inserted(&[("tenant", "acme"), ("id", "1")]),
            inserted(&[("tenant", "acme"), ("id", "2")]),
        ])
        .await
        .unwrap();

    assert_eq!(batch_sizes(&batcher).await, vec![2]);
    assert_eq!(stored_items(&batcher).await.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn source_key_is_used_without_declared_key_fields() {
    init_test_tracing();
    let batcher = create_batcher(MigratorConfig::new(TABLE_NAME), &["pk"], IdentityMapper);

    batcher
        .process_changes(vec![
            inserted(&[("pk", "a"), ("v", "1")]),
            inserted(&[("pk", "a"), ("v", "2")]),
        ])
        .await
        .unwrap();

    assert_eq!(batch_sizes(&batcher).await, vec![1, 1]);
}

#[tokio::test(start_paused = true)]
async fn unprocessed_requests_are_resubmitted_until_applied() {
    init_test_tracing();
    let batcher = create_batcher(MigratorConfig::new(TABLE_NAME), &["pk"], IdentityMapper);
    batcher.destination().inner().leave_unprocessed([3, 1]).await;

    let summary = batcher.process_changes(distinct_inserts(5)).await.unwrap();

    assert_eq!(summary.batches, 1);
    assert_eq!(summary.write_calls, 3);
    assert_eq!(batch_sizes(&batcher).await, vec![5, 3, 1]);
    assert_eq!(stored_items(&batcher).await.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn persistent_throttling_exhausts_retries() {
    init_test_tracing();
    let config = MigratorConfig {
        retry: RetryConfig {
            max_attempts: 3,
            ..RetryConfig::default()
        },
        ..MigratorConfig::new(TABLE_NAME)
    };
    let batcher = create_batcher(config, &["pk"], IdentityMapper);
    batcher.destination().inner().leave_unprocessed([1, 1, 1]).await;

    let err = batcher
        .process_changes(distinct_inserts(2))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SubmitRetriesExhausted);
    assert_eq!(batch_sizes(&batcher).await, vec![2, 1, 1]);
    // Everything but the last request was applied before giving up.
    assert_eq!(stored_items(&batcher).await.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn destination_errors_abort_processing() {
    init_test_tracing();
    let config = MigratorConfig {
        batch: BatchConfig {
            max_entries: 2,
            ..BatchConfig::default()
        },
        ..MigratorConfig::new(TABLE_NAME)
    };
    let batcher = create_batcher(config, &["pk"], IdentityMapper);
    batcher
        .destination()
        .inner()
        .fail_next(migrator::migrator_error!(
            ErrorKind::DestinationConnectionFailed,
            "Connection reset by peer"
        ))
        .await;

    let err = batcher
        .process_changes(distinct_inserts(4))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DestinationConnectionFailed);
    assert_eq!(batcher.destination().failed_calls().await, 1);
    assert_eq!(batch_sizes(&batcher).await, vec![2]);
    assert!(stored_items(&batcher).await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn legacy_items_are_reshaped_into_the_new_layout() {
    init_test_tracing();
    let config = MigratorConfig {
        key_fields: Some(vec!["pk".to_string(), "sk".to_string()]),
        ..MigratorConfig::new(TABLE_NAME)
    };
    let mapper = RuleMapper::new(&legacy_rules()).unwrap();
    let batcher = create_batcher(config, &["pk", "sk"], mapper);

    let legacy = Image::new()
        .with("PartitionKey", "user#1")
        .with("SortKey", "profile")
        .with("someKey", AttributeValue::N("42".to_string()))
        .with("name", "Ada");

    batcher
        .process_changes(vec![ChangeRecord::Inserted {
            new_image: legacy,
            source_key: Image::new()
                .with("PartitionKey", "user#1")
                .with("SortKey", "profile"),
        }])
        .await
        .unwrap();

    let stored = batcher
        .destination()
        .inner()
        .get_item(TABLE_NAME, &Image::new().with("pk", "user#1").with("sk", "profile"))
        .await
        .unwrap();
    assert_eq!(
        stored,
        Image::new()
            .with("pk", "user#1")
            .with("sk", "profile")
            .with("gsi1_pk", "profile")
            .with("gsi1_sk", "new-42")
            .with("someKey", AttributeValue::N("42".to_string()))
            .with("name", "Ada")
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn mapped_key_change_moves_the_item() {
    init_test_tracing();
    let rules = vec![
        MappingRuleConfig::Format {
            to: "pk".to_string(),
            template: "user#{someKey}".to_string(),
        },
        MappingRuleConfig::Remove {
            attribute: "id".to_string(),
        },
    ];
    let config = MigratorConfig {
        key_fields: Some(vec!["pk".to_string()]),
        ..MigratorConfig::new(TABLE_NAME)
    };
    let batcher = create_batcher(config, &["pk"], RuleMapper::new(&rules).unwrap());

    let summary = batcher
        .process_changes(vec![
            inserted(&[("id", "1"), ("someKey", "a")]),
            modified(
                &[("id", "1"), ("someKey", "b")],
                &[("id", "1"), ("someKey", "a")],
            ),
        ])
        .await
        .unwrap();

    assert_eq!(summary.key_changes, 1);
    assert_eq!(
        stored_items(&batcher).await,
        vec![image(&[("pk", "user#b"), ("someKey", "b")])]
    );
}
