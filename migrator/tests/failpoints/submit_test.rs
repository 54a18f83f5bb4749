use config::shared::{BackfillConfig, MigratorConfig};
use migrator::backfill::Backfill;
use migrator::backfill::memory::MemorySourceTable;
use migrator::destination::memory::MemoryDestination;
use migrator::error::ErrorKind;
use migrator::failpoints::{BACKFILL__BEFORE_MARK, BATCH_SUBMIT__BEFORE_WRITE};
use migrator::key::KeyFields;
use migrator::mapping::IdentityMapper;
use migrator::replication::ChangeBatcher;
use migrator::test_utils::failpoints::CustomFailScenario;
use migrator::test_utils::record::distinct_inserts;
use migrator::test_utils::test_destination_wrapper::TestDestinationWrapper;
use migrator::types::Image;
use telemetry::init_test_tracing;

fn create_batcher() -> ChangeBatcher<TestDestinationWrapper<MemoryDestination>, IdentityMapper> {
    let memory = MemoryDestination::with_table("items", KeyFields::new(["pk"]));

    ChangeBatcher::new(
        MigratorConfig::new("items"),
        TestDestinationWrapper::wrap(memory),
        IdentityMapper,
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn injected_throttling_aborts_before_writing() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(
        BATCH_SUBMIT__BEFORE_WRITE,
        "return(throttled)",
    )]);
    let batcher = create_batcher();

    let err = batcher
        .process_changes(distinct_inserts(3))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DestinationThrottled);
    assert!(batcher.destination().batches().await.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn redelivered_records_are_applied_after_a_failed_submission() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(
        BATCH_SUBMIT__BEFORE_WRITE,
        "1*return(connection)",
    )]);
    let batcher = create_batcher();

    let err = batcher
        .process_changes(distinct_inserts(30))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DestinationConnectionFailed);

    // The change source redelivers the whole invocation.
    let summary = batcher.process_changes(distinct_inserts(30)).await.unwrap();

    assert_eq!(summary.batches, 2);
    assert_eq!(
        batcher
            .destination()
            .inner()
            .items("items")
            .await
            .unwrap()
            .len(),
        30
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unparameterized_fail_point_reports_injected_failure() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(
        BATCH_SUBMIT__BEFORE_WRITE,
        "return",
    )]);
    let batcher = create_batcher();

    let err = batcher
        .process_changes(distinct_inserts(1))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InjectedFailure);
}

#[tokio::test(flavor = "multi_thread")]
async fn backfill_stops_when_stamping_fails_and_resumes_cleanly() {
    init_test_tracing();
    let _scenario = CustomFailScenario::setup(&[(
        BACKFILL__BEFORE_MARK,
        "1*return(source)",
    )]);
    let source = MemorySourceTable::with_table("legacy", KeyFields::new(["id"]));
    for id in ["a", "b", "c"] {
        source
            .put_item("legacy", Image::new().with("id", id).with("v", "1"))
            .await
            .unwrap();
    }
    source.take_changes().await;
    let config = BackfillConfig {
        source_table: "legacy".to_string(),
        key_fields: vec!["id".to_string()],
        page_size: 10,
        migrated_attribute: BackfillConfig::DEFAULT_MIGRATED_ATTRIBUTE.to_string(),
        time_budget_ms: None,
    };
    let backfill = Backfill::new(config, source.clone());

    let err = backfill.run(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SourceError);
    assert_eq!(source.take_changes().await.len(), 2);

    let progress = backfill.run(None).await.unwrap();
    assert!(progress.is_complete());
    assert_eq!(progress.items_marked, 3);
}
