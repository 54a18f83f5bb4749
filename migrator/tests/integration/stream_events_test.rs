use config::shared::MigratorConfig;
use migrator::conversions::stream::StreamEvent;
use migrator::destination::memory::MemoryDestination;
use migrator::error::ErrorKind;
use migrator::key::KeyFields;
use migrator::mapping::IdentityMapper;
use migrator::replication::ChangeBatcher;
use migrator::test_utils::test_destination_wrapper::TestDestinationWrapper;
use migrator::types::{AttributeValue, ChangeKind, Image};
use telemetry::init_test_tracing;

const EVENT: &str = r#"{
  "Records": [
    {
      "eventID": "1",
      "eventName": "INSERT",
      "eventSource": "aws:dynamodb",
      "dynamodb": {
        "Keys": {"pk": {"S": "order#1"}},
        "NewImage": {
          "pk": {"S": "order#1"},
          "total": {"N": "19.99"},
          "paid": {"BOOL": false},
          "tags": {"SS": ["new", "web"]},
          "lines": {"L": [{"M": {"sku": {"S": "A-1"}, "qty": {"N": "2"}}}]}
        },
        "SequenceNumber": "111",
        "SizeBytes": 120,
        "StreamViewType": "NEW_AND_OLD_IMAGES"
      }
    },
    {
      "eventID": "2",
      "eventName": "MODIFY",
      "dynamodb": {
        "Keys": {"pk": {"S": "order#1"}},
        "NewImage": {"pk": {"S": "order#1"}, "total": {"N": "19.99"}, "paid": {"BOOL": true}},
        "OldImage": {"pk": {"S": "order#1"}, "total": {"N": "19.99"}, "paid": {"BOOL": false}}
      }
    },
    {
      "eventID": "3",
      "eventName": "INSERT",
      "dynamodb": {
        "Keys": {"pk": {"S": "order#2"}},
        "NewImage": {"pk": {"S": "order#2"}, "note": {"NULL": true}, "blob": {"B": "AQID"}}
      }
    },
    {
      "eventID": "4",
      "eventName": "REMOVE",
      "dynamodb": {
        "Keys": {"pk": {"S": "order#2"}},
        "OldImage": {"pk": {"S": "order#2"}, "note": {"NULL": true}, "blob": {"B": "AQID"}}
      }
    }
  ]
}"#;

#[tokio::test(flavor = "multi_thread")]
async fn stream_event_is_replayed_into_the_destination() {
    init_test_tracing();
    let records = StreamEvent::from_json(EVENT)
        .unwrap()
        .into_change_records()
        .unwrap();
    let kinds = records.iter().map(|record| record.kind()).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            ChangeKind::Insert,
            ChangeKind::Modify,
            ChangeKind::Insert,
            ChangeKind::Remove
        ]
    );

    let destination = TestDestinationWrapper::wrap(MemoryDestination::with_table(
        "orders",
        KeyFields::new(["pk"]),
    ));
    let batcher = ChangeBatcher::new(MigratorConfig::new("orders"), destination, IdentityMapper);

    let summary = batcher.process_changes(records).await.unwrap();

    assert_eq!(summary.records, 4);
    assert_eq!(summary.batches, 3);
    assert_eq!(
        batcher.destination().inner().items("orders").await.unwrap(),
        vec![
            Image::new()
                .with("pk", "order#1")
                .with("total", AttributeValue::N("19.99".to_string()))
                .with("paid", true)
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_attribute_values_are_rejected_before_processing() {
    init_test_tracing();
    let event = r#"{"Records": [{"eventID": "1", "eventName": "INSERT", "dynamodb": {
        "Keys": {"pk": {"S": "a"}},
        "NewImage": {"pk": {"S": "a"}, "amount": {"N": "not-a-number"}}
    }}]}"#;

    let err = StreamEvent::from_json(event).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DeserializationError);
}

#[tokio::test(flavor = "multi_thread")]
async fn records_without_images_are_rejected() {
    init_test_tracing();
    let event = r#"{"Records": [{"eventID": "abc", "eventName": "MODIFY", "dynamodb": {
        "Keys": {"pk": {"S": "a"}},
        "NewImage": {"pk": {"S": "a"}}
    }}]}"#;

    let err = StreamEvent::from_json(event)
        .unwrap()
        .into_change_records()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidData);
    assert!(err.detail().unwrap().contains("abc"));
}
