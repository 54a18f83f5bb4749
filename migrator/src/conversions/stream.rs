use serde::Deserialize;

use crate::bail;
use crate::error::{ErrorKind, MigratorResult};
use crate::types::{ChangeRecord, Image};

/// A change stream event as delivered to a stream consumer: `{"Records": [...]}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "Records")]
    pub records: Vec<StreamRecord>,
}

/// One record of a [`StreamEvent`].
///
/// Fields other than the event name, id and the change payload are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamRecord {
    #[serde(rename = "eventID", default)]
    pub event_id: Option<String>,
    #[serde(rename = "eventName")]
    pub event_name: StreamEventName,
    pub dynamodb: StreamPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StreamEventName {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "MODIFY")]
    Modify,
    #[serde(rename = "REMOVE")]
    Remove,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamPayload {
    #[serde(rename = "Keys")]
    pub keys: Option<Image>,
    #[serde(rename = "NewImage", default)]
    pub new_image: Option<Image>,
    #[serde(rename = "OldImage", default)]
    pub old_image: Option<Image>,
}

impl StreamEvent {
    /// Parses a stream event from its JSON representation.
    pub fn from_json(json: &str) -> MigratorResult<StreamEvent> {
        Ok(serde_json::from_str(json)?)
    }

    /// Converts all records into change records, preserving their order.
    pub fn into_change_records(self) -> MigratorResult<Vec<ChangeRecord>> {
        self.records
            .into_iter()
            .enumerate()
            .map(|(index, record)| record.into_change_record(index))
            .collect()
    }
}

impl StreamRecord {
    fn into_change_record(self, index: usize) -> MigratorResult<ChangeRecord> {
        let id = self
            .event_id
            .unwrap_or_else(|| format!("record #{index}"));
        let payload = self.dynamodb;

        let Some(source_key) = payload.keys else {
            bail!(
                ErrorKind::InvalidData,
                "Stream record has no keys",
                format!("The stream record '{id}' is missing `Keys`")
            );
        };

        let record = match (self.event_name, payload.new_image, payload.old_image) {
            (StreamEventName::Insert, Some(new_image), _) => ChangeRecord::Inserted {
                new_image,
                source_key,
            },
            (StreamEventName::Modify, Some(new_image), Some(old_image)) => {
                ChangeRecord::Modified {
                    new_image,
                    old_image,
                    source_key,
                }
            }
            (StreamEventName::Remove, _, Some(old_image)) => ChangeRecord::Removed {
                old_image,
                source_key,
            },
            (event_name, new_image, old_image) => {
                let missing = match (event_name, new_image.is_none(), old_image.is_none()) {
                    (StreamEventName::Modify, true, true) => "`NewImage` and `OldImage`",
                    (StreamEventName::Remove, _, _) => "`OldImage`",
                    (StreamEventName::Modify, false, true) => "`OldImage`",
                    _ => "`NewImage`",
                };

                bail!(
                    ErrorKind::InvalidData,
                    "Stream record is missing images",
                    format!(
                        "The {event_name:?} stream record '{id}' is missing {missing}; the stream must capture new and old images"
                    )
                );
            }
        };

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeValue;

    #[test]
    fn converts_records_in_order() {
        let event = StreamEvent::from_json(
            r#"{"Records": [
                {"eventID": "1", "eventName": "INSERT", "awsRegion": "eu-west-1",
                 "dynamodb": {"Keys": {"id": {"S": "a"}}, "NewImage": {"id": {"S": "a"}, "v": {"N": "1"}},
                              "SequenceNumber": "100", "StreamViewType": "NEW_AND_OLD_IMAGES"}},
                {"eventID": "2", "eventName": "REMOVE",
                 "dynamodb": {"Keys": {"id": {"S": "b"}}, "OldImage": {"id": {"S": "b"}}}}
            ]}"#,
        )
        .unwrap();

        let records = event.into_change_records().unwrap();

        assert_eq!(records.len(), 2);
        match &records[0] {
            ChangeRecord::Inserted { new_image, .. } => {
                assert_eq!(new_image.get("v"), Some(&AttributeValue::N("1".to_owned())));
            }
            other => panic!("unexpected record: {other:?}"),
        }
        assert!(matches!(records[1], ChangeRecord::Removed { .. }));
    }

    #[test]
    fn modify_without_old_image_is_invalid() {
        let event = StreamEvent::from_json(
            r#"{"Records": [{"eventID": "7", "eventName": "MODIFY",
                 "dynamodb": {"Keys": {"id": {"S": "a"}}, "NewImage": {"id": {"S": "a"}}}}]}"#,
        )
        .unwrap();

        let err = event.into_change_records().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(err.detail().unwrap().contains("'7' is missing `OldImage`"));
    }

    #[test]
    fn missing_keys_are_invalid() {
        let event = StreamEvent::from_json(
            r#"{"Records": [{"eventName": "REMOVE", "dynamodb": {"OldImage": {"id": {"S": "a"}}}}]}"#,
        )
        .unwrap();

        let err = event.into_change_records().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(err.detail().unwrap().contains("record #0"));
    }

    #[test]
    fn unknown_event_names_fail_to_parse() {
        let err = StreamEvent::from_json(
            r#"{"Records": [{"eventName": "UPSERT", "dynamodb": {"Keys": {}}}]}"#,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeserializationError);
    }
}
