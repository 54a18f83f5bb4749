use std::collections::HashMap;

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::AttributeValue as SdkAttributeValue;

use crate::backfill::{MarkOutcome, ScanPage, SourceTable};
use crate::bail;
use crate::clients::dynamodb::{connect, from_sdk_item, sdk_error, to_sdk_item};
use crate::error::{ErrorKind, MigratorResult};
use crate::key::KeyFields;
use crate::types::Image;

/// Source table read with DynamoDB `Scan` and stamped with `UpdateItem`.
#[derive(Debug, Clone)]
pub struct DynamoDbSourceTable {
    client: Client,
}

impl DynamoDbSourceTable {
    pub async fn new(region: Option<&str>, endpoint_url: Option<&str>) -> Self {
        Self {
            client: connect(region, endpoint_url).await,
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

/// Builds `#k0, #k1, ...` with the matching expression attribute names.
fn key_projection(key_fields: &KeyFields) -> (String, HashMap<String, String>) {
    let names = key_fields
        .iter()
        .enumerate()
        .map(|(index, field)| (format!("#k{index}"), field.to_owned()))
        .collect::<Vec<_>>();
    let expression = names
        .iter()
        .map(|(placeholder, _)| placeholder.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    (expression, names.into_iter().collect())
}

impl SourceTable for DynamoDbSourceTable {
    fn name() -> &'static str {
        "dynamodb"
    }

    async fn scan_keys(
        &self,
        table_name: &str,
        key_fields: &KeyFields,
        limit: usize,
        exclusive_start_key: Option<&Image>,
    ) -> MigratorResult<ScanPage> {
        let (projection, names) = key_projection(key_fields);
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);

        let output = self
            .client
            .scan()
            .table_name(table_name)
            .limit(limit)
            .projection_expression(projection)
            .set_expression_attribute_names(Some(names))
            .set_exclusive_start_key(exclusive_start_key.map(to_sdk_item))
            .send()
            .await
            .map_err(|err| {
                sdk_error(
                    err,
                    ErrorKind::SourceConnectionFailed,
                    ErrorKind::SourceError,
                    "DynamoDB scan failed",
                )
            })?;

        let items = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(from_sdk_item)
            .collect::<MigratorResult<Vec<_>>>()?;
        let last_evaluated_key = output
            .last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(from_sdk_item)
            .transpose()?;

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
        let Some(first_key_field) = key.attribute_names().next() else {
            bail!(
                ErrorKind::InvalidData,
                "Cannot update an item without a key",
                format!("Empty key for table '{table_name}'")
            );
        };

        let result = self
            .client
            .update_item()
            .table_name(table_name)
            .set_key(Some(to_sdk_item(key)))
            .update_expression("SET #migrated = :now")
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#migrated", attribute)
            .expression_attribute_names("#pk", first_key_field)
            .expression_attribute_values(":now", SdkAttributeValue::S(timestamp.to_owned()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(MarkOutcome::Marked),
            Err(SdkError::ServiceError(service_err))
                if matches!(
                    service_err.err(),
                    UpdateItemError::ConditionalCheckFailedException(_)
                ) =>
            {
                Ok(MarkOutcome::Missing)
            }
            Err(err) => Err(sdk_error(
                err,
                ErrorKind::SourceConnectionFailed,
                ErrorKind::SourceError,
                "DynamoDB update item failed",
            )),
        }
    }
}
