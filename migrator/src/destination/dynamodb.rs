use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::types::{DeleteRequest, PutRequest, WriteRequest as SdkWriteRequest};
use tracing::debug;

use crate::bail;
use crate::clients::dynamodb::{connect, from_sdk_item, sdk_error, to_sdk_item};
use crate::destination::{BatchWriteOutput, Destination};
use crate::error::{ErrorKind, MigratorError, MigratorResult};
use crate::migrator_error;
use crate::types::WriteRequest;

/// Destination writing batches with DynamoDB `BatchWriteItem`.
///
/// Items reported in `UnprocessedItems` are returned as unprocessed write requests. Throttling
/// errors for the whole request are reported as [`ErrorKind::DestinationThrottled`].
#[derive(Debug, Clone)]
pub struct DynamoDbDestination {
    client: Client,
}

impl DynamoDbDestination {
    pub async fn new(region: Option<&str>, endpoint_url: Option<&str>) -> Self {
        Self {
            client: connect(region, endpoint_url).await,
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_sdk_write_request(request: &WriteRequest) -> MigratorResult<SdkWriteRequest> {
    let builder = SdkWriteRequest::builder();
    let builder = match request {
        WriteRequest::Put { item } => builder.put_request(
            PutRequest::builder()
                .set_item(Some(to_sdk_item(item)))
                .build()
                .map_err(|err| {
                    migrator_error!(
                        ErrorKind::ConversionError,
                        "Failed to build put request",
                        err.to_string(),
                        source: err
                    )
                })?,
        ),
        WriteRequest::Delete { key } => builder.delete_request(
            DeleteRequest::builder()
                .set_key(Some(to_sdk_item(key)))
                .build()
                .map_err(|err| {
                    migrator_error!(
                        ErrorKind::ConversionError,
                        "Failed to build delete request",
                        err.to_string(),
                        source: err
                    )
                })?,
        ),
    };

    Ok(builder.build())
}

fn from_sdk_write_request(request: SdkWriteRequest) -> MigratorResult<WriteRequest> {
    if let Some(put) = request.put_request {
        return Ok(WriteRequest::Put {
            item: from_sdk_item(put.item)?,
        });
    }

    if let Some(delete) = request.delete_request {
        return Ok(WriteRequest::Delete {
            key: from_sdk_item(delete.key)?,
        });
    }

    bail!(
        ErrorKind::ConversionError,
        "Unprocessed write request is empty",
        "DynamoDB returned a write request without put or delete"
    );
}

fn batch_write_error(err: SdkError<BatchWriteItemError>) -> MigratorError {
    let kind = match err.as_service_error() {
        Some(
            BatchWriteItemError::ProvisionedThroughputExceededException(_)
            | BatchWriteItemError::RequestLimitExceeded(_),
        ) => ErrorKind::DestinationThrottled,
        Some(BatchWriteItemError::ResourceNotFoundException(_)) => {
            ErrorKind::DestinationValidationFailed
        }
        _ => ErrorKind::DestinationError,
    };

    sdk_error(
        err,
        ErrorKind::DestinationConnectionFailed,
        kind,
        "DynamoDB batch write failed",
    )
}

impl Destination for DynamoDbDestination {
    fn name() -> &'static str {
        "dynamodb"
    }

    async fn batch_write(
        &self,
        table_name: &str,
        requests: Vec<WriteRequest>,
    ) -> MigratorResult<BatchWriteOutput> {
        let write_requests = requests
            .iter()
            .map(to_sdk_write_request)
            .collect::<MigratorResult<Vec<_>>>()?;

        debug!(
            table_name,
            requests = write_requests.len(),
            "sending batch write item request"
        );

        let output = self
            .client
            .batch_write_item()
            .request_items(table_name, write_requests)
            .send()
            .await
            .map_err(batch_write_error)?;

        let unprocessed = output
            .unprocessed_items
            .and_then(|mut items| items.remove(table_name))
            .unwrap_or_default()
            .into_iter()
            .map(from_sdk_write_request)
            .collect::<MigratorResult<Vec<_>>>()?;

        Ok(BatchWriteOutput { unprocessed })
    }
}
