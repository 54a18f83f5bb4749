//! DynamoDB client construction and attribute value conversions.

use std::collections::HashMap;

use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue as SdkAttributeValue;
use tracing::info;

use crate::bail;
use crate::error::{ErrorKind, MigratorError, MigratorResult};
use crate::migrator_error;
use crate::types::{AttributeValue, Image};

/// Builds a client from the default credential and region chain.
///
/// `region` and `endpoint_url` override the values found in the environment, the latter is
/// used to talk to local emulators.
pub async fn connect(region: Option<&str>, endpoint_url: Option<&str>) -> Client {
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);

    if let Some(region) = region {
        builder = builder.region(aws_sdk_dynamodb::config::Region::new(region.to_owned()));
    }

    if let Some(endpoint_url) = endpoint_url {
        builder = builder.endpoint_url(endpoint_url);
    }

    info!(?region, ?endpoint_url, "created dynamodb client");

    Client::from_conf(builder.build())
}

pub fn to_sdk_value(value: &AttributeValue) -> SdkAttributeValue {
    match value {
        AttributeValue::S(value) => SdkAttributeValue::S(value.clone()),
        AttributeValue::N(value) => SdkAttributeValue::N(value.clone()),
        AttributeValue::B(value) => SdkAttributeValue::B(Blob::new(value.clone())),
        AttributeValue::Bool(value) => SdkAttributeValue::Bool(*value),
        AttributeValue::Null => SdkAttributeValue::Null(true),
        AttributeValue::L(values) => {
            SdkAttributeValue::L(values.iter().map(to_sdk_value).collect())
        }
        AttributeValue::M(values) => SdkAttributeValue::M(
            values
                .iter()
                .map(|(name, value)| (name.clone(), to_sdk_value(value)))
                .collect(),
        ),
        AttributeValue::Ss(values) => SdkAttributeValue::Ss(values.clone()),
        AttributeValue::Ns(values) => SdkAttributeValue::Ns(values.clone()),
        AttributeValue::Bs(values) => {
            SdkAttributeValue::Bs(values.iter().map(|v| Blob::new(v.clone())).collect())
        }
    }
}

pub fn from_sdk_value(value: SdkAttributeValue) -> MigratorResult<AttributeValue> {
    let value = match value {
        SdkAttributeValue::S(value) => AttributeValue::S(value),
        SdkAttributeValue::N(value) => AttributeValue::N(value),
        SdkAttributeValue::B(value) => AttributeValue::B(value.into_inner()),
        SdkAttributeValue::Bool(value) => AttributeValue::Bool(value),
        SdkAttributeValue::Null(_) => AttributeValue::Null,
        SdkAttributeValue::L(values) => AttributeValue::L(
            values
                .into_iter()
                .map(from_sdk_value)
                .collect::<MigratorResult<_>>()?,
        ),
        SdkAttributeValue::M(values) => AttributeValue::M(
            values
                .into_iter()
                .map(|(name, value)| Ok((name, from_sdk_value(value)?)))
                .collect::<MigratorResult<_>>()?,
        ),
        SdkAttributeValue::Ss(values) => AttributeValue::Ss(values),
        SdkAttributeValue::Ns(values) => AttributeValue::Ns(values),
        SdkAttributeValue::Bs(values) => {
            AttributeValue::Bs(values.into_iter().map(Blob::into_inner).collect())
        }
        other => bail!(
            ErrorKind::ConversionError,
            "Unsupported DynamoDB attribute value",
            format!("{other:?}")
        ),
    };

    Ok(value)
}

pub fn to_sdk_item(image: &Image) -> HashMap<String, SdkAttributeValue> {
    image
        .iter()
        .map(|(name, value)| (name.clone(), to_sdk_value(value)))
        .collect()
}

pub fn from_sdk_item(item: HashMap<String, SdkAttributeValue>) -> MigratorResult<Image> {
    item.into_iter()
        .map(|(name, value)| Ok((name, from_sdk_value(value)?)))
        .collect()
}

/// Converts an SDK failure into a [`MigratorError`].
///
/// Dispatch failures and timeouts get `connection_kind`, everything else `kind`.
pub(crate) fn sdk_error<E>(
    err: SdkError<E>,
    connection_kind: ErrorKind,
    kind: ErrorKind,
    description: &'static str,
) -> MigratorError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let kind = match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => connection_kind,
        _ => kind,
    };
    let detail = DisplayErrorContext(&err).to_string();

    migrator_error!(kind, description, detail, source: err)
}
