//! AWS-backed capability implementations.
//!
//! The capability traits are synchronous: each call is one blocking round
//! trip. These implementations bridge into the async SDK clients on the
//! Lambda runtime's multi-threaded executor.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;

use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_sns::types::MessageAttributeValue;
use order_relay_core::contract::MessageAttribute;
use order_relay_core::routing::PersistedRecord;
use serde_json::{Map, Number, Value};

use crate::adapters::item_store::ItemStore;
use crate::adapters::object_store::ObjectStore;
use crate::adapters::publisher::{MessageId, MessagePublisher};

pub async fn load_sdk_config() -> SdkConfig {
    aws_config::load_defaults(BehaviorVersion::latest()).await
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

#[derive(Clone)]
pub struct SnsPublisher {
    client: aws_sdk_sns::Client,
}

impl SnsPublisher {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_sns::Client::new(config),
        }
    }
}

impl MessagePublisher for SnsPublisher {
    fn publish(
        &self,
        topic: &str,
        message: &str,
        attributes: &BTreeMap<String, MessageAttribute>,
    ) -> Result<MessageId, String> {
        let mut message_attributes = HashMap::with_capacity(attributes.len());
        for (name, attribute) in attributes {
            let value = MessageAttributeValue::builder()
                .data_type(attribute.data_type.clone())
                .string_value(attribute.value.clone())
                .build()
                .map_err(|error| format!("invalid message attribute '{name}': {error}"))?;
            message_attributes.insert(name.clone(), value);
        }

        let client = self.client.clone();
        let topic_arn = topic.to_string();
        let body = message.to_string();

        block_on(async move {
            let output = client
                .publish()
                .topic_arn(topic_arn)
                .message(body)
                .set_message_attributes(Some(message_attributes))
                .send()
                .await
                .map_err(|error| format!("failed to publish message to sns: {error}"))?;
            output
                .message_id()
                .map(str::to_string)
                .ok_or_else(|| "sns publish returned no message id".to_string())
        })
    }
}

#[derive(Clone)]
pub struct DynamoItemStore {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoItemStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_dynamodb::Client::new(config),
        }
    }
}

impl ItemStore for DynamoItemStore {
    fn put_item(&self, table: &str, record: &PersistedRecord) -> Result<(), String> {
        let client = self.client.clone();
        let table_name = table.to_string();
        let item = to_attribute_map(record);

        block_on(async move {
            client
                .put_item()
                .table_name(table_name)
                .set_item(Some(item))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to put item to dynamodb: {error}"))
        })
    }

    fn get_item(
        &self,
        table: &str,
        key: &PersistedRecord,
    ) -> Result<Option<PersistedRecord>, String> {
        let client = self.client.clone();
        let table_name = table.to_string();
        let key = to_attribute_map(key);

        block_on(async move {
            let output = client
                .get_item()
                .table_name(table_name)
                .set_key(Some(key))
                .send()
                .await
                .map_err(|error| format!("failed to get item from dynamodb: {error}"))?;
            output.item().map(from_attribute_map).transpose()
        })
    }
}

fn to_attribute_map(record: &PersistedRecord) -> HashMap<String, AttributeValue> {
    record
        .iter()
        .map(|(name, value)| (name.clone(), to_attribute_value(value)))
        .collect()
}

fn from_attribute_map(item: &HashMap<String, AttributeValue>) -> Result<PersistedRecord, String> {
    Ok(from_attribute_fields(item)?.into_iter().collect())
}

pub fn to_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(flag) => AttributeValue::Bool(*flag),
        Value::Number(number) => AttributeValue::N(number.to_string()),
        Value::String(text) => AttributeValue::S(text.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute_value).collect()),
        Value::Object(fields) => AttributeValue::M(
            fields
                .iter()
                .map(|(name, value)| (name.clone(), to_attribute_value(value)))
                .collect(),
        ),
    }
}

/// Binary attributes have no JSON form and are reported, not dropped.
pub fn from_attribute_value(value: &AttributeValue) -> Result<Value, String> {
    match value {
        AttributeValue::S(text) => Ok(Value::String(text.clone())),
        AttributeValue::N(number) => Ok(number_value(number)),
        AttributeValue::Bool(flag) => Ok(Value::Bool(*flag)),
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::L(items) => items
            .iter()
            .map(from_attribute_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        AttributeValue::M(fields) => from_attribute_fields(fields).map(Value::Object),
        AttributeValue::Ss(items) => {
            Ok(Value::Array(items.iter().cloned().map(Value::String).collect()))
        }
        AttributeValue::Ns(items) => {
            Ok(Value::Array(items.iter().map(String::as_str).map(number_value).collect()))
        }
        AttributeValue::B(_) | AttributeValue::Bs(_) => {
            Err("binary dynamodb attributes cannot be read as json".to_string())
        }
        _ => Err("unknown dynamodb attribute type".to_string()),
    }
}

fn from_attribute_fields(
    fields: &HashMap<String, AttributeValue>,
) -> Result<Map<String, Value>, String> {
    fields
        .iter()
        .map(|(name, value)| {
            from_attribute_value(value)
                .map(|value| (name.clone(), value))
                .map_err(|error| format!("attribute '{name}': {error}"))
        })
        .collect()
}

fn number_value(text: &str) -> Value {
    serde_json::from_str::<Number>(text)
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(text.to_string()))
}

#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_s3::Client::new(config),
        }
    }
}

impl ObjectStore for S3ObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), String> {
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let object_key = key.to_string();
        let body_bytes = body.to_vec();
        let content_type = content_type.to_string();

        block_on(async move {
            client
                .put_object()
                .bucket(bucket)
                .key(object_key)
                .content_type(content_type)
                .body(ByteStream::from(body_bytes))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to write object to s3: {error}"))
        })
    }

    fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|error| format!("invalid presigning window: {error}"))?;
        let client = self.client.clone();
        let bucket = bucket.to_string();
        let object_key = key.to_string();

        block_on(async move {
            client
                .get_object()
                .bucket(bucket)
                .key(object_key)
                .presigned(presigning)
                .await
                .map(|request| request.uri().to_string())
                .map_err(|error| format!("failed to presign s3 get_object: {error}"))
        })
    }
}
