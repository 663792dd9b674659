//! In-memory capability fakes and event fixtures shared by unit and
//! integration tests.

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use order_relay_core::contract::{Envelope, MessageAttribute};
use order_relay_core::routing::{PersistedRecord, RoutingProfile};
use order_relay_core::RelayError;
use serde_json::{json, Value};
use tracing_subscriber::fmt::MakeWriter;

use crate::adapters::item_store::ItemStore;
use crate::adapters::object_store::ObjectStore;
use crate::adapters::observer::InvocationObserver;
use crate::adapters::publisher::{MessageId, MessagePublisher};

pub const SAMPLE_ORDER_BODY: &str = r#"{"order":{"accountid":"A1","vendorid":"V9","orderdate":"2024-01-01","city":"NYC","details":{"coffeetype":"latte","coffeesize":"M","unitprice":4.5,"quantity":2}}}"#;

pub fn api_event(body: &str) -> Value {
    json!({
        "httpMethod": "POST",
        "path": "/order",
        "body": body,
        "isBase64Encoded": false,
    })
}

/// Delivery as a topic subscription would enqueue it.
pub fn delivery(message: &str, attributes: &[(&str, &str)]) -> Envelope {
    Envelope::new(
        message,
        attributes
            .iter()
            .map(|(name, value)| (name.to_string(), MessageAttribute::string(*value)))
            .collect(),
    )
}

pub fn sqs_event(envelopes: &[Envelope]) -> Value {
    let records: Vec<Value> = envelopes
        .iter()
        .enumerate()
        .map(|(index, envelope)| {
            json!({
                "messageId": format!("sqs-{index}"),
                "eventSource": "aws:sqs",
                "body": serde_json::to_string(envelope).expect("envelope should serialize"),
            })
        })
        .collect();
    json!({ "Records": records })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub message_id: MessageId,
    pub topic: String,
    pub message: String,
    pub attributes: BTreeMap<String, MessageAttribute>,
}

/// Topic fake that assigns sequential ids and never deduplicates.
#[derive(Default)]
pub struct InMemoryBroker {
    published: Mutex<Vec<PublishedMessage>>,
    failure: Option<String>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            failure: Some(message.to_string()),
        }
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().expect("poisoned mutex").clone()
    }

    /// One delivery per published message, as each subscribed queue sees it.
    pub fn deliveries(&self) -> Vec<Envelope> {
        self.published()
            .into_iter()
            .map(|published| Envelope {
                message_id: Some(published.message_id),
                message: published.message,
                message_attributes: published.attributes,
            })
            .collect()
    }
}

impl MessagePublisher for InMemoryBroker {
    fn publish(
        &self,
        topic: &str,
        message: &str,
        attributes: &BTreeMap<String, MessageAttribute>,
    ) -> Result<MessageId, String> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        let mut published = self.published.lock().expect("poisoned mutex");
        let message_id = format!("msg-{}", published.len() + 1);
        published.push(PublishedMessage {
            message_id: message_id.clone(),
            topic: topic.to_string(),
            message: message.to_string(),
            attributes: attributes.clone(),
        });
        Ok(message_id)
    }
}

/// Table fake keyed by the profile's key fields.
pub struct InMemoryTable {
    key_fields: Vec<&'static str>,
    items: Mutex<BTreeMap<Vec<String>, PersistedRecord>>,
    failure: Option<String>,
}

impl InMemoryTable {
    pub fn new(profile: &RoutingProfile) -> Self {
        Self {
            key_fields: profile.key_fields.clone(),
            items: Mutex::new(BTreeMap::new()),
            failure: None,
        }
    }

    pub fn failing(profile: &RoutingProfile, message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(profile)
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("poisoned mutex").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key_values: &[&str]) -> Option<PersistedRecord> {
        let key: Vec<String> = key_values.iter().map(|value| value.to_string()).collect();
        self.items.lock().expect("poisoned mutex").get(&key).cloned()
    }

    fn key_of(&self, record: &PersistedRecord) -> Result<Vec<String>, String> {
        self.key_fields
            .iter()
            .map(|&name| {
                record
                    .get(name)
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| format!("ValidationException: missing key attribute {name}"))
            })
            .collect()
    }
}

impl ItemStore for InMemoryTable {
    fn put_item(&self, _table: &str, record: &PersistedRecord) -> Result<(), String> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        let key = self.key_of(record)?;
        self.items
            .lock()
            .expect("poisoned mutex")
            .insert(key, record.clone());
        Ok(())
    }

    fn get_item(
        &self,
        _table: &str,
        key: &PersistedRecord,
    ) -> Result<Option<PersistedRecord>, String> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        let key = self.key_of(key)?;
        Ok(self.items.lock().expect("poisoned mutex").get(&key).cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    presign_requests: Mutex<usize>,
    failure: Option<String>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().expect("poisoned mutex").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn presign_requests(&self) -> usize {
        *self.presign_requests.lock().expect("poisoned mutex")
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
    ) -> Result<(), String> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        self.objects.lock().expect("poisoned mutex").insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn presigned_get_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, String> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        let mut requests = self.presign_requests.lock().expect("poisoned mutex");
        *requests += 1;
        Ok(format!(
            "https://{bucket}.s3.amazonaws.com/{key}?X-Amz-Expires={}&X-Amz-Signature=sig{}",
            expires_in.as_secs(),
            *requests
        ))
    }
}

/// Records observer hooks as `kind:operation[:detail]` strings.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().expect("poisoned mutex").clone()
    }

    fn record(&self, event: String) {
        self.events.lock().expect("poisoned mutex").push(event);
    }
}

impl InvocationObserver for RecordingObserver {
    fn started(&self, operation: &str) {
        self.record(format!("started:{operation}"));
    }

    fn annotate(&self, operation: &str, key: &str, value: &str) {
        self.record(format!("annotate:{operation}:{key}={value}"));
    }

    fn succeeded(&self, operation: &str) {
        self.record(format!("succeeded:{operation}"));
    }

    fn failed(&self, operation: &str, error: &RelayError) {
        self.record(format!("failed:{operation}:{}", error.code()));
    }
}

/// Log sink for `telemetry::json_subscriber`; every writer shares one buffer.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Captured output parsed as one JSON object per line.
    pub fn lines(&self) -> Vec<Value> {
        let buffer = self.buffer.lock().expect("poisoned mutex");
        String::from_utf8_lossy(&buffer)
            .lines()
            .map(|line| serde_json::from_str(line).expect("log line should be JSON"))
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("poisoned mutex")
            .extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'w> MakeWriter<'w> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'w self) -> Self::Writer {
        self.clone()
    }
}
