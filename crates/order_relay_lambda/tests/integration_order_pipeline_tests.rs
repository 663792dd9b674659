use std::time::Duration;

use order_relay_core::routing::RoutingProfile;
use order_relay_core::RelayError;
use order_relay_lambda::adapters::observer::NoopObserver;
use order_relay_lambda::config::{BucketConfig, TableConfig, TopicConfig};
use order_relay_lambda::handlers::archive::handle_archive_event;
use order_relay_lambda::handlers::lookup::handle_get_item;
use order_relay_lambda::handlers::persist::handle_persist_event;
use order_relay_lambda::handlers::presign::handle_presigned_url;
use order_relay_lambda::handlers::publish::handle_publish;
use order_relay_lambda::test_helpers::{
    api_event, sqs_event, InMemoryBroker, InMemoryObjectStore, InMemoryTable, SAMPLE_ORDER_BODY,
};
use serde_json::{json, Value};

const TOPIC: &str = "arn:aws:sns:eu-west-1:123456789012:lambda_api_topic";
const TABLE: &str = "sqs_sns_lambda_dynamodb";
const BUCKET: &str = "order-archive";

struct Pipeline {
    topic: TopicConfig,
    table: TableConfig,
    bucket: BucketConfig,
    broker: InMemoryBroker,
    items: InMemoryTable,
    objects: InMemoryObjectStore,
}

impl Pipeline {
    fn new(profile: RoutingProfile) -> Self {
        Self {
            topic: TopicConfig {
                topic: TOPIC.to_string(),
                profile: profile.clone(),
            },
            table: TableConfig {
                table: TABLE.to_string(),
                profile: profile.clone(),
            },
            items: InMemoryTable::new(&profile),
            bucket: BucketConfig {
                bucket: BUCKET.to_string(),
                profile,
                presigned_url_ttl: Duration::from_secs(3600),
            },
            broker: InMemoryBroker::new(),
            objects: InMemoryObjectStore::new(),
        }
    }

    /// Fans every published message out to both subscribed queues. The
    /// archive queue is drained first since the two consumers are unordered.
    fn drain_queues(&self) {
        let event = sqs_event(&self.broker.deliveries());
        handle_archive_event(&event, &self.bucket, &self.objects, &NoopObserver)
            .expect("archive consumer should succeed");
        handle_persist_event(&event, &self.table, &self.items, &NoopObserver)
            .expect("persist consumer should succeed");
    }
}

#[test]
fn order_flows_from_http_to_table_and_archive() {
    let pipeline = Pipeline::new(RoutingProfile::account_vendor());

    let response = handle_publish(
        &api_event(SAMPLE_ORDER_BODY),
        &pipeline.topic,
        &pipeline.broker,
        &NoopObserver,
    )
    .expect("publish should succeed");
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, "\"msg-1\"");

    pipeline.drain_queues();

    let record = pipeline
        .items
        .get(&["A1", "V9"])
        .expect("record keyed by A1/V9");
    assert_eq!(
        Value::Object(record.into_iter().collect()),
        json!({
            "accountid": "A1",
            "vendorid": "V9",
            "orderdate": "2024-01-01",
            "city": "NYC",
            "details": {
                "coffeetype": "latte",
                "coffeesize": "M",
                "unitprice": 4.5,
                "quantity": 2
            }
        })
    );

    let object = pipeline
        .objects
        .object(BUCKET, "accountid_A1.json")
        .expect("archived object");
    assert_eq!(object.body, SAMPLE_ORDER_BODY.as_bytes());
    assert_eq!(object.content_type, "application/json");
}

#[test]
fn archived_order_is_readable_through_presigned_url_and_lookup() {
    let pipeline = Pipeline::new(RoutingProfile::account());
    handle_publish(
        &api_event(SAMPLE_ORDER_BODY),
        &pipeline.topic,
        &pipeline.broker,
        &NoopObserver,
    )
    .expect("publish should succeed");
    pipeline.drain_queues();

    let url_response = handle_presigned_url(
        &json!({"queryStringParameters": {"accountid": "A1"}}),
        &pipeline.bucket,
        &pipeline.objects,
        &NoopObserver,
    )
    .expect("presign should succeed");
    let url: String = serde_json::from_str(&url_response.body).expect("JSON string body");
    assert!(url.contains("/accountid_A1.json?"));

    let item_response = handle_get_item(
        &json!({"queryStringParameters": {"accountid": "A1", "vendorid": "V9"}}),
        &pipeline.table,
        &pipeline.items,
        &NoopObserver,
    )
    .expect("lookup should succeed");
    assert_eq!(item_response.status_code, 200);
}

#[test]
fn duplicate_submissions_are_not_deduplicated() {
    let pipeline = Pipeline::new(RoutingProfile::account());
    let event = api_event(SAMPLE_ORDER_BODY);

    let first = handle_publish(&event, &pipeline.topic, &pipeline.broker, &NoopObserver)
        .expect("first publish");
    let second = handle_publish(&event, &pipeline.topic, &pipeline.broker, &NoopObserver)
        .expect("second publish");
    assert_ne!(first.body, second.body);
    assert_eq!(pipeline.broker.deliveries().len(), 2);

    pipeline.drain_queues();

    assert_eq!(pipeline.items.len(), 1);
    assert_eq!(pipeline.objects.len(), 1);
}

#[test]
fn orderid_profile_routes_by_order_identifier() {
    let pipeline = Pipeline::new(RoutingProfile::order());
    let body = json!({
        "order": {
            "orderid": "42",
            "accountid": "A1",
            "details": {"coffeetype": "espresso", "quantity": "1"}
        }
    })
    .to_string();

    handle_publish(
        &api_event(&body),
        &pipeline.topic,
        &pipeline.broker,
        &NoopObserver,
    )
    .expect("publish should succeed");
    pipeline.drain_queues();

    assert!(pipeline.objects.object(BUCKET, "orderid_42.json").is_some());
    let record = pipeline.items.get(&["42"]).expect("record keyed by orderid");
    assert_eq!(
        record.get("details"),
        Some(&json!({"coffeetype": "espresso", "quantity": "1"}))
    );
}

#[test]
fn presigned_url_is_issued_before_anything_is_archived() {
    let pipeline = Pipeline::new(RoutingProfile::account());

    let response = handle_presigned_url(
        &json!({"queryStringParameters": {"accountid": "nobody"}}),
        &pipeline.bucket,
        &pipeline.objects,
        &NoopObserver,
    )
    .expect("signing does not check for the object");

    let url: String = serde_json::from_str(&response.body).expect("JSON string body");
    assert!(url.starts_with("https://"));
    assert!(url.contains("accountid_nobody.json"));
    assert!(pipeline.objects.is_empty());
}

#[test]
fn downstream_failures_leave_no_partial_state() {
    let profile = RoutingProfile::account();
    let pipeline = Pipeline::new(profile.clone());
    handle_publish(
        &api_event(SAMPLE_ORDER_BODY),
        &pipeline.topic,
        &pipeline.broker,
        &NoopObserver,
    )
    .expect("publish should succeed");
    let event = sqs_event(&pipeline.broker.deliveries());

    let failing_items = InMemoryTable::failing(&profile, "InternalServerError");
    let persist_error =
        handle_persist_event(&event, &pipeline.table, &failing_items, &NoopObserver)
            .expect_err("table is down");
    assert!(matches!(
        persist_error,
        RelayError::DownstreamUnavailable { .. }
    ));
    assert!(failing_items.is_empty());

    let failing_objects = InMemoryObjectStore::failing("SlowDown");
    let archive_error =
        handle_archive_event(&event, &pipeline.bucket, &failing_objects, &NoopObserver)
            .expect_err("bucket is down");
    assert_eq!(
        archive_error,
        RelayError::downstream("s3:PutObject", BUCKET, "SlowDown")
    );
    assert!(failing_objects.is_empty());
}

#[test]
fn padded_account_identifier_stays_distinct_end_to_end() {
    let pipeline = Pipeline::new(RoutingProfile::account());
    let padded = SAMPLE_ORDER_BODY.replace(r#""accountid":"A1""#, r#""accountid":"A1 ""#);
    for body in [SAMPLE_ORDER_BODY, padded.as_str()] {
        handle_publish(
            &api_event(body),
            &pipeline.topic,
            &pipeline.broker,
            &NoopObserver,
        )
        .expect("publish should succeed");
    }
    let published: Vec<String> = pipeline
        .broker
        .published()
        .into_iter()
        .map(|message| message.attributes["accountid"].value.clone())
        .collect();
    assert_eq!(published, ["A1", "A1 "]);

    pipeline.drain_queues();

    assert_eq!(pipeline.items.len(), 2);
    assert_eq!(pipeline.objects.len(), 2);
    let padded_object = pipeline
        .objects
        .object(BUCKET, "accountid_A1 .json")
        .expect("padded order archived under its own key");
    assert_eq!(padded_object.body, padded.as_bytes());

    let response = handle_get_item(
        &json!({"queryStringParameters": {"accountid": "A1 ", "vendorid": "V9"}}),
        &pipeline.table,
        &pipeline.items,
        &NoopObserver,
    )
    .expect("lookup should succeed");
    let body: Value = serde_json::from_str(&response.body).expect("json body");
    assert_eq!(body["accountid"], "A1 ");
}
