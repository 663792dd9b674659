use order_relay_core::contract::{decode_queue_event, Envelope};
use order_relay_core::storage_keys::ARCHIVE_CONTENT_TYPE;
use order_relay_core::{RelayError, RelayResult};
use serde_json::Value;
use tracing::{error, info};

use crate::adapters::object_store::ObjectStore;
use crate::adapters::observer::{observe, InvocationObserver};
use crate::config::BucketConfig;

pub const OPERATION: &str = "put_object";

pub fn handle_archive_event(
    event: &Value,
    config: &BucketConfig,
    store: &dyn ObjectStore,
    observer: &dyn InvocationObserver,
) -> RelayResult<Vec<String>> {
    let envelopes = decode_queue_event(event).inspect_err(|error| {
        error!(
            component = "archive_handler",
            event = "queue_event_rejected",
            bucket = %config.bucket,
            error = %error,
        );
    })?;

    envelopes
        .iter()
        .map(|envelope| handle_archive(envelope, config, store, observer))
        .collect()
}

/// Stores the delivered message text under a key derived from its routing
/// attribute and returns that key. A colliding key replaces the object.
pub fn handle_archive(
    envelope: &Envelope,
    config: &BucketConfig,
    store: &dyn ObjectStore,
    observer: &dyn InvocationObserver,
) -> RelayResult<String> {
    let digest = envelope.digest();

    observe(observer, OPERATION, || {
        let key = config
            .profile
            .archive_key
            .resolve(|name| envelope.attribute(name))?;
        if let Some(name) = config.profile.archive_key.attribute_name() {
            if let Some(value) = envelope.attribute(name) {
                observer.annotate(OPERATION, name, value);
            }
        }

        store
            .put_object(
                &config.bucket,
                &key,
                envelope.message.as_bytes(),
                ARCHIVE_CONTENT_TYPE,
            )
            .map_err(|message| RelayError::downstream("s3:PutObject", &config.bucket, message))?;
        Ok(key)
    })
    .inspect(|key| {
        info!(
            component = "archive_handler",
            event = "object_put",
            digest = %digest,
            bucket = %config.bucket,
            key = %key,
        );
    })
    .inspect_err(|error| {
        error!(
            component = "archive_handler",
            event = "put_object_failed",
            digest = %digest,
            bucket = %config.bucket,
            error_code = error.code(),
            error = %error,
        );
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use order_relay_core::routing::RoutingProfile;
    use order_relay_core::storage_keys::ArchiveKeyScheme;

    use super::*;
    use crate::adapters::observer::NoopObserver;
    use crate::test_helpers::{delivery, sqs_event, InMemoryObjectStore, SAMPLE_ORDER_BODY};

    const BUCKET: &str = "order-archive";

    fn config(profile: RoutingProfile) -> BucketConfig {
        BucketConfig {
            bucket: BUCKET.to_string(),
            profile,
            presigned_url_ttl: Duration::from_secs(3600),
        }
    }

    #[test]
    fn derives_account_key_and_stores_message_as_json() {
        let store = InMemoryObjectStore::new();
        let key = handle_archive(
            &delivery(SAMPLE_ORDER_BODY, &[("accountid", "42")]),
            &config(RoutingProfile::account()),
            &store,
            &NoopObserver,
        )
        .expect("archive should succeed");

        assert_eq!(key, "accountid_42.json");
        let object = store.object(BUCKET, "accountid_42.json").expect("object stored");
        assert_eq!(object.body, SAMPLE_ORDER_BODY.as_bytes());
        assert_eq!(object.content_type, "application/json");
    }

    #[test]
    fn order_profile_keys_by_orderid() {
        let store = InMemoryObjectStore::new();
        let key = handle_archive(
            &delivery(r#"{"order":{"orderid":"42"}}"#, &[("orderid", "42")]),
            &config(RoutingProfile::order()),
            &store,
            &NoopObserver,
        )
        .expect("archive should succeed");
        assert_eq!(key, "orderid_42.json");
    }

    #[test]
    fn missing_routing_attribute_is_reported() {
        let store = InMemoryObjectStore::new();
        let error = handle_archive(
            &delivery(SAMPLE_ORDER_BODY, &[("vendorid", "V9")]),
            &config(RoutingProfile::account()),
            &store,
            &NoopObserver,
        )
        .expect_err("accountid attribute absent");

        assert_eq!(error, RelayError::missing_attribute("accountid"));
        assert!(store.is_empty());
    }

    #[test]
    fn fixed_key_overwrites_previous_archive() {
        let store = InMemoryObjectStore::new();
        let config = config(
            RoutingProfile::account().with_archive_key(ArchiveKeyScheme::fixed("order.json")),
        );
        let second = r#"{"order":{"accountid":"B2"}}"#;

        handle_archive(&delivery(SAMPLE_ORDER_BODY, &[]), &config, &store, &NoopObserver)
            .expect("first archive");
        handle_archive(&delivery(second, &[]), &config, &store, &NoopObserver)
            .expect("second archive");

        assert_eq!(store.len(), 1);
        let object = store.object(BUCKET, "order.json").expect("object stored");
        assert_eq!(object.body, second.as_bytes());
    }

    #[test]
    fn store_failure_propagates_without_partial_object() {
        let store = InMemoryObjectStore::failing("AccessDenied");
        let error = handle_archive(
            &delivery(SAMPLE_ORDER_BODY, &[("accountid", "A1")]),
            &config(RoutingProfile::account()),
            &store,
            &NoopObserver,
        )
        .expect_err("bucket rejects put");

        assert_eq!(
            error,
            RelayError::downstream("s3:PutObject", BUCKET, "AccessDenied")
        );
        assert!(store.is_empty());
    }

    #[test]
    fn queue_event_stops_at_first_failure() {
        let store = InMemoryObjectStore::new();
        let event = sqs_event(&[
            delivery(SAMPLE_ORDER_BODY, &[("accountid", "A1")]),
            delivery(SAMPLE_ORDER_BODY, &[]),
            delivery(SAMPLE_ORDER_BODY, &[("accountid", "A3")]),
        ]);

        let error = handle_archive_event(
            &event,
            &config(RoutingProfile::account()),
            &store,
            &NoopObserver,
        )
        .expect_err("second record has no routing attribute");

        assert_eq!(error, RelayError::missing_attribute("accountid"));
        assert_eq!(store.len(), 1);
    }
}
