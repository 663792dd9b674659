use order_relay_core::{RelayError, RelayResult};
use serde_json::Value;
use tracing::{error, info};

use crate::adapters::object_store::ObjectStore;
use crate::adapters::observer::{observe, InvocationObserver};
use crate::config::BucketConfig;
use crate::handlers::http::{query_parameter, ApiGatewayResponse, READ_METHODS};

pub const OPERATION: &str = "get_presigned_url";

/// `GET /invoice?accountid=..`: signs a fresh read URL for the archived
/// order on every call. The object is not looked up first, so a URL is
/// returned even when nothing has been archived under the key yet.
pub fn handle_presigned_url(
    event: &Value,
    config: &BucketConfig,
    store: &dyn ObjectStore,
    observer: &dyn InvocationObserver,
) -> RelayResult<ApiGatewayResponse> {
    observe(observer, OPERATION, || {
        let key = config
            .profile
            .archive_key
            .resolve(|name| query_parameter(event, name))?;

        let url = store
            .presigned_get_url(&config.bucket, &key, config.presigned_url_ttl)
            .map_err(|message| RelayError::downstream("s3:GetObject", &config.bucket, message))?;

        info!(
            component = "presign_handler",
            event = "url_signed",
            bucket = %config.bucket,
            key = %key,
            expires_in_secs = config.presigned_url_ttl.as_secs(),
        );
        Ok(ApiGatewayResponse::ok(Value::String(url), READ_METHODS))
    })
    .inspect_err(|error| {
        error!(
            component = "presign_handler",
            event = "presign_failed",
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
    use serde_json::json;

    use super::*;
    use crate::adapters::observer::NoopObserver;
    use crate::test_helpers::InMemoryObjectStore;

    fn config() -> BucketConfig {
        BucketConfig {
            bucket: "order-archive".to_string(),
            profile: RoutingProfile::account(),
            presigned_url_ttl: Duration::from_secs(3600),
        }
    }

    #[test]
    fn signs_url_for_account_object_even_when_absent() {
        let store = InMemoryObjectStore::new();
        let response = handle_presigned_url(
            &json!({"queryStringParameters": {"accountid": "A1"}}),
            &config(),
            &store,
            &NoopObserver,
        )
        .expect("signing should succeed");

        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(response.headers["Access-Control-Allow-Methods"], "OPTIONS,GET");
        let url: String = serde_json::from_str(&response.body).expect("body is a JSON string");
        assert!(url.starts_with("https://order-archive.s3.amazonaws.com/accountid_A1.json?"));
        assert!(url.contains("X-Amz-Expires=3600"));
        assert!(store.is_empty());
    }

    #[test]
    fn every_call_signs_a_fresh_url() {
        let store = InMemoryObjectStore::new();
        let event = json!({"queryStringParameters": {"accountid": "A1"}});
        let first = handle_presigned_url(&event, &config(), &store, &NoopObserver).expect("first");
        let second =
            handle_presigned_url(&event, &config(), &store, &NoopObserver).expect("second");

        assert_ne!(first.body, second.body);
        assert_eq!(store.presign_requests(), 2);
    }

    #[test]
    fn missing_accountid_is_an_error() {
        let store = InMemoryObjectStore::new();
        let error = handle_presigned_url(
            &json!({"queryStringParameters": null}),
            &config(),
            &store,
            &NoopObserver,
        )
        .expect_err("accountid is required");

        assert_eq!(error, RelayError::missing_attribute("accountid"));
        assert_eq!(store.presign_requests(), 0);
    }

    #[test]
    fn signer_failure_propagates() {
        let store = InMemoryObjectStore::failing("ExpiredToken");
        let error = handle_presigned_url(
            &json!({"queryStringParameters": {"accountid": "A1"}}),
            &config(),
            &store,
            &NoopObserver,
        )
        .expect_err("signer rejects request");

        assert_eq!(
            error,
            RelayError::downstream("s3:GetObject", "order-archive", "ExpiredToken")
        );
    }
}
