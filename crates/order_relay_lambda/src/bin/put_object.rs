use lambda_runtime::{service_fn, Error, LambdaEvent};
use order_relay_lambda::adapters::aws::{load_sdk_config, S3ObjectStore};
use order_relay_lambda::adapters::observer::TracingObserver;
use order_relay_lambda::config::BucketConfig;
use order_relay_lambda::handlers::archive::handle_archive_event;
use order_relay_lambda::telemetry::init_tracing;
use serde_json::{json, Value};

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &BucketConfig,
    store: &S3ObjectStore,
) -> Result<Value, Error> {
    let observer = TracingObserver::new(event.context.request_id.clone());
    let keys = handle_archive_event(&event.payload, config, store, &observer)?;
    Ok(json!({ "status": "ok", "keys": keys }))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let config = BucketConfig::from_env()?;
    let sdk_config = load_sdk_config().await;
    let store = S3ObjectStore::new(&sdk_config);

    lambda_runtime::run(service_fn(|event| handle_request(event, &config, &store))).await
}
