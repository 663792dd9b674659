use lambda_runtime::{service_fn, Error, LambdaEvent};
use order_relay_lambda::adapters::aws::{load_sdk_config, DynamoItemStore};
use order_relay_lambda::adapters::observer::TracingObserver;
use order_relay_lambda::config::TableConfig;
use order_relay_lambda::handlers::http::ApiGatewayResponse;
use order_relay_lambda::handlers::lookup::handle_get_item;
use order_relay_lambda::telemetry::init_tracing;
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &TableConfig,
    store: &DynamoItemStore,
) -> Result<ApiGatewayResponse, Error> {
    let observer = TracingObserver::new(event.context.request_id.clone());
    Ok(handle_get_item(&event.payload, config, store, &observer)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let config = TableConfig::from_env()?;
    let sdk_config = load_sdk_config().await;
    let store = DynamoItemStore::new(&sdk_config);

    lambda_runtime::run(service_fn(|event| handle_request(event, &config, &store))).await
}
