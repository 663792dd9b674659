use lambda_runtime::{service_fn, Error, LambdaEvent};
use order_relay_lambda::adapters::aws::{load_sdk_config, SnsPublisher};
use order_relay_lambda::adapters::observer::TracingObserver;
use order_relay_lambda::config::TopicConfig;
use order_relay_lambda::handlers::http::ApiGatewayResponse;
use order_relay_lambda::handlers::publish::handle_publish;
use order_relay_lambda::telemetry::init_tracing;
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &TopicConfig,
    publisher: &SnsPublisher,
) -> Result<ApiGatewayResponse, Error> {
    let observer = TracingObserver::new(event.context.request_id.clone());
    Ok(handle_publish(&event.payload, config, publisher, &observer)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();
    let config = TopicConfig::from_env()?;
    let sdk_config = load_sdk_config().await;
    let publisher = SnsPublisher::new(&sdk_config);

    lambda_runtime::run(service_fn(|event| handle_request(event, &config, &publisher))).await
}
