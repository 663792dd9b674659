use std::collections::BTreeMap;

use order_relay_core::contract::{decode_inbound, order_digest, MessageAttribute};
use order_relay_core::{RelayError, RelayResult};
use serde_json::Value;
use tracing::{error, info};

use crate::adapters::observer::{observe, InvocationObserver};
use crate::adapters::publisher::{MessageId, MessagePublisher};
use crate::config::TopicConfig;
use crate::handlers::http::{request_body, ApiGatewayResponse, WRITE_METHODS};

pub const OPERATION: &str = "publish_order";

/// `POST /order`: publishes the request body unchanged, routed by the
/// profile's attributes, and answers with the broker's message id.
pub fn handle_publish(
    event: &Value,
    config: &TopicConfig,
    publisher: &dyn MessagePublisher,
    observer: &dyn InvocationObserver,
) -> RelayResult<ApiGatewayResponse> {
    observe(observer, OPERATION, || {
        let body = request_body(event).inspect_err(|error| log_rejected(config, error))?;
        let request = decode_inbound(&body).inspect_err(|error| log_rejected(config, error))?;

        for (key, value) in config.profile.annotations(&request.order) {
            observer.annotate(OPERATION, &key, &value);
        }

        let attributes = config
            .profile
            .message_attributes(&request.order)
            .inspect_err(|error| log_rejected(config, error))?;
        let message_id = publish(&body, &attributes, config, publisher)?;

        Ok(ApiGatewayResponse::ok(Value::String(message_id), WRITE_METHODS))
    })
}

/// Exactly one publish call. Not idempotent: repeating it publishes again.
pub fn publish(
    body: &str,
    attributes: &BTreeMap<String, MessageAttribute>,
    config: &TopicConfig,
    publisher: &dyn MessagePublisher,
) -> RelayResult<MessageId> {
    let digest = order_digest(body);

    match publisher.publish(&config.topic, body, attributes) {
        Ok(message_id) => {
            info!(
                component = "publish_handler",
                event = "order_published",
                digest = %digest,
                topic = %config.topic,
                message_id = %message_id,
            );
            Ok(message_id)
        }
        Err(message) => {
            let error = RelayError::downstream("sns:Publish", &config.topic, message);
            error!(
                component = "publish_handler",
                event = "publish_failed",
                digest = %digest,
                topic = %config.topic,
                error = %error,
            );
            Err(error)
        }
    }
}

fn log_rejected(config: &TopicConfig, error: &RelayError) {
    error!(
        component = "publish_handler",
        event = "request_rejected",
        topic = %config.topic,
        error_code = error.code(),
        error = %error,
    );
}
