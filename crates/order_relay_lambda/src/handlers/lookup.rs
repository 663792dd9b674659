use order_relay_core::{RelayError, RelayResult};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::adapters::item_store::ItemStore;
use crate::adapters::observer::{observe, InvocationObserver};
use crate::config::TableConfig;
use crate::handlers::http::{query_parameter, ApiGatewayResponse, READ_METHODS};

pub const OPERATION: &str = "get_item";

/// `GET /order?accountid=..&vendorid=..`: reads one persisted record back by
/// the profile's key fields.
pub fn handle_get_item(
    event: &Value,
    config: &TableConfig,
    store: &dyn ItemStore,
    observer: &dyn InvocationObserver,
) -> RelayResult<ApiGatewayResponse> {
    observe(observer, OPERATION, || {
        let key = config
            .profile
            .lookup_key(|name| query_parameter(event, name))?;
        for (name, value) in &key {
            if let Some(value) = value.as_str() {
                observer.annotate(OPERATION, name, value);
            }
        }

        let item = store
            .get_item(&config.table, &key)
            .map_err(|message| RelayError::downstream("dynamodb:GetItem", &config.table, message))?;

        info!(
            component = "lookup_handler",
            event = "item_read",
            table = %config.table,
            found = item.is_some(),
        );
        Ok(match item {
            Some(record) => ApiGatewayResponse::ok(
                Value::Object(record.into_iter().collect()),
                READ_METHODS,
            ),
            None => ApiGatewayResponse::json(404, json!({"error": "not_found"}), READ_METHODS),
        })
    })
    .inspect_err(|error| {
        error!(
            component = "lookup_handler",
            event = "get_item_failed",
            table = %config.table,
            error_code = error.code(),
            error = %error,
        );
    })
}
