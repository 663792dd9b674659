use order_relay_core::contract::{decode_queue_event, Envelope};
use order_relay_core::routing::PersistedRecord;
use order_relay_core::{RelayError, RelayResult};
use serde_json::Value;
use tracing::{error, info};

use crate::adapters::item_store::ItemStore;
use crate::adapters::observer::{observe, InvocationObserver};
use crate::config::TableConfig;

pub const OPERATION: &str = "put_item";

/// Processes every delivery of a queue event in order, stopping at the
/// first failure so the queue redelivers the batch.
pub fn handle_persist_event(
    event: &Value,
    config: &TableConfig,
    store: &dyn ItemStore,
    observer: &dyn InvocationObserver,
) -> RelayResult<usize> {
    let envelopes = decode_queue_event(event).inspect_err(|error| {
        error!(
            component = "persist_handler",
            event = "queue_event_rejected",
            table = %config.table,
            error = %error,
        );
    })?;

    for envelope in &envelopes {
        handle_persist(envelope, config, store, observer)?;
    }
    Ok(envelopes.len())
}

/// Writes the profile's projection of the delivered order. Every put fully
/// replaces a record with the same key.
pub fn handle_persist(
    envelope: &Envelope,
    config: &TableConfig,
    store: &dyn ItemStore,
    observer: &dyn InvocationObserver,
) -> RelayResult<PersistedRecord> {
    let digest = envelope.digest();

    observe(observer, OPERATION, || {
        let request = envelope.order()?;
        for (key, value) in config.profile.annotations(&request.order) {
            observer.annotate(OPERATION, &key, &value);
        }

        let record = config.profile.project(&request.order)?;
        store
            .put_item(&config.table, &record)
            .map_err(|message| RelayError::downstream("dynamodb:PutItem", &config.table, message))?;
        Ok(record)
    })
    .inspect(|_| {
        info!(
            component = "persist_handler",
            event = "item_put",
            digest = %digest,
            table = %config.table,
        );
    })
    .inspect_err(|error| {
        error!(
            component = "persist_handler",
            event = "put_item_failed",
            digest = %digest,
            table = %config.table,
            error_code = error.code(),
            error = %error,
        );
    })
}
