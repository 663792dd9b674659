use std::collections::BTreeMap;

use order_relay_core::contract::MessageAttribute;

/// Broker-assigned identifier of a published message.
pub type MessageId = String;

pub trait MessagePublisher {
    fn publish(
        &self,
        topic: &str,
        message: &str,
        attributes: &BTreeMap<String, MessageAttribute>,
    ) -> Result<MessageId, String>;
}
