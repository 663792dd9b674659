use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{RelayError, RelayResult};

pub const STRING_ATTRIBUTE_TYPE: &str = "String";

/// Line items of an order. Values are kept exactly as the client supplied
/// them, string or number.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coffeetype: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coffeesize: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unitprice: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
}

impl OrderDetails {
    pub fn field(&self, name: &str) -> Option<&Value> {
        match name {
            "coffeetype" => self.coffeetype.as_ref(),
            "coffeesize" => self.coffeesize.as_ref(),
            "unitprice" => self.unitprice.as_ref(),
            "quantity" => self.quantity.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accountid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendorid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orderid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orderdate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<OrderDetails>,
}

impl Order {
    /// Returns a non-blank string attribute by name.
    pub fn text_field(&self, name: &str) -> Option<&str> {
        let value = match name {
            "accountid" => self.accountid.as_deref(),
            "vendorid" => self.vendorid.as_deref(),
            "orderid" => self.orderid.as_deref(),
            "orderdate" => self.orderdate.as_deref(),
            "city" => self.city.as_deref(),
            _ => None,
        };
        value.filter(|text| !text.trim().is_empty())
    }

    /// Returns any top-level attribute as JSON, `details` included.
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == "details" {
            return self
                .details
                .as_ref()
                .and_then(|details| serde_json::to_value(details).ok());
        }
        self.text_field(name).map(|text| Value::String(text.to_string()))
    }

    pub fn has_identifier(&self) -> bool {
        self.text_field("accountid").is_some() || self.text_field("orderid").is_some()
    }
}

/// Inbound HTTP body: `{"order": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRequest {
    pub order: Order,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageAttribute {
    #[serde(rename = "Type", alias = "DataType", default = "string_attribute_type")]
    pub data_type: String,
    #[serde(rename = "Value", alias = "StringValue")]
    pub value: String,
}

impl MessageAttribute {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            data_type: STRING_ATTRIBUTE_TYPE.to_string(),
            value: value.into(),
        }
    }
}

fn string_attribute_type() -> String {
    STRING_ATTRIBUTE_TYPE.to_string()
}

/// Pub/sub delivery wrapper as it arrives in a subscribed queue's body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    #[serde(rename = "MessageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "MessageAttributes", default)]
    pub message_attributes: BTreeMap<String, MessageAttribute>,
}

impl Envelope {
    pub fn new(message: impl Into<String>, attributes: BTreeMap<String, MessageAttribute>) -> Self {
        Self {
            message_id: None,
            message: message.into(),
            message_attributes: attributes,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.message_attributes
            .get(name)
            .map(|attribute| attribute.value.as_str())
            .filter(|value| !value.trim().is_empty())
    }

    pub fn order(&self) -> RelayResult<OrderRequest> {
        decode_inbound(&self.message)
    }

    pub fn digest(&self) -> String {
        order_digest(&self.message)
    }
}

pub fn decode_inbound(raw_body: &str) -> RelayResult<OrderRequest> {
    let payload: Value = serde_json::from_str(raw_body)
        .map_err(|error| RelayError::malformed(format!("body is not valid JSON: {error}")))?;

    let Some(order) = payload.get("order") else {
        return Err(RelayError::malformed("body must contain an 'order' object"));
    };
    if !order.is_object() {
        return Err(RelayError::malformed("'order' must be a JSON object"));
    }

    let order: Order = serde_json::from_value(order.clone())
        .map_err(|error| RelayError::malformed(format!("invalid order: {error}")))?;
    if !order.has_identifier() {
        return Err(RelayError::malformed(
            "order must carry a non-empty accountid or orderid",
        ));
    }

    Ok(OrderRequest { order })
}

pub fn decode_delivery(raw_delivery_body: &str) -> RelayResult<Envelope> {
    let payload: Value = serde_json::from_str(raw_delivery_body).map_err(|error| {
        RelayError::malformed(format!("delivery body is not valid JSON: {error}"))
    })?;

    if !payload.get("Message").is_some_and(Value::is_string) {
        return Err(RelayError::malformed(
            "delivery body must carry a string 'Message'",
        ));
    }

    serde_json::from_value(payload)
        .map_err(|error| RelayError::malformed(format!("invalid delivery envelope: {error}")))
}

/// Decodes every record body of a queue trigger event, in order.
pub fn decode_queue_event(event: &Value) -> RelayResult<Vec<Envelope>> {
    let records = event
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| RelayError::malformed("queue event must include Records array"))?;

    let mut envelopes = Vec::with_capacity(records.len());
    for record in records {
        let body = record
            .get("body")
            .and_then(Value::as_str)
            .ok_or_else(|| RelayError::malformed("queue record body must be a string"))?;
        envelopes.push(decode_delivery(body)?);
    }

    Ok(envelopes)
}

/// Hex SHA-256 of a message body. Logged instead of the payload itself.
pub fn order_digest(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}
