use order_relay_core::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const WRITE_METHODS: &str = "OPTIONS,POST";
pub const READ_METHODS: &str = "OPTIONS,GET";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

impl ApiGatewayResponse {
    pub fn json(status_code: u16, payload: Value, allowed_methods: &str) -> Self {
        Self {
            status_code,
            headers: cors_headers(allowed_methods),
            body: payload.to_string(),
        }
    }

    pub fn ok(payload: Value, allowed_methods: &str) -> Self {
        Self::json(200, payload, allowed_methods)
    }
}

pub fn cors_headers(allowed_methods: &str) -> Value {
    json!({
        "Content-Type": "application/json",
        "Access-Control-Allow-Origin": "*",
        "Access-Control-Allow-Headers": "Content-Type,X-Amz-Date,X-Api-Key",
        "Access-Control-Allow-Methods": allowed_methods,
    })
}

/// Raw request body text of a proxy event. A direct invocation without a
/// `body` field is treated as the body itself.
pub fn request_body(event: &Value) -> RelayResult<String> {
    let Some(object) = event.as_object() else {
        return Err(RelayError::malformed("request payload must be a JSON object"));
    };

    let Some(body) = object.get("body") else {
        return Ok(event.to_string());
    };

    if object.get("isBase64Encoded").and_then(Value::as_bool) == Some(true) {
        return Err(RelayError::malformed(
            "base64-encoded request bodies are not accepted",
        ));
    }

    match body {
        Value::String(text) => Ok(text.clone()),
        Value::Object(_) => Ok(body.to_string()),
        Value::Null => Err(RelayError::malformed("request body is required")),
        _ => Err(RelayError::malformed("request body must be a JSON object")),
    }
}

pub fn query_parameter<'a>(event: &'a Value, name: &str) -> Option<&'a str> {
    event
        .get("queryStringParameters")
        .and_then(|params| params.get(name))
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_string_body_verbatim() {
        let body = r#"{"order": {"accountid": "A1"}}"#;
        let event = json!({"body": body, "httpMethod": "POST"});
        assert_eq!(request_body(&event).expect("body present"), body);
    }

    #[test]
    fn treats_bare_event_as_body() {
        let event = json!({"order": {"accountid": "A1"}});
        let body = request_body(&event).expect("bare event is the body");
        assert_eq!(serde_json::from_str::<Value>(&body).expect("json"), event);
    }

    #[test]
    fn rejects_null_and_encoded_bodies() {
        assert_eq!(
            request_body(&json!({"body": null})),
            Err(RelayError::malformed("request body is required"))
        );
        assert!(request_body(&json!({"body": "e30=", "isBase64Encoded": true})).is_err());
        assert!(request_body(&json!("text")).is_err());
    }

    #[test]
    fn reads_query_parameters() {
        let event = json!({"queryStringParameters": {"accountid": "A1"}});
        assert_eq!(query_parameter(&event, "accountid"), Some("A1"));
        assert_eq!(query_parameter(&event, "vendorid"), None);
        assert_eq!(
            query_parameter(&json!({"queryStringParameters": null}), "accountid"),
            None
        );
    }

    #[test]
    fn responses_carry_permissive_cors_headers() {
        let response = ApiGatewayResponse::ok(json!("msg-1"), WRITE_METHODS);
        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "\"msg-1\"");
        assert_eq!(response.headers["Access-Control-Allow-Origin"], "*");
        assert_eq!(response.headers["Access-Control-Allow-Methods"], "OPTIONS,POST");
    }
}
