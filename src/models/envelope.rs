//! Gateway envelope handling.
//!
//! The inventory and order services sit behind an API gateway that may wrap
//! the real payload once, as `{ "body": "<json string>" }` or
//! `{ "statusCode": 200, "body": "<json string>" }`. [`ResponseBody`] tags
//! the two shapes so exactly one layer is unwrapped.

use std::fmt;

use serde_json::Value;

/// Message for any response body the client cannot interpret.
pub const INVALID_RESPONSE_FORMAT: &str = "Invalid response format from server.";

/// A response body whose payload was malformed or could not be unwrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    pub message: String,
}

impl ProtocolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProtocolError {}

/// A decoded HTTP body, before envelope unwrapping.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The payload itself.
    Plain(Value),
    /// A payload serialized into the envelope's `body` string.
    Enveloped(String),
}

impl ResponseBody {
    /// Classifies a decoded body.
    ///
    /// A string `body` field marks an envelope. A `statusCode` envelope whose
    /// `body` is already an object is unwrapped in place.
    #[must_use]
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Object(mut map) => match map.remove("body") {
                Some(Value::String(inner)) => Self::Enveloped(inner),
                Some(inner @ Value::Object(_)) if map.contains_key("statusCode") => {
                    Self::Plain(inner)
                }
                Some(other) => {
                    map.insert("body".to_string(), other);
                    Self::Plain(Value::Object(map))
                }
                None => Self::Plain(Value::Object(map)),
            },
            other => Self::Plain(other),
        }
    }

    /// Returns the payload, parsing an envelope's string body.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] if an enveloped body is not valid JSON.
    pub fn into_payload(self) -> Result<Value, ProtocolError> {
        match self {
            Self::Plain(value) => Ok(value),
            Self::Enveloped(raw) => serde_json::from_str(&raw).map_err(|e| {
                tracing::warn!(error = %e, "failed to parse enveloped body");
                ProtocolError::new(INVALID_RESPONSE_FORMAT)
            }),
        }
    }
}

/// Classifies and unwraps in one step.
///
/// # Errors
///
/// See [`ResponseBody::into_payload`].
pub fn unwrap_envelope(value: Value) -> Result<Value, ProtocolError> {
    ResponseBody::classify(value).into_payload()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_object_passes_through() {
        let value = json!({"status": "success", "receipt_number": "0001"});
        assert_eq!(
            ResponseBody::classify(value.clone()),
            ResponseBody::Plain(value.clone())
        );
        assert_eq!(unwrap_envelope(value.clone()).unwrap(), value);
    }

    #[test]
    fn string_body_is_unwrapped_once() {
        let value = json!({"body": "{\"status\":\"success\",\"receipt_number\":\"0008\"}"});
        let payload = unwrap_envelope(value).unwrap();
        assert_eq!(payload["status"], "success");
        assert_eq!(payload["receipt_number"], "0008");
    }

    #[test]
    fn status_code_envelope_is_unwrapped() {
        let value = json!({"statusCode": 200, "body": "{\"status\":\"success\"}"});
        assert!(matches!(
            ResponseBody::classify(value.clone()),
            ResponseBody::Enveloped(_)
        ));
        assert_eq!(unwrap_envelope(value).unwrap()["status"], "success");
    }

    #[test]
    fn only_one_layer_is_removed() {
        let inner = json!({"body": "{\"status\":\"success\"}"}).to_string();
        let value = json!({"body": inner});
        let payload = unwrap_envelope(value).unwrap();
        assert!(payload.get("status").is_none());
        assert!(payload["body"].is_string());
    }

    #[test]
    fn status_code_with_object_body() {
        let value = json!({"statusCode": 200, "body": {"status": "success"}});
        assert_eq!(unwrap_envelope(value).unwrap(), json!({"status": "success"}));
    }

    #[test]
    fn unparseable_envelope_is_protocol_error() {
        let err = unwrap_envelope(json!({"body": "<html>502</html>"})).unwrap_err();
        assert_eq!(err.message, "Invalid response format from server.");
    }
}
