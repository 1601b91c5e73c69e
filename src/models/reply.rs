//! Order service replies.

use serde_json::Value;

use super::envelope::ProtocolError;

/// Message used when a failed reply carries no explanation.
const DEFAULT_FAILURE_MESSAGE: &str = "Sync failed";

/// Receipt id recorded when a success reply carries none.
pub const MISSING_RECEIPT_ID: &str = "N/A";

/// An unwrapped reply from the order service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitReply {
    /// The service accepted the order.
    Success { receipt_id: String },
    /// The service reported a failure with a message for the customer.
    Failure { message: String },
}

impl SubmitReply {
    /// Interprets an unwrapped payload.
    ///
    /// `status == "success"` is the success flag. The receipt id is read from
    /// `loyverse_receipt_id`, then `receipt_number`; numeric ids are accepted.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolError`] if the payload is not an object or has no
    /// string `status` field.
    pub fn from_payload(payload: &Value) -> Result<Self, ProtocolError> {
        let obj = payload
            .as_object()
            .ok_or_else(|| ProtocolError::new("order response is not a JSON object"))?;
        let status = obj
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::new("order response has no status"))?;

        if status == "success" {
            let receipt_id = ["loyverse_receipt_id", "receipt_number"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(non_empty_text))
                .unwrap_or_else(|| MISSING_RECEIPT_ID.to_string());
            Ok(Self::Success { receipt_id })
        } else {
            let message = ["message", "error"]
                .iter()
                .find_map(|key| obj.get(*key).and_then(non_empty_text))
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
            Ok(Self::Failure { message })
        }
    }
}

fn non_empty_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_prefers_loyverse_receipt_id() {
        let reply = SubmitReply::from_payload(&json!({
            "status": "success",
            "loyverse_receipt_id": "3f2a",
            "receipt_number": "0008"
        }))
        .unwrap();
        assert_eq!(
            reply,
            SubmitReply::Success {
                receipt_id: "3f2a".to_string()
            }
        );
    }

    #[test]
    fn success_falls_back_to_receipt_number() {
        let reply =
            SubmitReply::from_payload(&json!({"status": "success", "receipt_number": 8})).unwrap();
        assert_eq!(
            reply,
            SubmitReply::Success {
                receipt_id: "8".to_string()
            }
        );
    }

    #[test]
    fn success_without_receipt_records_placeholder() {
        let reply = SubmitReply::from_payload(&json!({"status": "success"})).unwrap();
        assert_eq!(
            reply,
            SubmitReply::Success {
                receipt_id: MISSING_RECEIPT_ID.to_string()
            }
        );
    }

    #[test]
    fn failure_passes_message_through() {
        let reply = SubmitReply::from_payload(&json!({
            "status": "error",
            "message": "Item out of stock in POS"
        }))
        .unwrap();
        assert_eq!(
            reply,
            SubmitReply::Failure {
                message: "Item out of stock in POS".to_string()
            }
        );
    }

    #[test]
    fn failure_without_message_uses_default() {
        let reply = SubmitReply::from_payload(&json!({"status": "failed", "error": ""})).unwrap();
        assert_eq!(
            reply,
            SubmitReply::Failure {
                message: "Sync failed".to_string()
            }
        );
    }

    #[test]
    fn missing_status_is_protocol_error() {
        assert!(SubmitReply::from_payload(&json!({"receipt_number": "1"})).is_err());
        assert!(SubmitReply::from_payload(&json!(["success"])).is_err());
    }
}
