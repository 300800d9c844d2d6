use epayco_tools::EpaycoApiError;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorefrontApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("You need to log in first")]
    NotAuthenticated,
    #[error("A shipping address is required before checkout")]
    AddressRequired,
    #[error("Invalid input. {0}")]
    Validation(String),
    #[error("Could not start a checkout session")]
    NoCheckoutSession,
    #[error("Payment gateway error. {0}")]
    Gateway(#[from] EpaycoApiError),
    #[error("Client storage error. {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Could not access the client store. {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not (de)serialize stored data. {0}")]
    Serialization(String),
}

/// Pulls a human-readable message out of an error body from the Order API.
///
/// Validation failures come back as `{"errors": {"field": ["message", ..]}}`; the first message of the first field
/// wins. Otherwise `message`, then `error` are used.
pub fn server_error_message(body: &Value) -> Option<String> {
    let from_errors = body.get("errors").and_then(Value::as_object).and_then(|errors| {
        errors.values().next().and_then(Value::as_array).and_then(|a| a.first()).map(|m| match m {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    });
    from_errors
        .or_else(|| body.get("message").and_then(Value::as_str).map(String::from))
        .or_else(|| body.get("error").and_then(Value::as_str).map(String::from))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn validation_errors_take_precedence() {
        let body = json!({
            "message": "The given data was invalid.",
            "errors": { "email": ["The email has already been taken."], "password": ["Too short"] }
        });
        assert_eq!(server_error_message(&body).as_deref(), Some("The email has already been taken."));
    }

    #[test]
    fn message_then_error() {
        assert_eq!(server_error_message(&json!({"message": "Unauthenticated."})).as_deref(), Some("Unauthenticated."));
        assert_eq!(server_error_message(&json!({"error": "boom"})).as_deref(), Some("boom"));
        assert_eq!(server_error_message(&json!({"errors": {}})), None);
        assert_eq!(server_error_message(&json!("text")), None);
    }
}
