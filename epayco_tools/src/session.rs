use serde::{Deserialize, Serialize};
use serde_json::Value;
use sf_common::{Cop, COP_CURRENCY_CODE};

use crate::helpers::first_text_at;

/// Body for creating a Smart Checkout session directly, used when the merchant's checkout endpoint did not hand back
/// a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub name: String,
    pub description: String,
    pub currency: String,
    /// Currency units, not cents.
    pub amount: Cop,
    pub lang: String,
    pub country: String,
    pub test: bool,
}

impl SessionRequest {
    pub fn new(amount: Cop, test: bool) -> Self {
        Self {
            name: "Alma Store".to_string(),
            description: "Compra desde frontend".to_string(),
            currency: COP_CURRENCY_CODE.to_string(),
            amount,
            lang: "ES".to_string(),
            country: "CO".to_string(),
            test,
        }
    }
}

/// What the hosted widget needs to open the on-page checkout for a session.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutWidgetConfig {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub test: bool,
}

impl CheckoutWidgetConfig {
    pub fn on_page(session_id: &str, test: bool) -> Self {
        Self { session_id: session_id.to_string(), kind: "onpage".to_string(), test }
    }
}

/// Finds the checkout session id in a backend response. The merchant API has shipped both snake and camel case
/// spellings, with and without a `data` envelope.
pub fn extract_session_id(response: &Value) -> Option<String> {
    first_text_at(response, &["/session_id", "/data/sessionId", "/sessionId", "/data/session_id"])
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn session_id_locations() {
        assert_eq!(extract_session_id(&json!({"session_id": "a"})).as_deref(), Some("a"));
        assert_eq!(extract_session_id(&json!({"data": {"sessionId": "b"}})).as_deref(), Some("b"));
        assert_eq!(extract_session_id(&json!({"sessionId": "c", "data": {"session_id": "d"}})).as_deref(), Some("c"));
        assert_eq!(extract_session_id(&json!({"data": {"session_id": "d"}})).as_deref(), Some("d"));
        assert_eq!(extract_session_id(&json!({"session_id": ""})), None);
    }

    #[test]
    fn session_request_body() {
        let body = serde_json::to_value(SessionRequest::new(Cop::from(120_000), true)).unwrap();
        assert_eq!(body["amount"], json!(120000));
        assert_eq!(body["currency"], json!("COP"));
        assert_eq!(body["country"], json!("CO"));
        let widget = serde_json::to_value(CheckoutWidgetConfig::on_page("s-9", true)).unwrap();
        assert_eq!(widget, json!({"sessionId": "s-9", "type": "onpage", "test": true}));
    }
}
