//! The gateway's view of a single payment attempt.
//!
//! ePayco does not commit to a schema for transaction lookups: depending on the integration path the same datum shows
//! up as `x_amount`, `amount` or `value`, and the whole payload may or may not be wrapped in a `data` envelope. A
//! [`TransactionRecord`] therefore keeps the payload as an opaque map and exposes one accessor per logical field, each
//! walking a fixed list of field names in priority order.
use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};
use sf_common::{Cop, COP_CURRENCY_CODE};

use crate::helpers::scalar_text;

/// Gateway states that count as an approved payment. Comparison is case-sensitive.
pub const ACCEPTED_STATES: [&str; 5] = ["Aceptada", "Aceptado", "Aceptada Test", "APPROVED", "approved"];

const STATE_FIELDS: &[&str] = &["x_response", "x_transaction_state", "transaction_state", "state"];
const LINK_REFERENCE_FIELDS: &[&str] = &["x_ref_payco", "ref_payco", "reference"];
const INVOICE_FIELDS: &[&str] = &["x_id_invoice", "invoice"];
const DISPLAY_REFERENCE_FIELDS: &[&str] = &["x_id_invoice", "invoice", "x_ref_payco", "reference"];
const DESCRIPTION_FIELDS: &[&str] = &["x_description", "description", "x_extra1"];
const DATE_FIELDS: &[&str] = &["x_transaction_date", "transaction_date"];
const AMOUNT_FIELDS: &[&str] = &["x_amount", "amount", "value"];
const CURRENCY_FIELDS: &[&str] = &["x_currency_code", "currency", "x_currency"];
const METHOD_FIELDS: &[&str] = &["x_type_payment", "payment_method", "x_payment_method"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TransactionRecord {
    fields: Map<String, Value>,
}

impl TransactionRecord {
    /// Unwraps a lookup response. A non-null `data` member takes precedence over the top level. Anything that is not a
    /// JSON object after unwrapping is not a transaction.
    pub fn from_response(response: Value) -> Option<Self> {
        let payload = match response {
            Value::Object(mut top) => match top.remove("data") {
                Some(Value::Null) | None => Value::Object(top),
                Some(data) => data,
            },
            other => other,
        };
        match payload {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// The first non-empty scalar among `names`, rendered as text.
    pub fn first_text(&self, names: &[&str]) -> Option<String> {
        names.iter().find_map(|n| self.fields.get(*n).and_then(scalar_text))
    }

    /// The gateway's own verdict on the transaction, e.g. "Aceptada" or "Rechazada".
    pub fn state(&self) -> Option<String> {
        self.first_text(STATE_FIELDS)
    }

    /// Advisory approval signal. This is the gateway's word only; the merchant's order status is authoritative.
    pub fn is_approved(&self) -> bool {
        self.state().map(|s| ACCEPTED_STATES.contains(&s.as_str())).unwrap_or(false)
    }

    /// The gateway reference used to link this transaction to a merchant order.
    pub fn gateway_reference(&self) -> Option<String> {
        self.first_text(LINK_REFERENCE_FIELDS)
    }

    pub fn invoice(&self) -> Option<String> {
        self.first_text(INVOICE_FIELDS)
    }

    /// The reference shown to the customer: the merchant invoice where known, otherwise the gateway reference.
    pub fn display_reference(&self) -> Option<String> {
        self.first_text(DISPLAY_REFERENCE_FIELDS)
    }

    pub fn description(&self) -> Option<String> {
        self.first_text(DESCRIPTION_FIELDS)
    }

    pub fn transaction_date(&self) -> Option<String> {
        self.first_text(DATE_FIELDS)
    }

    /// The transaction date, when it is in one of the formats ePayco is known to use.
    pub fn transaction_timestamp(&self) -> Option<NaiveDateTime> {
        let raw = self.transaction_date()?;
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(&raw).ok().map(|d| d.naive_local()))
    }

    /// Transaction amount. Missing or unparseable amounts read as zero.
    pub fn amount(&self) -> Cop {
        self.first_text(AMOUNT_FIELDS).and_then(|s| s.parse::<Cop>().ok()).unwrap_or_default()
    }

    pub fn currency(&self) -> String {
        self.first_text(CURRENCY_FIELDS).unwrap_or_else(|| COP_CURRENCY_CODE.to_string())
    }

    pub fn payment_method(&self) -> Option<String> {
        self.first_text(METHOD_FIELDS)
    }
}
