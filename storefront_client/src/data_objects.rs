use std::fmt::Display;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sf_common::Cop;

//--------------------------------------     OrderStatus     ---------------------------------------------------------
/// Lifecycle of a merchant order. Statuses this client does not know about are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Rejected,
    Failed,
    Other(String),
}

impl OrderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::PendingPayment => "pending_payment",
            Self::Paid => "paid",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Once an order reaches one of these, the payment has settled one way or another and there is nothing left to
    /// wait for on the confirmation page.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Paid | Self::Rejected | Self::Failed)
    }

    /// The label shown to customers.
    pub fn label(&self) -> &str {
        match self {
            Self::PendingPayment => "Pendiente",
            Self::Paid => "Pagado",
            Self::Processing => "Procesando",
            Self::Shipped => "Enviado",
            Self::Delivered => "Entregado",
            Self::Cancelled => "Cancelado",
            Self::Rejected => "Rechazado",
            Self::Failed => "Fallido",
            Self::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for OrderStatus {
    fn from(value: &str) -> Self {
        match value {
            "pending_payment" => Self::PendingPayment,
            "paid" => Self::Paid,
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            "rejected" => Self::Rejected,
            "failed" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for OrderStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<OrderStatus> for String {
    fn from(value: OrderStatus) -> Self {
        value.as_str().to_string()
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Product id
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(rename = "price_number", default)]
    pub unit_price: Cop,
}

fn default_quantity() -> u32 {
    1
}

impl LineItem {
    pub fn subtotal(&self) -> Cop {
        self.unit_price * i64::from(self.quantity)
    }
}

/// The client's read-only, possibly stale, copy of a merchant order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub total: Cop,
}

impl Order {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        let raw = self.created_at.as_deref()?;
        raw.parse::<DateTime<Utc>>()
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok().map(|d| d.and_utc()))
    }

    /// A one-line summary of the order contents, e.g. "Vestido Lino x2" or "3 ítems".
    pub fn product_label(&self) -> String {
        match self.items.first() {
            Some(first) => format!("{} x{}", first.name, first.quantity),
            None => format!("{} ítems", self.items.len()),
        }
    }
}

/// The part of an order response that reconciliation relies on. Responses may wrap the order in an `order` envelope,
/// and only the status is guaranteed to be present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderStatusReport {
    pub order_id: Option<i64>,
    pub status: Option<OrderStatus>,
}

impl OrderStatusReport {
    pub fn from_response(response: &Value) -> Self {
        let order = match response.get("order") {
            Some(o) if !o.is_null() => o,
            _ => response,
        };
        let status = order.get("status").and_then(Value::as_str).map(OrderStatus::from);
        let order_id = order.get("id").and_then(Value::as_i64);
        Self { order_id, status }
    }
}

//--------------------------------------       Checkout      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub id: i64,
    pub name: String,
    pub price_number: Cop,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub subtotal: Cop,
    pub taxes: Cop,
    pub total: Cop,
}

/// Associates a gateway reference (and the merchant invoice, if the gateway reported one) with an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkReferenceRequest {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncStatusRequest {
    pub order_id: i64,
    #[serde(rename = "ref")]
    pub reference: String,
}

/// Returned by a successful checkout: everything the hosted widget needs, and the order it will pay for.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub session_id: String,
    pub order_id: Option<i64>,
}

//--------------------------------------     Users & auth    ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

impl User {
    pub fn has_address(&self) -> bool {
        self.address.as_deref().map(|a| !a.trim().is_empty()).unwrap_or(false)
    }

    /// Case-insensitive match against name, email, phone and address. An empty query matches everyone.
    pub fn matches(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        [Some(self.name.as_str()), Some(self.email.as_str()), self.phone.as_deref(), self.address.as_deref()]
            .into_iter()
            .flatten()
            .any(|f| f.to_lowercase().contains(&q))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price_number: Cop,
    #[serde(default)]
    pub price_label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
