use epayco_tools::TransactionRecord;
use sf_common::Cop;

use crate::data_objects::OrderStatus;

/// Everything the confirmation page knows at a given moment.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationState {
    pub loading: bool,
    /// The gateway's transaction record. `None` once loading has finished means there is no payment to show.
    pub payment: Option<TransactionRecord>,
    /// The merchant's status for the order, once known. Updated on every poll response.
    pub order_status: Option<OrderStatus>,
    /// True while the page is still waiting for a pending order to settle.
    pub polling: bool,
}

impl Default for ConfirmationState {
    fn default() -> Self {
        Self { loading: true, payment: None, order_status: None, polling: false }
    }
}

impl ConfirmationState {
    pub fn view(&self) -> ConfirmationView {
        if self.loading {
            return ConfirmationView::Loading;
        }
        match &self.payment {
            None => ConfirmationView::NotFound,
            Some(record) => ConfirmationView::Detail(PaymentSummary::new(record, self.order_status.as_ref())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmationView {
    Loading,
    /// No payment information: the reference was missing or the gateway lookup failed.
    NotFound,
    Detail(PaymentSummary),
}

/// The reconciled payment as presented to the customer.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSummary {
    /// Merchant status when known, else the gateway's state, else "Desconocido".
    pub status: String,
    /// Rendered as a success when the gateway approved the payment or the merchant marked the order paid.
    pub successful: bool,
    pub order_status: Option<OrderStatus>,
    pub gateway_state: Option<String>,
    pub reference: String,
    pub description: String,
    pub date: String,
    pub amount: Cop,
    pub currency: String,
    pub payment_method: String,
}

impl PaymentSummary {
    pub fn new(record: &TransactionRecord, order_status: Option<&OrderStatus>) -> Self {
        let gateway_state = record.state();
        let status = order_status
            .map(|s| s.as_str().to_string())
            .or_else(|| gateway_state.clone())
            .unwrap_or_else(|| "Desconocido".to_string());
        let successful = record.is_approved() || order_status == Some(&OrderStatus::Paid);
        let date = match (record.transaction_timestamp(), record.transaction_date()) {
            (Some(ts), _) => ts.format("%d/%m/%Y %H:%M:%S").to_string(),
            (None, Some(raw)) => raw,
            (None, None) => "-".to_string(),
        };
        Self {
            status,
            successful,
            order_status: order_status.cloned(),
            gateway_state,
            reference: record.display_reference().unwrap_or_else(|| "-".to_string()),
            description: record.description().unwrap_or_else(|| "-".to_string()),
            date,
            amount: record.amount(),
            currency: record.currency(),
            payment_method: record.payment_method().unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn record(v: serde_json::Value) -> TransactionRecord {
        TransactionRecord::from_response(v).unwrap()
    }

    #[test]
    fn views() {
        assert_eq!(ConfirmationState::default().view(), ConfirmationView::Loading);
        let done = ConfirmationState { loading: false, ..Default::default() };
        assert_eq!(done.view(), ConfirmationView::NotFound);
        let found = ConfirmationState { payment: Some(record(json!({"x_response": "Aceptada"}))), ..done };
        assert!(matches!(found.view(), ConfirmationView::Detail(_)));
    }

    #[test]
    fn merchant_status_takes_precedence() {
        let r = record(json!({"x_response": "Pendiente", "x_amount": "85000"}));
        let s = PaymentSummary::new(&r, Some(&OrderStatus::Paid));
        assert_eq!(s.status, "paid");
        assert!(s.successful);
        let s = PaymentSummary::new(&r, None);
        assert_eq!(s.status, "Pendiente");
        assert!(!s.successful);
        assert_eq!(s.amount, Cop::from(85_000));
    }

    #[test]
    fn defaults_for_missing_fields() {
        let s = PaymentSummary::new(&record(json!({})), None);
        assert_eq!(s.status, "Desconocido");
        assert_eq!(s.reference, "-");
        assert_eq!(s.description, "-");
        assert_eq!(s.date, "-");
        assert_eq!(s.currency, "COP");
        assert_eq!(s.payment_method, "-");
        assert_eq!(s.amount, Cop::default());
    }

    #[test]
    fn dates() {
        let s = PaymentSummary::new(&record(json!({"x_transaction_date": "2024-09-18 14:32:30"})), None);
        assert_eq!(s.date, "18/09/2024 14:32:30");
        let s = PaymentSummary::new(&record(json!({"transaction_date": "ayer"})), None);
        assert_eq!(s.date, "ayer");
    }
}
