//! Order confirmation after the customer returns from the hosted payment page.
//!
//! The gateway redirects back with a transaction reference in the query string. From there the page resolves what
//! actually happened by combining two sources that can disagree:
//!
//! 1. the gateway's transaction record, which is advisory, and
//! 2. the merchant's own order, which is authoritative when it can be reached.
//!
//! If the merchant still reports the order as `pending_payment`, the page keeps asking for a short while so that
//! late webhooks from the gateway can land. Every network failure degrades what is shown; none of them is fatal.
mod backends;
mod query;
mod reconciler;
mod view;

pub use backends::{OrderBackend, TransactionLookup};
pub use query::{payment_reference_from_query, REFERENCE_PARAMS};
pub use reconciler::PaymentConfirmation;
pub use view::{ConfirmationState, ConfirmationView, PaymentSummary};
