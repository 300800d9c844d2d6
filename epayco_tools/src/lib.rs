mod api;
mod config;
mod error;
pub mod helpers;
mod session;
mod transaction;

pub use api::EpaycoApi;
pub use config::EpaycoConfig;
pub use error::EpaycoApiError;
pub use session::{extract_session_id, CheckoutWidgetConfig, SessionRequest};
pub use transaction::{TransactionRecord, ACCEPTED_STATES};
