//! Client library for the Alma storefront.
//!
//! * [`StorefrontApi`] talks to the merchant Order API.
//! * [`cart`], [`auth`] and [`checkout`] implement the customer-side flows that run against it.
//! * [`confirmation`] reconciles what the payment gateway says about a transaction with what the merchant says about
//!   the order once the customer is redirected back to the store.
//! * [`storage`] holds the client-side state that survives that redirect.
mod api;
pub mod auth;
pub mod cart;
pub mod checkout;
mod config;
pub mod confirmation;
pub mod data_objects;
mod errors;
pub mod storage;

pub use api::StorefrontApi;
pub use config::{PollSettings, StorefrontConfig};
pub use errors::{server_error_message, StorageError, StorefrontApiError};
