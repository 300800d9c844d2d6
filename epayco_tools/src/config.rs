use log::*;
use sf_common::helpers::parse_boolean_flag;

pub const DEFAULT_EPAYCO_HOST: &str = "https://secure.epayco.co";
pub const DEFAULT_CHECKOUT_SCRIPT: &str = "https://checkout.epayco.co/checkout-v2.js";

#[derive(Debug, Clone)]
pub struct EpaycoConfig {
    /// Base URL of the transaction validation service, e.g. `https://secure.epayco.co`
    pub host: String,
    /// The hosted Smart Checkout script the storefront loads to open the payment widget.
    pub checkout_script: String,
    /// Sandbox mode. Sessions created in test mode never move real money.
    pub test_mode: bool,
}

impl Default for EpaycoConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_EPAYCO_HOST.to_string(),
            checkout_script: DEFAULT_CHECKOUT_SCRIPT.to_string(),
            test_mode: true,
        }
    }
}

impl EpaycoConfig {
    pub fn new_from_env_or_default() -> Self {
        let host = std::env::var("SF_EPAYCO_HOST").unwrap_or_else(|_| {
            debug!("SF_EPAYCO_HOST not set, using {DEFAULT_EPAYCO_HOST}");
            DEFAULT_EPAYCO_HOST.to_string()
        });
        let checkout_script =
            std::env::var("SF_EPAYCO_CHECKOUT_SCRIPT").unwrap_or_else(|_| DEFAULT_CHECKOUT_SCRIPT.to_string());
        let test_mode = parse_boolean_flag(std::env::var("SF_EPAYCO_TEST").ok(), true);
        if !test_mode {
            warn!("💳️ ePayco test mode is OFF. Checkout sessions will charge real cards.");
        }
        Self { host: host.trim_end_matches('/').to_string(), checkout_script, test_mode }
    }

    pub fn with_host(host: &str) -> Self {
        Self { host: host.trim_end_matches('/').to_string(), ..Default::default() }
    }
}
