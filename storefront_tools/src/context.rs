use std::sync::Arc;

use anyhow::Result;
use epayco_tools::{EpaycoApi, EpaycoConfig};
use log::*;
use storefront_client::{
    storage::{ClientStorage, FileStorage, AUTH_TOKEN},
    StorefrontApi,
    StorefrontConfig,
};

/// Everything a command needs: configuration, the persistent client store and API clients.
pub struct AppContext {
    pub config: StorefrontConfig,
    pub gateway_config: EpaycoConfig,
    pub storage: Arc<FileStorage>,
    pub api: StorefrontApi,
}

impl AppContext {
    pub fn load() -> Result<Self> {
        let config = StorefrontConfig::from_env_or_default();
        let gateway_config = EpaycoConfig::new_from_env_or_default();
        let storage = Arc::new(FileStorage::open(config.state_dir.as_deref())?);
        debug!("🗄️ Using client store at {}", storage.path().display());
        let api = StorefrontApi::new(&config.api_base)?.with_access_token(storage.get(AUTH_TOKEN));
        debug!("🧾️ Order API: {api}");
        Ok(Self { config, gateway_config, storage, api })
    }

    pub fn gateway(&self) -> Result<EpaycoApi> {
        Ok(EpaycoApi::new(self.gateway_config.clone())?)
    }
}
