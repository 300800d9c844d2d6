use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{config::EpaycoConfig, EpaycoApiError, TransactionRecord};

#[derive(Clone)]
pub struct EpaycoApi {
    config: EpaycoConfig,
    client: Arc<Client>,
}

impl EpaycoApi {
    pub fn new(config: EpaycoConfig) -> Result<Self, EpaycoApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .user_agent("Storefront Client")
            .default_headers(headers)
            .build()
            .map_err(|e| EpaycoApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &EpaycoConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.host)
    }

    pub async fn rest_query<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, EpaycoApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {url}");
        let response = self
            .client
            .request(method, url)
            .send()
            .await
            .map_err(|e| EpaycoApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| EpaycoApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| EpaycoApiError::RestResponseError(e.to_string()))?;
            Err(EpaycoApiError::QueryError { status, message })
        }
    }

    /// Fetches the gateway's record of the transaction with the given reference. A single request is made; there are
    /// no retries.
    pub async fn lookup_transaction(&self, reference: &str) -> Result<TransactionRecord, EpaycoApiError> {
        if reference.trim().is_empty() {
            return Err(EpaycoApiError::RestRequestError("Empty transaction reference".to_string()));
        }
        let path = format!("/validation/v1/reference/{}", urlencoding::encode(reference));
        debug!("💳️ Looking up transaction {reference}");
        let response = self.rest_query::<Value>(Method::GET, &path).await?;
        let record = TransactionRecord::from_response(response).ok_or(EpaycoApiError::EmptyResponse)?;
        info!("💳️ Fetched transaction {reference}. State: {}", record.state().unwrap_or_else(|| "unknown".into()));
        Ok(record)
    }
}
