use std::future::Future;

use epayco_tools::{EpaycoApi, EpaycoApiError, TransactionRecord};
use sf_common::Secret;

use crate::{
    data_objects::{LinkReferenceRequest, OrderStatusReport, SyncStatusRequest},
    StorefrontApi,
    StorefrontApiError,
};

/// Looks up the gateway's record of a transaction.
pub trait TransactionLookup: Send + Sync + 'static {
    fn lookup_transaction(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<TransactionRecord, EpaycoApiError>> + Send;
}

/// The Order API operations that order confirmation depends on.
pub trait OrderBackend: Send + Sync + 'static {
    /// Associates a gateway reference with an order. Callers treat this as fire-and-forget.
    fn link_reference(
        &self,
        order_id: i64,
        request: LinkReferenceRequest,
        token: Option<Secret<String>>,
    ) -> impl Future<Output = Result<(), StorefrontApiError>> + Send;

    /// Has the backend reconcile the reference against the order, returning the merchant's status.
    fn sync_status(
        &self,
        request: SyncStatusRequest,
    ) -> impl Future<Output = Result<OrderStatusReport, StorefrontApiError>> + Send;

    fn order_status(&self, order_id: i64) -> impl Future<Output = Result<OrderStatusReport, StorefrontApiError>> + Send;
}

impl TransactionLookup for EpaycoApi {
    async fn lookup_transaction(&self, reference: &str) -> Result<TransactionRecord, EpaycoApiError> {
        EpaycoApi::lookup_transaction(self, reference).await
    }
}

impl OrderBackend for StorefrontApi {
    async fn link_reference(
        &self,
        order_id: i64,
        request: LinkReferenceRequest,
        token: Option<Secret<String>>,
    ) -> Result<(), StorefrontApiError> {
        StorefrontApi::link_reference(self, order_id, &request, token.as_ref()).await
    }

    async fn sync_status(&self, request: SyncStatusRequest) -> Result<OrderStatusReport, StorefrontApiError> {
        StorefrontApi::sync_status(self, &request).await
    }

    async fn order_status(&self, order_id: i64) -> Result<OrderStatusReport, StorefrontApiError> {
        StorefrontApi::order_status(self, order_id).await
    }
}
