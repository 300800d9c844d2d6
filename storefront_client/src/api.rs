use std::fmt::Display;

use epayco_tools::SessionRequest;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
    RequestBuilder,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sf_common::Secret;
use url::Url;

use crate::{
    data_objects::{
        AuthResponse,
        CheckoutRequest,
        LinkReferenceRequest,
        LoginRequest,
        Order,
        OrderStatusReport,
        Product,
        ProfileUpdate,
        RegisterRequest,
        SyncStatusRequest,
        User,
    },
    errors::server_error_message,
    StorefrontApiError,
};

/// Client for the merchant's Order API.
#[derive(Clone)]
pub struct StorefrontApi {
    client: Client,
    base: Url,
    access_token: Option<Secret<String>>,
}

impl StorefrontApi {
    pub fn new(api_base: &str) -> Result<Self, StorefrontApiError> {
        let base = Url::parse(api_base).map_err(|e| StorefrontApiError::InvalidUrl(format!("{api_base}. {e}")))?;
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .user_agent("Storefront Client")
            .default_headers(headers)
            .build()
            .map_err(|e| StorefrontApiError::Initialization(e.to_string()))?;
        Ok(Self { client, base, access_token: None })
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.is_empty()).map(Secret::new);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn url(&self, path: &str) -> Result<Url, StorefrontApiError> {
        self.base.join(path).map_err(|e| StorefrontApiError::InvalidUrl(format!("{path}. {e}")))
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&Secret<String>>,
    ) -> Result<RequestBuilder, StorefrontApiError> {
        let url = self.url(path)?;
        trace!("🧾️ {method} {url}");
        let mut req = self.client.request(method, url);
        if let Some(token) = token {
            req = req.bearer_auth(token.reveal());
        }
        Ok(req)
    }

    fn auth_request(&self, method: Method, path: &str) -> Result<RequestBuilder, StorefrontApiError> {
        let token = self.access_token.as_ref().ok_or(StorefrontApiError::NotAuthenticated)?;
        self.request(method, path, Some(token))
    }

    async fn send<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, StorefrontApiError> {
        let res = req.send().await.map_err(|e| StorefrontApiError::RestResponseError(e.to_string()))?;
        let status = res.status();
        if status.is_success() {
            res.json::<T>().await.map_err(|e| StorefrontApiError::JsonError(e.to_string()))
        } else {
            let text = res.text().await.map_err(|e| StorefrontApiError::RestResponseError(e.to_string()))?;
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| server_error_message(&body))
                .unwrap_or(text);
            Err(StorefrontApiError::QueryError { status: status.as_u16(), message })
        }
    }

    async fn send_ignoring_body(req: RequestBuilder) -> Result<(), StorefrontApiError> {
        let res = req.send().await.map_err(|e| StorefrontApiError::RestResponseError(e.to_string()))?;
        let status = res.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = res.text().await.unwrap_or_default();
            let message =
                serde_json::from_str::<Value>(&text).ok().and_then(|b| server_error_message(&b)).unwrap_or(text);
            Err(StorefrontApiError::QueryError { status: status.as_u16(), message })
        }
    }

    fn with_body<B: Serialize>(req: RequestBuilder, body: &B) -> RequestBuilder {
        req.json(body)
    }

    //------------------------------------------   Auth   --------------------------------------------------------
    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse, StorefrontApiError> {
        let req = self.request(Method::POST, "/api/login", None)?;
        let result = Self::send::<AuthResponse>(Self::with_body(req, credentials)).await?;
        info!("🧾️ Logged in as {}", result.user.email);
        Ok(result)
    }

    pub async fn register(&self, details: &RegisterRequest) -> Result<AuthResponse, StorefrontApiError> {
        let req = self.request(Method::POST, "/api/register", None)?;
        let result = Self::send::<AuthResponse>(Self::with_body(req, details)).await?;
        info!("🧾️ Registered {}", result.user.email);
        Ok(result)
    }

    pub async fn logout(&self) -> Result<(), StorefrontApiError> {
        let req = self.auth_request(Method::POST, "/api/logout")?;
        Self::send_ignoring_body(req).await
    }

    //------------------------------------------  Profile  -------------------------------------------------------
    pub async fn profile(&self) -> Result<User, StorefrontApiError> {
        Self::send(self.auth_request(Method::GET, "/api/profile")?).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), StorefrontApiError> {
        let req = self.auth_request(Method::PUT, "/api/profile")?;
        Self::send_ignoring_body(Self::with_body(req, update)).await
    }

    //------------------------------------------  Orders  --------------------------------------------------------
    /// The signed-in customer's orders. A response that is not a list is treated as no orders.
    pub async fn my_orders(&self) -> Result<Vec<Order>, StorefrontApiError> {
        let value: Value = Self::send(self.auth_request(Method::GET, "/api/my/orders")?).await?;
        if !value.is_array() {
            debug!("🧾️ /api/my/orders did not return a list. Treating as empty.");
            return Ok(vec![]);
        }
        serde_json::from_value(value).map_err(|e| StorefrontApiError::JsonError(e.to_string()))
    }

    pub async fn order_by_id(&self, order_id: i64) -> Result<Order, StorefrontApiError> {
        let path = format!("/api/orders/{order_id}");
        let value: Value = Self::send(self.request(Method::GET, &path, self.access_token.as_ref())?).await?;
        let order = match value.get("order") {
            Some(o) if o.is_object() => o.clone(),
            _ => value,
        };
        serde_json::from_value(order).map_err(|e| StorefrontApiError::JsonError(e.to_string()))
    }

    /// `GET /api/orders/{id}`, keeping only the status. Used while waiting for a payment to settle.
    pub async fn order_status(&self, order_id: i64) -> Result<OrderStatusReport, StorefrontApiError> {
        let path = format!("/api/orders/{order_id}");
        let value: Value = Self::send(self.request(Method::GET, &path, None)?).await?;
        Ok(OrderStatusReport::from_response(&value))
    }

    pub async fn product(&self, product_id: i64) -> Result<Product, StorefrontApiError> {
        Self::send(self.request(Method::GET, &format!("/api/products/{product_id}"), None)?).await
    }

    //------------------------------------------  Checkout  ------------------------------------------------------
    /// Creates the order and, usually, a gateway checkout session for it. The response shape varies, so it is returned
    /// raw for the checkout flow to pick apart.
    pub async fn checkout(&self, request: &CheckoutRequest) -> Result<Value, StorefrontApiError> {
        let req = self.auth_request(Method::POST, "/api/orders/checkout")?;
        debug!("🧾️ Checking out {} items, total {}", request.items.len(), request.total);
        Self::send(Self::with_body(req, request)).await
    }

    pub async fn create_epayco_session(&self, request: &SessionRequest) -> Result<Value, StorefrontApiError> {
        let req = self.request(Method::POST, "/api/epayco/session", None)?;
        Self::send(Self::with_body(req, request)).await
    }

    /// Associates a gateway reference with an order. `token` overrides the client's own access token.
    pub async fn link_reference(
        &self,
        order_id: i64,
        request: &LinkReferenceRequest,
        token: Option<&Secret<String>>,
    ) -> Result<(), StorefrontApiError> {
        let path = format!("/api/orders/{order_id}/epayco/ref");
        let req = self.request(Method::POST, &path, token.or(self.access_token.as_ref()))?;
        Self::send_ignoring_body(Self::with_body(req, request)).await
    }

    /// Asks the backend to reconcile the gateway reference against the order and report the merchant's status.
    pub async fn sync_status(&self, request: &SyncStatusRequest) -> Result<OrderStatusReport, StorefrontApiError> {
        let req = self.request(Method::POST, "/api/orders/sync-status", None)?;
        let value: Value = Self::send(Self::with_body(req, request)).await?;
        Ok(OrderStatusReport::from_response(&value))
    }

    //------------------------------------------   Admin   -------------------------------------------------------
    pub async fn users(&self) -> Result<Vec<User>, StorefrontApiError> {
        let value: Value = Self::send(self.auth_request(Method::GET, "/api/users")?).await?;
        if !value.is_array() {
            return Ok(vec![]);
        }
        serde_json::from_value(value).map_err(|e| StorefrontApiError::JsonError(e.to_string()))
    }

    pub async fn set_admin(&self, user_id: i64, is_admin: bool) -> Result<User, StorefrontApiError> {
        let req = self.auth_request(Method::PATCH, &format!("/api/users/{user_id}"))?;
        let user: User = Self::send(Self::with_body(req, &serde_json::json!({ "is_admin": is_admin }))).await?;
        info!("🧾️ {} ({}) admin: {}", user.name, user.email, user.is_admin);
        Ok(user)
    }
}

impl Display for StorefrontApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = if self.is_authenticated() { "authenticated" } else { "anonymous" };
        write!(f, "{} [{auth}]", self.base)
    }
}
