//! Starting a payment: turning the cart into a merchant order and a hosted checkout session.
use epayco_tools::{extract_session_id, helpers::first_i64_at, SessionRequest};
use log::*;
use sf_common::Secret;

use crate::{
    cart::Cart,
    data_objects::{CheckoutSession, LinkReferenceRequest},
    storage::{ClientStorage, AUTH_TOKEN, LAST_EPAYCO_INVOICE, LAST_ORDER_ID, LAST_REF_PAYCO},
    StorefrontApi,
    StorefrontApiError,
};

/// Creates the order for the current cart and obtains a checkout session for the hosted payment widget.
///
/// * The customer must be signed in, and must have a shipping address on file. If the profile cannot be fetched the
///   address check is skipped rather than blocking the purchase.
/// * When the backend hands back a session and an order id, the order id is remembered as `last_order_id` so the
///   confirmation page can find the order after the redirect.
/// * When the backend returns no session, one is requested directly from the session endpoint. Such a session is not
///   tied to any order.
pub async fn start_checkout<S: ClientStorage + ?Sized>(
    api: &StorefrontApi,
    storage: &S,
    cart: &Cart,
    test_mode: bool,
) -> Result<CheckoutSession, StorefrontApiError> {
    if storage.get(AUTH_TOKEN).filter(|t| !t.is_empty()).is_none() || !api.is_authenticated() {
        return Err(StorefrontApiError::NotAuthenticated);
    }
    if cart.is_empty() {
        return Err(StorefrontApiError::Validation("The cart is empty".into()));
    }
    match api.profile().await {
        Ok(profile) if !profile.has_address() => return Err(StorefrontApiError::AddressRequired),
        Ok(_) => {},
        Err(e) => warn!("🛒️ Could not fetch profile before checkout, continuing. {e}"),
    }

    let response = api.checkout(&cart.to_checkout_request()).await?;
    debug!("🛒️ orders/checkout response: {response}");
    let order_id = first_i64_at(&response, &["/order_id", "/data/order_id"]);
    if let Some(session_id) = extract_session_id(&response) {
        if let Some(id) = order_id {
            storage.set(LAST_ORDER_ID, &id.to_string())?;
        }
        info!("🛒️ Checkout session {session_id} created for order {order_id:?}");
        return Ok(CheckoutSession { session_id, order_id });
    }

    debug!("🛒️ No session id in the checkout response. Requesting a standalone gateway session.");
    let request = SessionRequest::new(cart.total(), test_mode);
    match api.create_epayco_session(&request).await {
        Ok(response) => match extract_session_id(&response) {
            Some(session_id) => {
                info!("🛒️ Standalone checkout session {session_id} created");
                Ok(CheckoutSession { session_id, order_id: None })
            },
            None => Err(StorefrontApiError::NoCheckoutSession),
        },
        Err(e) => {
            error!("🛒️ Fallback session request failed. {e}");
            Err(StorefrontApiError::NoCheckoutSession)
        },
    }
}

/// What the checkout widget does when the gateway answers: link the reference to the order and remember it.
pub async fn record_gateway_response<S: ClientStorage + ?Sized>(
    api: &StorefrontApi,
    storage: &S,
    order_id: i64,
    reference: &str,
    invoice: Option<&str>,
) -> Result<(), StorefrontApiError> {
    let request = LinkReferenceRequest {
        reference: reference.to_string(),
        invoice: invoice.filter(|i| !i.is_empty()).map(String::from),
    };
    let token = storage.get(AUTH_TOKEN).map(Secret::new);
    api.link_reference(order_id, &request, token.as_ref()).await?;
    storage.set(LAST_REF_PAYCO, reference)?;
    if let Some(invoice) = &request.invoice {
        storage.set(LAST_EPAYCO_INVOICE, invoice)?;
    }
    info!("🛒️ Linked gateway reference {reference} to order {order_id}");
    Ok(())
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use serde_json::{json, Value};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    };

    use super::*;
    use crate::{cart::CartItem, storage::MemoryStorage};

    /// A canned reply for one method and path.
    struct Route {
        method: &'static str,
        path: &'static str,
        status: u16,
        body: Value,
    }

    fn route(method: &'static str, path: &'static str, status: u16, body: Value) -> Route {
        Route { method, path, status, body }
    }

    #[derive(Debug, Clone)]
    struct Request {
        method: String,
        path: String,
        body: String,
    }

    /// Minimal HTTP/1.1 backend. Unknown routes get a 404.
    struct StubBackend {
        base: String,
        requests: Arc<Mutex<Vec<Request>>>,
    }

    impl StubBackend {
        async fn start(routes: Vec<Route>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let log = Arc::clone(&requests);
            let routes = Arc::new(routes);
            tokio::spawn(async move {
                while let Ok((mut socket, _)) = listener.accept().await {
                    let routes = Arc::clone(&routes);
                    let log = Arc::clone(&log);
                    tokio::spawn(async move {
                        let request = read_request(&mut socket).await;
                        let (status, reply) = routes
                            .iter()
                            .find(|r| r.method == request.method && r.path == request.path)
                            .map(|r| (r.status, r.body.to_string()))
                            .unwrap_or_else(|| (404, json!({"message": "not found"}).to_string()));
                        log.lock().unwrap().push(request);
                        let reason = if status < 400 { "OK" } else { "Error" };
                        let response = format!(
                            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: \
                             close\r\n\r\n{reply}",
                            reply.len()
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
            });
            Self { base, requests }
        }

        fn api(&self) -> StorefrontApi {
            StorefrontApi::new(&self.base).unwrap().with_access_token(Some("tok".into()))
        }

        fn paths(&self) -> Vec<String> {
            self.requests.lock().unwrap().iter().map(|r| format!("{} {}", r.method, r.path)).collect()
        }

        fn body_of(&self, path: &str) -> Value {
            let requests = self.requests.lock().unwrap();
            let request = requests.iter().find(|r| r.path == path).unwrap();
            serde_json::from_str(&request.body).unwrap()
        }
    }

    async fn read_request(socket: &mut TcpStream) -> Request {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break buf.len();
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
        let method = request_line.next().unwrap_or_default().to_string();
        let path = request_line.next().unwrap_or_default().to_string();
        let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
        Request { method, path, body }
    }

    fn signed_in() -> MemoryStorage {
        let store = MemoryStorage::new();
        store.set(AUTH_TOKEN, "tok").unwrap();
        store
    }

    fn one_item_cart() -> Cart {
        let mut cart = Cart::new();
        cart.add(CartItem { quantity: 2, ..CartItem::new(7, "Vestido Lino", sf_common::Cop::from(95_000)) });
        cart
    }

    fn with_address() -> Value {
        json!({"id": 3, "name": "Ana", "email": "ana@example.com", "address": "Calle 10 # 5-20, Medellín"})
    }

    #[tokio::test]
    async fn checkout_requires_login() {
        let store = MemoryStorage::new();
        let api = StorefrontApi::new("http://localhost:1").unwrap();
        let mut cart = Cart::new();
        cart.add(CartItem::new(1, "Blusa", sf_common::Cop::from(1_000)));
        let err = start_checkout(&api, &store, &cart, true).await.unwrap_err();
        assert!(matches!(err, StorefrontApiError::NotAuthenticated));
    }

    #[tokio::test]
    async fn checkout_rejects_empty_cart() {
        let store = MemoryStorage::new();
        store.set(AUTH_TOKEN, "tok").unwrap();
        let api = StorefrontApi::new("http://localhost:1").unwrap().with_access_token(Some("tok".into()));
        let err = start_checkout(&api, &store, &Cart::new(), true).await.unwrap_err();
        assert!(matches!(err, StorefrontApiError::Validation(_)));
    }

    #[tokio::test]
    async fn session_with_order_remembers_the_order() {
        let backend = StubBackend::start(vec![
            route("GET", "/api/profile", 200, with_address()),
            route("POST", "/api/orders/checkout", 200, json!({"order_id": 1042, "session_id": "sess-1"})),
        ])
        .await;
        let store = signed_in();
        let session = start_checkout(&backend.api(), &store, &one_item_cart(), true).await.unwrap();
        assert_eq!(session, CheckoutSession { session_id: "sess-1".into(), order_id: Some(1042) });
        assert_eq!(store.get(LAST_ORDER_ID).as_deref(), Some("1042"));
        assert_eq!(backend.paths(), vec!["GET /api/profile", "POST /api/orders/checkout"]);
        let body = backend.body_of("/api/orders/checkout");
        assert_eq!(body["items"][0]["id"], json!(7));
        assert_eq!(body["items"][0]["quantity"], json!(2));
        assert_eq!(body["total"], json!(190_000));
    }

    #[tokio::test]
    async fn missing_session_falls_back_to_standalone_session() {
        let backend = StubBackend::start(vec![
            route("GET", "/api/profile", 200, with_address()),
            route("POST", "/api/orders/checkout", 200, json!({"data": {"order_id": 77}})),
            route("POST", "/api/epayco/session", 200, json!({"data": {"sessionId": "sess-2"}})),
        ])
        .await;
        let store = signed_in();
        let session = start_checkout(&backend.api(), &store, &one_item_cart(), true).await.unwrap();
        assert_eq!(session, CheckoutSession { session_id: "sess-2".into(), order_id: None });
        assert_eq!(store.get(LAST_ORDER_ID), None);
        let body = backend.body_of("/api/epayco/session");
        assert_eq!(body["amount"], json!(190_000));
        assert_eq!(body["currency"], json!("COP"));
        assert_eq!(body["test"], json!(true));
    }

    #[tokio::test]
    async fn failed_standalone_session_is_no_checkout_session() {
        let backend = StubBackend::start(vec![
            route("GET", "/api/profile", 200, with_address()),
            route("POST", "/api/orders/checkout", 200, json!({"order_id": 77})),
            route("POST", "/api/epayco/session", 502, json!({"message": "gateway down"})),
        ])
        .await;
        let store = signed_in();
        let err = start_checkout(&backend.api(), &store, &one_item_cart(), false).await.unwrap_err();
        assert!(matches!(err, StorefrontApiError::NoCheckoutSession));
        assert_eq!(store.get(LAST_ORDER_ID), None);
        assert_eq!(backend.paths().last().map(String::as_str), Some("POST /api/epayco/session"));

        let backend = StubBackend::start(vec![
            route("GET", "/api/profile", 200, with_address()),
            route("POST", "/api/orders/checkout", 200, json!({"ok": true})),
            route("POST", "/api/epayco/session", 200, json!({"data": {}})),
        ])
        .await;
        let err = start_checkout(&backend.api(), &store, &one_item_cart(), false).await.unwrap_err();
        assert!(matches!(err, StorefrontApiError::NoCheckoutSession));
    }

    #[tokio::test]
    async fn checkout_requires_an_address() {
        let backend = StubBackend::start(vec![
            route("GET", "/api/profile", 200, json!({"name": "Ana", "address": "   "})),
            route("POST", "/api/orders/checkout", 200, json!({"order_id": 1042, "session_id": "sess-1"})),
        ])
        .await;
        let store = signed_in();
        let err = start_checkout(&backend.api(), &store, &one_item_cart(), true).await.unwrap_err();
        assert!(matches!(err, StorefrontApiError::AddressRequired));
        assert_eq!(backend.paths(), vec!["GET /api/profile"]);
        assert_eq!(store.get(LAST_ORDER_ID), None);
    }

    #[tokio::test]
    async fn unreadable_profile_does_not_block_checkout() {
        let backend = StubBackend::start(vec![route(
            "POST",
            "/api/orders/checkout",
            200,
            json!({"order_id": 1042, "session_id": "sess-1"}),
        )])
        .await;
        let store = signed_in();
        let session = start_checkout(&backend.api(), &store, &one_item_cart(), true).await.unwrap();
        assert_eq!(session.order_id, Some(1042));
    }

    #[tokio::test]
    async fn gateway_response_is_linked_and_remembered() {
        let backend = StubBackend::start(vec![route("POST", "/api/orders/1042/epayco/ref", 200, json!({}))]).await;
        let store = signed_in();
        record_gateway_response(&backend.api(), &store, 1042, "87436512", Some("ORD-1042")).await.unwrap();
        assert_eq!(store.get(LAST_REF_PAYCO).as_deref(), Some("87436512"));
        assert_eq!(store.get(LAST_EPAYCO_INVOICE).as_deref(), Some("ORD-1042"));
        assert_eq!(backend.body_of("/api/orders/1042/epayco/ref"), json!({"ref": "87436512", "invoice": "ORD-1042"}));

        let store = signed_in();
        record_gateway_response(&backend.api(), &store, 1042, "87436513", Some("")).await.unwrap();
        assert_eq!(store.get(LAST_REF_PAYCO).as_deref(), Some("87436513"));
        assert_eq!(store.get(LAST_EPAYCO_INVOICE), None);
    }

    #[tokio::test]
    async fn rejected_link_stores_nothing() {
        let backend = StubBackend::start(vec![]).await;
        let store = signed_in();
        let err = record_gateway_response(&backend.api(), &store, 9, "87436512", Some("ORD-9")).await.unwrap_err();
        assert!(matches!(err, StorefrontApiError::QueryError { status: 404, .. }));
        assert_eq!(store.get(LAST_REF_PAYCO), None);
        assert_eq!(store.get(LAST_EPAYCO_INVOICE), None);
    }
}
