use std::sync::{
    atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    Arc,
    Mutex,
};

use log::*;
use sf_common::Secret;
use tokio::{sync::watch, task::JoinHandle};

use super::{
    backends::{OrderBackend, TransactionLookup},
    query::payment_reference_from_query,
    view::{ConfirmationState, ConfirmationView},
};
use crate::{
    cart::Cart,
    config::PollSettings,
    data_objects::{LinkReferenceRequest, OrderStatus, SyncStatusRequest},
    storage::{last_order_id, ClientStorage, AUTH_TOKEN},
};

/// The order-confirmation page as a component.
///
/// [`activate`](Self::activate) runs the confirmation flow for one redirect. State changes are published on a watch
/// channel (see [`subscribe`](Self::subscribe)), including those made later by the poll chain. Dropping the component,
/// or calling [`teardown`](Self::teardown), cancels any pending poll.
pub struct PaymentConfirmation<G, O, S>
where
    G: TransactionLookup,
    O: OrderBackend,
    S: ClientStorage + 'static,
{
    inner: Arc<Inner<G, O, S>>,
}

struct Inner<G, O, S> {
    gateway: G,
    orders: O,
    storage: S,
    settings: PollSettings,
    state: watch::Sender<ConfirmationState>,
    poll: PollState,
    cart_cleared: AtomicBool,
}

/// Owned by a single component instance. `epoch` changes on every teardown, which invalidates any step of the poll
/// chain that was scheduled before it.
#[derive(Default)]
struct PollState {
    attempts: AtomicU32,
    active: AtomicBool,
    epoch: AtomicU64,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<G, O, S> PaymentConfirmation<G, O, S>
where
    G: TransactionLookup,
    O: OrderBackend,
    S: ClientStorage + 'static,
{
    pub fn new(gateway: G, orders: O, storage: S, settings: PollSettings) -> Self {
        let (state, _) = watch::channel(ConfirmationState::default());
        let inner = Inner {
            gateway,
            orders,
            storage,
            settings,
            state,
            poll: PollState::default(),
            cart_cleared: AtomicBool::new(false),
        };
        Self { inner: Arc::new(inner) }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConfirmationState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> ConfirmationState {
        self.inner.state.borrow().clone()
    }

    pub fn view(&self) -> ConfirmationView {
        self.inner.state.borrow().view()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poll.active.load(Ordering::SeqCst)
    }

    /// Number of status requests made by the current poll chain.
    pub fn poll_attempts(&self) -> u32 {
        self.inner.poll.attempts.load(Ordering::SeqCst)
    }

    /// Whether the last activation emptied the stored cart.
    pub fn cart_cleared(&self) -> bool {
        self.inner.cart_cleared.load(Ordering::SeqCst)
    }

    /// Runs the confirmation flow for the redirect's query string and returns the view as it stands once the
    /// synchronous part is done. If the order is still pending, polling carries on in the background.
    ///
    /// Activating again tears down the previous activation first.
    pub async fn activate(&self, query: &str) -> ConfirmationView {
        let inner = &self.inner;
        inner.reset();
        inner.cart_cleared.store(false, Ordering::SeqCst);
        let epoch = inner.poll.epoch.load(Ordering::SeqCst);

        let Some(reference) = payment_reference_from_query(query) else {
            info!("🧾️ No payment reference in the redirect. Nothing to confirm.");
            inner.publish(|s| *s = ConfirmationState { loading: false, ..Default::default() });
            return self.view();
        };
        inner.publish(|s| *s = ConfirmationState::default());

        let record = match inner.gateway.lookup_transaction(&reference).await {
            Ok(record) => record,
            Err(e) => {
                warn!("🧾️ Could not fetch transaction {reference} from the gateway. {e}");
                inner.publish(|s| {
                    s.loading = false;
                    s.payment = None;
                });
                return self.view();
            },
        };
        let approved = record.is_approved();
        let gateway_reference = record.gateway_reference();
        let invoice = record.invoice();
        debug!("🧾️ Gateway state for {reference}: {:?}. Approved: {approved}", record.state());
        inner.publish(|s| s.payment = Some(record));

        let mut merchant_status = None;
        match (last_order_id(&inner.storage), gateway_reference) {
            (Some(order_id), Some(xref)) => {
                let token = inner.storage.get(AUTH_TOKEN).filter(|t| !t.is_empty()).map(Secret::new);
                inner.dispatch_link(order_id, LinkReferenceRequest { reference: xref.clone(), invoice }, token);
                match inner.orders.sync_status(SyncStatusRequest { order_id, reference: xref }).await {
                    Ok(report) => {
                        merchant_status = report.status;
                        let status = merchant_status.clone();
                        inner.publish(|s| {
                            if status.is_some() {
                                s.order_status = status;
                            }
                            s.loading = false;
                        });
                        if merchant_status == Some(OrderStatus::PendingPayment) {
                            inner.start_polling(order_id, epoch);
                        }
                    },
                    Err(e) => {
                        warn!("🧾️ Could not sync status for order {order_id}. {e}");
                        inner.publish(|s| s.loading = false);
                    },
                }
            },
            (order_id, xref) => {
                debug!(
                    "🧾️ Showing gateway data only. Order id known: {}. Reference known: {}",
                    order_id.is_some(),
                    xref.is_some()
                );
                inner.publish(|s| s.loading = false);
            },
        }

        // Evaluated once. A pending order that only becomes paid while polling does not clear the cart.
        inner.settle_cart(approved, merchant_status.as_ref());
        self.view()
    }

    /// Resolves once no poll chain is running, returning the final state.
    pub async fn settled(&self) -> ConfirmationState {
        let mut rx = self.inner.state.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if !state.polling {
                    return state.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Cancels any pending poll and resets the poll counter and flag so a later activation starts fresh.
    pub fn teardown(&self) {
        debug!("🔁️ Tearing down payment confirmation");
        self.inner.reset();
    }
}

impl<G, O, S> Drop for PaymentConfirmation<G, O, S>
where
    G: TransactionLookup,
    O: OrderBackend,
    S: ClientStorage + 'static,
{
    fn drop(&mut self) {
        self.inner.reset();
    }
}

impl<G, O, S> Inner<G, O, S>
where
    G: TransactionLookup,
    O: OrderBackend,
    S: ClientStorage + 'static,
{
    fn publish<F: FnOnce(&mut ConfirmationState)>(&self, f: F) {
        self.state.send_modify(f);
    }

    fn reset(&self) {
        self.poll.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.poll.timer.lock().unwrap_or_else(|p| p.into_inner()).take() {
            handle.abort();
        }
        self.poll.active.store(false, Ordering::SeqCst);
        self.poll.attempts.store(0, Ordering::SeqCst);
        self.state.send_if_modified(|s| std::mem::replace(&mut s.polling, false));
    }

    /// Links the gateway reference to the order without waiting for the outcome. There is no ordering guarantee
    /// relative to the sync-status request that follows, no retry, and failures are only logged.
    fn dispatch_link(self: &Arc<Self>, order_id: i64, request: LinkReferenceRequest, token: Option<Secret<String>>) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let reference = request.reference.clone();
            match inner.orders.link_reference(order_id, request, token).await {
                Ok(()) => trace!("🧾️ Linked reference {reference} to order {order_id}"),
                Err(e) => debug!("🧾️ Ignoring failure to link reference {reference} to order {order_id}. {e}"),
            }
        });
    }

    fn start_polling(self: &Arc<Self>, order_id: i64, epoch: u64) {
        if self.poll.epoch.load(Ordering::SeqCst) != epoch || self.poll.active.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("🔁️ Order {order_id} is pending payment. Waiting for it to settle.");
        self.publish(|s| s.polling = true);
        self.schedule_poll(order_id, epoch);
    }

    /// Schedules the next status request one interval from now. Only called once the previous request has settled,
    /// so there is never more than one request in flight.
    fn schedule_poll(self: &Arc<Self>, order_id: i64, epoch: u64) {
        let mut timer = self.poll.timer.lock().unwrap_or_else(|p| p.into_inner());
        if self.poll.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        let inner = Arc::clone(self);
        let interval = self.settings.interval;
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            inner.poll_once(order_id, epoch).await;
        }));
    }

    async fn poll_once(self: Arc<Self>, order_id: i64, epoch: u64) {
        let max = self.settings.max_attempts;
        if self.poll.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        if self.poll.attempts.load(Ordering::SeqCst) >= max {
            self.stop_polling();
            return;
        }
        let attempt = self.poll.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("🔁️ Checking order {order_id}, attempt {attempt}/{max}");
        let result = self.orders.order_status(order_id).await;
        if self.poll.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        match result {
            Ok(report) => {
                if let Some(status) = report.status {
                    let settled = status.is_settled();
                    debug!("🔁️ Order {order_id} is {status}");
                    self.publish(|s| s.order_status = Some(status));
                    if settled {
                        info!("🔁️ Order {order_id} settled after {attempt} checks");
                        self.stop_polling();
                        return;
                    }
                }
            },
            Err(e) => debug!("🔁️ Status check {attempt} for order {order_id} failed. {e}"),
        }
        if attempt < max {
            self.schedule_poll(order_id, epoch);
        } else {
            info!("🔁️ Order {order_id} still not settled after {max} checks. Giving up.");
            self.stop_polling();
        }
    }

    fn stop_polling(&self) {
        self.poll.active.store(false, Ordering::SeqCst);
        self.publish(|s| s.polling = false);
    }

    fn settle_cart(&self, approved: bool, merchant_status: Option<&OrderStatus>) {
        let paid = merchant_status == Some(&OrderStatus::Paid);
        if !(approved || paid) || self.cart_cleared.swap(true, Ordering::SeqCst) {
            return;
        }
        match Cart::clear_stored(&self.storage) {
            Ok(()) => info!("🛒️ Payment confirmed (gateway approved: {approved}, merchant paid: {paid}). Cart cleared."),
            Err(e) => warn!("🛒️ Payment confirmed but the cart could not be cleared. {e}"),
        }
    }
}
