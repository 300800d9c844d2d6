use log::*;
use serde::{Deserialize, Serialize};
use sf_common::Cop;

use crate::{
    data_objects::{CheckoutItem, CheckoutRequest, Order},
    storage::{ClientStorage, CART},
    StorageError,
    StorefrontApi,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: i64,
    pub name: String,
    pub unit_price: Cop,
    pub quantity: u32,
    #[serde(default)]
    pub category: Option<String>,
}

impl CartItem {
    pub fn new(product_id: i64, name: &str, unit_price: Cop) -> Self {
        Self { product_id, name: name.to_string(), unit_price, quantity: 1, category: None }
    }

    pub fn subtotal(&self) -> Cop {
        self.unit_price * i64::from(self.quantity)
    }
}

/// The shopping cart. It lives entirely on the client and is persisted under the `cart` storage key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn total(&self) -> Cop {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    /// Adds the item. If the product is already in the cart, its quantity is increased instead.
    pub fn add(&mut self, item: CartItem) {
        match self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity.max(1)),
            None => self.items.push(CartItem { quantity: item.quantity.max(1), ..item }),
        }
    }

    pub fn remove(&mut self, product_id: i64) -> Option<CartItem> {
        let pos = self.items.iter().position(|i| i.product_id == product_id)?;
        Some(self.items.remove(pos))
    }

    /// Sets the quantity for a product. A quantity of zero removes the line. Returns false if the product is not in
    /// the cart.
    pub fn update_quantity(&mut self, product_id: i64, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(product_id).is_some();
        }
        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = quantity;
                true
            },
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn to_checkout_request(&self) -> CheckoutRequest {
        let items = self
            .items
            .iter()
            .map(|i| CheckoutItem {
                id: i.product_id,
                name: i.name.clone(),
                price_number: i.unit_price,
                quantity: i.quantity,
            })
            .collect();
        let total = self.total();
        CheckoutRequest { items, subtotal: total, taxes: Cop::default(), total }
    }

    /// Loads the stored cart. A missing or unreadable cart is an empty one.
    pub fn load<S: ClientStorage + ?Sized>(storage: &S) -> Self {
        storage
            .get(CART)
            .and_then(|raw| {
                serde_json::from_str(&raw).map_err(|e| warn!("🛒️ Discarding unreadable stored cart. {e}")).ok()
            })
            .unwrap_or_default()
    }

    pub fn save<S: ClientStorage + ?Sized>(&self, storage: &S) -> Result<(), StorageError> {
        let json = serde_json::to_string(self).map_err(|e| StorageError::Serialization(e.to_string()))?;
        storage.set(CART, &json)
    }

    /// Empties the persisted cart without loading it.
    pub fn clear_stored<S: ClientStorage + ?Sized>(storage: &S) -> Result<(), StorageError> {
        debug!("🛒️ Clearing stored cart");
        storage.remove(CART)
    }

    /// Rebuilds a cart from a past order so that its payment can be retried.
    ///
    /// Each line is refreshed from the product catalogue. If a product can no longer be fetched the order's own line
    /// data is used, so the retry never silently drops items.
    pub async fn from_order(api: &StorefrontApi, order: &Order) -> Self {
        let mut cart = Cart::new();
        for line in &order.items {
            let item = match api.product(line.id).await {
                Ok(p) => CartItem {
                    product_id: line.id,
                    name: if line.name.is_empty() { p.name } else { line.name.clone() },
                    unit_price: if line.unit_price == Cop::default() { p.price_number } else { line.unit_price },
                    quantity: line.quantity.max(1),
                    category: p.category,
                },
                Err(e) => {
                    warn!("🛒️ Could not refresh product {} for order {}. Using order data. {e}", line.id, order.id);
                    let name = if line.name.is_empty() { "Producto".to_string() } else { line.name.clone() };
                    CartItem { quantity: line.quantity.max(1), ..CartItem::new(line.id, &name, line.unit_price) }
                },
            };
            cart.add(item);
        }
        info!("🛒️ Rebuilt cart with {} items from order {}", cart.item_count(), order.id);
        cart
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        data_objects::{LineItem, OrderStatus},
        storage::MemoryStorage,
    };

    fn sample() -> Cart {
        let mut cart = Cart::new();
        cart.add(CartItem::new(1, "Blusa Seda", Cop::from(120_000)));
        cart.add(CartItem { quantity: 2, ..CartItem::new(2, "Aretes", Cop::from(35_000)) });
        cart
    }

    #[test]
    fn totals() {
        let cart = sample();
        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), Cop::from(190_000));
    }

    #[test]
    fn adding_existing_product_merges() {
        let mut cart = sample();
        cart.add(CartItem::new(1, "Blusa Seda", Cop::from(120_000)));
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn merged_quantity_saturates() {
        let mut cart = Cart::new();
        cart.add(CartItem { quantity: u32::MAX, ..CartItem::new(7, "Collar", Cop::from(1)) });
        cart.add(CartItem { quantity: u32::MAX, ..CartItem::new(7, "Collar", Cop::from(1)) });
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, u32::MAX);
    }

    #[test]
    fn quantity_updates() {
        let mut cart = sample();
        assert!(cart.update_quantity(2, 5));
        assert_eq!(cart.item_count(), 6);
        assert!(cart.update_quantity(2, 0));
        assert_eq!(cart.items().len(), 1);
        assert!(!cart.update_quantity(99, 1));
        assert!(cart.remove(1).is_some());
        assert!(cart.is_empty());
    }

    #[test]
    fn checkout_request_matches_cart() {
        let req = sample().to_checkout_request();
        assert_eq!(req.items.len(), 2);
        assert_eq!(req.items[1].quantity, 2);
        assert_eq!(req.subtotal, Cop::from(190_000));
        assert_eq!(req.total, req.subtotal);
        assert_eq!(req.taxes, Cop::default());
    }

    #[test]
    fn persistence() {
        let store = MemoryStorage::new();
        assert!(Cart::load(&store).is_empty());
        sample().save(&store).unwrap();
        assert_eq!(Cart::load(&store), sample());
        Cart::clear_stored(&store).unwrap();
        assert!(Cart::load(&store).is_empty());
        store.set(CART, "{not json").unwrap();
        assert!(Cart::load(&store).is_empty());
    }

    #[tokio::test]
    async fn retry_uses_order_lines_when_catalogue_is_unreachable() {
        let api = StorefrontApi::new("http://localhost:1").unwrap();
        let order = Order {
            id: 1042,
            status: OrderStatus::PendingPayment,
            items: vec![
                LineItem { id: 1, name: "Blusa Seda".into(), quantity: 2, unit_price: Cop::from(120_000) },
                LineItem { id: 2, name: String::new(), quantity: 0, unit_price: Cop::from(35_000) },
            ],
            created_at: None,
            total: Cop::from(275_000),
        };
        let cart = Cart::from_order(&api, &order).await;
        let items = cart.items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id, 1);
        assert_eq!(items[0].name, "Blusa Seda");
        assert_eq!(items[0].unit_price, Cop::from(120_000));
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].product_id, 2);
        assert_eq!(items[1].name, "Producto");
        assert_eq!(items[1].unit_price, Cop::from(35_000));
        assert_eq!(items[1].quantity, 1);
        assert_eq!(cart.total(), Cop::from(275_000));
    }
}
