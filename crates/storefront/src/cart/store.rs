//! Persisted cart: every mutation is written through to durable storage.

use boutique_core::ProductId;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::{Cart, CartProduct};
use crate::error::add_breadcrumb;
use crate::storage::{CartPersistence, KeyValueStore};

/// A [`Cart`] bound to durable storage.
///
/// Each mutation that changes the cart saves the whole state before
/// returning. Storage failures are logged, never returned: the in-memory
/// cart stays authoritative and the next successful write catches storage up.
#[derive(Debug)]
pub struct CartStore<S> {
    cart: Cart,
    persistence: CartPersistence<S>,
}

impl<S: KeyValueStore> CartStore<S> {
    /// Create an empty cart over `store` without reading it.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            cart: Cart::new(),
            persistence: CartPersistence::new(store),
        }
    }

    /// Create a cart over `store` and rehydrate it.
    #[must_use]
    pub fn open(store: S) -> Self {
        let mut cart = Self::new(store);
        cart.load();
        cart
    }

    /// Replace the in-memory cart with whatever storage holds.
    ///
    /// Corrupt entries are treated as absent (see [`CartPersistence::load`]).
    pub fn load(&mut self) {
        self.cart = self.persistence.load();
        debug!(
            lines = self.cart.items().len(),
            total_items = self.cart.total_items(),
            "Cart loaded"
        );
    }

    /// Add one unit of a product.
    pub fn add_item(&mut self, product: CartProduct) {
        let id = product.id.to_string();
        self.cart.add_item(product);
        add_breadcrumb("cart", "Added item", Some(&[("product_id", id.as_str())]));
        self.persist();
    }

    /// Remove one unit of a product. No-op if absent.
    pub fn remove_item(&mut self, id: ProductId) {
        if self.cart.remove_item(id) {
            let id = id.to_string();
            add_breadcrumb("cart", "Removed item", Some(&[("product_id", id.as_str())]));
            self.persist();
        }
    }

    /// Remove a product's line regardless of quantity. No-op if absent.
    pub fn clear_item(&mut self, id: ProductId) {
        if self.cart.clear_item(id) {
            let id = id.to_string();
            add_breadcrumb("cart", "Cleared item", Some(&[("product_id", id.as_str())]));
            self.persist();
        }
    }

    /// Empty the cart and reset the location cost.
    pub fn clear_cart(&mut self) {
        if self.cart.clear() {
            add_breadcrumb("cart", "Cleared cart", None);
            self.persist();
        }
    }

    /// Overwrite the location cost. Negative values are stored as given.
    pub fn set_location_cost(&mut self, cost: Decimal) {
        if cost.is_sign_negative() && !cost.is_zero() {
            warn!(%cost, "Negative location cost set");
        }
        if self.cart.set_location_cost(cost) {
            self.persist();
        }
    }

    /// Current cart state.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    fn persist(&self) {
        if let Err(e) = self.persistence.save(&self.cart) {
            warn!(error = %e, "Failed to persist cart");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use boutique_core::Price;

    use super::*;
    use crate::storage::{MemoryStore, SNAPSHOT_KEY, StorageError};

    fn product(id: i64, price: &str) -> CartProduct {
        CartProduct {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Price::parse(price).unwrap(),
            image: Some(format!("https://cdn.example.com/{id}.png")),
        }
    }

    #[test]
    fn test_mutations_are_persisted() {
        let store = MemoryStore::new();
        let mut cart = CartStore::new(store.clone());

        cart.add_item(product(1, "10"));
        assert!(store.get(SNAPSHOT_KEY).unwrap().is_some());

        cart.add_item(product(1, "10"));
        cart.add_item(product(2, "2.5"));
        cart.set_location_cost("4".parse().unwrap());

        let reopened = CartStore::open(store);
        assert_eq!(reopened.cart(), cart.cart());
        assert_eq!(reopened.cart().total_items(), 3);
        assert_eq!(reopened.cart().grand_total(), "26.5".parse::<Decimal>().unwrap());
    }

    #[test]
    fn test_noop_mutation_does_not_write() {
        let store = MemoryStore::new();
        let mut cart = CartStore::new(store.clone());

        cart.remove_item(ProductId::new(9));
        cart.clear_item(ProductId::new(9));
        cart.clear_cart();
        assert_eq!(store.get(SNAPSHOT_KEY).unwrap(), None);
    }

    #[test]
    fn test_clear_cart_persists_empty_state() {
        let store = MemoryStore::new();
        let mut cart = CartStore::new(store.clone());
        cart.add_item(product(1, "10"));
        cart.set_location_cost("5".parse().unwrap());

        cart.clear_cart();

        let reopened = CartStore::open(store);
        assert!(reopened.cart().is_empty());
        assert_eq!(reopened.cart().location_cost(), Decimal::ZERO);
    }

    /// Store whose writes always fail.
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }

        fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Poisoned)
        }
    }

    #[test]
    fn test_storage_failure_keeps_in_memory_state() {
        let mut cart = CartStore::new(ReadOnlyStore);
        cart.add_item(product(1, "10"));
        cart.add_item(product(1, "10"));
        assert_eq!(cart.cart().quantity_of(ProductId::new(1)), 2);
    }
}
