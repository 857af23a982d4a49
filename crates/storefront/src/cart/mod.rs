//! Shopper cart state.
//!
//! [`Cart`] is the pure in-memory state: ordered line items plus a delivery
//! (location) surcharge, with totals always recomputed from the items.
//! [`CartStore`] wraps it with durable persistence after every mutation.
//!
//! # Invariants
//!
//! - At most one line item per product id
//! - Every line item has quantity >= 1; an item reaching 0 is removed
//! - Items keep insertion order

mod store;

use boutique_core::price::coerce_decimal;
use boutique_core::{Price, ProductId};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::Product;

pub use store::CartStore;

/// One product-and-quantity pair in the cart.
///
/// Product data is copied by value when the item is added; later catalog
/// refreshes do not touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "price", alias = "unitPrice")]
    pub unit_price: Price,
    #[serde(
        default,
        deserialize_with = "image_url",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
    #[serde(deserialize_with = "quantity")]
    pub quantity: u32,
}

impl CartLineItem {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.unit_price.times(self.quantity)
    }
}

/// Product data needed to add a line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: Option<String>,
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
        }
    }
}

/// The shopper's in-progress order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartLineItem>,
    location_cost: Decimal,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a cart from stored parts, restoring the invariants.
    ///
    /// Items with quantity 0 are dropped; repeated ids are merged into the
    /// first occurrence by summing quantities.
    #[must_use]
    pub fn from_parts(items: Vec<CartLineItem>, location_cost: Decimal) -> Self {
        let mut merged: Vec<CartLineItem> = Vec::with_capacity(items.len());
        for item in items.into_iter().filter(|item| item.quantity > 0) {
            match merged.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => merged.push(item),
            }
        }
        Self {
            items: merged,
            location_cost,
        }
    }

    /// Add one unit of a product.
    ///
    /// An existing line keeps its original name, price and image; only the
    /// quantity changes.
    pub fn add_item(&mut self, product: CartProduct) {
        if let Some(existing) = self.items.iter_mut().find(|item| item.id == product.id) {
            existing.quantity = existing.quantity.saturating_add(1);
            return;
        }
        self.items.push(CartLineItem {
            id: product.id,
            name: product.name,
            unit_price: product.price,
            image: product.image,
            quantity: 1,
        });
    }

    /// Remove one unit of a product; the line goes away at quantity 1.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn remove_item(&mut self, id: ProductId) -> bool {
        let Some(index) = self.items.iter().position(|item| item.id == id) else {
            return false;
        };
        match self.items.get_mut(index) {
            Some(item) if item.quantity > 1 => item.quantity -= 1,
            _ => {
                self.items.remove(index);
            }
        }
        true
    }

    /// Remove a product's line regardless of quantity.
    ///
    /// Returns `false` if the product is not in the cart.
    pub fn clear_item(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Empty the cart and reset the location cost.
    ///
    /// Returns `false` if the cart was already empty with no location cost.
    pub fn clear(&mut self) -> bool {
        let changed = !self.items.is_empty() || !self.location_cost.is_zero();
        self.items.clear();
        self.location_cost = Decimal::ZERO;
        changed
    }

    /// Overwrite the location cost.
    ///
    /// Returns `false` if the value is unchanged.
    pub fn set_location_cost(&mut self, cost: Decimal) -> bool {
        let changed = self.location_cost != cost;
        self.location_cost = cost;
        changed
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Delivery/location surcharge.
    #[must_use]
    pub const fn location_cost(&self) -> Decimal {
        self.location_cost
    }

    /// Quantity of a product, 0 if absent.
    #[must_use]
    pub fn quantity_of(&self, id: ProductId) -> u32 {
        self.items
            .iter()
            .find(|item| item.id == id)
            .map_or(0, |item| item.quantity)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of line subtotals, excluding the location cost.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartLineItem::subtotal).sum()
    }

    /// `total_price + location_cost`.
    #[must_use]
    pub fn grand_total(&self) -> Decimal {
        self.total_price() + self.location_cost
    }
}

// Stored carts have carried quantities as numbers and as numeric strings.
fn quantity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    coerce_decimal(&raw)
        .filter(|q| q.fract().is_zero())
        .and_then(|q| q.to_u32())
        .ok_or_else(|| serde::de::Error::custom(format!("invalid quantity: {raw}")))
}

// Images were stored either as a URL string or as `{ "url": ... }`.
fn image_url<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(match raw {
        serde_json::Value::String(url) => Some(url),
        serde_json::Value::Object(mut map) => match map.remove("url") {
            Some(serde_json::Value::String(url)) => Some(url),
            _ => None,
        },
        _ => None,
    })
}
