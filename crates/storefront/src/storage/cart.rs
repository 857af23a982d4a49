//! Cart persistence contract.
//!
//! # Key Layout
//!
//! | Key | Contents |
//! |-----|----------|
//! | `cart` | [`CartSnapshot`] - canonical, versioned |
//! | `cartItems` | JSON array of line items |
//! | `cartLocationCost` | JSON number |
//!
//! The snapshot is the source of truth. The two legacy keys are a projection
//! of the same snapshot written by the same [`CartPersistence::save`] call;
//! they are only read when the snapshot is missing or unreadable, and each
//! is recovered on its own so a corrupt item list does not lose the
//! location cost (or the other way round).
//!
//! Amounts are JSON numbers unless an `f64` cannot hold them exactly, in
//! which case they are stored as numeric strings.
//!
//! # Versions
//!
//! A snapshot without a `version` field is the unversioned
//! `{ "items": [...], "locationCost": N }` layout and loads as version 0.
//! A snapshot with a version newer than [`SNAPSHOT_VERSION`] is ignored on
//! load and never overwritten.

use boutique_core::price::number;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{KeyValueStore, StorageError};
use crate::cart::{Cart, CartLineItem};

/// Key holding the canonical snapshot.
pub const SNAPSHOT_KEY: &str = "cart";

/// Legacy key holding the line items.
pub const ITEMS_KEY: &str = "cartItems";

/// Legacy key holding the location cost.
pub const LOCATION_COST_KEY: &str = "cartLocationCost";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted form of a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    #[serde(default)]
    pub version: u32,
    pub items: Vec<CartLineItem>,
    #[serde(default, with = "number")]
    pub location_cost: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl CartSnapshot {
    /// Snapshot the current cart.
    #[must_use]
    pub fn of(cart: &Cart) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            items: cart.items().to_vec(),
            location_cost: cart.location_cost(),
            saved_at: Some(Utc::now()),
        }
    }

    /// Rebuild the cart this snapshot describes.
    #[must_use]
    pub fn into_cart(self) -> Cart {
        Cart::from_parts(self.items, self.location_cost)
    }
}

/// Wire form of the legacy location cost key.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct LocationCost(#[serde(with = "number")] Decimal);

/// Just the version of a stored snapshot.
#[derive(Deserialize)]
struct StoredVersion {
    #[serde(default)]
    version: u32,
}

/// Reads and writes carts through a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct CartPersistence<S> {
    store: S,
}

impl<S: KeyValueStore> CartPersistence<S> {
    /// Wrap a store.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Write the whole cart: the snapshot, then its legacy projection.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NewerSnapshot`] without writing anything if
    /// storage holds a snapshot from a newer version, otherwise the first
    /// storage or serialization failure.
    pub fn save(&self, cart: &Cart) -> Result<(), StorageError> {
        self.check_stored_version()?;
        let snapshot = CartSnapshot::of(cart);

        self.store
            .set(SNAPSHOT_KEY, &serde_json::to_string(&snapshot)?)?;
        self.store
            .set(ITEMS_KEY, &serde_json::to_string(&snapshot.items)?)?;
        self.store.set(
            LOCATION_COST_KEY,
            &serde_json::to_string(&LocationCost(snapshot.location_cost))?,
        )?;

        debug!(
            lines = snapshot.items.len(),
            location_cost = %snapshot.location_cost,
            "Cart saved"
        );
        Ok(())
    }

    /// Read the stored cart. Never fails.
    ///
    /// Missing data yields an empty cart; unreadable entries are logged,
    /// dropped from storage, and treated as absent.
    #[must_use]
    pub fn load(&self) -> Cart {
        if let Some(snapshot) = self.load_snapshot() {
            return snapshot.into_cart();
        }
        Cart::from_parts(self.load_legacy_items(), self.load_legacy_location_cost())
    }

    fn load_snapshot(&self) -> Option<CartSnapshot> {
        let raw = self.read(SNAPSHOT_KEY)?;
        match serde_json::from_str::<CartSnapshot>(&raw) {
            Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => Some(snapshot),
            Ok(snapshot) if snapshot.version == 0 => {
                debug!("Reading unversioned cart snapshot");
                Some(snapshot)
            }
            Ok(snapshot) => {
                warn!(
                    version = snapshot.version,
                    "Unsupported cart snapshot version, falling back to legacy keys"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "Corrupt cart snapshot, falling back to legacy keys");
                self.discard(SNAPSHOT_KEY);
                None
            }
        }
    }

    /// Legacy item list. Individual unreadable items are skipped; a value
    /// that is not a list at all is discarded.
    fn load_legacy_items(&self) -> Vec<CartLineItem> {
        let Some(raw) = self.read(ITEMS_KEY) else {
            return Vec::new();
        };
        let values = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!(error = %e, "Corrupt stored cart items, starting empty");
                self.discard(ITEMS_KEY);
                return Vec::new();
            }
        };

        values
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<CartLineItem>(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable stored cart item");
                    None
                }
            })
            .collect()
    }

    fn load_legacy_location_cost(&self) -> Decimal {
        let Some(raw) = self.read(LOCATION_COST_KEY) else {
            return Decimal::ZERO;
        };
        match serde_json::from_str::<LocationCost>(&raw) {
            Ok(LocationCost(cost)) => cost,
            Err(e) => {
                warn!(error = %e, "Corrupt stored location cost, using 0");
                self.discard(LOCATION_COST_KEY);
                Decimal::ZERO
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored cart entry");
                None
            }
        }
    }

    fn check_stored_version(&self) -> Result<(), StorageError> {
        let Some(raw) = self.store.get(SNAPSHOT_KEY)? else {
            return Ok(());
        };
        match serde_json::from_str::<StoredVersion>(&raw) {
            Ok(StoredVersion { version }) if version > SNAPSHOT_VERSION => {
                Err(StorageError::NewerSnapshot(version))
            }
            _ => Ok(()),
        }
    }

    fn discard(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!(key, error = %e, "Failed to discard corrupt cart entry");
        }
    }
}
