//! Client-held shopping cart. Never persisted server-side; it round-trips as
//! JSON so a storefront can keep it in durable local storage.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{catalog::repo_types::Product, orders::repo_types::LineItem};

/// Line item quantities are stored as `INTEGER`.
const MAX_QUANTITY: u32 = i32::MAX as u32;

/// Product data captured when it was first added. Later catalog price
/// changes do not reach an existing cart entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub image_url: String,
}

impl From<&Product> for ProductSnapshot {
    fn from(p: &Product) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            price: p.price,
            image_url: p.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    pub product: ProductSnapshot,
    pub quantity: u32,
}

#[derive(Debug, Error, PartialEq)]
pub enum CartError {
    #[error("price for product {0} must be a non-negative number")]
    BadPrice(Uuid),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CartEntry>", into = "Vec<CartEntry>")]
pub struct Cart {
    entries: Vec<CartEntry>,
}

impl TryFrom<Vec<CartEntry>> for Cart {
    type Error = CartError;

    /// Zero-quantity entries are dropped and duplicate products merged.
    fn try_from(raw: Vec<CartEntry>) -> Result<Self, Self::Error> {
        let mut cart = Cart::default();
        for entry in raw {
            if !entry.product.price.is_finite() || entry.product.price < 0.0 {
                return Err(CartError::BadPrice(entry.product.id));
            }
            if entry.quantity == 0 {
                continue;
            }
            cart.add_or_increment(entry.product, entry.quantity);
        }
        Ok(cart)
    }
}

impl From<Cart> for Vec<CartEntry> {
    fn from(cart: Cart) -> Self {
        cart.entries
    }
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.entries.iter().position(|e| e.product.id == id)
    }

    /// Accumulates onto an existing entry; otherwise starts at `qty`.
    /// A `qty` of zero counts as one.
    pub fn add_or_increment(&mut self, product: ProductSnapshot, qty: u32) {
        let qty = qty.max(1);
        match self.position(product.id) {
            Some(i) => {
                let e = &mut self.entries[i];
                e.quantity = e.quantity.saturating_add(qty).min(MAX_QUANTITY);
            }
            None => self.entries.push(CartEntry {
                product,
                quantity: qty.min(MAX_QUANTITY),
            }),
        }
    }

    /// One step down, never below one. Returns the new quantity.
    pub fn decrement(&mut self, id: Uuid) -> Option<u32> {
        let i = self.position(id)?;
        let e = &mut self.entries[i];
        e.quantity = e.quantity.saturating_sub(1).max(1);
        Some(e.quantity)
    }

    /// Zero removes the entry. Returns false when the product is not in the cart.
    pub fn set_quantity(&mut self, id: Uuid, qty: u32) -> bool {
        let Some(i) = self.position(id) else {
            return false;
        };
        if qty == 0 {
            self.entries.remove(i);
        } else {
            self.entries[i].quantity = qty.min(MAX_QUANTITY);
        }
        true
    }

    pub fn remove(&mut self, id: Uuid) -> Option<CartEntry> {
        self.position(id).map(|i| self.entries.remove(i))
    }

    /// Sum of snapshot price × quantity.
    pub fn total(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| e.product.price * f64::from(e.quantity))
            .sum()
    }

    pub fn item_count(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.quantity)).sum()
    }

    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    pub fn line_items(&self) -> Vec<LineItem> {
        self.entries
            .iter()
            .map(|e| LineItem {
                product_id: e.product.id,
                quantity: i32::try_from(e.quantity).unwrap_or(i32::MAX),
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
