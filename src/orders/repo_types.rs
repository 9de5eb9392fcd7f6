use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::status::OrderStatus;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub country: String,
}

impl ShippingAddress {
    pub fn validate(&self) -> AppResult<()> {
        let blank = [&self.address, &self.city, &self.postal_code, &self.country]
            .into_iter()
            .any(|f| f.trim().is_empty());
        if blank {
            return Err(AppError::validation("Please fill in all address fields"));
        }
        Ok(())
    }

    pub fn trimmed(self) -> Self {
        Self {
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            country: self.country.trim().to_string(),
        }
    }
}

/// A product reference and a positive quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Input to order placement, whether it comes from the HTTP payload or a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    pub shipping_address: ShippingAddress,
}

impl NewOrder {
    pub fn validate(&self) -> AppResult<()> {
        if self.items.is_empty() {
            return Err(AppError::validation("Order must contain at least one product"));
        }
        if let Some(bad) = self.items.iter().find(|i| i.quantity < 1) {
            return Err(AppError::validation(format!(
                "Quantity for product {} must be a positive integer",
                bad.product_id
            )));
        }
        if !self.total_amount.is_finite() || self.total_amount < 0.0 {
            return Err(AppError::validation("totalAmount must be a non-negative number"));
        }
        self.shipping_address.validate()
    }
}

/// Persisted order. Mutated after creation only through status transitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    /// Bumped on every status write; used for compare-and-swap.
    pub version: i32,
    pub created_at: OffsetDateTime,
}

impl Order {
    pub fn pending(user_id: Uuid, new: NewOrder) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            items: new.items,
            total_amount: new.total_amount,
            shipping_address: new.shipping_address.trimmed(),
            status: OrderStatus::INITIAL,
            version: 0,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_amount: f64,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub status: String,
    pub version: i32,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct OrderItemRow {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

impl OrderRow {
    pub fn into_order(self, items: Vec<LineItem>) -> anyhow::Result<Order> {
        let status = self.status.parse::<OrderStatus>()?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            items,
            total_amount: self.total_amount,
            shipping_address: ShippingAddress {
                address: self.address,
                city: self.city,
                postal_code: self.postal_code,
                country: self.country,
            },
            status,
            version: self.version,
            created_at: self.created_at,
        })
    }
}
