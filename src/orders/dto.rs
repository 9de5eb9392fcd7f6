use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{
    repo_types::{LineItem, NewOrder, Order, ShippingAddress},
    status::OrderStatus,
};
use crate::{
    catalog::repo_types::Product,
    error::{AppError, AppResult},
};

/// Label shown for a line item whose product was deleted from the catalog.
pub const MISSING_PRODUCT_LABEL: &str = "product no longer exists";

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    #[serde(alias = "productId")]
    pub product: Uuid,
    pub quantity: i64,
}

/// Storefront order payload. A `status` key, if sent, is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: Option<Uuid>,
    pub products: Option<Vec<LineItemRequest>>,
    pub total_amount: Option<f64>,
    pub shipping_address: Option<ShippingAddress>,
}

impl CreateOrderRequest {
    /// Presence checks only; value rules live in [`NewOrder::validate`].
    pub fn into_new_order(self) -> AppResult<NewOrder> {
        let (Some(products), Some(total_amount), Some(shipping_address)) =
            (self.products, self.total_amount, self.shipping_address)
        else {
            return Err(AppError::validation("Missing order data"));
        };
        let items = products
            .into_iter()
            .map(|p| {
                let quantity = i32::try_from(p.quantity).map_err(|_| {
                    AppError::validation(format!("Quantity for product {} is out of range", p.product))
                })?;
                Ok(LineItem {
                    product_id: p.product,
                    quantity,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(NewOrder {
            items,
            total_amount,
            shipping_address,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: String,
    /// Version the admin last saw; a mismatch is rejected as stale.
    pub version: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub name: String,
    pub price: f64,
    pub image_url: String,
}

impl From<&Product> for ProductSummary {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            price: p.price,
            image_url: p.image_url.clone(),
        }
    }
}

/// A line item with its product reference resolved, or tagged missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    pub product: Uuid,
    pub quantity: i32,
    pub details: Option<ProductSummary>,
    pub missing: bool,
    pub label: String,
}

impl LineItemView {
    pub fn resolve(item: &LineItem, product: Option<&Product>) -> Self {
        let details = product.map(ProductSummary::from);
        Self {
            product: item.product_id,
            quantity: item.quantity,
            missing: details.is_none(),
            label: details
                .as_ref()
                .map_or_else(|| MISSING_PRODUCT_LABEL.to_string(), |d| d.name.clone()),
            details,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub products: Vec<LineItemView>,
    pub total_amount: f64,
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub progress: f64,
    pub is_active: bool,
    pub version: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl OrderView {
    pub fn new(order: Order, products: Vec<LineItemView>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            products,
            total_amount: order.total_amount,
            shipping_address: order.shipping_address,
            status: order.status,
            progress: order.status.progress(),
            is_active: !order.status.is_terminal(),
            version: order.version,
            created_at: order.created_at,
        }
    }
}
