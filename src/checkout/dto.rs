use serde::{Deserialize, Serialize};

use crate::{cart::Cart, orders::dto::OrderView, orders::repo_types::ShippingAddress};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub cart: Cart,
    #[serde(default)]
    pub shipping_address: ShippingAddress,
}

/// The placed order plus the cart as it stands afterwards (emptied).
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: OrderView,
    pub cart: Cart,
}
