use std::collections::HashMap;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    dto::{LineItemView, OrderView},
    repo_types::{LineItem, NewOrder, Order},
    status::OrderStatus,
};
use crate::{
    auth::repo_types::User,
    catalog::repo_types::Product,
    error::{AppError, AppResult},
    state::AppState,
};

/// Σ current price × quantity, or the first product id that no longer exists.
pub fn catalog_total(items: &[LineItem], products: &[Product]) -> Result<f64, Uuid> {
    let prices: HashMap<Uuid, f64> = products.iter().map(|p| (p.id, p.price)).collect();
    items.iter().try_fold(0.0, |acc, item| {
        prices
            .get(&item.product_id)
            .map(|price| acc + price * f64::from(item.quantity))
            .ok_or(item.product_id)
    })
}

async fn fetch_products(state: &AppState, ids: &[Uuid]) -> anyhow::Result<Vec<Product>> {
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    if unique.is_empty() {
        return Ok(Vec::new());
    }
    state.products.get_many(&unique).await
}

/// Re-prices the order against the live catalog and rejects totals that drift
/// beyond the configured tolerance.
async fn verify_total(state: &AppState, new: &NewOrder) -> AppResult<()> {
    let ids: Vec<Uuid> = new.items.iter().map(|i| i.product_id).collect();
    let products = fetch_products(state, &ids).await.map_err(|e| {
        error!(error = %e, "loading products for total verification failed");
        AppError::Persistence("Order creation failed")
    })?;

    let expected = catalog_total(&new.items, &products).map_err(|missing| {
        warn!(product_id = %missing, "order references unknown product");
        AppError::validation(format!("Product {missing} does not exist"))
    })?;

    let tolerance = state.config.checkout.total_tolerance;
    if (expected - new.total_amount).abs() > tolerance {
        warn!(
            client_total = new.total_amount,
            catalog_total = expected,
            "order total mismatch"
        );
        return Err(AppError::validation(format!(
            "totalAmount {:.2} does not match current prices ({:.2})",
            new.total_amount, expected
        )));
    }
    Ok(())
}

/// Checkout pipeline, server half: validate, re-price, persist as `Pending`.
pub async fn place_order(state: &AppState, user_id: Uuid, new: NewOrder) -> AppResult<OrderView> {
    new.validate()?;
    if state.config.checkout.verify_total {
        verify_total(state, &new).await?;
    }

    let order = Order::pending(user_id, new);
    let saved = state.orders.create(&order).await.map_err(|e| {
        error!(error = %e, %user_id, "order insert failed");
        AppError::Persistence("Order creation failed")
    })?;
    info!(
        order_id = %saved.id,
        %user_id,
        items = saved.items.len(),
        total = saved.total_amount,
        "order placed"
    );

    let mut views = resolve(state, vec![saved], "Order creation failed").await?;
    views
        .pop()
        .ok_or(AppError::Persistence("Order creation failed"))
}

/// Joins orders with the catalog. Deleted products are tagged, never an error.
pub async fn resolve(
    state: &AppState,
    orders: Vec<Order>,
    failure: &'static str,
) -> AppResult<Vec<OrderView>> {
    let ids: Vec<Uuid> = orders
        .iter()
        .flat_map(|o| o.items.iter().map(|i| i.product_id))
        .collect();
    let products = fetch_products(state, &ids).await.map_err(|e| {
        error!(error = %e, "resolving order products failed");
        AppError::Persistence(failure)
    })?;
    let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();

    Ok(orders
        .into_iter()
        .map(|o| {
            let items = o
                .items
                .iter()
                .map(|i| LineItemView::resolve(i, by_id.get(&i.product_id).copied()))
                .collect();
            OrderView::new(o, items)
        })
        .collect())
}

pub async fn list_for_user(state: &AppState, user_id: Uuid) -> AppResult<Vec<OrderView>> {
    const FAILED: &str = "Failed to fetch orders";
    let orders = state.orders.list_by_user(user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "list orders by user failed");
        AppError::Persistence(FAILED)
    })?;
    resolve(state, orders, FAILED).await
}

pub async fn list_all(state: &AppState) -> AppResult<Vec<OrderView>> {
    const FAILED: &str = "Failed to fetch orders";
    let orders = state.orders.list_all().await.map_err(|e| {
        error!(error = %e, "list all orders failed");
        AppError::Persistence(FAILED)
    })?;
    resolve(state, orders, FAILED).await
}

async fn load(state: &AppState, id: Uuid) -> AppResult<Order> {
    state
        .orders
        .get(id)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %id, "get order failed");
            AppError::Persistence("Failed to fetch order")
        })?
        .ok_or_else(|| AppError::not_found("Order"))
}

/// Owner or admin only. Anyone else gets the same 404 as for an unknown id,
/// and the catalog is only consulted after the check passes.
pub async fn get_order(state: &AppState, caller: &User, id: Uuid) -> AppResult<OrderView> {
    let order = load(state, id).await?;
    if !caller.is_admin && caller.id != order.user_id {
        warn!(caller = %caller.id, order_id = %id, "order read by non-owner refused");
        return Err(AppError::not_found("Order"));
    }
    let mut views = resolve(state, vec![order], "Failed to fetch order").await?;
    views.pop().ok_or_else(|| AppError::not_found("Order"))
}

/// Admin-only transition. Enforces the transition table and rejects stale writes.
pub async fn set_status(
    state: &AppState,
    admin_id: Uuid,
    order_id: Uuid,
    raw_status: &str,
    seen_version: Option<i32>,
) -> AppResult<OrderView> {
    let next: OrderStatus = raw_status.parse().map_err(|e| {
        warn!(error = %e, "invalid status requested");
        AppError::validation(format!(
            "Invalid status; expected one of {}",
            OrderStatus::SEQUENCE.map(OrderStatus::as_str).join(", ")
        ))
    })?;

    let current = load(state, order_id).await?;

    if let Some(seen) = seen_version {
        if seen != current.version {
            warn!(%order_id, seen, stored = current.version, "stale status write");
            return Err(AppError::Conflict(
                "Order was modified since it was read; reload and retry".into(),
            ));
        }
    }

    if !current.status.can_transition_to(next) {
        warn!(%order_id, from = %current.status, to = %next, "illegal status transition");
        return Err(AppError::Conflict(format!(
            "Cannot move order from {} to {}",
            current.status, next
        )));
    }

    let updated = state
        .orders
        .update_status(order_id, next, current.version)
        .await
        .map_err(|e| {
            error!(error = %e, %order_id, "status update failed");
            AppError::Persistence("Failed to update order status")
        })?
        .ok_or_else(|| {
            warn!(%order_id, "concurrent status write lost the race");
            AppError::Conflict("Order was modified since it was read; reload and retry".into())
        })?;

    info!(
        %order_id,
        from = %current.status,
        to = %updated.status,
        by = %admin_id,
        "order status changed"
    );
    let mut views = resolve(state, vec![updated], "Failed to update order status").await?;
    views.pop().ok_or_else(|| AppError::not_found("Order"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        orders::repo_types::ShippingAddress,
        state::testing::{seed_product, seed_user},
    };

    fn address() -> ShippingAddress {
        ShippingAddress {
            address: "9 Harbour Rd".into(),
            city: "Kochi".into(),
            postal_code: "682001".into(),
            country: "India".into(),
        }
    }

    #[test]
    fn catalog_total_uses_current_prices_and_reports_missing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let product = |id, price| Product {
            id,
            name: "p".into(),
            description: "d".into(),
            price,
            image_url: "i".into(),
            category: "c".into(),
            size: "s".into(),
            stock: 1,
            ratings: 0.0,
            reviews: 0,
        };
        let items = [
            LineItem { product_id: a, quantity: 2 },
            LineItem { product_id: b, quantity: 1 },
        ];
        assert_eq!(catalog_total(&items, &[product(a, 100.0), product(b, 50.0)]), Ok(250.0));
        assert_eq!(catalog_total(&items, &[product(a, 100.0)]), Err(b));
    }

    #[tokio::test]
    async fn placed_orders_start_pending() {
        let state = AppState::fake();
        let user = seed_user(&state, "cust", false).await;
        let p = seed_product(&state, "Spring 20L", "spring", "20L", 100.0).await;
        let view = place_order(
            &state,
            user.user.id,
            NewOrder {
                items: vec![LineItem { product_id: p.id, quantity: 2 }],
                total_amount: 200.0,
                shipping_address: address(),
            },
        )
        .await
        .unwrap();
        assert_eq!(view.status, OrderStatus::Pending);
        assert_eq!(view.progress, 25.0);
        assert!(view.is_active);
        assert_eq!(view.version, 0);
    }

    #[tokio::test]
    async fn divergent_total_is_rejected_and_nothing_is_written() {
        let state = AppState::fake();
        let user = seed_user(&state, "cust", false).await;
        let p = seed_product(&state, "Spring 20L", "spring", "20L", 100.0).await;
        let res = place_order(
            &state,
            user.user.id,
            NewOrder {
                items: vec![LineItem { product_id: p.id, quantity: 2 }],
                total_amount: 1.0,
                shipping_address: address(),
            },
        )
        .await;
        assert!(matches!(res, Err(AppError::Validation(_))));
        assert!(state.orders.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn client_total_is_trusted_when_verification_is_off() {
        let state = AppState::fake_with(|cfg| cfg.checkout.verify_total = false);
        let user = seed_user(&state, "cust", false).await;
        let view = place_order(
            &state,
            user.user.id,
            NewOrder {
                items: vec![LineItem { product_id: Uuid::new_v4(), quantity: 1 }],
                total_amount: 999.0,
                shipping_address: address(),
            },
        )
        .await
        .unwrap();
        assert_eq!(view.total_amount, 999.0);
        assert!(view.products[0].missing);
    }

    #[tokio::test]
    async fn status_walks_forward_one_step_at_a_time() {
        let state = AppState::fake();
        let user = seed_user(&state, "cust", false).await;
        let admin = seed_user(&state, "boss", true).await;
        let p = seed_product(&state, "Spring 5L", "spring", "5L", 40.0).await;
        let order = place_order(
            &state,
            user.user.id,
            NewOrder {
                items: vec![LineItem { product_id: p.id, quantity: 1 }],
                total_amount: 40.0,
                shipping_address: address(),
            },
        )
        .await
        .unwrap();

        let skip = set_status(&state, admin.user.id, order.id, "Shipped", None).await;
        assert!(matches!(skip, Err(AppError::Conflict(_))));

        let mut version = order.version;
        for next in ["Processing", "Shipped", "Delivered"] {
            let v = set_status(&state, admin.user.id, order.id, next, Some(version))
                .await
                .unwrap();
            assert_eq!(v.status.as_str(), next);
            version = v.version;
        }
        assert_eq!(version, 3);

        let after_terminal = set_status(&state, admin.user.id, order.id, "Delivered", None).await;
        assert!(matches!(after_terminal, Err(AppError::Conflict(_))));
        let backwards = set_status(&state, admin.user.id, order.id, "Pending", None).await;
        assert!(matches!(backwards, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let state = AppState::fake();
        let user = seed_user(&state, "cust", false).await;
        let p = seed_product(&state, "Spring 5L", "spring", "5L", 40.0).await;
        let order = place_order(
            &state,
            user.user.id,
            NewOrder {
                items: vec![LineItem { product_id: p.id, quantity: 1 }],
                total_amount: 40.0,
                shipping_address: address(),
            },
        )
        .await
        .unwrap();

        set_status(&state, Uuid::new_v4(), order.id, "Processing", Some(0)).await.unwrap();
        let stale = set_status(&state, Uuid::new_v4(), order.id, "Shipped", Some(0)).await;
        assert!(matches!(stale, Err(AppError::Conflict(_))));
        assert_eq!(load(&state, order.id).await.unwrap().status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn unknown_status_and_unknown_order() {
        let state = AppState::fake();
        let bad = set_status(&state, Uuid::new_v4(), Uuid::new_v4(), "Lost", None).await;
        assert!(matches!(bad, Err(AppError::Validation(_))));
        let missing = set_status(&state, Uuid::new_v4(), Uuid::new_v4(), "Processing", None).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn only_owner_or_admin_reads_an_order() {
        let state = AppState::fake();
        let owner = seed_user(&state, "cust", false).await;
        let stranger = seed_user(&state, "nosy", false).await;
        let admin = seed_user(&state, "boss", true).await;
        let p = seed_product(&state, "Spring 5L", "spring", "5L", 40.0).await;
        let order = place_order(
            &state,
            owner.user.id,
            NewOrder {
                items: vec![LineItem { product_id: p.id, quantity: 1 }],
                total_amount: 40.0,
                shipping_address: address(),
            },
        )
        .await
        .unwrap();

        assert_eq!(get_order(&state, &owner.user, order.id).await.unwrap().id, order.id);
        assert_eq!(get_order(&state, &admin.user, order.id).await.unwrap().id, order.id);

        let existing = get_order(&state, &stranger.user, order.id).await;
        let unknown = get_order(&state, &stranger.user, Uuid::new_v4()).await;
        match (existing, unknown) {
            (Err(AppError::NotFound(a)), Err(AppError::NotFound(b))) => assert_eq!(a, b),
            other => panic!("unexpected {other:?}"),
        }
    }
}
