use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    cart::Cart,
    error::{AppError, AppResult},
    orders::{
        dto::OrderView,
        repo_types::{NewOrder, ShippingAddress},
        services::place_order,
    },
    state::AppState,
};

/// Whatever turns a validated order request into a persisted order.
#[async_trait]
pub trait OrderPlacer: Send + Sync {
    async fn place(&self, user_id: Uuid, order: NewOrder) -> AppResult<OrderView>;
}

#[async_trait]
impl OrderPlacer for AppState {
    async fn place(&self, user_id: Uuid, order: NewOrder) -> AppResult<OrderView> {
        place_order(self, user_id, order).await
    }
}

pub struct Checkout;

impl Checkout {
    /// Turns the cart into a `Pending` order. The cart is emptied only once
    /// the placer succeeds; on any error it is left as it was.
    pub async fn submit<P>(
        cart: &mut Cart,
        user_id: Uuid,
        address: ShippingAddress,
        placer: &P,
    ) -> AppResult<OrderView>
    where
        P: OrderPlacer + ?Sized,
    {
        address.validate()?;
        if cart.is_empty() {
            return Err(AppError::validation("Your cart is empty"));
        }

        let request = NewOrder {
            items: cart.line_items(),
            total_amount: cart.total(),
            shipping_address: address,
        };
        let order = placer.place(user_id, request).await.map_err(|e| {
            warn!(%user_id, error = %e, "checkout failed; cart kept");
            e
        })?;

        cart.clear();
        info!(%user_id, order_id = %order.id, "checkout complete");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use time::OffsetDateTime;

    use super::*;
    use crate::{
        cart::ProductSnapshot,
        orders::{dto::LineItemView, repo_types::Order},
    };

    /// Echoes the request back as an order and counts calls.
    #[derive(Default)]
    struct RecordingPlacer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl OrderPlacer for RecordingPlacer {
        async fn place(&self, user_id: Uuid, order: NewOrder) -> AppResult<OrderView> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Persistence("Order creation failed"));
            }
            let mut order = Order::pending(user_id, order);
            order.created_at = OffsetDateTime::UNIX_EPOCH;
            let items = order
                .items
                .iter()
                .map(|i| LineItemView::resolve(i, None))
                .collect();
            Ok(OrderView::new(order, items))
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            address: "22 River Rd".into(),
            city: "Surat".into(),
            postal_code: "395003".into(),
            country: "India".into(),
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new();
        let a = ProductSnapshot { id: Uuid::new_v4(), name: "A".into(), price: 100.0, image_url: "a".into() };
        let b = ProductSnapshot { id: Uuid::new_v4(), name: "B".into(), price: 50.0, image_url: "b".into() };
        cart.add_or_increment(a, 2);
        cart.add_or_increment(b, 1);
        cart
    }

    #[tokio::test]
    async fn success_submits_cart_total_and_clears_cart() {
        let placer = RecordingPlacer::default();
        let mut cart = cart();
        let order = Checkout::submit(&mut cart, Uuid::new_v4(), address(), &placer)
            .await
            .unwrap();
        assert_eq!(order.total_amount, 250.0);
        assert_eq!(order.products.len(), 2);
        assert_eq!(order.products[0].quantity, 2);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn blank_address_field_fails_before_placing() {
        let placer = RecordingPlacer::default();
        let mut cart = cart();
        let res = Checkout::submit(
            &mut cart,
            Uuid::new_v4(),
            ShippingAddress { city: "".into(), ..address() },
            &placer,
        )
        .await;
        assert!(matches!(res, Err(AppError::Validation(_))));
        assert_eq!(placer.calls.load(Ordering::SeqCst), 0);
        assert!(!cart.is_empty());
    }

    #[tokio::test]
    async fn empty_cart_is_rejected() {
        let placer = RecordingPlacer::default();
        let mut cart = Cart::new();
        let res = Checkout::submit(&mut cart, Uuid::new_v4(), address(), &placer).await;
        assert!(matches!(res, Err(AppError::Validation(_))));
        assert_eq!(placer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_placement_leaves_cart_for_retry() {
        let placer = RecordingPlacer { fail: true, ..Default::default() };
        let mut cart = cart();
        let before = cart.clone();
        let res = Checkout::submit(&mut cart, Uuid::new_v4(), address(), &placer).await;
        assert!(matches!(res, Err(AppError::Persistence(_))));
        assert_eq!(cart, before);
    }
}
