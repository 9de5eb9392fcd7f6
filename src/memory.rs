//! In-process stores backing `AppState::fake()`.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{
        repo::{DuplicateUser, UserStore},
        repo_types::User,
    },
    catalog::{
        repo::ProductStore,
        repo_types::{Product, ProductFilter, ProductPatch},
    },
    orders::{repo::OrderStore, repo_types::Order, status::OrderStatus},
};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_user_name(&self, user_name: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.user_name == user_name)
            .cloned())
    }

    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>> {
        let email = login.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.user_name == login || u.email == email)
            .cloned())
    }

    async fn is_taken(&self, user_name: &str, email: &str, except: Option<Uuid>) -> anyhow::Result<bool> {
        Ok(self.users.read().await.iter().any(|u| {
            Some(u.id) != except && (u.user_name == user_name || u.email == email)
        }))
    }

    async fn create(&self, user: User) -> anyhow::Result<User> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.user_name == user.user_name || u.email == user.email)
        {
            return Err(DuplicateUser.into());
        }
        users.push(user.clone());
        Ok(user)
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn update(&self, user: User) -> anyhow::Result<Option<User>> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| {
            u.id != user.id && (u.user_name == user.user_name || u.email == user.email)
        }) {
            return Err(DuplicateUser.into());
        }
        Ok(users.iter_mut().find(|u| u.id == user.id).map(|slot| {
            *slot = user;
            slot.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() != before)
    }

    async fn promote_to_admin(&self, login: &str) -> anyhow::Result<bool> {
        let email = login.to_lowercase();
        let mut users = self.users.write().await;
        Ok(users
            .iter_mut()
            .find(|u| u.user_name == login || u.email == email)
            .map(|u| u.is_admin = true)
            .is_some())
    }
}

#[derive(Default)]
pub struct MemoryProductStore {
    products: RwLock<Vec<Product>>,
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn create(&self, product: Product) -> anyhow::Result<Product> {
        self.products.write().await.push(product.clone());
        Ok(product)
    }

    async fn list(&self, filter: &ProductFilter) -> anyhow::Result<Vec<Product>> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        Ok(self.products.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Product>> {
        Ok(self
            .products
            .read()
            .await
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, patch: &ProductPatch) -> anyhow::Result<Option<Product>> {
        let mut products = self.products.write().await;
        Ok(products.iter_mut().find(|p| p.id == id).map(|p| {
            patch.apply(p);
            p.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| p.id != id);
        Ok(products.len() != before)
    }
}

/// Orders kept in insertion order; listings walk it backwards for newest first.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<Vec<Order>>,
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, order: &Order) -> anyhow::Result<Order> {
        self.orders.write().await.push(order.clone());
        Ok(order.clone())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Order>> {
        Ok(self.orders.read().await.iter().find(|o| o.id == id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Order>> {
        Ok(self.orders.read().await.iter().rev().cloned().collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        expected_version: i32,
    ) -> anyhow::Result<Option<Order>> {
        let mut orders = self.orders.write().await;
        Ok(orders
            .iter_mut()
            .find(|o| o.id == id && o.version == expected_version)
            .map(|o| {
                o.status = status;
                o.version += 1;
                o.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::repo_types::{LineItem, NewOrder, ShippingAddress};

    #[tokio::test]
    async fn status_write_with_stale_version_is_refused() {
        let store = MemoryOrderStore::default();
        let order = Order::pending(
            Uuid::new_v4(),
            NewOrder {
                items: vec![LineItem { product_id: Uuid::new_v4(), quantity: 1 }],
                total_amount: 1.0,
                shipping_address: ShippingAddress::default(),
            },
        );
        store.create(&order).await.unwrap();

        let first = store.update_status(order.id, OrderStatus::Processing, 0).await.unwrap();
        assert_eq!(first.map(|o| o.version), Some(1));
        let second = store.update_status(order.id, OrderStatus::Shipped, 0).await.unwrap();
        assert!(second.is_none());
    }
}
