use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    repo_types::{LineItem, Order, OrderItemRow, OrderRow},
    status::OrderStatus,
};

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes the order and all of its items atomically.
    async fn create(&self, order: &Order) -> anyhow::Result<Order>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Order>>;
    /// Newest first.
    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>>;
    /// Newest first.
    async fn list_all(&self) -> anyhow::Result<Vec<Order>>;
    /// Compare-and-swap on `version`. `None` when the order is gone or was
    /// written by someone else since `expected_version` was read.
    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        expected_version: i32,
    ) -> anyhow::Result<Option<Order>>;
}

const ORDER_COLUMNS: &str =
    "id, user_id, total_amount, address, city, postal_code, country, status, version, created_at";

#[derive(Clone)]
pub struct PgOrderStore {
    db: PgPool,
}

impl PgOrderStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn items_for(&self, order_ids: &[Uuid]) -> anyhow::Result<HashMap<Uuid, Vec<LineItem>>> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT order_id, product_id, quantity
              FROM order_items
             WHERE order_id = ANY($1)
             ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.db)
        .await
        .context("list order items")?;

        let mut by_order: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for r in rows {
            by_order.entry(r.order_id).or_default().push(LineItem {
                product_id: r.product_id,
                quantity: r.quantity,
            });
        }
        Ok(by_order)
    }

    async fn hydrate(&self, rows: Vec<OrderRow>) -> anyhow::Result<Vec<Order>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;
        rows.into_iter()
            .map(|r| {
                let its = items.remove(&r.id).unwrap_or_default();
                r.into_order(its)
            })
            .collect()
    }
}

async fn insert_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
    position: i32,
    item: &LineItem,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO order_items (order_id, position, product_id, quantity)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(order_id)
    .bind(position)
    .bind(item.product_id)
    .bind(item.quantity)
    .execute(&mut **tx)
    .await
    .context("insert order item")?;
    Ok(())
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn create(&self, order: &Order) -> anyhow::Result<Order> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        let sql = format!(
            r#"
            INSERT INTO orders (id, user_id, total_amount, address, city, postal_code, country,
                                status, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.id)
            .bind(order.user_id)
            .bind(order.total_amount)
            .bind(&order.shipping_address.address)
            .bind(&order.shipping_address.city)
            .bind(&order.shipping_address.postal_code)
            .bind(&order.shipping_address.country)
            .bind(order.status.as_str())
            .bind(order.version)
            .bind(order.created_at)
            .fetch_one(&mut *tx)
            .await
            .context("insert order")?;

        for (position, item) in order.items.iter().enumerate() {
            insert_item_tx(&mut tx, order.id, position as i32, item).await?;
        }
        tx.commit().await.context("commit tx")?;

        row.into_order(order.items.clone())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get order")?;
        match row {
            Some(r) => Ok(self.hydrate(vec![r]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .context("list orders by user")?;
        self.hydrate(rows).await
    }

    async fn list_all(&self) -> anyhow::Result<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list all orders")?;
        self.hydrate(rows).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        expected_version: i32,
    ) -> anyhow::Result<Option<Order>> {
        let sql = format!(
            r#"
            UPDATE orders
               SET status = $2, version = version + 1
             WHERE id = $1 AND version = $3
            RETURNING {ORDER_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .bind(expected_version)
            .fetch_optional(&self.db)
            .await
            .context("update order status")?;
        match row {
            Some(r) => Ok(self.hydrate(vec![r]).await?.pop()),
            None => Ok(None),
        }
    }
}
