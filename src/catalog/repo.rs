use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{Product, ProductFilter, ProductPatch};

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create(&self, product: Product) -> anyhow::Result<Product>;
    async fn list(&self, filter: &ProductFilter) -> anyhow::Result<Vec<Product>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>>;
    /// Products that still exist among `ids`; missing ids are simply absent.
    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Product>>;
    async fn update(&self, id: Uuid, patch: &ProductPatch) -> anyhow::Result<Option<Product>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, image_url, category, size, stock, ratings, reviews";

#[derive(Clone)]
pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn create(&self, p: Product) -> anyhow::Result<Product> {
        let sql = format!(
            r#"
            INSERT INTO products (id, name, description, price, image_url, category, size,
                                  stock, ratings, reviews)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(p.id)
            .bind(&p.name)
            .bind(&p.description)
            .bind(p.price)
            .bind(&p.image_url)
            .bind(&p.category)
            .bind(&p.size)
            .bind(p.stock)
            .bind(p.ratings)
            .bind(p.reviews)
            .fetch_one(&self.db)
            .await
            .context("insert product")
    }

    /// Category and size narrow in SQL. The name dimension goes through
    /// [`ProductFilter::matches`] so case folding never depends on the
    /// database collation.
    async fn list(&self, filter: &ProductFilter) -> anyhow::Result<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
              FROM products
             WHERE ($1::text IS NULL OR category = $1)
               AND ($2::text IS NULL OR size = $2)
             ORDER BY name ASC, id ASC
            "#
        );
        let mut rows = sqlx::query_as::<_, Product>(&sql)
            .bind(filter.category.as_deref())
            .bind(filter.size.as_deref())
            .fetch_all(&self.db)
            .await
            .context("list products")?;
        rows.retain(|p| filter.matches(p));
        Ok(rows)
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("get product")
    }

    async fn get_many(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        sqlx::query_as::<_, Product>(&sql)
            .bind(ids)
            .fetch_all(&self.db)
            .await
            .context("get products by ids")
    }

    async fn update(&self, id: Uuid, patch: &ProductPatch) -> anyhow::Result<Option<Product>> {
        let sql = format!(
            r#"
            UPDATE products
               SET name        = COALESCE($2, name),
                   description = COALESCE($3, description),
                   price       = COALESCE($4, price),
                   image_url   = COALESCE($5, image_url),
                   category    = COALESCE($6, category),
                   size        = COALESCE($7, size),
                   stock       = COALESCE($8, stock),
                   ratings     = COALESCE($9, ratings),
                   reviews     = COALESCE($10, reviews)
             WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(patch.name.as_deref())
            .bind(patch.description.as_deref())
            .bind(patch.price)
            .bind(patch.image_url.as_deref())
            .bind(patch.category.as_deref())
            .bind(patch.size.as_deref())
            .bind(patch.stock)
            .bind(patch.ratings)
            .bind(patch.reviews)
            .fetch_optional(&self.db)
            .await
            .context("update product")
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete product")?;
        Ok(res.rows_affected() > 0)
    }
}
