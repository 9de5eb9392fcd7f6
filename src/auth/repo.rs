use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use super::repo_types::User;

/// Persistence of customer and admin accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_user_name(&self, user_name: &str) -> anyhow::Result<Option<User>>;
    /// Matches either the userName or the (lowercase) email.
    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>>;
    /// True when another account (other than `except`) already holds the userName or email.
    async fn is_taken(&self, user_name: &str, email: &str, except: Option<Uuid>) -> anyhow::Result<bool>;
    /// Fails with [`DuplicateUser`] when the userName or email is already held.
    async fn create(&self, user: User) -> anyhow::Result<User>;
    async fn list(&self) -> anyhow::Result<Vec<User>>;
    async fn update(&self, user: User) -> anyhow::Result<Option<User>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
    async fn promote_to_admin(&self, login: &str) -> anyhow::Result<bool>;
}

/// A write collided with another account's userName or email.
#[derive(Debug, Error)]
#[error("userName or email already registered")]
pub struct DuplicateUser;

fn duplicate_or(e: sqlx::Error, context: &'static str) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return DuplicateUser.into();
        }
    }
    anyhow::Error::new(e).context(context)
}

const USER_COLUMNS: &str = "id, user_name, first_name, last_name, address, dob, email, \
                            password_hash, is_admin, created_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")
    }

    async fn find_by_user_name(&self, user_name: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE user_name = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(user_name)
            .fetch_optional(&self.db)
            .await
            .context("find user by user_name")
    }

    async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_name = $1 OR email = lower($1) LIMIT 1"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(login)
            .fetch_optional(&self.db)
            .await
            .context("find user by login")
    }

    async fn is_taken(&self, user_name: &str, email: &str, except: Option<Uuid>) -> anyhow::Result<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM users
                 WHERE (user_name = $1 OR email = $2)
                   AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(user_name)
        .bind(email)
        .bind(except)
        .fetch_one(&self.db)
        .await
        .context("check user uniqueness")?;
        Ok(taken)
    }

    async fn create(&self, user: User) -> anyhow::Result<User> {
        let sql = format!(
            r#"
            INSERT INTO users (id, user_name, first_name, last_name, address, dob, email,
                               password_hash, is_admin, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.user_name)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.address)
            .bind(user.dob)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.is_admin)
            .bind(user.created_at)
            .fetch_one(&self.db)
            .await
            .map_err(|e| duplicate_or(e, "insert user"))
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list users")
    }

    async fn update(&self, user: User) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET user_name = $2, first_name = $3, last_name = $4, address = $5,
                   dob = $6, email = $7, password_hash = $8, is_admin = $9
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.user_name)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.address)
            .bind(user.dob)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.is_admin)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| duplicate_or(e, "update user"))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() > 0)
    }

    async fn promote_to_admin(&self, login: &str) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE users SET is_admin = TRUE WHERE user_name = $1 OR email = lower($1)")
            .bind(login)
            .execute(&self.db)
            .await
            .context("promote user to admin")?;
        Ok(res.rows_affected() > 0)
    }
}
