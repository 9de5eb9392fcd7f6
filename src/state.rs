use std::sync::Arc;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::{
    auth::repo::{PgUserStore, UserStore},
    catalog::repo::{PgProductStore, ProductStore},
    config::AppConfig,
    orders::repo::{OrderStore, PgOrderStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub orders: Arc<dyn OrderStore>,
}

impl AppState {
    /// Connects to Postgres and returns the pool alongside the state so the
    /// caller can run migrations before serving.
    pub async fn init() -> anyhow::Result<(Self, PgPool)> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to postgres")?;

        Ok((Self::from_pool(config, db.clone()), db))
    }

    pub fn from_pool(config: Arc<AppConfig>, db: PgPool) -> Self {
        Self {
            config,
            users: Arc::new(PgUserStore::new(db.clone())),
            products: Arc::new(PgProductStore::new(db.clone())),
            orders: Arc::new(PgOrderStore::new(db)),
        }
    }

    /// Promotes the configured account to admin, if one is configured and exists.
    pub async fn bootstrap_admin(&self) -> anyhow::Result<()> {
        let Some(login) = self.config.bootstrap_admin.as_deref() else {
            return Ok(());
        };
        if self.users.promote_to_admin(login).await? {
            info!(login = %login, "bootstrap admin promoted");
        } else {
            warn!(login = %login, "bootstrap admin account not found; register it and restart");
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with(|_| {})
    }

    #[cfg(test)]
    pub fn fake_with(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        use crate::{
            config::{CheckoutConfig, JwtConfig},
            memory::{MemoryOrderStore, MemoryProductStore, MemoryUserStore},
        };

        let mut config = AppConfig {
            database_url: "postgres://unused".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            checkout: CheckoutConfig::default(),
            bootstrap_admin: None,
        };
        tweak(&mut config);

        Self {
            config: Arc::new(config),
            users: Arc::new(MemoryUserStore::default()),
            products: Arc::new(MemoryProductStore::default()),
            orders: Arc::new(MemoryOrderStore::default()),
        }
    }
}
