use serde::Deserialize;

/// Longest accepted token lifetime (one year).
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// How much the order pipeline trusts the client-computed total.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    /// Recompute the total from current catalog prices before persisting.
    pub verify_total: bool,
    /// Largest accepted absolute difference between client and catalog totals.
    pub total_tolerance: f64,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            verify_total: true,
            total_tolerance: 0.01,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub checkout: CheckoutConfig,
    /// userName or email of an account promoted to admin at start-up.
    pub bootstrap_admin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "aquanest".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "aquanest-users".into()),
            ttl_minutes: ttl_from_env("JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: ttl_from_env("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };
        let defaults = CheckoutConfig::default();
        let checkout = CheckoutConfig {
            verify_total: env_parse("CHECKOUT_VERIFY_TOTAL").unwrap_or(defaults.verify_total),
            total_tolerance: env_parse::<f64>("CHECKOUT_TOTAL_TOLERANCE")
                .filter(|t| t.is_finite() && *t >= 0.0)
                .unwrap_or(defaults.total_tolerance),
        };
        let bootstrap_admin = std::env::var("BOOTSTRAP_ADMIN")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(Self {
            database_url,
            jwt,
            checkout,
            bootstrap_admin,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn ttl_from_env(key: &str, default: i64) -> anyhow::Result<i64> {
    check_ttl(key, env_parse(key).unwrap_or(default))
}

fn check_ttl(key: &str, minutes: i64) -> anyhow::Result<i64> {
    if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!("{key} must be between 1 and {MAX_TTL_MINUTES} minutes, got {minutes}");
    }
    Ok(minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_lifetimes_must_be_in_range() {
        assert_eq!(check_ttl("JWT_TTL_MINUTES", 60).unwrap(), 60);
        assert_eq!(check_ttl("JWT_TTL_MINUTES", MAX_TTL_MINUTES).unwrap(), MAX_TTL_MINUTES);
        let err = check_ttl("JWT_TTL_MINUTES", 1_000_000_000_000).unwrap_err();
        assert!(err.to_string().contains("JWT_TTL_MINUTES"));
        assert!(check_ttl("JWT_REFRESH_TTL_MINUTES", 0).is_err());
        assert!(check_ttl("JWT_REFRESH_TTL_MINUTES", -5).is_err());
    }
}
