use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Access tokens authenticate requests; refresh tokens only mint new pairs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// JWT payload. `sub` is the customer's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}

impl Claims {
    pub fn issue(user_id: Uuid, kind: TokenKind, issuer: &str, audience: &str, ttl: Duration) -> Self {
        let now = OffsetDateTime::now_utc();
        let exp = now + time::Duration::seconds(ttl.as_secs() as i64);
        Self {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: issuer.to_string(),
            aud: audience.to_string(),
            kind,
        }
    }

    pub fn is_access(&self) -> bool {
        self.kind == TokenKind::Access
    }
}
