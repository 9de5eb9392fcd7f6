use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime};
use uuid::Uuid;

use super::repo_types::User;

/// Sign-up form. Every field is required; `Option` lets the handler answer with
/// a single "fill all the fields" message instead of a deserialization error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub dob: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Sign-in form. Storefront forms may send `userName` and `email` together;
/// `userName` wins, then `login`, then `email`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub login: Option<String>,
    pub user_name: Option<String>,
    pub email: Option<String>,
    pub password: String,
}

impl LoginRequest {
    pub fn identifier(&self) -> Option<&str> {
        [&self.user_name, &self.login, &self.email]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
}

/// Partial profile update; absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub user_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub dob: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Account as exposed over the API; never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub dob: String,
    pub email: String,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        let dob = u
            .dob
            .format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_default();
        Self {
            id: u.id,
            user_name: u.user_name,
            first_name: u.first_name,
            last_name: u.last_name,
            address: u.address,
            dob,
            email: u.email,
            is_admin: u.is_admin,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn public_user_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            user_name: "aqua".into(),
            first_name: "A".into(),
            last_name: "Q".into(),
            address: "1 Well Rd".into(),
            dob: date!(1990 - 04 - 02),
            email: "aqua@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            is_admin: false,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("\"userName\":\"aqua\""));
        assert!(json.contains("\"dob\":\"1990-04-02\""));
        assert!(json.contains("\"isAdmin\":false"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn login_accepts_email_or_user_name_key() {
        let a: LoginRequest = serde_json::from_str(r#"{"email":"a@b.co","password":"x"}"#).unwrap();
        let b: LoginRequest = serde_json::from_str(r#"{"userName":"aqua","password":"x"}"#).unwrap();
        let c: LoginRequest = serde_json::from_str(r#"{"login":"aqua","password":"x"}"#).unwrap();
        assert_eq!(a.identifier(), Some("a@b.co"));
        assert_eq!(b.identifier(), Some("aqua"));
        assert_eq!(c.identifier(), Some("aqua"));
    }

    #[test]
    fn login_with_both_keys_prefers_user_name() {
        let req: LoginRequest = serde_json::from_str(
            r#"{"userName":"aqua","email":"aqua@example.com","password":"x"}"#,
        )
        .unwrap();
        assert_eq!(req.identifier(), Some("aqua"));

        let blank_name: LoginRequest =
            serde_json::from_str(r#"{"userName":" ","email":"aqua@example.com","password":"x"}"#)
                .unwrap();
        assert_eq!(blank_name.identifier(), Some("aqua@example.com"));

        let neither: LoginRequest = serde_json::from_str(r#"{"password":"x"}"#).unwrap();
        assert_eq!(neither.identifier(), None);
    }
}
