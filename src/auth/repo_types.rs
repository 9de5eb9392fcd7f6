use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub dob: Date,
    pub email: String,         // stored lowercase
    pub password_hash: String, // Argon2 hash, never exposed
    pub is_admin: bool,
    pub created_at: OffsetDateTime,
}
