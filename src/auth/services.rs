use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    dto::{AuthResponse, PublicUser, RegisterRequest, UpdateUserRequest},
    jwt::JwtKeys,
    password::{hash_password, verify_password, MIN_PASSWORD_LEN},
    repo::DuplicateUser,
    repo_types::User,
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid");
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn parse_dob(raw: &str) -> AppResult<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::validation("dob must be a date formatted YYYY-MM-DD"))
}

fn required(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn check_password(password: &str) -> AppResult<()> {
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation("Password too short"));
    }
    Ok(())
}

fn hash(password: &str) -> AppResult<String> {
    hash_password(password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        AppError::Persistence("Could not store password")
    })
}

/// A lost uniqueness race surfaces from the store as [`DuplicateUser`].
fn write_failed(e: anyhow::Error, public: &'static str) -> AppError {
    if e.is::<DuplicateUser>() {
        warn!("userName or email taken concurrently");
        return AppError::Conflict("userName or email already registered".into());
    }
    error!(error = %e, "user write failed");
    AppError::Persistence(public)
}

/// Creates a customer account. Self-registration never grants admin.
pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<User> {
    let (
        Some(user_name),
        Some(first_name),
        Some(last_name),
        Some(address),
        Some(dob),
        Some(email),
        Some(password),
    ) = (
        required(req.user_name),
        required(req.first_name),
        required(req.last_name),
        required(req.address),
        required(req.dob),
        required(req.email),
        req.password.filter(|p| !p.is_empty()),
    )
    else {
        return Err(AppError::validation("Please fill all the fields"));
    };

    let email = email.to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    check_password(&password)?;
    let dob = parse_dob(&dob)?;

    let taken = state
        .users
        .is_taken(&user_name, &email, None)
        .await
        .map_err(|e| {
            error!(error = %e, "uniqueness check failed");
            AppError::Persistence("User creation failed")
        })?;
    if taken {
        warn!(user_name = %user_name, email = %email, "user already registered");
        return Err(AppError::Conflict("userName or email already registered".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        user_name,
        first_name,
        last_name,
        address,
        dob,
        email,
        password_hash: hash(&password)?,
        is_admin: false,
        created_at: OffsetDateTime::now_utc(),
    };
    let user = state
        .users
        .create(user)
        .await
        .map_err(|e| write_failed(e, "User creation failed"))?;
    info!(user_id = %user.id, user_name = %user.user_name, "user registered");
    Ok(user)
}

/// Resolves a login (userName or email) and checks the password.
pub async fn authenticate(state: &AppState, login: &str, password: &str) -> AppResult<User> {
    let login = login.trim();
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let user = state
        .users
        .find_by_login(login)
        .await
        .map_err(|e| {
            error!(error = %e, "find_by_login failed");
            AppError::Persistence("Login failed")
        })?
        .ok_or_else(|| {
            warn!(login = %login, "login unknown user");
            invalid()
        })?;

    let ok = verify_password(password, &user.password_hash).map_err(|e| {
        error!(error = %e, user_id = %user.id, "verify_password failed");
        AppError::Persistence("Login failed")
    })?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }
    info!(user_id = %user.id, "user logged in");
    Ok(user)
}

pub fn issue_tokens(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let sign_failed = |e: anyhow::Error| {
        error!(error = %e, "jwt sign failed");
        AppError::Persistence("Could not issue token")
    };
    let access_token = keys.sign_access(user.id).map_err(sign_failed)?;
    let refresh_token = keys.sign_refresh(user.id).map_err(sign_failed)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser::from(user),
    })
}

pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized("Invalid refresh token".into())
    })?;
    let user = load_user(state, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    issue_tokens(state, user)
}

pub async fn load_user(state: &AppState, id: Uuid) -> AppResult<Option<User>> {
    state.users.find_by_id(id).await.map_err(|e| {
        error!(error = %e, user_id = %id, "find_by_id failed");
        AppError::Persistence("Failed to load user")
    })
}

/// Customers may only act on their own account; admins on any.
pub fn ensure_self_or_admin(caller: &User, target: Uuid) -> AppResult<()> {
    if caller.is_admin || caller.id == target {
        Ok(())
    } else {
        warn!(caller = %caller.id, target = %target, "access to another user's data refused");
        Err(AppError::Forbidden("Not authorized".into()))
    }
}

/// Applies a partial profile update. Only admins may change `is_admin`.
pub async fn update_user(
    state: &AppState,
    caller: &User,
    id: Uuid,
    req: UpdateUserRequest,
) -> AppResult<User> {
    ensure_self_or_admin(caller, id)?;
    let mut user = load_user(state, id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let blank = |v: &Option<String>| v.as_ref().is_some_and(|s| s.trim().is_empty());
    if [&req.user_name, &req.first_name, &req.last_name, &req.address, &req.email]
        .into_iter()
        .any(blank)
    {
        return Err(AppError::validation("Fields cannot be blank"));
    }

    if let Some(v) = req.user_name {
        user.user_name = v.trim().to_string();
    }
    if let Some(v) = req.first_name {
        user.first_name = v.trim().to_string();
    }
    if let Some(v) = req.last_name {
        user.last_name = v.trim().to_string();
    }
    if let Some(v) = req.address {
        user.address = v.trim().to_string();
    }
    if let Some(v) = req.dob {
        user.dob = parse_dob(&v)?;
    }
    if let Some(v) = req.email {
        let email = v.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::validation("Invalid email"));
        }
        user.email = email;
    }
    if let Some(password) = req.password {
        check_password(&password)?;
        user.password_hash = hash(&password)?;
    }
    if let Some(is_admin) = req.is_admin {
        if !caller.is_admin {
            warn!(caller = %caller.id, "non-admin tried to change isAdmin");
            return Err(AppError::Forbidden("Only admins may change isAdmin".into()));
        }
        user.is_admin = is_admin;
    }

    let taken = state
        .users
        .is_taken(&user.user_name, &user.email, Some(user.id))
        .await
        .map_err(|e| {
            error!(error = %e, "uniqueness check failed");
            AppError::Persistence("User update failed")
        })?;
    if taken {
        return Err(AppError::Conflict("userName or email already registered".into()));
    }

    let updated = state
        .users
        .update(user)
        .await
        .map_err(|e| write_failed(e, "User update failed"))?
        .ok_or_else(|| AppError::not_found("User"))?;
    info!(user_id = %updated.id, by = %caller.id, "user updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::repo::UserStore,
        state::testing::{seed_user, TestUser},
    };

    fn form(user_name: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            user_name: Some(user_name.into()),
            first_name: Some("Nadia".into()),
            last_name: Some("Rao".into()),
            address: Some("12 Lake St".into()),
            dob: Some("1994-07-21".into()),
            email: Some(email.into()),
            password: Some("long-enough-pw".into()),
        }
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("two words@b.co"));
    }

    #[test]
    fn dob_must_be_iso_date() {
        assert!(parse_dob("2001-02-03").is_ok());
        assert!(matches!(parse_dob("03/02/2001"), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn register_lowercases_email_and_never_grants_admin() {
        let state = AppState::fake();
        let user = register(&state, form("nadia", "Nadia@Example.com")).await.unwrap();
        assert_eq!(user.email, "nadia@example.com");
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "long-enough-pw");
    }

    #[tokio::test]
    async fn register_rejects_missing_fields_and_duplicates() {
        let state = AppState::fake();
        let mut missing = form("nadia", "nadia@example.com");
        missing.address = Some("   ".into());
        assert!(matches!(register(&state, missing).await, Err(AppError::Validation(_))));

        register(&state, form("nadia", "nadia@example.com")).await.unwrap();
        let dup = register(&state, form("nadia", "other@example.com")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn authenticate_by_user_name_or_email() {
        let state = AppState::fake();
        register(&state, form("nadia", "nadia@example.com")).await.unwrap();
        assert!(authenticate(&state, "nadia", "long-enough-pw").await.is_ok());
        assert!(authenticate(&state, "NADIA@example.com", "long-enough-pw").await.is_ok());
        assert!(matches!(
            authenticate(&state, "nadia", "wrong-password").await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            authenticate(&state, "ghost", "long-enough-pw").await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn customers_cannot_promote_themselves() {
        let state = AppState::fake();
        let TestUser { user, .. } = seed_user(&state, "cust", false).await;
        let req = UpdateUserRequest {
            is_admin: Some(true),
            ..Default::default()
        };
        let res = update_user(&state, &user, user.id, req).await;
        assert!(matches!(res, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn admins_can_promote_others() {
        let state = AppState::fake();
        let TestUser { user: admin, .. } = seed_user(&state, "boss", true).await;
        let TestUser { user: cust, .. } = seed_user(&state, "cust", false).await;
        let req = UpdateUserRequest {
            is_admin: Some(true),
            address: Some("5 River Rd".into()),
            ..Default::default()
        };
        let updated = update_user(&state, &admin, cust.id, req).await.unwrap();
        assert!(updated.is_admin);
        assert_eq!(updated.address, "5 River Rd");
    }

    /// Answers "free" to every uniqueness check, as a store would when a
    /// concurrent sign-up commits between the check and the insert.
    struct LateCollision(crate::memory::MemoryUserStore);

    #[async_trait::async_trait]
    impl UserStore for LateCollision {
        async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
            self.0.find_by_id(id).await
        }
        async fn find_by_user_name(&self, user_name: &str) -> anyhow::Result<Option<User>> {
            self.0.find_by_user_name(user_name).await
        }
        async fn find_by_login(&self, login: &str) -> anyhow::Result<Option<User>> {
            self.0.find_by_login(login).await
        }
        async fn is_taken(&self, _: &str, _: &str, _: Option<Uuid>) -> anyhow::Result<bool> {
            Ok(false)
        }
        async fn create(&self, user: User) -> anyhow::Result<User> {
            self.0.create(user).await
        }
        async fn list(&self) -> anyhow::Result<Vec<User>> {
            self.0.list().await
        }
        async fn update(&self, user: User) -> anyhow::Result<Option<User>> {
            self.0.update(user).await
        }
        async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
            self.0.delete(id).await
        }
        async fn promote_to_admin(&self, login: &str) -> anyhow::Result<bool> {
            self.0.promote_to_admin(login).await
        }
    }

    #[tokio::test]
    async fn collision_at_insert_time_is_a_conflict() {
        let state = AppState {
            users: std::sync::Arc::new(LateCollision(Default::default())),
            ..AppState::fake()
        };
        register(&state, form("nadia", "nadia@example.com")).await.unwrap();
        let dup = register(&state, form("nadia2", "nadia@example.com")).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));

        let other = register(&state, form("omar", "omar@example.com")).await.unwrap();
        let req = UpdateUserRequest {
            user_name: Some("nadia".into()),
            ..Default::default()
        };
        let clash = update_user(&state, &other, other.id, req).await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));
    }
}
