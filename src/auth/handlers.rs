use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{
    dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest, UpdateUserRequest},
    extractors::{AdminUser, CurrentUser},
    services,
};
use crate::{
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(register).get(list_users))
        .route("/users/login", post(login))
        .route("/users/refresh", post(refresh))
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/me", get(get_me))
        .route("/users/by-name/:user_name", get(get_by_user_name))
        .route("/users/:id", get(get_user).put(update_user).delete(delete_user))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user = services::register(&state, payload).await?;
    let body = services::issue_tokens(&state, user)?;
    Ok((StatusCode::CREATED, Json(body)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let login = payload
        .identifier()
        .ok_or_else(|| AppError::validation("userName or email is required"))?;
    let user = services::authenticate(&state, login, &payload.password).await?;
    Ok(Json(services::issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(services::refresh(&state, &payload.refresh_token).await?))
}

#[instrument(skip_all)]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(PublicUser::from(user))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<PublicUser>>> {
    let users = state.users.list().await.map_err(|e| {
        error!(error = %e, "list users failed");
        AppError::Persistence("Failed to fetch users")
    })?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, _admin))]
pub async fn get_by_user_name(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(user_name): Path<String>,
) -> AppResult<Json<PublicUser>> {
    let user = state
        .users
        .find_by_user_name(&user_name)
        .await
        .map_err(|e| {
            error!(error = %e, "find_by_user_name failed");
            AppError::Persistence("Failed to load user")
        })?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, caller))]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PublicUser>> {
    services::ensure_self_or_admin(&caller, id)?;
    let user = services::load_user(&state, id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, caller, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> AppResult<Json<PublicUser>> {
    let user = services::update_user(&state, &caller, id, payload).await?;
    Ok(Json(PublicUser::from(user)))
}

#[instrument(skip(state, admin))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let deleted = state.users.delete(id).await.map_err(|e| {
        error!(error = %e, user_id = %id, "delete user failed");
        AppError::Persistence("Failed to delete user")
    })?;
    if !deleted {
        return Err(AppError::not_found("User"));
    }
    info!(user_id = %id, by = %admin.id, "user deleted");
    Ok(Json(serde_json::json!({ "message": "User deleted successfully" })))
}
