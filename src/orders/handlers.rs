use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    routing::{get, put},
    Json, Router,
};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateOrderRequest, OrderView, SetStatusRequest},
    services,
};
use crate::{
    auth::{
        extractors::{AdminUser, AuthUser, CurrentUser},
        services::ensure_self_or_admin,
    },
    error::{AppError, AppResult},
    extract::AppJson,
    state::AppState,
};

pub fn customer_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders).post(create_order))
        .route("/orders/user/:user_id", get(list_user_orders))
        .route("/orders/:id", get(get_order))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/orders/:id/status", put(set_order_status))
}

#[instrument(skip(state, payload))]
pub async fn create_order(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, [(header::HeaderName, String); 1], Json<OrderView>)> {
    if let Some(claimed) = payload.user_id {
        if claimed != user_id {
            warn!(%user_id, %claimed, "order placed on behalf of another user");
            return Err(AppError::Forbidden("Cannot place orders for another user".into()));
        }
    }
    let new = payload.into_new_order()?;
    let order = services::place_order(&state, user_id, new).await?;
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/api/orders/{}", order.id))],
        Json(order),
    ))
}

#[instrument(skip(state, _admin))]
pub async fn list_all_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<Json<Vec<OrderView>>> {
    Ok(Json(services::list_all(&state).await?))
}

#[instrument(skip(state, caller))]
pub async fn list_user_orders(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<OrderView>>> {
    ensure_self_or_admin(&caller, user_id)?;
    Ok(Json(services::list_for_user(&state, user_id).await?))
}

#[instrument(skip(state, caller))]
pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OrderView>> {
    Ok(Json(services::get_order(&state, &caller, id).await?))
}

#[instrument(skip(state, admin, payload))]
pub async fn set_order_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<SetStatusRequest>,
) -> AppResult<Json<OrderView>> {
    let order =
        services::set_status(&state, admin.id, id, &payload.status, payload.version).await?;
    Ok(Json(order))
}
