use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::instrument;

use super::{
    dto::{CheckoutRequest, CheckoutResponse},
    services::Checkout,
};
use crate::{auth::extractors::AuthUser, error::AppResult, extract::AppJson, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/checkout", post(checkout))
}

#[instrument(skip(state, payload))]
pub async fn checkout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<CheckoutResponse>)> {
    let CheckoutRequest {
        mut cart,
        shipping_address,
    } = payload;
    let order = Checkout::submit(&mut cart, user_id, shipping_address, &state).await?;
    Ok((StatusCode::CREATED, Json(CheckoutResponse { order, cart })))
}
