use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ListQuery, ProductRequest},
    repo_types::{Product, ProductFilter},
    services,
};
use crate::{auth::extractors::AdminUser, error::AppResult, extract::AppJson, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:id", get(get_product))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/products", axum::routing::post(create_product))
        .route(
            "/products/:id",
            axum::routing::put(update_product).delete(delete_product),
        )
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let filter = ProductFilter::new(q.category, q.size, q.name);
    Ok(Json(services::list_products(&state, &filter).await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    Ok(Json(services::get_product(&state, id).await?))
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    AppJson(payload): AppJson<ProductRequest>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = services::create_product(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<ProductRequest>,
) -> AppResult<Json<Product>> {
    Ok(Json(services::update_product(&state, id, payload).await?))
}

#[instrument(skip(state, _admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    services::delete_product(&state, id).await?;
    Ok(Json(serde_json::json!({ "message": "Product deleted" })))
}
