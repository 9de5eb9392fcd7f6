use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    dto::ProductRequest,
    repo_types::{Product, ProductFilter, ProductPatch},
};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

const REQUIRED_MSG: &str =
    "Name, price, category, size, stock, description, and imageUrl are required";

fn text(field: &str, v: Option<String>) -> AppResult<Option<String>> {
    match v.map(|s| s.trim().to_string()) {
        Some(s) if s.is_empty() => Err(AppError::validation(format!("{field} cannot be blank"))),
        other => Ok(other),
    }
}

fn non_negative(field: &str, v: Option<f64>) -> AppResult<Option<f64>> {
    match v {
        Some(x) if !x.is_finite() || x < 0.0 => Err(AppError::validation(format!(
            "{field} must be a non-negative number"
        ))),
        other => Ok(other),
    }
}

fn count(field: &str, v: Option<i64>) -> AppResult<Option<i32>> {
    v.map(|x| {
        i32::try_from(x)
            .ok()
            .filter(|x| *x >= 0)
            .ok_or_else(|| AppError::validation(format!("{field} must be a non-negative integer")))
    })
    .transpose()
}

/// Validates every supplied field; absent fields stay `None`.
pub fn validate_patch(req: ProductRequest) -> AppResult<ProductPatch> {
    Ok(ProductPatch {
        name: text("name", req.name)?,
        description: text("description", req.description)?,
        price: non_negative("price", req.price)?,
        image_url: text("imageUrl", req.image_url)?,
        category: text("category", req.category)?,
        size: text("size", req.size)?,
        stock: count("stock", req.stock)?,
        ratings: non_negative("ratings", req.ratings)?,
        reviews: count("reviews", req.reviews)?,
    })
}

/// Builds a new catalog record; all descriptive fields, price and stock are required.
pub fn validate_new(req: ProductRequest) -> AppResult<Product> {
    let missing = |s: &Option<String>| s.as_ref().map_or(true, |v| v.trim().is_empty());
    if missing(&req.name)
        || missing(&req.description)
        || missing(&req.image_url)
        || missing(&req.category)
        || missing(&req.size)
        || req.price.is_none()
        || req.stock.is_none()
    {
        return Err(AppError::validation(REQUIRED_MSG));
    }

    let patch = validate_patch(req)?;
    let (
        Some(name),
        Some(description),
        Some(price),
        Some(image_url),
        Some(category),
        Some(size),
        Some(stock),
    ) = (
        patch.name,
        patch.description,
        patch.price,
        patch.image_url,
        patch.category,
        patch.size,
        patch.stock,
    )
    else {
        return Err(AppError::validation(REQUIRED_MSG));
    };

    Ok(Product {
        id: Uuid::new_v4(),
        name,
        description,
        price,
        image_url,
        category,
        size,
        stock,
        ratings: patch.ratings.unwrap_or(0.0),
        reviews: patch.reviews.unwrap_or(0),
    })
}

pub async fn create_product(state: &AppState, req: ProductRequest) -> AppResult<Product> {
    let product = validate_new(req).map_err(|e| {
        warn!(error = %e, "product rejected");
        e
    })?;
    let product = state.products.create(product).await.map_err(|e| {
        error!(error = %e, "create product failed");
        AppError::Persistence("Product creation failed")
    })?;
    info!(product_id = %product.id, name = %product.name, "product created");
    Ok(product)
}

pub async fn list_products(state: &AppState, filter: &ProductFilter) -> AppResult<Vec<Product>> {
    state.products.list(filter).await.map_err(|e| {
        error!(error = %e, ?filter, "list products failed");
        AppError::Persistence("Failed to fetch products")
    })
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<Product> {
    state
        .products
        .get(id)
        .await
        .map_err(|e| {
            error!(error = %e, product_id = %id, "get product failed");
            AppError::Persistence("Failed to fetch product")
        })?
        .ok_or_else(|| AppError::not_found("Product"))
}

pub async fn update_product(state: &AppState, id: Uuid, req: ProductRequest) -> AppResult<Product> {
    let patch = validate_patch(req)?;
    let updated = state
        .products
        .update(id, &patch)
        .await
        .map_err(|e| {
            error!(error = %e, product_id = %id, "update product failed");
            AppError::Persistence("Product update failed")
        })?
        .ok_or_else(|| AppError::not_found("Product"))?;
    info!(product_id = %id, "product updated");
    Ok(updated)
}

/// Hard delete. Orders keep their reference and render it as missing.
pub async fn delete_product(state: &AppState, id: Uuid) -> AppResult<()> {
    let deleted = state.products.delete(id).await.map_err(|e| {
        error!(error = %e, product_id = %id, "delete product failed");
        AppError::Persistence("Product deletion failed")
    })?;
    if !deleted {
        return Err(AppError::not_found("Product"));
    }
    info!(product_id = %id, "product deleted");
    Ok(())
}
