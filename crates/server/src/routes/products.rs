use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    response::Response,
    Json,
};
use models::{NewProduct, QuantityUpdate};
use tracing::info;

use crate::errors::ApiError;
use crate::response;
use crate::state::AppState;

/// POST /products
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(input) = payload?;
    info!(codigo = ?input.codigo, "create_product_request");
    let product = state.products.create(input).await?;
    Ok(response::created("product created", product))
}

/// GET /products/:codigo
pub async fn get_product(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(codigo) = path?;
    let product = state.products.get(&codigo).await?;
    Ok(response::ok("product found", product))
}

/// GET /products
pub async fn list_products(State(state): State<AppState>) -> Result<Response, ApiError> {
    let products = state.products.list().await?;
    info!(count = products.len(), "list products");
    Ok(response::ok("products listed", products))
}

/// PUT|PATCH /products/:codigo
pub async fn update_quantity(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<QuantityUpdate>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(codigo) = path?;
    let Json(input) = payload?;
    let product = state.products.update_quantity(&codigo, input).await?;
    Ok(response::ok("quantity updated", product))
}
