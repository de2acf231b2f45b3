use axum::{
    extract::{Path, State},
    Json,
};
use shop_core::error::AppError;

use crate::dtos::catalog::{ProductDetailView, ProductView};
use crate::AppState;

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductView>>, AppError> {
    let products = state.catalog.list_products().await?;
    Ok(Json(products.into_iter().map(ProductView::from).collect()))
}

pub async fn product_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetailView>, AppError> {
    let detail = state.catalog.product_detail(&slug).await?;
    Ok(Json(detail.into()))
}
