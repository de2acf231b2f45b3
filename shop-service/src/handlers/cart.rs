//! Anonymous cart endpoints, keyed by the client's `cart_code`.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use shop_core::error::AppError;

use crate::dtos::cart::{
    AddItemRequest, CartCodeQuery, CartItemResponse, CartResponse, CartStatResponse,
    DeleteItemRequest, ProductInCartQuery, ProductInCartResponse, UpdateQuantityRequest,
};
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn add_item(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItemResponse>), AppError> {
    let line = state.carts.add_item(&req.cart_code, req.product_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CartItemResponse {
            data: line.into(),
            message: "Cartitem created successfully".to_string(),
        }),
    ))
}

pub async fn product_in_cart(
    State(state): State<AppState>,
    Query(query): Query<ProductInCartQuery>,
) -> Result<Json<ProductInCartResponse>, AppError> {
    let product_in_cart = state
        .carts
        .product_in_cart(&query.cart_code, query.product_id)
        .await?;
    Ok(Json(ProductInCartResponse { product_in_cart }))
}

pub async fn cart_stat(
    State(state): State<AppState>,
    Query(query): Query<CartCodeQuery>,
) -> Result<Json<CartStatResponse>, AppError> {
    let stat = state.carts.cart_stat(&query.cart_code).await?;
    Ok(Json(stat.into()))
}

pub async fn get_cart(
    State(state): State<AppState>,
    Query(query): Query<CartCodeQuery>,
) -> Result<Json<CartResponse>, AppError> {
    let view = state.carts.cart_detail(&query.cart_code).await?;
    Ok(Json(view.into()))
}

pub async fn update_quantity(
    State(state): State<AppState>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartItemResponse>, AppError> {
    let line = state
        .carts
        .update_quantity(req.item_id, req.quantity)
        .await?;

    Ok(Json(CartItemResponse {
        data: line.into(),
        message: "Cartitem updated successfully!".to_string(),
    }))
}

pub async fn delete_cart_item(
    State(state): State<AppState>,
    Json(req): Json<DeleteItemRequest>,
) -> Result<StatusCode, AppError> {
    state.carts.remove_item(req.item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
