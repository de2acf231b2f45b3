use super::catalog::ProductView;
use super::money;
use crate::models::CartLine;
use crate::services::{CartStat, CartView};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    #[validate(length(min = 1, max = 64, message = "cart_code is required"))]
    pub cart_code: String,
    pub product_id: Uuid,
}

/// Quantity rules are enforced by the cart service, not here.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct DeleteItemRequest {
    pub item_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CartCodeQuery {
    pub cart_code: String,
}

#[derive(Debug, Deserialize)]
pub struct ProductInCartQuery {
    pub cart_code: String,
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ProductInCartResponse {
    pub product_in_cart: bool,
}

#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub id: Uuid,
    pub quantity: i32,
    pub product: ProductView,
    pub total: String,
}

impl From<CartLine> for CartItemView {
    fn from(line: CartLine) -> Self {
        let total = money(line.line_total());
        Self {
            id: line.item.item_id,
            quantity: line.item.quantity,
            product: line.product.into(),
            total,
        }
    }
}

/// Wraps a single changed line.
#[derive(Debug, Serialize)]
pub struct CartItemResponse {
    pub data: CartItemView,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CartStatResponse {
    pub id: Uuid,
    pub cart_code: String,
    pub num_of_items: i64,
}

impl From<CartStat> for CartStatResponse {
    fn from(stat: CartStat) -> Self {
        Self {
            id: stat.cart_id,
            cart_code: stat.cart_code,
            num_of_items: stat.num_of_items,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub id: Option<Uuid>,
    pub cart_code: String,
    pub items: Vec<CartItemView>,
    pub sum_total: String,
    pub num_of_items: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        Self {
            id: view.cart.as_ref().map(|cart| cart.cart_id),
            created_at: view.cart.as_ref().map(|cart| cart.created_utc),
            modified_at: view.cart.as_ref().map(|cart| cart.modified_utc),
            cart_code: view.cart_code,
            items: view.lines.into_iter().map(CartItemView::from).collect(),
            sum_total: money(view.totals.sum_total),
            num_of_items: view.totals.num_of_items,
        }
    }
}
