use super::Product;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Cart {
    pub cart_id: Uuid,
    pub cart_code: String,
    /// Bound only when a payment for this cart settles.
    pub user_id: Option<Uuid>,
    pub paid: bool,
    pub created_utc: DateTime<Utc>,
    pub modified_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CartItem {
    pub item_id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Snapshot of `Cart::paid` taken at settlement.
    pub cart_paid: bool,
}

/// A cart item joined with the product it references.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CartLine {
    #[sqlx(flatten)]
    pub item: CartItem,
    #[sqlx(flatten)]
    pub product: Product,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.item.quantity)
    }
}

/// A line from a settled cart, as shown in a user's order history.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PurchasedItem {
    pub item_id: Uuid,
    pub quantity: i32,
    pub order_id: String,
    pub order_date: DateTime<Utc>,
    #[sqlx(flatten)]
    pub product: Product,
}
