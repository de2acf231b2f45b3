use super::ShopError;
use crate::models::{Cart, CartLine};
use crate::store::ShopStore;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartTotals {
    pub sum_total: Decimal,
    /// Sum of line quantities.
    pub num_of_items: i64,
}

/// Sum of `price * quantity` over the lines; no side effects.
pub fn compute_totals(lines: &[CartLine]) -> CartTotals {
    lines.iter().fold(
        CartTotals {
            sum_total: Decimal::ZERO,
            num_of_items: 0,
        },
        |acc, line| CartTotals {
            sum_total: acc.sum_total + line.line_total(),
            num_of_items: acc.num_of_items + i64::from(line.item.quantity),
        },
    )
}

#[derive(Debug, Clone)]
pub struct CartStat {
    pub cart_id: Uuid,
    pub cart_code: String,
    pub num_of_items: i64,
}

/// An unpaid cart with its lines. `cart` is `None` when no cart exists yet
/// for the code, in which case the view is empty.
#[derive(Debug, Clone)]
pub struct CartView {
    pub cart_code: String,
    pub cart: Option<Cart>,
    pub lines: Vec<CartLine>,
    pub totals: CartTotals,
}

fn require_cart_code(cart_code: &str) -> Result<&str, ShopError> {
    let cart_code = cart_code.trim();
    if cart_code.is_empty() {
        return Err(ShopError::Validation("cart_code is required".to_string()));
    }
    Ok(cart_code)
}

fn paid_cart() -> ShopError {
    ShopError::Validation("Cart has already been paid for".to_string())
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn ShopStore>,
}

impl CartService {
    pub fn new(store: Arc<dyn ShopStore>) -> Self {
        Self { store }
    }

    pub async fn get_or_create_cart(&self, cart_code: &str) -> Result<Cart, ShopError> {
        let cart_code = require_cart_code(cart_code)?;
        Ok(self.store.get_or_create_cart(cart_code).await?)
    }

    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        cart_code: &str,
        product_id: Uuid,
    ) -> Result<CartLine, ShopError> {
        let cart_code = require_cart_code(cart_code)?;
        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| ShopError::NotFound("Product not found".to_string()))?;

        let cart = self.store.get_or_create_cart(cart_code).await?;
        if cart.paid {
            return Err(paid_cart());
        }

        let item = self
            .store
            .add_or_increment_item(cart.cart_id, product.product_id)
            .await?;

        info!(
            cart_code = %cart.cart_code,
            product_id = %product.product_id,
            quantity = item.quantity,
            "Item added to cart"
        );

        Ok(CartLine { item, product })
    }

    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine, ShopError> {
        if quantity < 1 {
            return Err(ShopError::Validation("Quantity must be at least 1".to_string()));
        }

        let line = self
            .store
            .find_cart_line(item_id)
            .await?
            .ok_or_else(|| ShopError::NotFound("Cart item not found".to_string()))?;
        if line.item.cart_paid {
            return Err(paid_cart());
        }

        let item = self
            .store
            .set_item_quantity(item_id, quantity)
            .await?
            .ok_or_else(|| ShopError::NotFound("Cart item not found".to_string()))?;

        Ok(CartLine {
            item,
            product: line.product,
        })
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, item_id: Uuid) -> Result<(), ShopError> {
        let line = self
            .store
            .find_cart_line(item_id)
            .await?
            .ok_or_else(|| ShopError::NotFound("Cart item not found".to_string()))?;
        if line.item.cart_paid {
            return Err(paid_cart());
        }

        if !self.store.delete_item(item_id).await? {
            return Err(ShopError::NotFound("Cart item not found".to_string()));
        }
        Ok(())
    }

    pub async fn product_in_cart(
        &self,
        cart_code: &str,
        product_id: Uuid,
    ) -> Result<bool, ShopError> {
        let cart_code = require_cart_code(cart_code)?;
        let cart = self
            .store
            .find_cart_by_code(cart_code)
            .await?
            .ok_or_else(|| ShopError::NotFound("Cart not found".to_string()))?;
        let product = self
            .store
            .find_product(product_id)
            .await?
            .ok_or_else(|| ShopError::NotFound("Product not found".to_string()))?;

        Ok(self
            .store
            .cart_contains_product(cart.cart_id, product.product_id)
            .await?)
    }

    pub async fn cart_stat(&self, cart_code: &str) -> Result<CartStat, ShopError> {
        let cart_code = require_cart_code(cart_code)?;
        let cart = self
            .store
            .find_cart_by_code(cart_code)
            .await?
            .filter(|cart| !cart.paid)
            .ok_or_else(|| ShopError::NotFound("Cart not found".to_string()))?;

        let lines = self.store.list_cart_lines(cart.cart_id).await?;
        Ok(CartStat {
            cart_id: cart.cart_id,
            cart_code: cart.cart_code,
            num_of_items: compute_totals(&lines).num_of_items,
        })
    }

    pub async fn cart_detail(&self, cart_code: &str) -> Result<CartView, ShopError> {
        let cart_code = require_cart_code(cart_code)?;
        let cart = self
            .store
            .find_cart_by_code(cart_code)
            .await?
            .filter(|cart| !cart.paid);

        let lines = match &cart {
            Some(cart) => self.store.list_cart_lines(cart.cart_id).await?,
            None => Vec::new(),
        };
        let totals = compute_totals(&lines);

        Ok(CartView {
            cart_code: cart_code.to_string(),
            cart,
            lines,
            totals,
        })
    }
}
