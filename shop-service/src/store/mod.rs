//! Persistence contract for shop records.
//!
//! `PgStore` is the production implementation; `MemoryStore` keeps the same
//! guarantees behind a single lock and backs the test suites.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{Cart, CartItem, CartLine, Product, PurchasedItem, Transaction, User};
use async_trait::async_trait;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness rule rejected the write.
    #[error("{0} already exists")]
    Conflict(String),

    #[error("{0} does not exist")]
    Missing(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of marking a transaction completed.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// This call moved the transaction and its cart to paid.
    Settled(Transaction),
    /// An earlier call already did.
    AlreadyCompleted(Transaction),
}

#[async_trait]
pub trait ShopStore: Send + Sync {
    async fn health_check(&self) -> StoreResult<()>;

    // Catalog
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn find_product(&self, product_id: Uuid) -> StoreResult<Option<Product>>;
    async fn find_product_by_slug(&self, slug: &str) -> StoreResult<Option<Product>>;
    async fn list_similar_products(
        &self,
        category: &str,
        exclude_product_id: Uuid,
    ) -> StoreResult<Vec<Product>>;
    async fn slug_exists(&self, slug: &str) -> StoreResult<bool>;
    /// Fails with `Conflict` when the slug is taken.
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;

    // Carts
    /// Atomic: concurrent callers with the same code get the same cart.
    async fn get_or_create_cart(&self, cart_code: &str) -> StoreResult<Cart>;
    async fn find_cart_by_code(&self, cart_code: &str) -> StoreResult<Option<Cart>>;
    async fn list_cart_lines(&self, cart_id: Uuid) -> StoreResult<Vec<CartLine>>;
    async fn find_cart_line(&self, item_id: Uuid) -> StoreResult<Option<CartLine>>;
    /// Insert the (cart, product) line with quantity 1, or add 1 to it.
    async fn add_or_increment_item(&self, cart_id: Uuid, product_id: Uuid)
        -> StoreResult<CartItem>;
    async fn set_item_quantity(&self, item_id: Uuid, quantity: i32)
        -> StoreResult<Option<CartItem>>;
    async fn delete_item(&self, item_id: Uuid) -> StoreResult<bool>;
    async fn cart_contains_product(&self, cart_id: Uuid, product_id: Uuid) -> StoreResult<bool>;

    // Transactions
    async fn insert_transaction(&self, transaction: &Transaction) -> StoreResult<()>;
    async fn find_transaction_by_ref(&self, tx_ref: &str) -> StoreResult<Option<Transaction>>;
    async fn find_transaction_by_order_id(
        &self,
        provider_order_id: &str,
    ) -> StoreResult<Option<Transaction>>;
    async fn attach_provider_order(
        &self,
        transaction_id: Uuid,
        provider_order_id: &str,
    ) -> StoreResult<()>;
    /// In one atomic step: transaction `pending -> completed`, cart paid and
    /// bound to the transaction's user, every item of the cart `cart_paid`.
    async fn settle_transaction(&self, transaction_id: Uuid) -> StoreResult<Settlement>;

    // Users
    /// Fails with `Conflict` when the username is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// Most recent paid lines from carts owned by the user.
    async fn list_purchased_items(&self, user_id: Uuid, limit: i64)
        -> StoreResult<Vec<PurchasedItem>>;
}
