//! Domain models for shop-service.

mod cart;
mod product;
mod transaction;
mod user;

pub use cart::{Cart, CartItem, CartLine, PurchasedItem};
pub use product::{Category, Product};
pub use transaction::{PaymentProvider, Transaction, TransactionStatus};
pub use user::User;

/// A stored text value that does not name a known enum variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
