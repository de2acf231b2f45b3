//! Checkout: pricing a cart, opening a pending transaction against it, and
//! settling that transaction once a provider has confirmed the payment.
//!
//! The provider-specific flows live in [`flutterwave`] and [`paypal`]; both
//! go through [`CheckoutLedger`] so pricing and settlement stay identical.

pub mod flutterwave;
pub mod paypal;

pub use flutterwave::{CallbackParams, FlutterwaveCheckout, FlutterwaveInitiation};
pub use paypal::{PayPalCapture, PayPalCheckout, PayPalInitiation};

use super::cart::compute_totals;
use super::metrics::{record_amount, record_transaction};
use super::ShopError;
use crate::config::CheckoutConfig;
use crate::models::{PaymentProvider, Transaction, TransactionStatus, User};
use crate::store::{Settlement, ShopStore, StoreError};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Cart total plus the flat tax, rounded to cents.
pub fn checkout_amount(sum_total: Decimal, tax: Decimal) -> Decimal {
    (sum_total + tax).round_dp(2)
}

/// Shared by both provider flows.
#[derive(Clone)]
pub struct CheckoutLedger {
    store: Arc<dyn ShopStore>,
    settings: CheckoutConfig,
}

impl CheckoutLedger {
    pub fn new(store: Arc<dyn ShopStore>, settings: CheckoutConfig) -> Self {
        Self { store, settings }
    }

    pub fn store(&self) -> &Arc<dyn ShopStore> {
        &self.store
    }

    /// Price the cart and persist a pending transaction for it. Nothing is
    /// sent to a provider here; callers do that once this returns.
    pub async fn open(
        &self,
        cart_code: &str,
        user: &User,
        provider: PaymentProvider,
        currency: &str,
    ) -> Result<Transaction, ShopError> {
        let cart_code = cart_code.trim();
        if cart_code.is_empty() {
            return Err(ShopError::Validation("cart_code is required".to_string()));
        }

        let cart = self
            .store
            .find_cart_by_code(cart_code)
            .await?
            .ok_or_else(|| ShopError::NotFound("Cart not found".to_string()))?;
        if cart.paid {
            return Err(ShopError::Validation(
                "Cart has already been paid for".to_string(),
            ));
        }

        let lines = self.store.list_cart_lines(cart.cart_id).await?;
        if lines.is_empty() {
            return Err(ShopError::Validation("Cart is empty".to_string()));
        }

        let amount = checkout_amount(compute_totals(&lines).sum_total, self.settings.tax);
        if amount <= Decimal::ZERO {
            return Err(ShopError::Validation(
                "Cart total must be greater than zero".to_string(),
            ));
        }

        let now = Utc::now();
        let transaction = Transaction {
            transaction_id: Uuid::new_v4(),
            tx_ref: Uuid::new_v4().to_string(),
            provider,
            provider_order_id: None,
            cart_id: cart.cart_id,
            user_id: user.user_id,
            amount,
            currency: currency.to_string(),
            settlement_currency: self.settings.settlement_currency.clone(),
            status: TransactionStatus::Pending,
            created_utc: now,
            modified_utc: now,
        };
        self.store.insert_transaction(&transaction).await?;

        record_transaction(provider.as_str(), TransactionStatus::Pending.as_str());
        info!(
            tx_ref = %transaction.tx_ref,
            provider = provider.as_str(),
            cart_code = %cart.cart_code,
            amount = %transaction.amount,
            currency = %transaction.currency,
            "Checkout transaction opened"
        );

        Ok(transaction)
    }

    /// Mark the transaction completed and its cart paid in one step.
    pub async fn settle(&self, transaction: &Transaction) -> Result<Transaction, ShopError> {
        let settlement = self
            .store
            .settle_transaction(transaction.transaction_id)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(what) => {
                    warn!(
                        tx_ref = %transaction.tx_ref,
                        reason = %what,
                        "Settlement refused"
                    );
                    ShopError::Conflict("Cart has already been paid for".to_string())
                }
                other => other.into(),
            })?;

        match settlement {
            Settlement::Settled(settled) => {
                let provider = settled.provider.as_str();
                record_transaction(provider, TransactionStatus::Completed.as_str());
                record_amount(provider, &settled.currency, settled.amount);
                info!(
                    tx_ref = %settled.tx_ref,
                    provider,
                    amount = %settled.amount,
                    currency = %settled.currency,
                    "Checkout transaction settled"
                );
                Ok(settled)
            }
            Settlement::AlreadyCompleted(settled) => Ok(settled),
        }
    }
}
