//! PayPal checkout: create an order for a pending transaction, then capture
//! it after the buyer approves.

use super::CheckoutLedger;
use crate::models::{PaymentProvider, Transaction, User};
use crate::services::metrics::record_verification;
use crate::services::paypal::PayPalClient;
use crate::services::ShopError;
use serde::Serialize;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Serialize)]
pub struct PayPalInitiation {
    pub order_id: String,
    pub tx_ref: String,
    pub approval_url: String,
}

/// Identifies the transaction to capture. At least one is required.
#[derive(Debug, Clone, Default)]
pub struct PayPalCapture {
    pub order_id: Option<String>,
    pub tx_ref: Option<String>,
}

#[derive(Clone)]
pub struct PayPalCheckout {
    ledger: CheckoutLedger,
    client: PayPalClient,
    return_url: String,
    cancel_url: String,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl PayPalCheckout {
    pub fn new(ledger: CheckoutLedger, client: PayPalClient, frontend_base_url: &str) -> Self {
        let base = frontend_base_url.trim_end_matches('/');
        Self {
            ledger,
            client,
            return_url: format!("{}/payment-status?paymentStatus=success", base),
            cancel_url: format!("{}/payment-status?paymentStatus=cancel", base),
        }
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn initiate(
        &self,
        cart_code: &str,
        user: &User,
    ) -> Result<PayPalInitiation, ShopError> {
        if !self.client.is_configured() {
            return Err(ShopError::NotConfigured("PayPal"));
        }

        let transaction = self
            .ledger
            .open(cart_code, user, PaymentProvider::PayPal, self.client.currency())
            .await?;

        let access_token = self.client.access_token().await?;
        let order = self
            .client
            .create_order(
                &access_token,
                &transaction.tx_ref,
                transaction.amount,
                &transaction.currency,
                &self.return_url,
                &self.cancel_url,
            )
            .await?;

        self.ledger
            .store()
            .attach_provider_order(transaction.transaction_id, &order.id)
            .await?;

        let approval_url = order.approval_url().map(str::to_string).ok_or_else(|| {
            warn!(order_id = %order.id, "PayPal order has no approval link");
            ShopError::Provider("PayPal did not return an approval link".to_string())
        })?;

        Ok(PayPalInitiation {
            order_id: order.id,
            tx_ref: transaction.tx_ref,
            approval_url,
        })
    }

    /// Find the caller's transaction by order id, else by reference.
    async fn resolve(
        &self,
        order_id: Option<&str>,
        tx_ref: Option<&str>,
        user: &User,
    ) -> Result<Transaction, ShopError> {
        let store = self.ledger.store();
        let not_found = || ShopError::NotFound("Transaction not found".to_string());

        let transaction = match (order_id, tx_ref) {
            (Some(order_id), _) => store.find_transaction_by_order_id(order_id).await?,
            (None, Some(tx_ref)) => store.find_transaction_by_ref(tx_ref).await?,
            (None, None) => {
                return Err(ShopError::Validation(
                    "order_id or tx_ref is required".to_string(),
                ))
            }
        }
        .filter(|tx| tx.user_id == user.user_id && tx.provider == PaymentProvider::PayPal)
        .ok_or_else(not_found)?;

        if let (Some(_), Some(tx_ref)) = (order_id, tx_ref) {
            if transaction.tx_ref != tx_ref {
                return Err(ShopError::Validation(
                    "order_id and tx_ref refer to different transactions".to_string(),
                ));
            }
        }

        Ok(transaction)
    }

    #[instrument(skip(self, request, user), fields(user_id = %user.user_id))]
    pub async fn capture(
        &self,
        request: PayPalCapture,
        user: &User,
    ) -> Result<Transaction, ShopError> {
        let order_id = non_blank(request.order_id);
        let tx_ref = non_blank(request.tx_ref);

        let transaction = self
            .resolve(order_id.as_deref(), tx_ref.as_deref(), user)
            .await?;

        if transaction.is_completed() {
            info!(tx_ref = %transaction.tx_ref, "Transaction already completed");
            return Ok(transaction);
        }

        let order_id = match transaction.provider_order_id.clone() {
            Some(order_id) => order_id,
            None => {
                return Err(ShopError::Validation(
                    "No PayPal order is associated with this transaction".to_string(),
                ))
            }
        };

        if !self.client.is_configured() {
            return Err(ShopError::NotConfigured("PayPal"));
        }

        let access_token = self.client.access_token().await?;
        let captured = self.client.capture_order(&access_token, &order_id).await?;

        if captured.status != "COMPLETED" {
            record_verification(PaymentProvider::PayPal.as_str(), "incomplete");
            warn!(
                tx_ref = %transaction.tx_ref,
                order_id = %order_id,
                status = %captured.status,
                "PayPal capture did not complete"
            );
            return Err(ShopError::CaptureIncomplete(captured.status));
        }

        record_verification(PaymentProvider::PayPal.as_str(), "verified");
        self.ledger.settle(&transaction).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CheckoutConfig, PayPalConfig};
    use crate::models::TransactionStatus;
    use crate::store::{MemoryStore, ShopStore};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use secrecy::Secret;
    use std::sync::Arc;
    use std::time::Duration;
    use uuid::Uuid;
    use wiremock::MockServer;

    fn user() -> User {
        User {
            user_id: Uuid::new_v4(),
            username: "buyer".to_string(),
            email: "buyer@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            country: None,
            created_utc: Utc::now(),
        }
    }

    async fn setup(base_url: &str) -> (PayPalCheckout, Arc<MemoryStore>, User, Transaction) {
        let store = Arc::new(MemoryStore::new());
        let buyer = user();
        store.insert_user(&buyer).await.unwrap();
        let cart = store.get_or_create_cart("cart-1").await.unwrap();

        let now = Utc::now();
        let pending = Transaction {
            transaction_id: Uuid::new_v4(),
            tx_ref: "ref-1".to_string(),
            provider: PaymentProvider::PayPal,
            provider_order_id: None,
            cart_id: cart.cart_id,
            user_id: buyer.user_id,
            amount: dec!(24.00),
            currency: "USD".to_string(),
            settlement_currency: "KES".to_string(),
            status: TransactionStatus::Pending,
            created_utc: now,
            modified_utc: now,
        };
        store.insert_transaction(&pending).await.unwrap();

        let ledger = CheckoutLedger::new(
            store.clone(),
            CheckoutConfig {
                tax: dec!(4.00),
                settlement_currency: "KES".to_string(),
            },
        );
        let client = PayPalClient::new(PayPalConfig {
            client_id: "client-id".to_string(),
            client_secret: Secret::new("client-secret".to_string()),
            api_base_url: base_url.to_string(),
            currency: "USD".to_string(),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        (
            PayPalCheckout::new(ledger, client, "http://localhost:5173"),
            store,
            buyer,
            pending,
        )
    }

    #[tokio::test]
    async fn capture_by_ref_without_order_never_calls_paypal() {
        let server = MockServer::start().await;
        let (checkout, _, buyer, pending) = setup(&server.uri()).await;

        let err = checkout
            .capture(
                PayPalCapture {
                    order_id: None,
                    tx_ref: Some(pending.tx_ref.clone()),
                },
                &buyer,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ShopError::Validation(_)));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn capture_requires_an_identifier() {
        let server = MockServer::start().await;
        let (checkout, _, buyer, _) = setup(&server.uri()).await;

        let err = checkout
            .capture(PayPalCapture::default(), &buyer)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn other_users_transactions_are_not_found() {
        let server = MockServer::start().await;
        let (checkout, store, _, pending) = setup(&server.uri()).await;
        store
            .attach_provider_order(pending.transaction_id, "ORDER-1")
            .await
            .unwrap();

        let err = checkout
            .capture(
                PayPalCapture {
                    order_id: Some("ORDER-1".to_string()),
                    tx_ref: None,
                },
                &user(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }

    #[tokio::test]
    async fn mismatched_identifiers_are_rejected() {
        let server = MockServer::start().await;
        let (checkout, store, buyer, pending) = setup(&server.uri()).await;
        store
            .attach_provider_order(pending.transaction_id, "ORDER-1")
            .await
            .unwrap();

        let err = checkout
            .capture(
                PayPalCapture {
                    order_id: Some("ORDER-1".to_string()),
                    tx_ref: Some("some-other-ref".to_string()),
                },
                &buyer,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }
}
