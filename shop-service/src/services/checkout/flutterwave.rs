//! Flutterwave hosted checkout: redirect the customer to a payment link, then
//! trust nothing from the redirect back until the provider's verify endpoint
//! agrees with the stored transaction.

use super::CheckoutLedger;
use crate::models::{PaymentProvider, Transaction, User};
use crate::services::flutterwave::{
    FlutterwaveClient, PaymentCustomer, PaymentCustomizations, PaymentRequest,
    VerifiedTransaction,
};
use crate::services::metrics::record_verification;
use crate::services::ShopError;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Serialize)]
pub struct FlutterwaveInitiation {
    pub tx_ref: String,
    pub link: String,
}

/// Query parameters Flutterwave appends to the redirect URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub status: Option<String>,
    pub tx_ref: Option<String>,
    pub transaction_id: Option<String>,
}

#[derive(Clone)]
pub struct FlutterwaveCheckout {
    ledger: CheckoutLedger,
    client: FlutterwaveClient,
    redirect_url: String,
}

/// Compare the provider's record with ours. Returns the first disagreement.
fn verification_mismatch(stored: &Transaction, verified: &VerifiedTransaction) -> Option<String> {
    if verified.status != "successful" {
        return Some(format!("provider status is {}", verified.status));
    }
    if verified.amount != stored.amount {
        return Some(format!(
            "amount mismatch: expected {}, provider reported {}",
            stored.amount, verified.amount
        ));
    }
    if verified.currency != stored.currency {
        return Some(format!(
            "currency mismatch: expected {}, provider reported {}",
            stored.currency, verified.currency
        ));
    }
    match verified.tx_ref.as_deref() {
        Some(tx_ref) if tx_ref != stored.tx_ref => {
            Some("transaction reference mismatch".to_string())
        }
        _ => None,
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, ShopError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ShopError::Validation(format!("{} is required", name)))
}

impl FlutterwaveCheckout {
    pub fn new(ledger: CheckoutLedger, client: FlutterwaveClient, frontend_base_url: &str) -> Self {
        Self {
            ledger,
            client,
            redirect_url: format!("{}/payment-status", frontend_base_url.trim_end_matches('/')),
        }
    }

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn initiate(
        &self,
        cart_code: &str,
        user: &User,
    ) -> Result<FlutterwaveInitiation, ShopError> {
        if !self.client.is_configured() {
            return Err(ShopError::NotConfigured("Flutterwave"));
        }

        let transaction = self
            .ledger
            .open(cart_code, user, PaymentProvider::Flutterwave, self.client.currency())
            .await?;

        let request = PaymentRequest {
            tx_ref: transaction.tx_ref.clone(),
            amount: format!("{:.2}", transaction.amount),
            currency: transaction.currency.clone(),
            redirect_url: self.redirect_url.clone(),
            customer: PaymentCustomer {
                email: user.email.clone(),
                phonenumber: user.phone.clone(),
                name: user.display_name(),
            },
            customizations: PaymentCustomizations {
                title: "Shoppit".to_string(),
                description: "Cart Payment".to_string(),
            },
        };

        let link = self.client.create_payment(&request).await?;

        Ok(FlutterwaveInitiation {
            tx_ref: transaction.tx_ref,
            link,
        })
    }

    /// Handle the customer's redirect back from the hosted page.
    #[instrument(skip(self, params), fields(tx_ref = ?params.tx_ref))]
    pub async fn callback(&self, params: CallbackParams) -> Result<Transaction, ShopError> {
        if params.status.as_deref() != Some("successful") {
            info!(status = ?params.status, "Payment not successful, skipping verification");
            return Err(ShopError::Rejected("Payment was not successful.".to_string()));
        }

        let tx_ref = required(params.tx_ref, "tx_ref")?;
        let transaction_id = required(params.transaction_id, "transaction_id")?;

        let transaction = self
            .ledger
            .store()
            .find_transaction_by_ref(&tx_ref)
            .await?
            .ok_or_else(|| ShopError::NotFound("Transaction not found".to_string()))?;

        if transaction.provider != PaymentProvider::Flutterwave {
            return Err(ShopError::Validation(
                "Transaction was not opened with Flutterwave".to_string(),
            ));
        }
        if transaction.is_completed() {
            info!("Transaction already completed");
            return Ok(transaction);
        }

        // Interpolated into the provider URL.
        if !transaction_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ShopError::Validation(
                "transaction_id must be alphanumeric".to_string(),
            ));
        }

        let verified = self.client.verify_transaction(&transaction_id).await?;

        if let Some(reason) = verification_mismatch(&transaction, &verified) {
            record_verification(PaymentProvider::Flutterwave.as_str(), "mismatch");
            warn!(
                transaction_id = %transaction_id,
                reason = %reason,
                "Flutterwave verification rejected"
            );
            return Err(ShopError::VerificationFailed(reason));
        }

        record_verification(PaymentProvider::Flutterwave.as_str(), "verified");
        self.ledger.settle(&transaction).await
    }
}
