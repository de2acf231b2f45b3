//! Flutterwave payment provider client.
//!
//! Hosted-checkout flow: create a payment link for a transaction reference,
//! then verify the provider's transaction record after the customer is
//! redirected back.

use super::ShopError;
use crate::config::FlutterwaveConfig;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Flutterwave client for the v3 REST API.
#[derive(Clone)]
pub struct FlutterwaveClient {
    client: Client,
    config: FlutterwaveConfig,
}

/// Request to create a hosted payment link.
#[derive(Debug, Serialize)]
pub struct PaymentRequest {
    pub tx_ref: String,
    /// Decimal amount with two places, e.g. "24.00".
    pub amount: String,
    pub currency: String,
    pub redirect_url: String,
    pub customer: PaymentCustomer,
    pub customizations: PaymentCustomizations,
}

#[derive(Debug, Serialize)]
pub struct PaymentCustomer {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phonenumber: Option<String>,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentCustomizations {
    pub title: String,
    pub description: String,
}

/// Every Flutterwave response is wrapped in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PaymentLink {
    link: String,
}

/// The provider's record of a transaction, as returned by verify.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifiedTransaction {
    #[serde(default)]
    pub tx_ref: Option<String>,
    pub status: String,
    pub amount: Decimal,
    pub currency: String,
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message)
        .unwrap_or_else(|| format!("Flutterwave returned HTTP {}", status.as_u16()))
}

impl FlutterwaveClient {
    pub fn new(config: FlutterwaveConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build Flutterwave HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    fn ensure_configured(&self) -> Result<(), ShopError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(ShopError::NotConfigured("Flutterwave"))
        }
    }

    /// Create a hosted payment link. Returns the URL to redirect the customer to.
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<String, ShopError> {
        self.ensure_configured()?;

        let url = format!("{}/v3/payments", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(
            status = %status,
            tx_ref = %request.tx_ref,
            "Flutterwave create_payment response"
        );

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::error!(
                status = %status,
                tx_ref = %request.tx_ref,
                message = %message,
                "Flutterwave payment creation failed"
            );
            return Err(ShopError::Provider(message));
        }

        let envelope: Envelope<PaymentLink> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Unexpected Flutterwave create_payment response");
            ShopError::Provider("Unexpected response from Flutterwave".to_string())
        })?;

        match envelope.data {
            Some(data) if envelope.status == "success" => {
                tracing::info!(tx_ref = %request.tx_ref, "Flutterwave payment link created");
                Ok(data.link)
            }
            _ => Err(ShopError::Provider(envelope.message.unwrap_or_else(|| {
                "Flutterwave did not return a payment link".to_string()
            }))),
        }
    }

    /// Fetch the provider's record for a Flutterwave transaction id.
    pub async fn verify_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<VerifiedTransaction, ShopError> {
        self.ensure_configured()?;

        let url = format!(
            "{}/v3/transactions/{}/verify",
            self.config.api_base_url, transaction_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(
            status = %status,
            transaction_id = %transaction_id,
            "Flutterwave verify response"
        );

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::error!(
                status = %status,
                transaction_id = %transaction_id,
                message = %message,
                "Flutterwave verification failed"
            );
            return Err(ShopError::Provider(message));
        }

        let envelope: Envelope<VerifiedTransaction> = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Unexpected Flutterwave verify response");
            ShopError::Provider("Unexpected response from Flutterwave".to_string())
        })?;

        match envelope.data {
            Some(data) if envelope.status == "success" => Ok(data),
            _ => Err(ShopError::Provider(envelope.message.unwrap_or_else(|| {
                "Failed to verify transaction with Flutterwave".to_string()
            }))),
        }
    }
}
