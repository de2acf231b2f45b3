//! PayPal Orders v2 client.
//!
//! Client-credentials access token per call, order creation with intent
//! CAPTURE, and capture once the buyer has approved.

use super::ShopError;
use crate::config::PayPalConfig;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct PayPalClient {
    client: Client,
    config: PayPalConfig,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    intent: &'static str,
    purchase_units: Vec<PurchaseUnit<'a>>,
    application_context: ApplicationContext<'a>,
}

#[derive(Debug, Serialize)]
struct PurchaseUnit<'a> {
    reference_id: &'a str,
    amount: Amount<'a>,
}

#[derive(Debug, Serialize)]
struct Amount<'a> {
    currency_code: &'a str,
    value: String,
}

#[derive(Debug, Serialize)]
struct ApplicationContext<'a> {
    return_url: &'a str,
    cancel_url: &'a str,
    shipping_preference: &'static str,
    user_action: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderLink {
    pub href: String,
    pub rel: String,
}

/// Order resource as returned by create and capture.
#[derive(Debug, Clone, Deserialize)]
pub struct PayPalOrder {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub links: Vec<OrderLink>,
}

impl PayPalOrder {
    /// Where the buyer approves the order.
    pub fn approval_url(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == "approve" || link.rel == "payer-action")
            .map(|link| link.href.as_str())
    }
}

/// PayPal uses two error shapes: OAuth (`error_description`) and REST
/// (`name` + `message`).
#[derive(Debug, Deserialize)]
struct PayPalErrorBody {
    name: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

fn error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<PayPalErrorBody>(body).ok();
    match parsed {
        Some(PayPalErrorBody {
            name: Some(name),
            message: Some(message),
            ..
        }) => format!("{}: {}", name, message),
        Some(PayPalErrorBody {
            message: Some(message),
            ..
        })
        | Some(PayPalErrorBody {
            error_description: Some(message),
            ..
        }) => message,
        _ => format!("PayPal returned HTTP {}", status.as_u16()),
    }
}

impl PayPalClient {
    pub fn new(config: PayPalConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build PayPal HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn currency(&self) -> &str {
        &self.config.currency
    }

    /// Fetch a fresh OAuth access token. Tokens are not cached.
    pub async fn access_token(&self) -> Result<String, ShopError> {
        if !self.is_configured() {
            return Err(ShopError::NotConfigured("PayPal"));
        }

        let url = format!("{}/v1/oauth2/token", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::error!(status = %status, message = %message, "PayPal authentication failed");
            return Err(ShopError::Provider(message));
        }

        let token: AccessTokenResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Unexpected PayPal token response");
            ShopError::Provider("Unexpected response from PayPal".to_string())
        })?;

        Ok(token.access_token)
    }

    /// Create a CAPTURE order for `amount` in `currency`. The transaction
    /// reference doubles as the idempotency key.
    pub async fn create_order(
        &self,
        access_token: &str,
        tx_ref: &str,
        amount: Decimal,
        currency: &str,
        return_url: &str,
        cancel_url: &str,
    ) -> Result<PayPalOrder, ShopError> {
        let request = CreateOrderRequest {
            intent: "CAPTURE",
            purchase_units: vec![PurchaseUnit {
                reference_id: tx_ref,
                amount: Amount {
                    currency_code: currency,
                    value: format!("{:.2}", amount),
                },
            }],
            application_context: ApplicationContext {
                return_url,
                cancel_url,
                shipping_preference: "NO_SHIPPING",
                user_action: "PAY_NOW",
            },
        };

        let url = format!("{}/v2/checkout/orders", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .header("PayPal-Request-Id", tx_ref)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, tx_ref = %tx_ref, "PayPal create_order response");

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::error!(
                status = %status,
                tx_ref = %tx_ref,
                message = %message,
                "PayPal order creation failed"
            );
            return Err(ShopError::Provider(message));
        }

        let order: PayPalOrder = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Unexpected PayPal create_order response");
            ShopError::Provider("Unexpected response from PayPal".to_string())
        })?;

        tracing::info!(
            order_id = %order.id,
            tx_ref = %tx_ref,
            status = %order.status,
            "PayPal order created"
        );
        Ok(order)
    }

    /// Capture an approved order. The returned status is the provider's
    /// verdict; only `COMPLETED` means the money moved.
    pub async fn capture_order(
        &self,
        access_token: &str,
        order_id: &str,
    ) -> Result<PayPalOrder, ShopError> {
        let url = format!(
            "{}/v2/checkout/orders/{}/capture",
            self.config.api_base_url, order_id
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, order_id = %order_id, "PayPal capture response");

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::error!(
                status = %status,
                order_id = %order_id,
                message = %message,
                "PayPal capture failed"
            );
            return Err(ShopError::Provider(message));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Unexpected PayPal capture response");
            ShopError::Provider("Unexpected response from PayPal".to_string())
        })
    }
}
