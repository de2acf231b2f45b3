//! Configuration module for shop-service.

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, Secret};
use shop_core::config as core_config;
use shop_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const PAYPAL_SANDBOX_URL: &str = "https://api-m.sandbox.paypal.com";
pub const PAYPAL_LIVE_URL: &str = "https://api-m.paypal.com";
pub const FLUTTERWAVE_URL: &str = "https://api.flutterwave.com";

#[derive(Debug, Clone)]
pub struct ShopConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub frontend: FrontendConfig,
    pub checkout: CheckoutConfig,
    pub flutterwave: FlutterwaveConfig,
    pub paypal: PayPalConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Secret<String>,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Origin of the storefront; used for CORS and provider redirect URLs.
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Flat surcharge added to every cart total at checkout.
    pub tax: Decimal,
    /// Currency the store books its revenue in.
    pub settlement_currency: String,
}

#[derive(Debug, Clone)]
pub struct FlutterwaveConfig {
    pub secret_key: Secret<String>,
    pub api_base_url: String,
    pub currency: String,
    pub timeout: Duration,
}

impl FlutterwaveConfig {
    pub fn is_configured(&self) -> bool {
        !self.secret_key.expose_secret().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct PayPalConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub api_base_url: String,
    pub currency: String,
    pub timeout: Duration,
}

impl PayPalConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.expose_secret().is_empty()
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::ConfigError(anyhow::anyhow!("{} is required", key)))
}

fn or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::ConfigError(anyhow::anyhow!("{} has an invalid value", key))),
        Err(_) => Ok(default),
    }
}

/// Resolve the PayPal REST base URL from `PAYPAL_MODE`, unless overridden.
pub fn paypal_base_url(mode: &str, override_url: Option<String>) -> Result<String, AppError> {
    if let Some(url) = override_url {
        return Ok(url);
    }
    match mode {
        "sandbox" => Ok(PAYPAL_SANDBOX_URL.to_string()),
        "live" => Ok(PAYPAL_LIVE_URL.to_string()),
        other => Err(AppError::ConfigError(anyhow::anyhow!(
            "PAYPAL_MODE must be 'sandbox' or 'live', got '{}'",
            other
        ))),
    }
}

impl ShopConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let provider_timeout = Duration::from_secs(parsed("PROVIDER_TIMEOUT_SECONDS", 30u64)?);
        let settlement_currency = or_default("SETTLEMENT_CURRENCY", "KES");

        Ok(Self {
            common,
            service_name: or_default("SERVICE_NAME", "shop-service"),
            log_level: or_default("LOG_LEVEL", "info"),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: Secret::new(required("DATABASE_URL")?),
                max_connections: parsed("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: parsed("DATABASE_MIN_CONNECTIONS", 2)?,
            },
            jwt: JwtConfig {
                secret: Secret::new(required("JWT_SECRET")?),
                access_token_expiry_minutes: parsed("JWT_ACCESS_TOKEN_EXPIRY_MINUTES", 60)?,
                refresh_token_expiry_days: parsed("JWT_REFRESH_TOKEN_EXPIRY_DAYS", 1)?,
            },
            frontend: FrontendConfig {
                base_url: or_default("FRONTEND_BASE_URL", "http://localhost:5173")
                    .trim_end_matches('/')
                    .to_string(),
            },
            checkout: CheckoutConfig {
                tax: parsed("CHECKOUT_TAX", Decimal::new(400, 2))?,
                settlement_currency: settlement_currency.clone(),
            },
            flutterwave: FlutterwaveConfig {
                secret_key: Secret::new(or_default("FLUTTERWAVE_SECRET_KEY", "")),
                api_base_url: or_default("FLUTTERWAVE_API_BASE_URL", FLUTTERWAVE_URL),
                currency: or_default("FLUTTERWAVE_CURRENCY", &settlement_currency),
                timeout: provider_timeout,
            },
            paypal: PayPalConfig {
                client_id: or_default("PAYPAL_CLIENT_ID", ""),
                client_secret: Secret::new(or_default("PAYPAL_CLIENT_SECRET", "")),
                api_base_url: paypal_base_url(
                    &or_default("PAYPAL_MODE", "sandbox"),
                    env::var("PAYPAL_API_BASE_URL").ok(),
                )?,
                currency: or_default("PAYPAL_CURRENCY", "USD"),
                timeout: provider_timeout,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paypal_mode_selects_base_url() {
        assert_eq!(paypal_base_url("sandbox", None).unwrap(), PAYPAL_SANDBOX_URL);
        assert_eq!(paypal_base_url("live", None).unwrap(), PAYPAL_LIVE_URL);
        assert!(paypal_base_url("staging", None).is_err());
    }

    #[test]
    fn explicit_paypal_url_wins_over_mode() {
        let url = paypal_base_url("live", Some("http://127.0.0.1:9999".to_string())).unwrap();
        assert_eq!(url, "http://127.0.0.1:9999");
    }

    #[test]
    fn provider_configs_report_missing_credentials() {
        let flutterwave = FlutterwaveConfig {
            secret_key: Secret::new(String::new()),
            api_base_url: FLUTTERWAVE_URL.to_string(),
            currency: "KES".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert!(!flutterwave.is_configured());

        let paypal = PayPalConfig {
            client_id: "client".to_string(),
            client_secret: Secret::new("secret".to_string()),
            api_base_url: PAYPAL_SANDBOX_URL.to_string(),
            currency: "USD".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert!(paypal.is_configured());
    }
}
