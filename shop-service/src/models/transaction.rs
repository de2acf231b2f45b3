use super::UnknownVariant;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Completed,
    /// Only set by manual correction; checkout never writes it.
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(UnknownVariant {
                kind: "transaction status",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    Flutterwave,
    PayPal,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flutterwave => "flutterwave",
            Self::PayPal => "paypal",
        }
    }
}

impl TryFrom<String> for PaymentProvider {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "flutterwave" => Ok(Self::Flutterwave),
            "paypal" => Ok(Self::PayPal),
            _ => Err(UnknownVariant {
                kind: "payment provider",
                value,
            }),
        }
    }
}

/// One checkout attempt against a cart. The amount is frozen when the
/// attempt is opened.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub tx_ref: String,
    #[sqlx(try_from = "String")]
    pub provider: PaymentProvider,
    pub provider_order_id: Option<String>,
    pub cart_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    /// Currency the provider charges in.
    pub currency: String,
    /// Currency the store books the sale in.
    pub settlement_currency: String,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub created_utc: DateTime<Utc>,
    pub modified_utc: DateTime<Utc>,
}

impl Transaction {
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }
}
