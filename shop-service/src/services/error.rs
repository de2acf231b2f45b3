use crate::store::StoreError;
use shop_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    /// The customer abandoned or cancelled the payment.
    #[error("{0}")]
    Rejected(String),

    /// The provider's record of the payment disagrees with ours.
    #[error("Payment verification failed: {0}")]
    VerificationFailed(String),

    /// The provider answered a capture without completing it.
    #[error("Payment not completed, provider status {0}")]
    CaptureIncomplete(String),

    #[error("{0}")]
    Provider(String),

    #[error("Provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Payment provider is not configured: {0}")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ShopError> for AppError {
    fn from(err: ShopError) -> Self {
        match err {
            ShopError::Validation(msg) | ShopError::Rejected(msg) => {
                AppError::BadRequest(anyhow::anyhow!(msg))
            }
            e @ (ShopError::VerificationFailed(_) | ShopError::CaptureIncomplete(_)) => {
                AppError::BadRequest(anyhow::anyhow!(e.to_string()))
            }
            ShopError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            ShopError::Unauthorized(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            ShopError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ShopError::Provider(msg) => AppError::ProviderError(msg),
            ShopError::Transport(e) => AppError::TransportError(e.into()),
            ShopError::NotConfigured(provider) => {
                AppError::ConfigError(anyhow::anyhow!("{} credentials are not configured", provider))
            }
            ShopError::Store(StoreError::Conflict(what)) => {
                AppError::Conflict(anyhow::anyhow!("{} already exists", what))
            }
            ShopError::Store(StoreError::Missing(what)) => {
                AppError::NotFound(anyhow::anyhow!("{} not found", what))
            }
            ShopError::Store(StoreError::Database(e)) => AppError::DatabaseError(e.into()),
            ShopError::Internal(e) => AppError::InternalError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn client_side_failures_map_to_4xx() {
        let cases = [
            (ShopError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (ShopError::Rejected("cancelled".into()), StatusCode::BAD_REQUEST),
            (
                ShopError::VerificationFailed("amount mismatch".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ShopError::NotFound("missing".into()), StatusCode::NOT_FOUND),
            (ShopError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
            (
                ShopError::Store(StoreError::Conflict("username".into())),
                StatusCode::CONFLICT,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_code(), status);
        }
    }

    #[test]
    fn provider_and_server_failures_map_to_5xx() {
        assert_eq!(
            AppError::from(ShopError::Provider("declined".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::from(ShopError::NotConfigured("PayPal")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(ShopError::Store(StoreError::Database(sqlx::Error::PoolTimedOut)))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn verification_failure_message_names_the_reason() {
        let err = ShopError::VerificationFailed("currency mismatch".into());
        assert_eq!(
            err.to_string(),
            "Payment verification failed: currency mismatch"
        );
    }
}
