use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct InitiatePaymentRequest {
    #[validate(length(min = 1, message = "cart_code is required"))]
    pub cart_code: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CapturePaymentRequest {
    pub order_id: Option<String>,
    pub tx_ref: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResultResponse {
    pub message: String,
    #[serde(rename = "subMessage")]
    pub sub_message: String,
    pub tx_ref: String,
}

impl PaymentResultResponse {
    pub fn success(tx_ref: String) -> Self {
        Self {
            message: "Payment successful!".to_string(),
            sub_message: "You have successfully made payment".to_string(),
            tx_ref,
        }
    }
}
