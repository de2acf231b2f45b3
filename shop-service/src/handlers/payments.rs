//! Checkout endpoints for both payment providers.

use axum::{
    extract::{Query, State},
    Json,
};
use shop_core::error::AppError;

use crate::dtos::payments::{CapturePaymentRequest, InitiatePaymentRequest, PaymentResultResponse};
use crate::middleware::AuthUser;
use crate::services::checkout::{
    CallbackParams, FlutterwaveInitiation, PayPalCapture, PayPalInitiation,
};
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn initiate_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<InitiatePaymentRequest>,
) -> Result<Json<FlutterwaveInitiation>, AppError> {
    let initiation = state.flutterwave.initiate(&req.cart_code, &user).await?;
    Ok(Json(initiation))
}

/// Flutterwave redirects the customer here, so there is no bearer token;
/// the provider's verify call is the only thing trusted.
pub async fn payment_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<PaymentResultResponse>, AppError> {
    let transaction = state.flutterwave.callback(params).await?;
    Ok(Json(PaymentResultResponse::success(transaction.tx_ref)))
}

pub async fn initiate_paypal_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<InitiatePaymentRequest>,
) -> Result<Json<PayPalInitiation>, AppError> {
    let initiation = state.paypal.initiate(&req.cart_code, &user).await?;
    Ok(Json(initiation))
}

pub async fn capture_paypal_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CapturePaymentRequest>,
) -> Result<Json<PaymentResultResponse>, AppError> {
    let transaction = state
        .paypal
        .capture(
            PayPalCapture {
                order_id: req.order_id,
                tx_ref: req.tx_ref,
            },
            &user,
        )
        .await?;
    Ok(Json(PaymentResultResponse::success(transaction.tx_ref)))
}
