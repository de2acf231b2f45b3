use axum::{extract::State, http::StatusCode, Json};
use shop_core::error::AppError;

use crate::dtos::auth::{
    AccessTokenResponse, RefreshRequest, RegisterRequest, RegisteredUser, TokenPairResponse,
    TokenRequest, UserInfoResponse, UsernameResponse,
};
use crate::middleware::AuthUser;
use crate::utils::{Password, ValidatedJson};
use crate::AppState;

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisteredUser>), AppError> {
    let user = state.auth.register(req.into()).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn obtain_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<TokenRequest>,
) -> Result<Json<TokenPairResponse>, AppError> {
    let pair = state
        .auth
        .obtain_token(&req.username, &Password::new(req.password))
        .await?;

    Ok(Json(TokenPairResponse {
        access: pair.access,
        refresh: pair.refresh,
    }))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, AppError> {
    let access = state.auth.refresh(&req.refresh).await?;
    Ok(Json(AccessTokenResponse { access }))
}

pub async fn get_username(AuthUser(user): AuthUser) -> Json<UsernameResponse> {
    Json(UsernameResponse {
        username: user.username,
    })
}

pub async fn user_info(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserInfoResponse>, AppError> {
    let profile = state.auth.user_info(user).await?;
    Ok(Json(profile.into()))
}
