use super::jwt::{JwtService, TokenPair};
use super::ShopError;
use crate::models::{PurchasedItem, User};
use crate::store::{ShopStore, StoreError};
use crate::utils::{hash_password, verify_password, Password};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Purchased lines shown on the profile.
const PURCHASE_HISTORY_LIMIT: i64 = 10;

const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: Option<Password>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub user: User,
    pub items: Vec<PurchasedItem>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn ShopStore>,
    jwt: JwtService,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AuthService {
    pub fn new(store: Arc<dyn ShopStore>, jwt: JwtService) -> Self {
        Self { store, jwt }
    }

    #[instrument(skip(self, new_user), fields(username = %new_user.username))]
    pub async fn register(&self, new_user: NewUser) -> Result<User, ShopError> {
        let username = new_user.username.trim();
        if username.is_empty() {
            return Err(ShopError::Validation("Username is required".to_string()));
        }
        let password = new_user
            .password
            .ok_or_else(|| ShopError::Validation("Password is required".to_string()))?;
        if password.as_str().chars().count() < 8 {
            return Err(ShopError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let user = User {
            user_id: Uuid::new_v4(),
            username: username.to_string(),
            email: new_user.email.trim().to_string(),
            password_hash: hash_password(&password)?,
            first_name: non_blank(new_user.first_name),
            last_name: non_blank(new_user.last_name),
            phone: non_blank(new_user.phone),
            address: non_blank(new_user.address),
            city: non_blank(new_user.city),
            state: non_blank(new_user.state),
            country: non_blank(new_user.country),
            created_utc: Utc::now(),
        };

        self.store.insert_user(&user).await.map_err(|e| match e {
            StoreError::Conflict(_) => {
                ShopError::Conflict("A user with that username already exists".to_string())
            }
            other => other.into(),
        })?;

        info!(user_id = %user.user_id, "User registered");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn obtain_token(
        &self,
        username: &str,
        password: &Password,
    ) -> Result<TokenPair, ShopError> {
        let user = self
            .store
            .find_user_by_username(username.trim())
            .await?
            .ok_or_else(|| ShopError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.user_id, "Login failed: wrong password");
            return Err(ShopError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        Ok(self.jwt.generate_token_pair(user.user_id, &user.username)?)
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, ShopError> {
        let claims = self.jwt.validate_refresh_token(refresh_token).map_err(|e| {
            warn!(error = %e, "Refresh token rejected");
            ShopError::Unauthorized("Token is invalid or expired".to_string())
        })?;
        let user_id = claims
            .user_id()
            .map_err(|_| ShopError::Unauthorized("Token is invalid or expired".to_string()))?;

        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ShopError::Unauthorized("User not found".to_string()))?;

        Ok(self.jwt.generate_access_token(user.user_id, &user.username)?)
    }

    /// Resolve a bearer access token to its user.
    pub async fn authenticate(&self, access_token: &str) -> Result<User, ShopError> {
        let claims = self.jwt.validate_access_token(access_token).map_err(|e| {
            warn!(error = %e, "Access token rejected");
            ShopError::Unauthorized("Given token not valid for any token type".to_string())
        })?;
        let user_id = claims.user_id().map_err(|_| {
            ShopError::Unauthorized("Given token not valid for any token type".to_string())
        })?;

        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ShopError::Unauthorized("User not found".to_string()))
    }

    pub async fn user_info(&self, user: User) -> Result<UserProfile, ShopError> {
        let items = self
            .store
            .list_purchased_items(user.user_id, PURCHASE_HISTORY_LIMIT)
            .await?;
        Ok(UserProfile { user, items })
    }
}
