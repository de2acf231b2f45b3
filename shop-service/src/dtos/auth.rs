use super::catalog::ProductView;
use crate::models::{PurchasedItem, User};
use crate::services::{NewUser, UserProfile};
use crate::utils::Password;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 150, message = "Username must be 1-150 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl From<RegisterRequest> for NewUser {
    fn from(req: RegisterRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            password: Some(Password::new(req.password)),
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            address: req.address,
            city: req.city,
            state: req.state,
            country: req.country,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

#[derive(Debug, Serialize)]
pub struct UsernameResponse {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

impl From<User> for RegisteredUser {
    fn from(user: User) -> Self {
        Self {
            id: user.user_id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PurchasedItemView {
    pub id: Uuid,
    pub quantity: i32,
    pub product: ProductView,
    pub order_id: String,
    pub order_date: DateTime<Utc>,
}

impl From<PurchasedItem> for PurchasedItemView {
    fn from(item: PurchasedItem) -> Self {
        Self {
            id: item.item_id,
            quantity: item.quantity,
            product: item.product.into(),
            order_id: item.order_id,
            order_date: item.order_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub items: Vec<PurchasedItemView>,
}

impl From<UserProfile> for UserInfoResponse {
    fn from(profile: UserProfile) -> Self {
        let user = profile.user;
        Self {
            id: user.user_id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            address: user.address,
            city: user.city,
            state: user.state,
            country: user.country,
            items: profile
                .items
                .into_iter()
                .map(PurchasedItemView::from)
                .collect(),
        }
    }
}
