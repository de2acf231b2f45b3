use super::UnknownVariant;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Groceries,
    Clothings,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Electronics => "Electronics",
            Self::Groceries => "Groceries",
            Self::Clothings => "Clothings",
        }
    }
}

impl TryFrom<String> for Category {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "Electronics" => Ok(Self::Electronics),
            "Groceries" => Ok(Self::Groceries),
            "Clothings" => Ok(Self::Clothings),
            _ => Err(UnknownVariant {
                kind: "category",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Product {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub created_utc: DateTime<Utc>,
}
