//! Product catalog: listing, detail with similar products, and creation
//! with unique slugs.

use super::ShopError;
use crate::models::{Category, Product};
use crate::store::{ShopStore, StoreError};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Insert races on the slug index are retried this many times.
const MAX_SLUG_ATTEMPTS: usize = 20;

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Decimal,
    pub category: Option<Category>,
}

#[derive(Debug, Clone)]
pub struct ProductDetail {
    pub product: Product,
    pub similar_products: Vec<Product>,
}

/// Lowercase ASCII slug: alphanumerics kept, runs of spaces, dashes and
/// underscores collapsed to one dash, everything else dropped.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "product".to_string()
    } else {
        slug
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ShopStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ShopStore>) -> Self {
        Self { store }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, ShopError> {
        Ok(self.store.list_products().await?)
    }

    #[instrument(skip(self))]
    pub async fn product_detail(&self, slug: &str) -> Result<ProductDetail, ShopError> {
        let product = self
            .store
            .find_product_by_slug(slug)
            .await?
            .ok_or_else(|| ShopError::NotFound("Product not found".to_string()))?;

        let similar_products = match product.category.as_deref() {
            Some(category) => {
                self.store
                    .list_similar_products(category, product.product_id)
                    .await?
            }
            None => Vec::new(),
        };

        Ok(ProductDetail {
            product,
            similar_products,
        })
    }

    /// First free slug among `base`, `base-1`, `base-2`, ...
    async fn next_free_slug(
        &self,
        base: &str,
        mut suffix: usize,
    ) -> Result<(String, usize), ShopError> {
        loop {
            let candidate = if suffix == 0 {
                base.to_string()
            } else {
                format!("{}-{}", base, suffix)
            };
            if !self.store.slug_exists(&candidate).await? {
                return Ok((candidate, suffix));
            }
            suffix += 1;
        }
    }

    #[instrument(skip(self, new_product), fields(name = %new_product.name))]
    pub async fn create_product(&self, new_product: NewProduct) -> Result<Product, ShopError> {
        let name = new_product.name.trim();
        if name.is_empty() {
            return Err(ShopError::Validation("Product name is required".to_string()));
        }
        if new_product.price < Decimal::ZERO {
            return Err(ShopError::Validation(
                "Product price cannot be negative".to_string(),
            ));
        }

        let base = slugify(name);
        let mut suffix = 0;

        for _ in 0..MAX_SLUG_ATTEMPTS {
            let (slug, taken_suffix) = self.next_free_slug(&base, suffix).await?;
            let product = Product {
                product_id: Uuid::new_v4(),
                name: name.to_string(),
                slug,
                image: new_product.image.clone(),
                description: new_product.description.clone(),
                price: new_product.price.round_dp(2),
                category: new_product.category.map(|c| c.as_str().to_string()),
                created_utc: Utc::now(),
            };

            match self.store.insert_product(&product).await {
                Ok(()) => {
                    info!(slug = %product.slug, "Product created");
                    return Ok(product);
                }
                // Another writer took the slug between the check and the insert.
                Err(StoreError::Conflict(_)) => suffix = taken_suffix + 1,
                Err(e) => return Err(e.into()),
            }
        }

        Err(ShopError::Conflict(format!(
            "Could not allocate a unique slug for '{}'",
            name
        )))
    }
}
