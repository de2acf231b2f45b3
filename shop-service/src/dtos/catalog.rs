use super::money;
use crate::models::Product;
use crate::services::ProductDetail;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: String,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            id: product.product_id,
            name: product.name,
            slug: product.slug,
            image: product.image,
            description: product.description,
            category: product.category,
            price: money(product.price),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductDetailView {
    #[serde(flatten)]
    pub product: ProductView,
    pub similar_products: Vec<ProductView>,
}

impl From<ProductDetail> for ProductDetailView {
    fn from(detail: ProductDetail) -> Self {
        Self {
            product: detail.product.into(),
            similar_products: detail
                .similar_products
                .into_iter()
                .map(ProductView::from)
                .collect(),
        }
    }
}
