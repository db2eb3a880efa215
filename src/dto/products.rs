use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::variants::VariantFields,
    models::{ProductImage, ProductSummary, RelatedProduct},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub product_material: Option<String>,
    pub inspiration: Option<String>,
    pub usage_instructions: Option<String>,
    pub thumbnail_image: Option<String>,
    pub is_active: Option<bool>,
    /// Brand name.
    pub brand: String,
    pub product_variant: VariantFields,
    pub image_urls: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub product_material: Option<String>,
    pub inspiration: Option<String>,
    pub usage_instructions: Option<String>,
    pub thumbnail_image: Option<String>,
    pub is_active: Option<bool>,
    pub brand: String,
    /// Appended to the existing images.
    pub image_urls: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImageUrlsRequest {
    pub image_urls: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<ProductSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductImageList {
    pub items: Vec<ProductImage>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RelatedProductList {
    pub items: Vec<RelatedProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductFilters {
    pub brands: Vec<String>,
    pub sizes: Vec<String>,
    pub scents: Vec<String>,
}
