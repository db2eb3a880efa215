use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Brand, BrandName};

#[derive(Debug, Deserialize, ToSchema)]
pub struct BrandRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BrandList {
    pub items: Vec<Brand>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BrandNameList {
    pub items: Vec<BrandName>,
}
