use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Review;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub product_id: Uuid,
    pub product_variant_id: Uuid,
    pub rating: i32,
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdminCreateReviewRequest {
    pub user_id: Uuid,
    #[serde(flatten)]
    pub review: CreateReviewRequest,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReviewRequest {
    pub review_id: Uuid,
    pub rating: i32,
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewList {
    pub items: Vec<Review>,
}
