use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub total_orders: i64,
    pub new_orders: i64,
    pub orders_growth: f64,
    pub total_products: i64,
    pub new_products: i64,
    pub products_growth: f64,
    pub total_users: i64,
    pub new_users: i64,
    pub users_growth: f64,
    pub total_revenue: i64,
}

#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct RecentOrder {
    pub id: Uuid,
    pub customer_name: String,
    pub order_date: DateTime<Utc>,
    pub total_amount: i64,
    pub status: String,
    pub payment_status: String,
}

#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct RecentReview {
    pub id: Uuid,
    pub product_name: String,
    pub customer_name: String,
    pub rating: i32,
    pub content: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusCountList {
    pub items: Vec<StatusCount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentOrderList {
    pub items: Vec<RecentOrder>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecentReviewList {
    pub items: Vec<RecentReview>,
}
