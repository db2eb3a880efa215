use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::dashboard::{DashboardSummary, RecentOrderList, RecentReviewList, StatusCountList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::LimitQuery,
    services::dashboard_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/orders/status", get(orders_by_status))
        .route("/orders/recent", get(recent_orders))
        .route("/reviews/recent", get(recent_reviews))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard/summary",
    responses(
        (status = 200, description = "Totals, 30 day counts and revenue", body = ApiResponse<DashboardSummary>),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardSummary>>> {
    let resp = dashboard_service::summary(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard/orders/status",
    responses((status = 200, description = "Order counts by status", body = ApiResponse<StatusCountList>)),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn orders_by_status(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<StatusCountList>>> {
    let resp = dashboard_service::orders_by_status(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard/orders/recent",
    params(LimitQuery),
    responses((status = 200, description = "Latest orders", body = ApiResponse<RecentOrderList>)),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn recent_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<RecentOrderList>>> {
    let resp = dashboard_service::recent_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard/reviews/recent",
    params(LimitQuery),
    responses((status = 200, description = "Latest reviews", body = ApiResponse<RecentReviewList>)),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn recent_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<RecentReviewList>>> {
    let resp = dashboard_service::recent_reviews(&state, &user, query).await?;
    Ok(Json(resp))
}
