use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::reviews::{AdminCreateReviewRequest, CreateReviewRequest, ReviewList, UpdateReviewRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Review,
    response::ApiResponse,
    routes::params::{Pagination, ReviewFilterQuery},
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_review))
        .route("/my", post(create_my_review).put(update_my_review))
        .route("/my/{review_id}", delete(delete_my_review))
        .route("/update", put(update_review))
        .route("/all", get(list_all_reviews))
        .route("/filter", get(filter_reviews))
        .route("/{id}", get(get_review).delete(delete_review))
}

#[utoipa::path(
    post,
    path = "/api/review/my",
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Review created", body = ApiResponse<Review>),
        (status = 400, description = "Rating out of range or variant of another product"),
        (status = 404, description = "Product or variant not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn create_my_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::create_my_review(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/review/my",
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ApiResponse<Review>),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn update_my_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::update_my_review(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/review/my/{review_id}",
    params(("review_id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn delete_my_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(review_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = review_service::delete_my_review(&state, &user, review_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/review",
    request_body = AdminCreateReviewRequest,
    responses(
        (status = 200, description = "Review created on behalf of a user", body = ApiResponse<Review>),
        (status = 404, description = "User, product or variant not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AdminCreateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::create_review(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/review/update",
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Review updated", body = ApiResponse<Review>),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn update_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::update_review(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/review/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review", body = ApiResponse<Review>),
        (status = 404, description = "Review not found")
    ),
    tag = "Reviews"
)]
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::get_review(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/review/{id}",
    params(("id" = Uuid, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review deleted"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn delete_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = review_service::delete_review(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/review/filter",
    params(Pagination, ReviewFilterQuery),
    responses((status = 200, description = "Filtered reviews", body = ApiResponse<ReviewList>)),
    tag = "Reviews"
)]
pub async fn filter_reviews(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<ReviewFilterQuery>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = review_service::filter_reviews(&state, pagination, filter).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/review/all",
    params(Pagination, ReviewFilterQuery),
    responses((status = 200, description = "All reviews", body = ApiResponse<ReviewList>)),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn list_all_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
    Query(filter): Query<ReviewFilterQuery>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = review_service::list_all_reviews(&state, &user, pagination, filter).await?;
    Ok(Json(resp))
}
