use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::variants::{CreateVariantRequest, VariantFields, VariantList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::ProductVariant,
    response::ApiResponse,
    routes::params::{Pagination, VariantListQuery},
    services::variant_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_variant))
        .route("/product/{product_id}", get(list_by_product))
        .route(
            "/{id}",
            get(get_variant).put(update_variant).delete(delete_variant),
        )
}

#[utoipa::path(
    post,
    path = "/api/product-variant",
    request_body = CreateVariantRequest,
    responses(
        (status = 200, description = "Created variant", body = ApiResponse<ProductVariant>),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Duplicate variant")
    ),
    security(("bearer_auth" = [])),
    tag = "Product variants"
)]
pub async fn create_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateVariantRequest>,
) -> AppResult<Json<ApiResponse<ProductVariant>>> {
    let resp = variant_service::create_variant(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/product-variant/{id}",
    params(("id" = Uuid, Path, description = "Variant ID")),
    request_body = VariantFields,
    responses(
        (status = 200, description = "Updated variant", body = ApiResponse<ProductVariant>),
        (status = 404, description = "Variant not found"),
        (status = 409, description = "Duplicate variant")
    ),
    security(("bearer_auth" = [])),
    tag = "Product variants"
)]
pub async fn update_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<VariantFields>,
) -> AppResult<Json<ApiResponse<ProductVariant>>> {
    let resp = variant_service::update_variant(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product-variant/{id}",
    params(("id" = Uuid, Path, description = "Variant ID")),
    responses(
        (status = 200, description = "Variant", body = ApiResponse<ProductVariant>),
        (status = 404, description = "Variant not found")
    ),
    tag = "Product variants"
)]
pub async fn get_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductVariant>>> {
    let resp = variant_service::get_variant(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product-variant/product/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product ID"), Pagination, VariantListQuery),
    responses(
        (status = 200, description = "Variants of the product", body = ApiResponse<VariantList>),
        (status = 404, description = "Product not found")
    ),
    tag = "Product variants"
)]
pub async fn list_by_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
    Query(query): Query<VariantListQuery>,
) -> AppResult<Json<ApiResponse<VariantList>>> {
    let resp = variant_service::list_by_product(&state, product_id, pagination, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/product-variant/{id}",
    params(("id" = Uuid, Path, description = "Variant ID")),
    responses(
        (status = 200, description = "Variant deleted"),
        (status = 400, description = "Last variant of the product"),
        (status = 404, description = "Variant not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Product variants"
)]
pub async fn delete_variant(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = variant_service::delete_variant(&state, &user, id).await?;
    Ok(Json(resp))
}
