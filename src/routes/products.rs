use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::products::{
        CreateProductRequest, ImageUrlsRequest, ProductFilters, ProductImageList, ProductList,
        RelatedProductList, UpdateProductRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::ProductDetail,
    response::ApiResponse,
    routes::params::{KeywordQuery, LimitQuery, Pagination, ProductFilterQuery, ProductListQuery},
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/all", get(list_products))
        .route("/search", get(search_products))
        .route("/search-es", get(search_by_keyword))
        .route("/related", get(list_related))
        .route("/filters", get(list_filters))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/images", post(add_images))
        .route("/{id}/images/{image_id}", delete(delete_image))
}

#[utoipa::path(
    post,
    path = "/api/product",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Created product with its first variant", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Brand not found"),
        (status = 409, description = "Product name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/product/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Product or brand not found"),
        (status = 409, description = "Product name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product detail", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/product/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/product/{id}/images",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ImageUrlsRequest,
    responses((status = 200, description = "Added images", body = ApiResponse<ProductImageList>)),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn add_images(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ImageUrlsRequest>,
) -> AppResult<Json<ApiResponse<ProductImageList>>> {
    let resp = product_service::add_images(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/product/{id}/images/{image_id}",
    params(
        ("id" = Uuid, Path, description = "Product ID"),
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Image deleted"),
        (status = 400, description = "Image belongs to another product"),
        (status = 404, description = "Image not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, image_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_image(&state, &user, id, image_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product/all",
    params(Pagination, ProductListQuery),
    responses((status = 200, description = "All products", body = ApiResponse<ProductList>)),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(query): Query<ProductListQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, pagination, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product/search",
    params(Pagination, ProductListQuery, ProductFilterQuery),
    responses((status = 200, description = "Filtered products", body = ApiResponse<ProductList>)),
    tag = "Products"
)]
pub async fn search_products(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(query): Query<ProductListQuery>,
    Query(filter): Query<ProductFilterQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::search_products(&state, pagination, query, filter).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product/search-es",
    params(Pagination, ProductListQuery, ProductFilterQuery, KeywordQuery),
    responses((status = 200, description = "Keyword search with filters", body = ApiResponse<ProductList>)),
    tag = "Products"
)]
pub async fn search_by_keyword(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(query): Query<ProductListQuery>,
    Query(filter): Query<ProductFilterQuery>,
    Query(keyword): Query<KeywordQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp =
        product_service::search_by_keyword(&state, pagination, query, filter, keyword).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product/related",
    params(LimitQuery),
    responses((status = 200, description = "Random products", body = ApiResponse<RelatedProductList>)),
    tag = "Products"
)]
pub async fn list_related(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<RelatedProductList>>> {
    let resp = product_service::list_related(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product/filters",
    responses((status = 200, description = "Distinct brands, sizes and scents", body = ApiResponse<ProductFilters>)),
    tag = "Products"
)]
pub async fn list_filters(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ProductFilters>>> {
    let resp = product_service::list_filters(&state).await?;
    Ok(Json(resp))
}
