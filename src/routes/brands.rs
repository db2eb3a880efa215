use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{
        brands::{BrandList, BrandNameList, BrandRequest},
        products::ProductList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Brand,
    response::ApiResponse,
    routes::params::{BrandListQuery, NameQuery, Pagination, ProductListQuery},
    services::brand_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_brands).post(create_brand))
        .route("/name", get(list_brand_names))
        .route("/search", get(search_brands))
        .route(
            "/{id}",
            get(get_brand).put(update_brand).delete(delete_brand),
        )
        .route("/{id}/products", get(list_brand_products))
}

#[utoipa::path(
    post,
    path = "/api/brand",
    request_body = BrandRequest,
    responses(
        (status = 200, description = "Created brand", body = ApiResponse<Brand>),
        (status = 409, description = "Brand name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Brands"
)]
pub async fn create_brand(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<BrandRequest>,
) -> AppResult<Json<ApiResponse<Brand>>> {
    let resp = brand_service::create_brand(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/brand/{id}",
    params(("id" = Uuid, Path, description = "Brand ID")),
    request_body = BrandRequest,
    responses(
        (status = 200, description = "Updated brand", body = ApiResponse<Brand>),
        (status = 404, description = "Brand not found"),
        (status = 409, description = "Brand name already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Brands"
)]
pub async fn update_brand(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<BrandRequest>,
) -> AppResult<Json<ApiResponse<Brand>>> {
    let resp = brand_service::update_brand(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/brand/{id}",
    params(("id" = Uuid, Path, description = "Brand ID")),
    responses(
        (status = 200, description = "Brand", body = ApiResponse<Brand>),
        (status = 404, description = "Brand not found")
    ),
    tag = "Brands"
)]
pub async fn get_brand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Brand>>> {
    let resp = brand_service::get_brand(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/brand/name",
    responses((status = 200, description = "Brand names for dropdowns", body = ApiResponse<BrandNameList>)),
    tag = "Brands"
)]
pub async fn list_brand_names(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<BrandNameList>>> {
    let resp = brand_service::list_brand_names(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/brand/{id}",
    params(("id" = Uuid, Path, description = "Brand ID")),
    responses(
        (status = 200, description = "Brand deleted, its products keep existing without a brand"),
        (status = 404, description = "Brand not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Brands"
)]
pub async fn delete_brand(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = brand_service::delete_brand(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/brand",
    params(Pagination, BrandListQuery),
    responses((status = 200, description = "Brands", body = ApiResponse<BrandList>)),
    tag = "Brands"
)]
pub async fn list_brands(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(query): Query<BrandListQuery>,
) -> AppResult<Json<ApiResponse<BrandList>>> {
    let resp = brand_service::list_brands(&state, pagination, query, NameQuery::default()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/brand/search",
    params(Pagination, BrandListQuery, NameQuery),
    responses((status = 200, description = "Brands matching the name", body = ApiResponse<BrandList>)),
    tag = "Brands"
)]
pub async fn search_brands(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
    Query(query): Query<BrandListQuery>,
    Query(name): Query<NameQuery>,
) -> AppResult<Json<ApiResponse<BrandList>>> {
    let resp = brand_service::list_brands(&state, pagination, query, name).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/brand/{id}/products",
    params(("id" = Uuid, Path, description = "Brand ID"), Pagination, ProductListQuery),
    responses(
        (status = 200, description = "Products of the brand", body = ApiResponse<ProductList>),
        (status = 404, description = "Brand not found")
    ),
    tag = "Brands"
)]
pub async fn list_brand_products(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
    Query(query): Query<ProductListQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = brand_service::list_brand_products(&state, id, pagination, query).await?;
    Ok(Json(resp))
}
