use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        brands::{BrandList, BrandNameList, BrandRequest},
        products::ProductList,
    },
    entity::{
        brands::{self, Column as BrandCol, Entity as Brands},
        products::Column as ProdCol,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Brand, BrandName},
    response::{ApiResponse, Meta},
    routes::params::{
        BrandListQuery, BrandSortBy, NameQuery, Pagination, ProductListQuery, contains_pattern,
    },
    services::product_service::page_summaries,
    state::AppState,
    validation::require_non_blank,
};

async fn find_brand(state: &AppState, id: Uuid) -> AppResult<brands::Model> {
    match Brands::find_by_id(id).one(&state.orm).await? {
        Some(brand) => Ok(brand),
        None => Err(AppError::not_found("Brand")),
    }
}

/// Case-insensitive name lookup, used for uniqueness and for resolving a product's brand.
pub async fn find_brand_by_name<C: sea_orm::ConnectionTrait>(
    conn: &C,
    name: &str,
) -> AppResult<Option<brands::Model>> {
    let brand = Brands::find()
        .filter(Expr::expr(Func::lower(Expr::col(BrandCol::Name))).eq(name.trim().to_lowercase()))
        .one(conn)
        .await?;
    Ok(brand)
}

pub async fn create_brand(
    state: &AppState,
    user: &AuthUser,
    payload: BrandRequest,
) -> AppResult<ApiResponse<Brand>> {
    ensure_admin(user)?;
    require_non_blank("name", &payload.name)?;

    if find_brand_by_name(&state.orm, &payload.name).await?.is_some() {
        return Err(AppError::Conflict("Brand name already exists".into()));
    }

    let brand = brands::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "brand_create",
        "brands",
        serde_json::json!({ "brand_id": brand.id, "name": brand.name }),
    )
    .await;

    Ok(ApiResponse::success("Brand created", Brand::from(brand), Some(Meta::empty())))
}

pub async fn update_brand(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: BrandRequest,
) -> AppResult<ApiResponse<Brand>> {
    ensure_admin(user)?;
    require_non_blank("name", &payload.name)?;

    let brand = find_brand(state, id).await?;
    if let Some(other) = find_brand_by_name(&state.orm, &payload.name).await? {
        if other.id != brand.id {
            return Err(AppError::Conflict("Brand name already exists".into()));
        }
    }

    let mut active: brands::ActiveModel = brand.into();
    active.name = Set(payload.name.trim().to_string());
    active.description = Set(payload.description);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "brand_update",
        "brands",
        serde_json::json!({ "brand_id": updated.id }),
    )
    .await;

    Ok(ApiResponse::success("Brand updated", Brand::from(updated), Some(Meta::empty())))
}

pub async fn get_brand(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Brand>> {
    let brand = find_brand(state, id).await?;
    Ok(ApiResponse::success("Brand", Brand::from(brand), Some(Meta::empty())))
}

pub async fn list_brand_names(state: &AppState) -> AppResult<ApiResponse<BrandNameList>> {
    let items = Brands::find()
        .order_by_asc(BrandCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|brand| BrandName {
            id: brand.id,
            name: brand.name,
        })
        .collect();

    Ok(ApiResponse::success("Brand names", BrandNameList { items }, Some(Meta::empty())))
}

pub async fn delete_brand(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Brands::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Brand"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "brand_delete",
        "brands",
        serde_json::json!({ "brand_id": id }),
    )
    .await;

    Ok(ApiResponse::deleted("Brand deleted", id))
}

pub async fn list_brands(
    state: &AppState,
    pagination: Pagination,
    query: BrandListQuery,
    name: NameQuery,
) -> AppResult<ApiResponse<BrandList>> {
    let (page, limit, offset) = pagination.normalize();

    let mut finder = Brands::find();
    if let Some(pattern) = name.name.as_deref().and_then(contains_pattern) {
        finder = finder.filter(Expr::col(BrandCol::Name).ilike(pattern));
    }
    let sort_col = match query.sort_by.unwrap_or_default() {
        BrandSortBy::CreatedAt => BrandCol::CreatedAt,
        BrandSortBy::Name => BrandCol::Name,
    };
    finder = finder.order_by(sort_col, query.sort_order.unwrap_or_default().order());

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Brand::from)
        .collect();

    Ok(ApiResponse::success(
        "Brands",
        BrandList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_brand_products(
    state: &AppState,
    id: Uuid,
    pagination: Pagination,
    query: ProductListQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let brand = find_brand(state, id).await?;
    let condition = Condition::all().add(ProdCol::BrandId.eq(brand.id));
    let (items, meta) = page_summaries(state, condition, pagination, query).await?;
    Ok(ApiResponse::success("Brand products", ProductList { items }, Some(meta)))
}
