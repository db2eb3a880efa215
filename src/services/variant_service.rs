use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::variants::{CreateVariantRequest, VariantFields, VariantList},
    entity::product_variants::{self, Column as VariantCol, Entity as ProductVariants},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::ProductVariant,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, VariantListQuery, VariantSortBy},
    services::product_service::{
        find_product, insert_variant, lock_product, recompute_price_range,
    },
    state::AppState,
};

async fn find_variant<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    lock: bool,
) -> AppResult<product_variants::Model> {
    let mut finder = ProductVariants::find_by_id(id);
    if lock {
        finder = finder.lock(LockType::Update);
    }
    match finder.one(conn).await? {
        Some(variant) => Ok(variant),
        None => Err(AppError::not_found("Product variant")),
    }
}

async fn ensure_unique<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    fields: &VariantFields,
    except: Option<Uuid>,
) -> AppResult<()> {
    let existing = ProductVariants::find()
        .filter(
            Condition::all()
                .add(VariantCol::ProductId.eq(product_id))
                .add(VariantCol::Name.eq(fields.name.trim()))
                .add(VariantCol::Size.eq(fields.size.trim()))
                .add(VariantCol::Scent.eq(fields.scent.trim())),
        )
        .one(conn)
        .await?;
    match existing {
        Some(other) if Some(other.id) != except => Err(AppError::Conflict(
            "A variant with the same name, size and scent already exists".into(),
        )),
        _ => Ok(()),
    }
}

pub async fn create_variant(
    state: &AppState,
    user: &AuthUser,
    payload: CreateVariantRequest,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;
    payload.variant.validate()?;

    let txn = state.orm.begin().await?;
    let product = lock_product(&txn, payload.product_id).await?;
    ensure_unique(&txn, product.id, &payload.variant, None).await?;
    let variant = insert_variant(&txn, product.id, payload.variant).await?;
    recompute_price_range(&txn, product.id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "variant_create",
        "product_variants",
        serde_json::json!({ "variant_id": variant.id, "product_id": variant.product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product variant created",
        ProductVariant::from(variant),
        Some(Meta::empty()),
    ))
}

pub async fn update_variant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: VariantFields,
) -> AppResult<ApiResponse<ProductVariant>> {
    ensure_admin(user)?;
    payload.validate()?;

    let txn = state.orm.begin().await?;
    let variant = find_variant(&txn, id, true).await?;
    let product_id = variant.product_id;
    ensure_unique(&txn, product_id, &payload, Some(variant.id)).await?;

    let mut active: product_variants::ActiveModel = variant.into();
    active.name = Set(payload.name.trim().to_string());
    active.size = Set(payload.size.trim().to_string());
    active.scent = Set(payload.scent.trim().to_string());
    active.stock = Set(payload.stock);
    active.price = Set(payload.price);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    recompute_price_range(&txn, product_id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "variant_update",
        "product_variants",
        serde_json::json!({ "variant_id": updated.id, "stock": updated.stock, "price": updated.price }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product variant updated",
        ProductVariant::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn get_variant(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductVariant>> {
    let variant = find_variant(&state.orm, id, false).await?;
    Ok(ApiResponse::success(
        "Product variant",
        ProductVariant::from(variant),
        Some(Meta::empty()),
    ))
}

pub async fn list_by_product(
    state: &AppState,
    product_id: Uuid,
    pagination: Pagination,
    query: VariantListQuery,
) -> AppResult<ApiResponse<VariantList>> {
    let product = find_product(&state.orm, product_id).await?;
    let (page, limit, offset) = pagination.normalize();

    let sort_col = match query.sort_by.unwrap_or_default() {
        VariantSortBy::CreatedAt => VariantCol::CreatedAt,
        VariantSortBy::Price => VariantCol::Price,
        VariantSortBy::Name => VariantCol::Name,
        VariantSortBy::Size => VariantCol::Size,
    };
    let finder = ProductVariants::find()
        .filter(VariantCol::ProductId.eq(product.id))
        .order_by(sort_col, query.sort_order.unwrap_or_default().order());

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ProductVariant::from)
        .collect();

    Ok(ApiResponse::success(
        "Product variants",
        VariantList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn delete_variant(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let variant = find_variant(&txn, id, false).await?;
    // Serializes deletes within one product so the last-variant guard holds.
    lock_product(&txn, variant.product_id).await?;
    let variant = find_variant(&txn, id, true).await?;
    let siblings = ProductVariants::find()
        .filter(VariantCol::ProductId.eq(variant.product_id))
        .count(&txn)
        .await?;
    if siblings <= 1 {
        return Err(AppError::BadRequest(
            "Cannot delete the last variant of a product".into(),
        ));
    }

    ProductVariants::delete_by_id(variant.id).exec(&txn).await?;
    recompute_price_range(&txn, variant.product_id).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "variant_delete",
        "product_variants",
        serde_json::json!({ "variant_id": id, "product_id": variant.product_id }),
    )
    .await;

    Ok(ApiResponse::deleted("Product variant deleted", id))
}
