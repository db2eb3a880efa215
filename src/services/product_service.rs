use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Func, LockType, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        products::{
            CreateProductRequest, ImageUrlsRequest, ProductFilters, ProductImageList, ProductList,
            RelatedProductList, UpdateProductRequest,
        },
        variants::VariantFields,
    },
    entity::{
        brands::{Column as BrandCol, Entity as Brands},
        product_images::{self, Column as ImageCol, Entity as ProductImages},
        product_variants::{self, Column as VariantCol, Entity as ProductVariants},
        products::{self, Column as ProdCol, Entity as Products},
        reviews::{Column as ReviewCol, Entity as Reviews},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{ProductDetail, ProductImage, ProductSummary, ProductVariant, RelatedProduct},
    response::{ApiResponse, Meta},
    routes::params::{
        KeywordQuery, LimitQuery, Pagination, ProductFilterQuery, ProductListQuery,
        ProductSortBy, contains_pattern,
    },
    services::{
        brand_service::find_brand_by_name,
        review_service::{review_statistic, reviews_with_authors},
    },
    state::AppState,
    validation::require_non_blank,
};

const LATEST_REVIEWS: u64 = 5;
const DETAIL_RELATED: i64 = 4;

/// Lowest and highest price of a set of variants.
pub fn price_range(prices: impl IntoIterator<Item = i64>) -> (Option<i64>, Option<i64>) {
    prices.into_iter().fold((None, None), |(min, max), price| {
        (
            Some(min.map_or(price, |m: i64| m.min(price))),
            Some(max.map_or(price, |m: i64| m.max(price))),
        )
    })
}

pub async fn find_product<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<products::Model> {
    match Products::find_by_id(id).one(conn).await? {
        Some(product) => Ok(product),
        None => Err(AppError::not_found("Product")),
    }
}

/// Like [`find_product`], holding the row lock until the transaction ends.
pub async fn lock_product<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<products::Model> {
    match Products::find_by_id(id).lock(LockType::Update).one(conn).await? {
        Some(product) => Ok(product),
        None => Err(AppError::not_found("Product")),
    }
}

/// Rewrites the product's cached `min_price`/`max_price` from its current variants.
pub async fn recompute_price_range<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<()> {
    let product = find_product(conn, product_id).await?;
    let prices = ProductVariants::find()
        .filter(VariantCol::ProductId.eq(product_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|variant| variant.price);
    let (min, max) = price_range(prices);

    let mut active: products::ActiveModel = product.into();
    active.min_price = Set(min);
    active.max_price = Set(max);
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await?;
    Ok(())
}

async fn ensure_name_free<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    except: Option<Uuid>,
) -> AppResult<()> {
    let existing = Products::find()
        .filter(Expr::expr(Func::lower(Expr::col(ProdCol::Name))).eq(name.trim().to_lowercase()))
        .one(conn)
        .await?;
    match existing {
        Some(other) if Some(other.id) != except => {
            Err(AppError::Conflict("Product name already exists".into()))
        }
        _ => Ok(()),
    }
}

async fn insert_images<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    urls: Vec<String>,
) -> AppResult<Vec<product_images::Model>> {
    let mut images = Vec::with_capacity(urls.len());
    for url in urls.into_iter().filter(|u| !u.trim().is_empty()) {
        let image = product_images::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            image: Set(url.trim().to_string()),
            created_at: NotSet,
        }
        .insert(conn)
        .await?;
        images.push(image);
    }
    Ok(images)
}

pub async fn insert_variant<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    fields: VariantFields,
) -> AppResult<product_variants::Model> {
    let variant = product_variants::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        name: Set(fields.name.trim().to_string()),
        size: Set(fields.size.trim().to_string()),
        scent: Set(fields.scent.trim().to_string()),
        stock: Set(fields.stock),
        price: Set(fields.price),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(variant)
}

async fn to_summaries(
    state: &AppState,
    models: Vec<products::Model>,
) -> AppResult<Vec<ProductSummary>> {
    let brand_ids: Vec<Uuid> = models.iter().filter_map(|p| p.brand_id).collect();
    let brand_names: HashMap<Uuid, String> = if brand_ids.is_empty() {
        HashMap::new()
    } else {
        Brands::find()
            .filter(BrandCol::Id.is_in(brand_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|brand| (brand.id, brand.name))
            .collect()
    };

    Ok(models
        .into_iter()
        .map(|p| ProductSummary {
            brand_name: p.brand_id.and_then(|id| brand_names.get(&id).cloned()),
            id: p.id,
            name: p.name,
            thumbnail_image: p.thumbnail_image,
            min_price: p.min_price,
            max_price: p.max_price,
            is_active: p.is_active,
            created_at: p.created_at.with_timezone(&Utc),
        })
        .collect())
}

/// One page of product summaries matching `condition`.
pub async fn page_summaries(
    state: &AppState,
    condition: Condition,
    pagination: Pagination,
    query: ProductListQuery,
) -> AppResult<(Vec<ProductSummary>, Meta)> {
    let (page, limit, offset) = pagination.normalize();

    let sort_col = match query.sort_by.unwrap_or_default() {
        ProductSortBy::CreatedAt => ProdCol::CreatedAt,
        ProductSortBy::Name => ProdCol::Name,
        ProductSortBy::MinPrice => ProdCol::MinPrice,
        ProductSortBy::MaxPrice => ProdCol::MaxPrice,
    };
    let finder = Products::find()
        .filter(condition)
        .order_by(sort_col, query.sort_order.unwrap_or_default().order())
        .order_by_asc(ProdCol::Id);

    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = to_summaries(state, models).await?;
    Ok((items, Meta::new(page, limit, total)))
}

fn lower_eq(col: impl sea_orm::sea_query::IntoColumnRef, value: &str) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).eq(value.trim().to_lowercase())
}

/// Builds the structured product filter shared by `/search` and `/search-es`.
pub fn filter_condition(filter: &ProductFilterQuery) -> Condition {
    let mut condition = Condition::all();

    if let Some(pattern) = filter.name.as_deref().and_then(contains_pattern) {
        condition = condition.add(Expr::col(ProdCol::Name).ilike(pattern));
    }
    if let Some(min_price) = filter.min_price {
        condition = condition.add(ProdCol::MaxPrice.gte(min_price));
    }
    if let Some(max_price) = filter.max_price {
        condition = condition.add(ProdCol::MinPrice.lte(max_price));
    }
    if let Some(brand_name) = filter.brand_name.as_deref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(
            ProdCol::BrandId.in_subquery(
                Query::select()
                    .column(BrandCol::Id)
                    .from(Brands)
                    .and_where(lower_eq(BrandCol::Name, brand_name))
                    .to_owned(),
            ),
        );
    }
    if let Some(is_active) = filter.is_active {
        condition = condition.add(ProdCol::IsActive.eq(is_active));
    }
    if let Some(size) = filter.size.as_deref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(
            ProdCol::Id.in_subquery(
                Query::select()
                    .column(VariantCol::ProductId)
                    .from(ProductVariants)
                    .and_where(lower_eq(VariantCol::Size, size))
                    .to_owned(),
            ),
        );
    }
    if let Some(scent) = filter.scent.as_deref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(
            ProdCol::Id.in_subquery(
                Query::select()
                    .column(VariantCol::ProductId)
                    .from(ProductVariants)
                    .and_where(lower_eq(VariantCol::Scent, scent))
                    .to_owned(),
            ),
        );
    }

    condition
}

/// Keyword match over the descriptive text, the brand name and the variant names and scents.
pub fn keyword_condition(keyword: &str) -> Option<Condition> {
    let pattern = contains_pattern(keyword)?;
    Some(
        Condition::any()
            .add(Expr::col(ProdCol::Name).ilike(pattern.clone()))
            .add(Expr::col(ProdCol::Description).ilike(pattern.clone()))
            .add(Expr::col(ProdCol::ProductMaterial).ilike(pattern.clone()))
            .add(Expr::col(ProdCol::Inspiration).ilike(pattern.clone()))
            .add(Expr::col(ProdCol::UsageInstructions).ilike(pattern.clone()))
            .add(
                ProdCol::BrandId.in_subquery(
                    Query::select()
                        .column(BrandCol::Id)
                        .from(Brands)
                        .and_where(Expr::col(BrandCol::Name).ilike(pattern.clone()))
                        .to_owned(),
                ),
            )
            .add(
                ProdCol::Id.in_subquery(
                    Query::select()
                        .column(VariantCol::ProductId)
                        .from(ProductVariants)
                        .cond_where(
                            Condition::any()
                                .add(Expr::col(VariantCol::Name).ilike(pattern.clone()))
                                .add(Expr::col(VariantCol::Scent).ilike(pattern)),
                        )
                        .to_owned(),
                ),
            ),
    )
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_admin(user)?;
    require_non_blank("name", &payload.name)?;
    payload.product_variant.validate()?;

    let txn = state.orm.begin().await?;
    ensure_name_free(&txn, &payload.name, None).await?;
    let brand = match find_brand_by_name(&txn, &payload.brand).await? {
        Some(brand) => brand,
        None => return Err(AppError::not_found("Brand")),
    };

    let price = payload.product_variant.price;
    let product = products::ActiveModel {
        id: Set(Uuid::new_v4()),
        brand_id: Set(Some(brand.id)),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        product_material: Set(payload.product_material),
        inspiration: Set(payload.inspiration),
        usage_instructions: Set(payload.usage_instructions),
        thumbnail_image: Set(payload.thumbnail_image),
        min_price: Set(Some(price)),
        max_price: Set(Some(price)),
        is_active: Set(payload.is_active.unwrap_or(true)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    insert_variant(&txn, product.id, payload.product_variant).await?;
    insert_images(&txn, product.id, payload.image_urls.unwrap_or_default()).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id, "name": product.name }),
    )
    .await;

    let detail = product_detail(state, product.id).await?;
    Ok(ApiResponse::success("Product created", detail, Some(Meta::empty())))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    ensure_admin(user)?;
    require_non_blank("name", &payload.name)?;

    let txn = state.orm.begin().await?;
    let product = find_product(&txn, id).await?;
    ensure_name_free(&txn, &payload.name, Some(product.id)).await?;
    let brand = match find_brand_by_name(&txn, &payload.brand).await? {
        Some(brand) => brand,
        None => return Err(AppError::not_found("Brand")),
    };

    let is_active = payload.is_active.unwrap_or(product.is_active);
    let mut active: products::ActiveModel = product.into();
    active.brand_id = Set(Some(brand.id));
    active.name = Set(payload.name.trim().to_string());
    active.description = Set(payload.description);
    active.product_material = Set(payload.product_material);
    active.inspiration = Set(payload.inspiration);
    active.usage_instructions = Set(payload.usage_instructions);
    active.thumbnail_image = Set(payload.thumbnail_image);
    active.is_active = Set(is_active);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    insert_images(&txn, id, payload.image_urls.unwrap_or_default()).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    let detail = product_detail(state, id).await?;
    Ok(ApiResponse::success("Product updated", detail, Some(Meta::empty())))
}

async fn related_products(
    state: &AppState,
    exclude: Option<Uuid>,
    limit: i64,
) -> AppResult<Vec<RelatedProduct>> {
    let items = sqlx::query_as::<_, RelatedProduct>(
        r#"
        SELECT id, name, thumbnail_image, min_price
        FROM products
        WHERE is_active = TRUE AND ($1::uuid IS NULL OR id <> $1)
        ORDER BY random()
        LIMIT $2
        "#,
    )
    .bind(exclude)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;
    Ok(items)
}

async fn product_detail(state: &AppState, id: Uuid) -> AppResult<ProductDetail> {
    let product = find_product(&state.orm, id).await?;

    let brand_name = match product.brand_id {
        Some(brand_id) => Brands::find_by_id(brand_id)
            .one(&state.orm)
            .await?
            .map(|brand| brand.name),
        None => None,
    };

    let variants: Vec<ProductVariant> = ProductVariants::find()
        .filter(VariantCol::ProductId.eq(id))
        .order_by_asc(VariantCol::Price)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ProductVariant::from)
        .collect();
    let (min_price, max_price) = price_range(variants.iter().map(|v| v.price));

    let images = ProductImages::find()
        .filter(ImageCol::ProductId.eq(id))
        .order_by_asc(ImageCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ProductImage::from)
        .collect();

    let latest = Reviews::find()
        .filter(ReviewCol::ProductId.eq(id))
        .order_by_desc(ReviewCol::CreatedAt)
        .limit(LATEST_REVIEWS)
        .all(&state.orm)
        .await?;
    let five_latest_reviews = reviews_with_authors(&state.orm, latest).await?;
    let review_statistic = review_statistic(&state.pool, id).await?;
    let related = related_products(state, Some(id), DETAIL_RELATED).await?;

    Ok(ProductDetail {
        id: product.id,
        name: product.name,
        description: product.description,
        product_material: product.product_material,
        inspiration: product.inspiration,
        usage_instructions: product.usage_instructions,
        thumbnail_image: product.thumbnail_image,
        is_active: product.is_active,
        brand_id: product.brand_id,
        brand_name,
        min_price,
        max_price,
        product_variants: variants,
        product_images: images,
        five_latest_reviews,
        review_statistic,
        related_products: related,
        created_at: product.created_at.with_timezone(&Utc),
        updated_at: product.updated_at.with_timezone(&Utc),
    })
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let detail = product_detail(state, id).await?;
    Ok(ApiResponse::success("Product", detail, Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Product"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::deleted("Product deleted", id))
}

pub async fn delete_image(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    image_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let image = match ProductImages::find_by_id(image_id).one(&state.orm).await? {
        Some(image) => image,
        None => return Err(AppError::not_found("Image")),
    };
    if image.product_id != product_id {
        return Err(AppError::BadRequest(
            "Image does not belong to this product".into(),
        ));
    }
    ProductImages::delete_by_id(image.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_image_delete",
        "product_images",
        serde_json::json!({ "product_id": product_id, "image_id": image_id }),
    )
    .await;

    Ok(ApiResponse::deleted("Image deleted", image_id))
}

pub async fn add_images(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: ImageUrlsRequest,
) -> AppResult<ApiResponse<ProductImageList>> {
    ensure_admin(user)?;
    if payload.image_urls.iter().all(|url| url.trim().is_empty()) {
        return Err(AppError::BadRequest("image_urls must not be empty".into()));
    }

    let product = find_product(&state.orm, product_id).await?;
    let added = insert_images(&state.orm, product.id, payload.image_urls).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_image_add",
        "product_images",
        serde_json::json!({ "product_id": product.id, "count": added.len() }),
    )
    .await;

    let items = added.into_iter().map(ProductImage::from).collect();
    Ok(ApiResponse::success("Images added", ProductImageList { items }, Some(Meta::empty())))
}

pub async fn list_products(
    state: &AppState,
    pagination: Pagination,
    query: ProductListQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (items, meta) = page_summaries(state, Condition::all(), pagination, query).await?;
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn search_products(
    state: &AppState,
    pagination: Pagination,
    query: ProductListQuery,
    filter: ProductFilterQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let condition = filter_condition(&filter);
    let (items, meta) = page_summaries(state, condition, pagination, query).await?;
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn search_by_keyword(
    state: &AppState,
    pagination: Pagination,
    query: ProductListQuery,
    filter: ProductFilterQuery,
    keyword: KeywordQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let mut condition = filter_condition(&filter);
    if let Some(matches) = keyword.keyword.as_deref().and_then(keyword_condition) {
        condition = condition.add(matches);
    }
    let (items, meta) = page_summaries(state, condition, pagination, query).await?;
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn list_related(
    state: &AppState,
    query: LimitQuery,
) -> AppResult<ApiResponse<RelatedProductList>> {
    let items = related_products(state, None, query.clamp(DETAIL_RELATED, 20)).await?;
    Ok(ApiResponse::success(
        "Related products",
        RelatedProductList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_filters(state: &AppState) -> AppResult<ApiResponse<ProductFilters>> {
    let brands: Vec<(String,)> = sqlx::query_as("SELECT DISTINCT name FROM brands ORDER BY name")
        .fetch_all(&state.pool)
        .await?;
    let sizes: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT size FROM product_variants ORDER BY size")
            .fetch_all(&state.pool)
            .await?;
    let scents: Vec<(String,)> =
        sqlx::query_as("SELECT DISTINCT scent FROM product_variants ORDER BY scent")
            .fetch_all(&state.pool)
            .await?;

    let filters = ProductFilters {
        brands: brands.into_iter().map(|(v,)| v).collect(),
        sizes: sizes.into_iter().map(|(v,)| v).collect(),
        scents: scents.into_iter().map(|(v,)| v).collect(),
    };
    Ok(ApiResponse::success("Product filters", filters, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn price_range_of_variants() {
        assert_eq!(price_range(Vec::<i64>::new()), (None, None));
        assert_eq!(price_range([4500]), (Some(4500), Some(4500)));
        assert_eq!(price_range([4500, 1200, 9900]), (Some(1200), Some(9900)));
    }

    #[test]
    fn price_filters_match_overlapping_ranges() {
        let filter = ProductFilterQuery {
            min_price: Some(1000),
            max_price: Some(5000),
            ..Default::default()
        };
        let sql = Products::find()
            .filter(filter_condition(&filter))
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains(r#""products"."max_price" >= 1000"#));
        assert!(sql.contains(r#""products"."min_price" <= 5000"#));
    }

    #[test]
    fn blank_keyword_adds_no_condition() {
        assert!(keyword_condition("   ").is_none());
        let sql = Products::find()
            .filter(keyword_condition("oud").unwrap())
            .build(DbBackend::Postgres)
            .to_string();
        assert!(sql.contains("ILIKE '%oud%'"));
        assert!(sql.contains("product_variants"));
    }
}
