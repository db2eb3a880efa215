use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::reviews::{AdminCreateReviewRequest, CreateReviewRequest, ReviewList, UpdateReviewRequest},
    entity::{
        product_variants::Entity as ProductVariants,
        reviews::{self, Column as ReviewCol, Entity as Reviews},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Review, ReviewStatistic},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ReviewFilterQuery, ReviewSortBy, contains_pattern},
    services::{product_service::find_product, user_service::find_user},
    state::AppState,
    validation::{require_non_blank, require_rating},
};

/// Attaches each author's display name.
pub async fn reviews_with_authors<C: ConnectionTrait>(
    conn: &C,
    models: Vec<reviews::Model>,
) -> AppResult<Vec<Review>> {
    let user_ids: Vec<Uuid> = models.iter().map(|r| r.user_id).collect();
    let names: HashMap<Uuid, String> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        Users::find()
            .filter(UserCol::Id.is_in(user_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|user| (user.id, user.display_name()))
            .collect()
    };

    Ok(models
        .into_iter()
        .map(|r| Review {
            user_name: names.get(&r.user_id).cloned().unwrap_or_default(),
            id: r.id,
            product_id: r.product_id,
            product_variant_id: r.product_variant_id,
            user_id: r.user_id,
            rating: r.rating,
            content: r.content,
            created_at: r.created_at.with_timezone(&Utc),
        })
        .collect())
}

pub async fn review_statistic(pool: &DbPool, product_id: Uuid) -> AppResult<ReviewStatistic> {
    let rows: Vec<(i32, i64)> = sqlx::query_as(
        "SELECT rating, COUNT(*) FROM reviews WHERE product_id = $1 GROUP BY rating",
    )
    .bind(product_id)
    .fetch_all(pool)
    .await?;

    let mut counts = [0_i64; 5];
    for (rating, count) in rows {
        if (1..=5).contains(&rating) {
            counts[(rating - 1) as usize] = count;
        }
    }
    Ok(ReviewStatistic::from_star_counts(counts))
}

async fn find_review(state: &AppState, id: Uuid, owner: Option<Uuid>) -> AppResult<reviews::Model> {
    let mut condition = Condition::all().add(ReviewCol::Id.eq(id));
    if let Some(owner) = owner {
        condition = condition.add(ReviewCol::UserId.eq(owner));
    }
    match Reviews::find().filter(condition).one(&state.orm).await? {
        Some(review) => Ok(review),
        None => Err(AppError::not_found("Review")),
    }
}

async fn one_review(state: &AppState, model: reviews::Model) -> AppResult<Review> {
    reviews_with_authors(&state.orm, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Review"))
}

async fn insert_review(
    state: &AppState,
    actor: &AuthUser,
    author_id: Uuid,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    require_rating(payload.rating)?;
    require_non_blank("content", &payload.content)?;

    let product = find_product(&state.orm, payload.product_id).await?;
    let variant = match ProductVariants::find_by_id(payload.product_variant_id)
        .one(&state.orm)
        .await?
    {
        Some(variant) => variant,
        None => return Err(AppError::not_found("Product variant")),
    };
    if variant.product_id != product.id {
        return Err(AppError::BadRequest(
            "Product variant does not belong to this product".into(),
        ));
    }

    let review = reviews::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(author_id),
        product_id: Set(product.id),
        product_variant_id: Set(variant.id),
        rating: Set(payload.rating),
        content: Set(payload.content.trim().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(actor.user_id),
        "review_create",
        "reviews",
        serde_json::json!({ "review_id": review.id, "product_id": review.product_id }),
    )
    .await;

    let review = one_review(state, review).await?;
    Ok(ApiResponse::success("Review created", review, Some(Meta::empty())))
}

async fn apply_update(
    state: &AppState,
    actor: &AuthUser,
    model: reviews::Model,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    require_rating(payload.rating)?;
    require_non_blank("content", &payload.content)?;

    let mut active: reviews::ActiveModel = model.into();
    active.rating = Set(payload.rating);
    active.content = Set(payload.content.trim().to_string());
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(actor.user_id),
        "review_update",
        "reviews",
        serde_json::json!({ "review_id": updated.id }),
    )
    .await;

    let review = one_review(state, updated).await?;
    Ok(ApiResponse::success("Review updated", review, Some(Meta::empty())))
}

async fn remove(
    state: &AppState,
    actor: &AuthUser,
    model: reviews::Model,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let id = model.id;
    Reviews::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(actor.user_id),
        "review_delete",
        "reviews",
        serde_json::json!({ "review_id": id }),
    )
    .await;

    Ok(ApiResponse::deleted("Review deleted", id))
}

pub async fn create_my_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    insert_review(state, user, user.user_id, payload).await
}

pub async fn update_my_review(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    let model = find_review(state, payload.review_id, Some(user.user_id)).await?;
    apply_update(state, user, model, payload).await
}

pub async fn delete_my_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let model = find_review(state, id, Some(user.user_id)).await?;
    remove(state, user, model).await
}

pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: AdminCreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_admin(user)?;
    let author = find_user(&state.orm, payload.user_id).await?;
    insert_review(state, user, author.id, payload.review).await
}

pub async fn update_review(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_admin(user)?;
    let model = find_review(state, payload.review_id, None).await?;
    apply_update(state, user, model, payload).await
}

pub async fn delete_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let model = find_review(state, id, None).await?;
    remove(state, user, model).await
}

pub async fn get_review(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Review>> {
    let model = find_review(state, id, None).await?;
    let review = one_review(state, model).await?;
    Ok(ApiResponse::success("Review", review, Some(Meta::empty())))
}

pub fn filter_condition(filter: &ReviewFilterQuery) -> Condition {
    let mut condition = Condition::all();
    if let Some(pattern) = filter.content.as_deref().and_then(contains_pattern) {
        condition = condition.add(Expr::col(ReviewCol::Content).ilike(pattern));
    }
    if let Some(rating) = filter.rating {
        condition = condition.add(ReviewCol::Rating.eq(rating));
    }
    if let Some(product_id) = filter.product_id {
        condition = condition.add(ReviewCol::ProductId.eq(product_id));
    }
    if let Some(variant_id) = filter.product_variant_id {
        condition = condition.add(ReviewCol::ProductVariantId.eq(variant_id));
    }
    if let Some(pattern) = filter.username.as_deref().and_then(contains_pattern) {
        condition = condition.add(
            ReviewCol::UserId.in_subquery(
                Query::select()
                    .column(UserCol::Id)
                    .from(Users)
                    .and_where(Expr::col(UserCol::Username).ilike(pattern))
                    .to_owned(),
            ),
        );
    }
    condition
}

pub async fn filter_reviews(
    state: &AppState,
    pagination: Pagination,
    filter: ReviewFilterQuery,
) -> AppResult<ApiResponse<ReviewList>> {
    let (page, limit, offset) = pagination.normalize();

    let sort_col = match filter.sort_by.unwrap_or_default() {
        ReviewSortBy::CreatedAt => ReviewCol::CreatedAt,
        ReviewSortBy::Rating => ReviewCol::Rating,
    };
    let finder = Reviews::find()
        .filter(filter_condition(&filter))
        .order_by(sort_col, filter.sort_order.unwrap_or_default().order());

    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = reviews_with_authors(&state.orm, models).await?;

    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn list_all_reviews(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    filter: ReviewFilterQuery,
) -> AppResult<ApiResponse<ReviewList>> {
    ensure_admin(user)?;
    filter_reviews(state, pagination, filter).await
}
