use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::users::{
        AdminUpdateUserRequest, CreateUserRequest, UpdateMyInfoRequest, UpdatePasswordRequest,
        UserList,
    },
    entity::users::{self, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Role, User},
    response::{ApiResponse, Meta},
    routes::params::{NameQuery, Pagination, UserListQuery, UserSortBy, contains_pattern},
    services::auth_service::{
        NewUser, ensure_identity_available, hash_password, insert_user_with_cart,
        normalize_email, validate_new_password, verify_password,
    },
    state::AppState,
    validation::{require_email, require_len, require_min_len, require_phone},
};

pub async fn find_user<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<users::Model> {
    match Users::find_by_id(id).one(conn).await? {
        Some(user) => Ok(user),
        None => Err(AppError::not_found("User")),
    }
}

fn validate_profile(full_name: Option<&str>, phone_number: Option<&str>) -> AppResult<()> {
    if let Some(full_name) = full_name {
        require_len("full_name", full_name, 2, 50)?;
    }
    if let Some(phone_number) = phone_number {
        require_phone(phone_number.trim())?;
    }
    Ok(())
}

fn apply_profile(
    active: &mut users::ActiveModel,
    full_name: Option<String>,
    phone_number: Option<String>,
    image_url: Option<String>,
) {
    if let Some(full_name) = full_name {
        active.full_name = Set(Some(full_name.trim().to_string()));
    }
    if let Some(phone_number) = phone_number {
        active.phone_number = Set(Some(phone_number.trim().to_string()));
    }
    if let Some(image_url) = image_url {
        active.image_url = Set(Some(image_url));
    }
    active.updated_at = Set(Utc::now().into());
}

pub async fn get_my_info(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let model = find_user(&state.orm, user.user_id).await?;
    Ok(ApiResponse::success("My info", User::from(model), Some(Meta::empty())))
}

pub async fn update_my_info(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateMyInfoRequest,
) -> AppResult<ApiResponse<User>> {
    validate_profile(payload.full_name.as_deref(), payload.phone_number.as_deref())?;

    let model = find_user(&state.orm, user.user_id).await?;
    let mut active: users::ActiveModel = model.into();
    apply_profile(
        &mut active,
        payload.full_name,
        payload.phone_number,
        payload.image_url,
    );
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_update_profile",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success("Profile updated", User::from(updated), Some(Meta::empty())))
}

pub async fn update_password(
    state: &AppState,
    user: &AuthUser,
    payload: UpdatePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let model = find_user(&state.orm, user.user_id).await?;
    if !verify_password(&payload.current_password, &model.password_hash)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }
    validate_new_password(&payload.new_password, &payload.confirm_password)?;

    let mut active: users::ActiveModel = model.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_update_password",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password updated",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn create_user(
    state: &AppState,
    user: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;

    let username = payload.username.trim().to_string();
    let email = normalize_email(&payload.email);
    require_min_len("username", &username, 8)?;
    require_email(&email)?;
    require_min_len("password", &payload.password, 8)?;
    validate_profile(payload.full_name.as_deref(), payload.phone_number.as_deref())?;

    let txn = state.orm.begin().await?;
    ensure_identity_available(&txn, Some(&username), Some(&email)).await?;
    let created = insert_user_with_cart(
        &txn,
        NewUser {
            username,
            email,
            password_hash: hash_password(&payload.password)?,
            full_name: payload.full_name.map(|s| s.trim().to_string()),
            phone_number: payload.phone_number.map(|s| s.trim().to_string()),
            role: payload.role.unwrap_or(Role::User),
        },
    )
    .await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_create",
        "users",
        serde_json::json!({ "user_id": created.id, "role": created.role }),
    )
    .await;

    Ok(ApiResponse::success("User created", User::from(created), Some(Meta::empty())))
}

pub async fn get_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let model = find_user(&state.orm, id).await?;
    Ok(ApiResponse::success("User", User::from(model), Some(Meta::empty())))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AdminUpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    validate_profile(payload.full_name.as_deref(), payload.phone_number.as_deref())?;

    let model = find_user(&state.orm, id).await?;
    let mut active: users::ActiveModel = model.into();
    apply_profile(
        &mut active,
        payload.full_name,
        payload.phone_number,
        payload.image_url,
    );
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_update",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::success("User updated", User::from(updated), Some(Meta::empty())))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Users::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("User"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "user_delete",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::deleted("User deleted", id))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    query: UserListQuery,
    name: NameQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let mut finder = Users::find();
    if let Some(pattern) = name.name.as_deref().and_then(contains_pattern) {
        finder = finder.filter(Expr::col(UserCol::FullName).ilike(pattern));
    }

    let sort_col = match query.sort_by.unwrap_or_default() {
        UserSortBy::CreatedAt => UserCol::CreatedAt,
        UserSortBy::FullName => UserCol::FullName,
        UserSortBy::Email => UserCol::Email,
        UserSortBy::Username => UserCol::Username,
    };
    finder = finder.order_by(sort_col, query.sort_order.unwrap_or_default().order());

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}
