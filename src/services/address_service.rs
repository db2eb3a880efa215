use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::addresses::{AddressList, AddressRequest, AdminCreateAddressRequest},
    entity::addresses::{self, Column as AddressCol, Entity as Addresses},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Address,
    response::{ApiResponse, Meta},
    services::user_service::find_user,
    state::AppState,
};

/// Looks up an address, optionally scoped to its owner. Other owners see a 404.
async fn find_address(
    state: &AppState,
    id: Uuid,
    owner: Option<Uuid>,
) -> AppResult<addresses::Model> {
    let mut condition = Condition::all().add(AddressCol::Id.eq(id));
    if let Some(owner) = owner {
        condition = condition.add(AddressCol::UserId.eq(owner));
    }
    match Addresses::find().filter(condition).one(&state.orm).await? {
        Some(address) => Ok(address),
        None => Err(AppError::not_found("Address")),
    }
}

async fn insert_address(
    state: &AppState,
    actor: &AuthUser,
    user_id: Uuid,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    payload.validate()?;

    let address = addresses::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        house_number: Set(payload.house_number.trim().to_string()),
        street_name: Set(payload.street_name.trim().to_string()),
        city: Set(payload.city.trim().to_string()),
        state: Set(payload.state.trim().to_string()),
        country: Set(payload.country.trim().to_string()),
        postal_code: Set(payload.postal_code.trim().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(actor.user_id),
        "address_create",
        "addresses",
        serde_json::json!({ "address_id": address.id, "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::success("Address created", Address::from(address), Some(Meta::empty())))
}

async fn apply_update(
    state: &AppState,
    actor: &AuthUser,
    model: addresses::Model,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    payload.validate()?;

    let mut active: addresses::ActiveModel = model.into();
    active.house_number = Set(payload.house_number.trim().to_string());
    active.street_name = Set(payload.street_name.trim().to_string());
    active.city = Set(payload.city.trim().to_string());
    active.state = Set(payload.state.trim().to_string());
    active.country = Set(payload.country.trim().to_string());
    active.postal_code = Set(payload.postal_code.trim().to_string());
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(actor.user_id),
        "address_update",
        "addresses",
        serde_json::json!({ "address_id": updated.id }),
    )
    .await;

    Ok(ApiResponse::success("Address updated", Address::from(updated), Some(Meta::empty())))
}

async fn remove(
    state: &AppState,
    actor: &AuthUser,
    model: addresses::Model,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let id = model.id;
    Addresses::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(actor.user_id),
        "address_delete",
        "addresses",
        serde_json::json!({ "address_id": id }),
    )
    .await;

    Ok(ApiResponse::deleted("Address deleted", id))
}

pub async fn create_my_address(
    state: &AppState,
    user: &AuthUser,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    insert_address(state, user, user.user_id, payload).await
}

pub async fn list_my_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let items = Addresses::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .order_by_desc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Address::from)
        .collect();

    Ok(ApiResponse::success("My addresses", AddressList { items }, Some(Meta::empty())))
}

pub async fn update_my_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let model = find_address(state, id, Some(user.user_id)).await?;
    apply_update(state, user, model, payload).await
}

pub async fn delete_my_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let model = find_address(state, id, Some(user.user_id)).await?;
    remove(state, user, model).await
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: AdminCreateAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    ensure_admin(user)?;
    let owner = find_user(&state.orm, payload.user_id).await?;
    insert_address(state, user, owner.id, payload.address).await
}

pub async fn get_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Address>> {
    ensure_admin(user)?;
    let model = find_address(state, id, None).await?;
    Ok(ApiResponse::success("Address", Address::from(model), Some(Meta::empty())))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AddressRequest,
) -> AppResult<ApiResponse<Address>> {
    ensure_admin(user)?;
    let model = find_address(state, id, None).await?;
    apply_update(state, user, model, payload).await
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let model = find_address(state, id, None).await?;
    remove(state, user, model).await
}
