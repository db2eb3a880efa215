use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    entity::{
        cart_items::{self, Column as CartItemCol, Entity as CartItems},
        carts::{self, Column as CartCol, Entity as Carts},
        product_variants::Entity as ProductVariants,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Cart, CartItem},
    response::{ApiResponse, Meta},
    services::user_service::find_user,
    state::AppState,
    validation::require_positive_quantity,
};

pub fn check_stock(requested: i32, stock: i32) -> AppResult<()> {
    if requested > stock {
        return Err(AppError::BadRequest(format!(
            "Requested quantity exceeds available stock ({stock})"
        )));
    }
    Ok(())
}

/// Quantity of a cart line after adding `added` more, checked against `stock`.
pub fn merged_quantity(current: i32, added: i32, stock: i32) -> AppResult<i32> {
    match current.checked_add(added) {
        Some(quantity) => {
            check_stock(quantity, stock)?;
            Ok(quantity)
        }
        None => Err(AppError::BadRequest(format!(
            "Requested quantity exceeds available stock ({stock})"
        ))),
    }
}

/// Returns the user's cart, creating it when the user has none yet.
pub async fn ensure_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<carts::Model> {
    if let Some(cart) = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?
    {
        return Ok(cart);
    }

    let cart = carts::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(cart)
}

async fn load_cart(state: &AppState, cart: &carts::Model) -> AppResult<Cart> {
    let items = sqlx::query_as::<_, CartItem>(
        r#"
        SELECT ci.id, ci.product_variant_id,
               p.id AS product_id, p.name AS product_name, p.thumbnail_image,
               v.name AS variant_name, v.size, v.scent, v.stock,
               ci.price AS unit_price, ci.quantity, ci.price * ci.quantity AS line_total
        FROM cart_items ci
        JOIN product_variants v ON v.id = ci.product_variant_id
        JOIN products p ON p.id = v.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.created_at DESC, ci.id
        "#,
    )
    .bind(cart.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Cart::new(cart.id, cart.user_id, items))
}

async fn cart_response(
    state: &AppState,
    message: &str,
    user_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    let cart = ensure_cart(&state.orm, user_id).await?;
    let cart = load_cart(state, &cart).await?;
    Ok(ApiResponse::success(message, cart, Some(Meta::empty())))
}

async fn find_item<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    item_id: Uuid,
) -> AppResult<cart_items::Model> {
    let item = CartItems::find()
        .filter(
            Condition::all()
                .add(CartItemCol::Id.eq(item_id))
                .add(CartItemCol::CartId.eq(cart_id)),
        )
        .one(conn)
        .await?;
    match item {
        Some(item) => Ok(item),
        None => Err(AppError::not_found("Cart item")),
    }
}

async fn add_item(
    state: &AppState,
    actor: &AuthUser,
    user_id: Uuid,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<Cart>> {
    require_positive_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    let cart = ensure_cart(&txn, user_id).await?;
    let variant = match ProductVariants::find_by_id(payload.product_variant_id)
        .one(&txn)
        .await?
    {
        Some(variant) => variant,
        None => return Err(AppError::not_found("Product variant")),
    };

    let existing = CartItems::find()
        .filter(
            Condition::all()
                .add(CartItemCol::CartId.eq(cart.id))
                .add(CartItemCol::ProductVariantId.eq(variant.id)),
        )
        .one(&txn)
        .await?;

    match existing {
        Some(item) => {
            let quantity = merged_quantity(item.quantity, payload.quantity, variant.stock)?;
            let mut active: cart_items::ActiveModel = item.into();
            active.quantity = Set(quantity);
            active.price = Set(variant.price);
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?;
        }
        None => {
            check_stock(payload.quantity, variant.stock)?;
            cart_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_variant_id: Set(variant.id),
                quantity: Set(payload.quantity),
                price: Set(variant.price),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(actor.user_id),
        "cart_add",
        "cart_items",
        serde_json::json!({
            "user_id": user_id,
            "product_variant_id": payload.product_variant_id,
            "quantity": payload.quantity
        }),
    )
    .await;

    cart_response(state, "Added to cart", user_id).await
}

async fn update_item(
    state: &AppState,
    actor: &AuthUser,
    user_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    require_positive_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    let cart = ensure_cart(&txn, user_id).await?;
    let item = find_item(&txn, cart.id, payload.cart_item_id).await?;
    let variant = match ProductVariants::find_by_id(item.product_variant_id)
        .one(&txn)
        .await?
    {
        Some(variant) => variant,
        None => return Err(AppError::not_found("Product variant")),
    };
    check_stock(payload.quantity, variant.stock)?;

    let mut active: cart_items::ActiveModel = item.into();
    active.quantity = Set(payload.quantity);
    active.price = Set(variant.price);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(actor.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({
            "user_id": user_id,
            "cart_item_id": payload.cart_item_id,
            "quantity": payload.quantity
        }),
    )
    .await;

    cart_response(state, "Cart updated", user_id).await
}

async fn remove_item(
    state: &AppState,
    actor: &AuthUser,
    user_id: Uuid,
    item_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    let cart = ensure_cart(&state.orm, user_id).await?;
    let item = find_item(&state.orm, cart.id, item_id).await?;
    CartItems::delete_by_id(item.id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(actor.user_id),
        "cart_remove",
        "cart_items",
        serde_json::json!({ "user_id": user_id, "cart_item_id": item_id }),
    )
    .await;

    cart_response(state, "Removed from cart", user_id).await
}

pub async fn get_my_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Cart>> {
    cart_response(state, "My cart", user.user_id).await
}

pub async fn add_to_my_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<Cart>> {
    add_item(state, user, user.user_id, payload).await
}

pub async fn update_my_cart_item(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    update_item(state, user, user.user_id, payload).await
}

pub async fn remove_from_my_cart(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    remove_item(state, user, user.user_id, item_id).await
}

pub async fn get_user_cart(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    ensure_admin(user)?;
    let owner = find_user(&state.orm, user_id).await?;
    cart_response(state, "User cart", owner.id).await
}

pub async fn add_to_user_cart(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<Cart>> {
    ensure_admin(user)?;
    let owner = find_user(&state.orm, user_id).await?;
    add_item(state, user, owner.id, payload).await
}

pub async fn update_user_cart_item(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<Cart>> {
    ensure_admin(user)?;
    let owner = find_user(&state.orm, user_id).await?;
    update_item(state, user, owner.id, payload).await
}

pub async fn remove_from_user_cart(
    state: &AppState,
    user: &AuthUser,
    user_id: Uuid,
    item_id: Uuid,
) -> AppResult<ApiResponse<Cart>> {
    ensure_admin(user)?;
    let owner = find_user(&state.orm, user_id).await?;
    remove_item(state, user, owner.id, item_id).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_check_reports_available_amount() {
        assert!(check_stock(3, 3).is_ok());
        let err = check_stock(4, 3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Requested quantity exceeds available stock (3)"
        );
    }

    #[test]
    fn merged_quantity_rejects_overflow() {
        assert_eq!(merged_quantity(2, 3, 5).unwrap(), 5);
        assert!(matches!(
            merged_quantity(1, i32::MAX, i32::MAX),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(merged_quantity(4, 2, 5), Err(AppError::BadRequest(_))));
    }
}
