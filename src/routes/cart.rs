use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Cart,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my-cart", get(get_my_cart))
        .route("/add", post(add_to_my_cart))
        .route("/update", put(update_my_cart_item))
        .route("/remove/{cart_item_id}", delete(remove_from_my_cart))
        .route("/user/{user_id}", get(get_user_cart))
        .route("/user/{user_id}/add", post(add_to_user_cart))
        .route("/user/{user_id}/update", put(update_user_cart_item))
        .route(
            "/user/{user_id}/remove/{cart_item_id}",
            delete(remove_from_user_cart),
        )
}

#[utoipa::path(
    get,
    path = "/api/cart/my-cart",
    responses((status = 200, description = "Current user's cart", body = ApiResponse<Cart>)),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_my_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::get_my_cart(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/add",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added, quantities merge per variant", body = ApiResponse<Cart>),
        (status = 400, description = "Invalid quantity or not enough stock"),
        (status = 404, description = "Product variant not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_my_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::add_to_my_cart(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/cart/update",
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity replaced", body = ApiResponse<Cart>),
        (status = 400, description = "Invalid quantity or not enough stock"),
        (status = 404, description = "Cart item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_my_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::update_my_cart_item(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/remove/{cart_item_id}",
    params(("cart_item_id" = Uuid, Path, description = "Cart item ID")),
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<Cart>),
        (status = 404, description = "Cart item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_my_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(cart_item_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::remove_from_my_cart(&state, &user, cart_item_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/cart/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Cart of the user", body = ApiResponse<Cart>),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_user_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::get_user_cart(&state, &user, user_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/user/{user_id}/add",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = AddToCartRequest,
    responses((status = 200, description = "Item added", body = ApiResponse<Cart>)),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_user_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::add_to_user_cart(&state, &user, user_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/cart/user/{user_id}/update",
    params(("user_id" = Uuid, Path, description = "User ID")),
    request_body = UpdateCartItemRequest,
    responses((status = 200, description = "Quantity replaced", body = ApiResponse<Cart>)),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_user_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp = cart_service::update_user_cart_item(&state, &user, user_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/user/{user_id}/remove/{cart_item_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("cart_item_id" = Uuid, Path, description = "Cart item ID")
    ),
    responses((status = 200, description = "Item removed", body = ApiResponse<Cart>)),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_user_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path((user_id, cart_item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<Cart>>> {
    let resp =
        cart_service::remove_from_user_cart(&state, &user, user_id, cart_item_id).await?;
    Ok(Json(resp))
}
