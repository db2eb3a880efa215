use axum::Router;

use crate::state::AppState;

pub mod addresses;
pub mod auth;
pub mod brands;
pub mod cart;
pub mod dashboard;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod reviews;
pub mod users;
pub mod variants;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/user", users::router())
        .nest("/address", addresses::router())
        .nest("/brand", brands::router())
        .nest("/product", products::router())
        .nest("/product-variant", variants::router())
        .nest("/cart", cart::router())
        .nest("/orders", orders::router())
        .nest("/review", reviews::router())
        .nest("/admin/dashboard", dashboard::router())
}
