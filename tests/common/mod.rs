#![allow(dead_code)]

use std::sync::Arc;

use raumania_api::{
    config::JwtConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    dto::{
        auth::RegisterRequest,
        brands::BrandRequest,
        products::CreateProductRequest,
        variants::VariantFields,
    },
    middleware::auth::AuthUser,
    models::{ProductDetail, Role},
    services::{auth_service, brand_service, product_service},
    state::AppState,
};
use sea_orm::{ConnectionTrait, Statement};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

static DB_LOCK: Mutex<()> = Mutex::const_new(());

/// Flows share one database and truncate it, so they take turns.
pub async fn lock_db() -> MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

/// Returns `None` when no database is configured so the flow can be skipped.
pub fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests.");
            None
        }
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url, 5).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE reviews, payments, order_items, orders, cart_items, carts, product_images, \
         product_variants, products, brands, addresses, password_reset_tokens, audit_logs, users CASCADE",
    ))
    .await?;

    let pool = create_pool(database_url, 5).await?;
    Ok(AppState {
        pool,
        orm,
        jwt: Arc::new(JwtConfig {
            secret: "integration-secret".into(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 1,
            reset_ttl_minutes: 5,
        }),
        frontend_url: Arc::from("http://localhost:5173"),
    })
}

pub async fn register(state: &AppState, username: &str) -> anyhow::Result<AuthUser> {
    let resp = auth_service::register_user(
        state,
        RegisterRequest {
            username: username.into(),
            email: format!("{username}@raumania.test"),
            password: "password123".into(),
            confirm_password: "password123".into(),
        },
    )
    .await?;
    let tokens = resp.data.expect("tokens");
    Ok(AuthUser {
        user_id: tokens.user_id,
        role: Role::User.as_str().into(),
    })
}

pub fn admin() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: Role::Admin.as_str().into(),
    }
}

pub async fn create_brand(state: &AppState, admin: &AuthUser, name: &str) -> anyhow::Result<Uuid> {
    let resp = brand_service::create_brand(
        state,
        admin,
        BrandRequest {
            name: name.into(),
            description: None,
        },
    )
    .await?;
    Ok(resp.data.expect("brand").id)
}

pub fn variant(name: &str, size: &str, stock: i32, price: i64) -> VariantFields {
    VariantFields {
        name: name.into(),
        size: size.into(),
        scent: "Floral".into(),
        stock,
        price,
    }
}

pub async fn create_product(
    state: &AppState,
    admin: &AuthUser,
    brand: &str,
    name: &str,
    first_variant: VariantFields,
) -> anyhow::Result<ProductDetail> {
    let resp = product_service::create_product(
        state,
        admin,
        CreateProductRequest {
            name: name.into(),
            description: Some(format!("{name} eau de parfum")),
            product_material: None,
            inspiration: None,
            usage_instructions: None,
            thumbnail_image: None,
            is_active: Some(true),
            brand: brand.into(),
            product_variant: first_variant,
            image_urls: Some(vec!["https://img.raumania.test/1.jpg".into()]),
        },
    )
    .await?;
    Ok(resp.data.expect("product"))
}
