mod common;

use raumania_api::{
    dto::{
        addresses::AddressRequest,
        cart::AddToCartRequest,
        orders::{CheckoutRequest, UpdateOrderStatusRequest},
        reviews::CreateReviewRequest,
    },
    error::AppError,
    models::{DeliveryMethod, PaymentMethod},
    routes::params::LimitQuery,
    services::{cart_service, dashboard_service, order_service, review_service},
};

#[tokio::test]
async fn dashboard_reports_revenue_and_recent_activity() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let _db = common::lock_db().await;
    let state = common::setup_state(&database_url).await?;
    let admin = common::admin();

    common::create_brand(&state, &admin, "Atelier Saffron").await?;
    let product = common::create_product(
        &state,
        &admin,
        "Atelier Saffron",
        "Saffron Ember",
        common::variant("Extrait", "30ml", 9, 120_000),
    )
    .await?;
    let variant_id = product.product_variants[0].id;
    let buyer = common::register(&state, "collector1").await?;

    let cart = cart_service::add_to_my_cart(
        &state,
        &buyer,
        AddToCartRequest {
            product_variant_id: variant_id,
            quantity: 2,
        },
    )
    .await?
    .data
    .expect("cart");

    let order = order_service::checkout(
        &state,
        &buyer,
        CheckoutRequest {
            cart_item_ids: vec![cart.items[0].id],
            delivery_method: DeliveryMethod::RaumaniaExpress,
            payment_method: PaymentMethod::Cash,
            address: AddressRequest {
                house_number: "3".into(),
                street_name: "Dong Khoi".into(),
                city: "Ho Chi Minh City".into(),
                state: "District 1".into(),
                country: "Vietnam".into(),
                postal_code: "700000".into(),
            },
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(order.total_amount, 240_000 + 3600);

    // Unpaid orders do not count as revenue
    let before = dashboard_service::summary(&state, &admin).await?.data.expect("summary");
    assert_eq!(before.total_revenue, 0);
    assert_eq!(before.total_orders, 1);
    assert_eq!(before.new_orders, 1);
    assert_eq!(before.orders_growth, 100.0);
    assert_eq!(before.total_products, 1);
    assert_eq!(before.total_users, 1);

    order_service::pay_order(&state, &buyer, order.id).await?;
    order_service::update_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            order_status: Some("DELIVERED".into()),
            payment_status: None,
            delivery_status: Some("DELIVERED".into()),
        },
    )
    .await?;

    let after = dashboard_service::summary(&state, &admin).await?.data.expect("summary");
    assert_eq!(after.total_revenue, order.total_amount);

    let by_status = dashboard_service::orders_by_status(&state, &admin)
        .await?
        .data
        .expect("counts");
    assert_eq!(by_status.items.len(), 1);
    assert_eq!(by_status.items[0].status, "DELIVERED");
    assert_eq!(by_status.items[0].count, 1);

    let recent = dashboard_service::recent_orders(&state, &admin, LimitQuery { limit: Some(5) })
        .await?
        .data
        .expect("orders");
    assert_eq!(recent.items.len(), 1);
    assert_eq!(recent.items[0].id, order.id);
    // No full name on file, so the username stands in
    assert_eq!(recent.items[0].customer_name, "collector1");
    assert_eq!(recent.items[0].payment_status, "COMPLETED");

    review_service::create_my_review(
        &state,
        &buyer,
        CreateReviewRequest {
            product_id: product.id,
            product_variant_id: variant_id,
            rating: 4,
            content: "Warm and smoky".into(),
        },
    )
    .await?;
    let reviews = dashboard_service::recent_reviews(&state, &admin, LimitQuery { limit: None })
        .await?
        .data
        .expect("reviews");
    assert_eq!(reviews.items.len(), 1);
    assert_eq!(reviews.items[0].product_name, "Saffron Ember");
    assert_eq!(reviews.items[0].rating, 4);

    let denied = dashboard_service::summary(&state, &buyer).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));
    let denied = dashboard_service::recent_orders(&state, &buyer, LimitQuery { limit: None }).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    Ok(())
}
