mod common;

use raumania_api::{
    dto::{
        addresses::AddressRequest,
        cart::{AddToCartRequest, UpdateCartItemRequest},
        orders::{CheckoutRequest, UpdateOrderStatusRequest},
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        orders::{Column as OrderCol, Entity as Orders},
        payments::{Column as PaymentCol, Entity as Payments},
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{DeliveryMethod, PaymentMethod},
    routes::params::{OrderListQuery, Pagination},
    services::{cart_service, order_service, variant_service},
    state::AppState,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

fn address() -> AddressRequest {
    AddressRequest {
        house_number: "12".into(),
        street_name: "Le Loi".into(),
        city: "Ho Chi Minh City".into(),
        state: "District 1".into(),
        country: "Vietnam".into(),
        postal_code: "700000".into(),
    }
}

fn checkout_of(cart_item_ids: Vec<Uuid>) -> CheckoutRequest {
    CheckoutRequest {
        cart_item_ids,
        delivery_method: DeliveryMethod::ShopeeExpress,
        payment_method: PaymentMethod::Cash,
        address: address(),
    }
}

/// Seeds one product with a single variant and returns the variant id.
async fn stocked_variant(state: &AppState, admin: &AuthUser, stock: i32) -> anyhow::Result<Uuid> {
    common::create_brand(state, admin, "Cedar & Salt").await?;
    let product = common::create_product(
        state,
        admin,
        "Cedar & Salt",
        "Driftwood Vetiver",
        common::variant("Eau de Toilette", "100ml", stock, 65_000),
    )
    .await?;
    Ok(product.product_variants[0].id)
}

async fn add_line(
    state: &AppState,
    user: &AuthUser,
    variant_id: Uuid,
    quantity: i32,
) -> anyhow::Result<Uuid> {
    let cart = cart_service::add_to_my_cart(
        state,
        user,
        AddToCartRequest {
            product_variant_id: variant_id,
            quantity,
        },
    )
    .await?
    .data
    .expect("cart");
    Ok(cart.items[0].id)
}

async fn orders_of(state: &AppState, user: &AuthUser) -> anyhow::Result<u64> {
    Ok(Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .count(&state.orm)
        .await?)
}

// Integration flow: register -> add to cart -> checkout -> pay; admin updates statuses.
#[tokio::test]
async fn checkout_deducts_stock_and_pays() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let _db = common::lock_db().await;
    let state = common::setup_state(&database_url).await?;
    let admin = common::admin();

    common::create_brand(&state, &admin, "Maison Lune").await?;
    let product = common::create_product(
        &state,
        &admin,
        "maison lune",
        "Moonlit Iris",
        common::variant("Eau de Parfum", "50ml", 5, 89_000),
    )
    .await?;
    let variant_id = product.product_variants[0].id;

    let customer = common::register(&state, "customer01").await?;
    let stranger = common::register(&state, "stranger01").await?;

    // Quantities merge per variant
    for quantity in [1, 1] {
        cart_service::add_to_my_cart(
            &state,
            &customer,
            AddToCartRequest {
                product_variant_id: variant_id,
                quantity,
            },
        )
        .await?;
    }
    let cart = cart_service::get_my_cart(&state, &customer).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total_items, 2);
    assert_eq!(cart.subtotal, 178_000);
    let item_id = cart.items[0].id;

    let too_many = cart_service::add_to_my_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_variant_id: variant_id,
            quantity: 10,
        },
    )
    .await;
    assert!(matches!(too_many, Err(AppError::BadRequest(_))));

    // Someone else's cart item cannot be checked out
    let foreign = order_service::checkout(
        &state,
        &stranger,
        CheckoutRequest {
            cart_item_ids: vec![item_id],
            delivery_method: DeliveryMethod::ViettelPost,
            payment_method: PaymentMethod::Cash,
            address: address(),
        },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::Forbidden)));

    let order = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            cart_item_ids: vec![item_id],
            delivery_method: DeliveryMethod::ViettelPost,
            payment_method: PaymentMethod::Cash,
            address: address(),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(order.delivery_fee, 2500);
    assert_eq!(order.total_amount, 178_000 + 2500);
    assert_eq!(order.order_status, "PENDING");
    assert_eq!(order.payment_status, "PENDING");
    assert_eq!(order.delivery_status, "PREPARING");
    assert_eq!(order.order_items.len(), 1);
    assert_eq!(order.order_items[0].product_name, "Moonlit Iris");
    assert_eq!(order.order_items[0].total_price, 178_000);

    let variant = variant_service::get_variant(&state, variant_id).await?.data.expect("variant");
    assert_eq!(variant.stock, 3);

    let cart = cart_service::get_my_cart(&state, &customer).await?.data.expect("cart");
    assert!(cart.items.is_empty());

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
        .expect("payment row");
    assert_eq!(payment.amount, order.total_amount);
    assert_eq!(payment.payment_status, "PENDING");

    // Checked-out items are gone
    let again = order_service::checkout(
        &state,
        &customer,
        CheckoutRequest {
            cart_item_ids: vec![item_id],
            delivery_method: DeliveryMethod::GrabExpress,
            payment_method: PaymentMethod::Cash,
            address: address(),
        },
    )
    .await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    let hidden = order_service::get_order(&state, &stranger, order.id).await;
    assert!(matches!(hidden, Err(AppError::Forbidden)));

    let paid = order_service::pay_order(&state, &customer, order.id)
        .await?
        .data
        .expect("paid order");
    assert_eq!(paid.payment_status, "COMPLETED");
    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
        .expect("payment row");
    assert_eq!(payment.payment_status, "COMPLETED");

    let twice = order_service::pay_order(&state, &customer, order.id).await;
    assert!(matches!(twice, Err(AppError::BadRequest(_))));

    let bogus = order_service::update_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            order_status: Some("TELEPORTED".into()),
            payment_status: None,
            delivery_status: None,
        },
    )
    .await;
    assert!(matches!(bogus, Err(AppError::BadRequest(_))));

    let shipped = order_service::update_status(
        &state,
        &admin,
        order.id,
        UpdateOrderStatusRequest {
            order_status: Some("SHIPPED".into()),
            payment_status: None,
            delivery_status: Some("DELIVERING".into()),
        },
    )
    .await?
    .data
    .expect("order");
    assert_eq!(shipped.order_status, "SHIPPED");
    assert_eq!(shipped.delivery_status, "DELIVERING");
    assert_eq!(shipped.payment_status, "COMPLETED");

    let mine = order_service::my_orders(
        &state,
        &customer,
        Pagination::default(),
        OrderListQuery::default(),
    )
    .await?;
    assert_eq!(mine.meta.as_ref().and_then(|m| m.total), Some(1));

    let counts = order_service::status_counts(&state, &admin).await?.data.expect("counts");
    assert_eq!(counts.order_status.get("SHIPPED"), Some(&1));
    assert_eq!(counts.order_status.get("PENDING"), Some(&0));

    let not_admin = order_service::status_counts(&state, &customer).await;
    assert!(matches!(not_admin, Err(AppError::Forbidden)));

    let checkouts = AuditLogs::find()
        .filter(AuditCol::Action.eq("checkout"))
        .count(&state.orm)
        .await?;
    assert_eq!(checkouts, 1);

    Ok(())
}

#[tokio::test]
async fn concurrent_checkouts_consume_cart_item_once() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let _db = common::lock_db().await;
    let state = common::setup_state(&database_url).await?;
    let admin = common::admin();
    let variant_id = stocked_variant(&state, &admin, 10).await?;

    let customer = common::register(&state, "doublebuyer").await?;
    let item_id = add_line(&state, &customer, variant_id, 3).await?;

    let (first, second) = tokio::join!(
        order_service::checkout(&state, &customer, checkout_of(vec![item_id])),
        order_service::checkout(&state, &customer, checkout_of(vec![item_id])),
    );
    let placed = [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(placed, 1);
    let rejected = if first.is_err() { first } else { second };
    assert!(matches!(rejected, Err(AppError::BadRequest(_) | AppError::Conflict(_))));

    let variant = variant_service::get_variant(&state, variant_id).await?.data.expect("variant");
    assert_eq!(variant.stock, 7);
    assert_eq!(orders_of(&state, &customer).await?, 1);
    assert_eq!(Payments::find().count(&state.orm).await?, 1);

    Ok(())
}

#[tokio::test]
async fn checkout_with_short_stock_changes_nothing() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let _db = common::lock_db().await;
    let state = common::setup_state(&database_url).await?;
    let admin = common::admin();
    let variant_id = stocked_variant(&state, &admin, 5).await?;

    let customer = common::register(&state, "latebuyer").await?;
    let item_id = add_line(&state, &customer, variant_id, 3).await?;

    // Stock drops below the cart quantity after the item was added
    variant_service::update_variant(
        &state,
        &admin,
        variant_id,
        common::variant("Eau de Toilette", "100ml", 2, 65_000),
    )
    .await?;

    let short = order_service::checkout(&state, &customer, checkout_of(vec![item_id])).await;
    assert!(matches!(short, Err(AppError::BadRequest(_))));

    let variant = variant_service::get_variant(&state, variant_id).await?.data.expect("variant");
    assert_eq!(variant.stock, 2);
    assert_eq!(orders_of(&state, &customer).await?, 0);
    assert_eq!(Payments::find().count(&state.orm).await?, 0);

    let cart = cart_service::get_my_cart(&state, &customer).await?.data.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);

    Ok(())
}

#[tokio::test]
async fn cart_lines_are_scoped_to_their_owner() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let _db = common::lock_db().await;
    let state = common::setup_state(&database_url).await?;
    let admin = common::admin();
    let variant_id = stocked_variant(&state, &admin, 8).await?;

    let owner = common::register(&state, "cartowner").await?;
    let other = common::register(&state, "cartother").await?;
    let item_id = add_line(&state, &owner, variant_id, 2).await?;

    let updated = cart_service::update_my_cart_item(
        &state,
        &owner,
        UpdateCartItemRequest {
            cart_item_id: item_id,
            quantity: 5,
        },
    )
    .await?
    .data
    .expect("cart");
    assert_eq!(updated.total_items, 5);
    assert_eq!(updated.subtotal, 5 * 65_000);

    let over = cart_service::update_my_cart_item(
        &state,
        &owner,
        UpdateCartItemRequest {
            cart_item_id: item_id,
            quantity: 9,
        },
    )
    .await;
    assert!(matches!(over, Err(AppError::BadRequest(_))));

    let overflow = cart_service::add_to_my_cart(
        &state,
        &owner,
        AddToCartRequest {
            product_variant_id: variant_id,
            quantity: i32::MAX,
        },
    )
    .await;
    assert!(matches!(overflow, Err(AppError::BadRequest(_))));

    let foreign_update = cart_service::update_my_cart_item(
        &state,
        &other,
        UpdateCartItemRequest {
            cart_item_id: item_id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(foreign_update, Err(AppError::NotFound(_))));

    let foreign_remove = cart_service::remove_from_my_cart(&state, &other, item_id).await;
    assert!(matches!(foreign_remove, Err(AppError::NotFound(_))));

    // Admin edits reach the owner's cart
    let via_admin = cart_service::update_user_cart_item(
        &state,
        &admin,
        owner.user_id,
        UpdateCartItemRequest {
            cart_item_id: item_id,
            quantity: 1,
        },
    )
    .await?
    .data
    .expect("cart");
    assert_eq!(via_admin.total_items, 1);

    let emptied = cart_service::remove_from_my_cart(&state, &owner, item_id)
        .await?
        .data
        .expect("cart");
    assert!(emptied.items.is_empty());
    assert_eq!(emptied.subtotal, 0);

    Ok(())
}
