use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::orders::{
        CheckoutRequest, OrderList, OrderStatusCounts, OrderSummaryList, UpdateOrderStatusRequest,
    },
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        carts::{Column as CartCol, Entity as Carts},
        order_items::{self, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, Column as OrderCol, Entity as Orders},
        payments::{self, Column as PaymentCol, Entity as Payments},
        product_variants::{Column as VariantCol, Entity as ProductVariants},
        products::{Column as ProdCol, Entity as Products},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{
        DeliveryStatus, Order, OrderItem, OrderStatus, OrderSummary, PaymentStatus,
    },
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, OrderSortBy, Pagination},
    state::AppState,
};

/// Order total: sum of the line totals plus the delivery fee.
pub fn order_total(line_totals: impl IntoIterator<Item = i64>, delivery_fee: i64) -> i64 {
    line_totals.into_iter().sum::<i64>() + delivery_fee
}

/// Rejects an empty or repeated list of cart item ids.
pub fn validate_cart_item_ids(ids: &[Uuid]) -> AppResult<()> {
    if ids.is_empty() {
        return Err(AppError::BadRequest("cart_item_ids must not be empty".into()));
    }
    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
        return Err(AppError::BadRequest(format!("Duplicate cart item id: {dup}")));
    }
    Ok(())
}

/// Counts per status value, with every known value present.
pub fn fill_counts<T: std::fmt::Display>(
    all: &[T],
    rows: Vec<(String, i64)>,
) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> = all.iter().map(|s| (s.to_string(), 0)).collect();
    for (status, count) in rows {
        counts.insert(status, count);
    }
    counts
}

async fn orders_view<C: ConnectionTrait>(
    conn: &C,
    models: Vec<orders::Model>,
) -> AppResult<Vec<Order>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<Uuid> = models.iter().map(|o| o.id).collect();
    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::CreatedAt)
        .order_by_asc(OrderItemCol::Id)
        .all(conn)
        .await?
    {
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItem::from(item));
    }

    let user_ids: Vec<Uuid> = models.iter().map(|o| o.user_id).collect();
    let names: HashMap<Uuid, String> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|user| (user.id, user.display_name()))
        .collect();

    Ok(models
        .into_iter()
        .map(|o| Order {
            order_items: items_by_order.remove(&o.id).unwrap_or_default(),
            user_name: names.get(&o.user_id).cloned(),
            id: o.id,
            user_id: o.user_id,
            total_amount: o.total_amount,
            delivery_fee: o.delivery_fee,
            order_status: o.order_status,
            payment_status: o.payment_status,
            delivery_status: o.delivery_status,
            delivery_method: o.delivery_method,
            payment_method: o.payment_method,
            house_number: o.house_number,
            street_name: o.street_name,
            city: o.city,
            state: o.state,
            country: o.country,
            postal_code: o.postal_code,
            created_at: o.created_at.with_timezone(&Utc),
            updated_at: o.updated_at.with_timezone(&Utc),
        })
        .collect())
}

async fn order_view<C: ConnectionTrait>(conn: &C, model: orders::Model) -> AppResult<Order> {
    orders_view(conn, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Order"))
}

async fn find_order<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<orders::Model> {
    match Orders::find_by_id(id).one(conn).await? {
        Some(order) => Ok(order),
        None => Err(AppError::not_found("Order")),
    }
}

pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<Order>> {
    validate_cart_item_ids(&payload.cart_item_ids)?;
    payload.address.validate()?;

    let txn = state.orm.begin().await?;

    // A concurrent checkout of the same items waits here, then no longer sees them.
    let cart_items = CartItems::find()
        .filter(CartItemCol::Id.is_in(payload.cart_item_ids.clone()))
        .order_by_asc(CartItemCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    if let Some(missing) = payload
        .cart_item_ids
        .iter()
        .find(|id| !cart_items.iter().any(|item| item.id == **id))
    {
        return Err(AppError::BadRequest(format!("Cart item not found: {missing}")));
    }

    let cart = Carts::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .one(&txn)
        .await?;
    let cart_id = cart.map(|c| c.id);
    if cart_items.iter().any(|item| Some(item.cart_id) != cart_id) {
        return Err(AppError::Forbidden);
    }

    let variant_ids: Vec<Uuid> = cart_items.iter().map(|i| i.product_variant_id).collect();
    let variants: HashMap<Uuid, _> = ProductVariants::find()
        .filter(VariantCol::Id.is_in(variant_ids))
        .order_by_asc(VariantCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|v| (v.id, v))
        .collect();

    for item in &cart_items {
        let variant = match variants.get(&item.product_variant_id) {
            Some(v) => v,
            None => return Err(AppError::not_found("Product variant")),
        };
        if variant.stock < item.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product: {}",
                variant.name
            )));
        }
    }

    for item in &cart_items {
        ProductVariants::update_many()
            .col_expr(VariantCol::Stock, Expr::col(VariantCol::Stock).sub(item.quantity))
            .col_expr(VariantCol::UpdatedAt, Expr::current_timestamp().into())
            .filter(VariantCol::Id.eq(item.product_variant_id))
            .exec(&txn)
            .await?;
    }

    let product_ids: Vec<Uuid> = variants.values().map(|v| v.product_id).collect();
    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let delivery_fee = payload.delivery_method.fee();
    let total_amount = order_total(
        cart_items.iter().map(|item| {
            variants
                .get(&item.product_variant_id)
                .map_or(0, |v| v.price * item.quantity as i64)
        }),
        delivery_fee,
    );

    let address = payload.address;
    let order = orders::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_amount: Set(total_amount),
        delivery_fee: Set(delivery_fee),
        order_status: Set(OrderStatus::Pending.as_str().to_string()),
        payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
        delivery_status: Set(DeliveryStatus::Preparing.as_str().to_string()),
        delivery_method: Set(payload.delivery_method.as_str().to_string()),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        house_number: Set(address.house_number.trim().to_string()),
        street_name: Set(address.street_name.trim().to_string()),
        city: Set(address.city.trim().to_string()),
        state: Set(address.state.trim().to_string()),
        country: Set(address.country.trim().to_string()),
        postal_code: Set(address.postal_code.trim().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    for item in &cart_items {
        let variant = match variants.get(&item.product_variant_id) {
            Some(v) => v,
            None => return Err(AppError::not_found("Product variant")),
        };
        let product = match products.get(&variant.product_id) {
            Some(p) => p,
            None => return Err(AppError::not_found("Product")),
        };
        order_items::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            product_variant_id: Set(variant.id),
            product_name: Set(product.name.clone()),
            product_description: Set(product.description.clone()),
            product_thumbnail: Set(product.thumbnail_image.clone()),
            product_variant_name: Set(variant.name.clone()),
            product_variant_size: Set(variant.size.clone()),
            product_variant_scent: Set(variant.scent.clone()),
            quantity: Set(item.quantity),
            unit_price: Set(variant.price),
            total_price: Set(variant.price * item.quantity as i64),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    payments::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        amount: Set(total_amount),
        payment_method: Set(payload.payment_method.as_str().to_string()),
        payment_status: Set(PaymentStatus::Pending.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let removed = CartItems::delete_many()
        .filter(CartItemCol::Id.is_in(payload.cart_item_ids.clone()))
        .exec(&txn)
        .await?;
    if removed.rows_affected != cart_items.len() as u64 {
        return Err(AppError::Conflict(
            "Cart changed during checkout, please retry".into(),
        ));
    }

    let view = order_view(&txn, order).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        "orders",
        serde_json::json!({ "order_id": view.id, "total_amount": view.total_amount }),
    )
    .await;

    Ok(ApiResponse::success("Checkout success", view, Some(Meta::empty())))
}

pub async fn pay_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::not_found("Order")),
    };

    if order.payment_status != PaymentStatus::Pending.as_str() {
        return Err(AppError::BadRequest("Order is not awaiting payment".into()));
    }

    let mut active: orders::ActiveModel = order.into();
    active.payment_status = Set(PaymentStatus::Completed.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    sync_payment_status(&txn, order.id, PaymentStatus::Completed).await?;

    let view = order_view(&txn, order).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_paid",
        "orders",
        serde_json::json!({ "order_id": view.id }),
    )
    .await;

    Ok(ApiResponse::success("Payment recorded", view, Some(Meta::empty())))
}

async fn sync_payment_status<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    status: PaymentStatus,
) -> AppResult<()> {
    Payments::update_many()
        .col_expr(PaymentCol::PaymentStatus, Expr::value(status.as_str()))
        .col_expr(PaymentCol::UpdatedAt, Expr::current_timestamp().into())
        .filter(PaymentCol::OrderId.eq(order_id))
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn my_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderSummaryList>> {
    let (page, limit, offset) = pagination.normalize();

    let sort_col = match query.sort_by.unwrap_or_default() {
        OrderSortBy::CreatedAt => OrderCol::CreatedAt,
        OrderSortBy::TotalAmount => OrderCol::TotalAmount,
    };
    let finder = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by(sort_col, query.sort_order.unwrap_or_default().order());

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut items_by_order: HashMap<Uuid, Vec<order_items::Model>> = HashMap::new();
    if !order_ids.is_empty() {
        for item in OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(order_ids))
            .order_by_asc(OrderItemCol::CreatedAt)
            .order_by_asc(OrderItemCol::Id)
            .all(&state.orm)
            .await?
        {
            items_by_order.entry(item.order_id).or_default().push(item);
        }
    }

    let items = orders
        .into_iter()
        .map(|o| {
            let lines = items_by_order.remove(&o.id).unwrap_or_default();
            let first = lines.first();
            OrderSummary {
                order_id: o.id,
                product_variant_name: first.map(|i| i.product_variant_name.clone()),
                product_variant_size: first.map(|i| i.product_variant_size.clone()),
                product_variant_scent: first.map(|i| i.product_variant_scent.clone()),
                quantity: lines.iter().map(|i| i.quantity as i64).sum(),
                delivery_status: o.delivery_status,
                total_amount: o.total_amount,
                created_at: o.created_at.with_timezone(&Utc),
            }
        })
        .collect();

    Ok(ApiResponse::success(
        "My orders",
        OrderSummaryList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = find_order(&state.orm, id).await?;
    if !user.is_admin() && order.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    let view = order_view(&state.orm, order).await?;
    Ok(ApiResponse::success("Order", view, Some(Meta::empty())))
}

async fn count_by(pool: &DbPool, column: &str) -> AppResult<Vec<(String, i64)>> {
    let sql = format!("SELECT {column}, COUNT(*) FROM orders GROUP BY {column}");
    let rows = sqlx::query_as::<_, (String, i64)>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn status_counts(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderStatusCounts>> {
    ensure_admin(user)?;

    let counts = OrderStatusCounts {
        order_status: fill_counts(OrderStatus::ALL, count_by(&state.pool, "order_status").await?),
        payment_status: fill_counts(
            PaymentStatus::ALL,
            count_by(&state.pool, "payment_status").await?,
        ),
        delivery_status: fill_counts(
            DeliveryStatus::ALL,
            count_by(&state.pool, "delivery_status").await?,
        ),
    };
    Ok(ApiResponse::success("Order status counts", counts, Some(Meta::empty())))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let order_status = payload
        .order_status
        .as_deref()
        .map(str::parse::<OrderStatus>)
        .transpose()?;
    let payment_status = payload
        .payment_status
        .as_deref()
        .map(str::parse::<PaymentStatus>)
        .transpose()?;
    let delivery_status = payload
        .delivery_status
        .as_deref()
        .map(str::parse::<DeliveryStatus>)
        .transpose()?;

    let txn = state.orm.begin().await?;
    let order = find_order(&txn, id).await?;

    let mut active: orders::ActiveModel = order.into();
    if let Some(status) = order_status {
        active.order_status = Set(status.as_str().to_string());
    }
    if let Some(status) = payment_status {
        active.payment_status = Set(status.as_str().to_string());
    }
    if let Some(status) = delivery_status {
        active.delivery_status = Set(status.as_str().to_string());
    }
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    if let Some(status) = payment_status {
        sync_payment_status(&txn, order.id, status).await?;
    }

    let view = order_view(&txn, order).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({
            "order_id": view.id,
            "order_status": view.order_status,
            "payment_status": view.payment_status,
            "delivery_status": view.delivery_status
        }),
    )
    .await;

    Ok(ApiResponse::success("Order updated", view, Some(Meta::empty())))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Orders::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Order"));
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::deleted("Order deleted", id))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let mut finder = Orders::find();
    if let Some(status) = query.order_status {
        finder = finder.filter(OrderCol::OrderStatus.eq(status.as_str()));
    }
    let sort_col = match query.sort_by.unwrap_or_default() {
        OrderSortBy::CreatedAt => OrderCol::CreatedAt,
        OrderSortBy::TotalAmount => OrderCol::TotalAmount,
    };
    finder = finder.order_by(sort_col, query.sort_order.unwrap_or_default().order());

    let total = finder.clone().count(&state.orm).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = orders_view(&state.orm, models).await?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryMethod;

    #[test]
    fn total_includes_delivery_fee() {
        let fee = DeliveryMethod::GrabExpress.fee();
        assert_eq!(order_total([2 * 12_000, 5_500], fee), 33_000);
        assert_eq!(order_total(Vec::new(), fee), 3_500);
    }

    #[test]
    fn cart_item_ids_must_be_non_empty_and_distinct() {
        assert!(validate_cart_item_ids(&[]).is_err());
        let id = Uuid::new_v4();
        assert!(validate_cart_item_ids(&[id, Uuid::new_v4()]).is_ok());
        let err = validate_cart_item_ids(&[id, id]).unwrap_err();
        assert!(err.to_string().starts_with("Duplicate cart item id"));
    }

    #[test]
    fn status_counts_list_every_value() {
        let counts = fill_counts(DeliveryStatus::ALL, vec![("DELIVERING".into(), 3)]);
        assert_eq!(counts.len(), 4);
        assert_eq!(counts["DELIVERING"], 3);
        assert_eq!(counts["PREPARING"], 0);
        assert_eq!(counts["CANCELLED"], 0);
    }
}
