use crate::{
    db::DbPool,
    dto::dashboard::{
        DashboardSummary, RecentOrder, RecentOrderList, RecentReview, RecentReviewList,
        StatusCount, StatusCountList,
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{OrderStatus, PaymentStatus},
    response::{ApiResponse, Meta},
    routes::params::LimitQuery,
    state::AppState,
};

const NEW_WINDOW_DAYS: i32 = 30;
const RECENT_DEFAULT: i64 = 10;
const RECENT_MAX: i64 = 50;

/// Growth of `total` against the count before the `new` rows were added.
pub fn growth_percentage(total: i64, new: i64) -> f64 {
    let previous = total - new;
    if previous <= 0 {
        return 100.0;
    }
    (total - previous) as f64 / previous as f64 * 100.0
}

async fn total_and_new(pool: &DbPool, table: &str) -> AppResult<(i64, i64)> {
    let sql = format!(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE created_at >= NOW() - make_interval(days => $1)) FROM {table}"
    );
    let row: (i64, i64) = sqlx::query_as(&sql)
        .bind(NEW_WINDOW_DAYS)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn summary(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardSummary>> {
    ensure_admin(user)?;

    let (total_orders, new_orders) = total_and_new(&state.pool, "orders").await?;
    let (total_products, new_products) = total_and_new(&state.pool, "products").await?;
    let (total_users, new_users) = total_and_new(&state.pool, "users").await?;

    let (total_revenue,): (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(o.total_amount), 0)::BIGINT
        FROM orders o
        JOIN payments p ON p.order_id = o.id
        WHERE o.order_status = $1 AND p.payment_status = $2
        "#,
    )
    .bind(OrderStatus::Delivered.as_str())
    .bind(PaymentStatus::Completed.as_str())
    .fetch_one(&state.pool)
    .await?;

    let data = DashboardSummary {
        total_orders,
        new_orders,
        orders_growth: growth_percentage(total_orders, new_orders),
        total_products,
        new_products,
        products_growth: growth_percentage(total_products, new_products),
        total_users,
        new_users,
        users_growth: growth_percentage(total_users, new_users),
        total_revenue,
    };
    Ok(ApiResponse::success("Dashboard summary", data, Some(Meta::empty())))
}

pub async fn orders_by_status(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<StatusCountList>> {
    ensure_admin(user)?;
    let items = sqlx::query_as::<_, StatusCount>(
        r#"
        SELECT order_status AS status, COUNT(*) AS count
        FROM orders
        GROUP BY order_status
        ORDER BY order_status
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success("Orders by status", StatusCountList { items }, Some(Meta::empty())))
}

pub async fn recent_orders(
    state: &AppState,
    user: &AuthUser,
    query: LimitQuery,
) -> AppResult<ApiResponse<RecentOrderList>> {
    ensure_admin(user)?;
    let items = sqlx::query_as::<_, RecentOrder>(
        r#"
        SELECT o.id,
               COALESCE(NULLIF(TRIM(u.full_name), ''), u.username) AS customer_name,
               o.created_at AS order_date,
               o.total_amount,
               o.order_status AS status,
               o.payment_status
        FROM orders o
        JOIN users u ON u.id = o.user_id
        ORDER BY o.created_at DESC
        LIMIT $1
        "#,
    )
    .bind(query.clamp(RECENT_DEFAULT, RECENT_MAX))
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success("Recent orders", RecentOrderList { items }, Some(Meta::empty())))
}

pub async fn recent_reviews(
    state: &AppState,
    user: &AuthUser,
    query: LimitQuery,
) -> AppResult<ApiResponse<RecentReviewList>> {
    ensure_admin(user)?;
    let items = sqlx::query_as::<_, RecentReview>(
        r#"
        SELECT r.id,
               p.name AS product_name,
               COALESCE(NULLIF(TRIM(u.full_name), ''), u.username) AS customer_name,
               r.rating,
               r.content,
               r.created_at AS date
        FROM reviews r
        JOIN products p ON p.id = r.product_id
        JOIN users u ON u.id = r.user_id
        ORDER BY r.created_at DESC
        LIMIT $1
        "#,
    )
    .bind(query.clamp(RECENT_DEFAULT, RECENT_MAX))
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success("Recent reviews", RecentReviewList { items }, Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::growth_percentage;

    #[test]
    fn growth_is_100_without_history() {
        assert_eq!(growth_percentage(0, 0), 100.0);
        assert_eq!(growth_percentage(5, 5), 100.0);
    }

    #[test]
    fn growth_compares_against_previous_total() {
        // 10 before, 5 new
        assert_eq!(growth_percentage(15, 5), 50.0);
        assert_eq!(growth_percentage(10, 0), 0.0);
    }
}
