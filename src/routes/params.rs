use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::OrderStatus;

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// Page number, starting at 1.
    pub page: Option<i64>,
    /// Items per page, 1 to 100, default 20.
    pub per_page: Option<i64>,
}

/// Highest page number honored; larger values are treated as this page.
pub const MAX_PAGE: i64 = 1_000_000;

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn order(&self) -> sea_orm::Order {
        match self {
            SortOrder::Asc => sea_orm::Order::Asc,
            SortOrder::Desc => sea_orm::Order::Desc,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserSortBy {
    #[default]
    CreatedAt,
    FullName,
    Email,
    Username,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BrandSortBy {
    #[default]
    CreatedAt,
    Name,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortBy {
    #[default]
    CreatedAt,
    Name,
    MinPrice,
    MaxPrice,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VariantSortBy {
    #[default]
    CreatedAt,
    Price,
    Name,
    Size,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortBy {
    #[default]
    CreatedAt,
    TotalAmount,
}

#[derive(Debug, Default, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSortBy {
    #[default]
    CreatedAt,
    Rating,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub sort_by: Option<UserSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NameQuery {
    /// Case-insensitive partial name.
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BrandListQuery {
    pub sort_by: Option<BrandSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    pub sort_by: Option<ProductSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilterQuery {
    pub name: Option<String>,
    /// Matches products whose highest variant price is at least this value.
    pub min_price: Option<i64>,
    /// Matches products whose lowest variant price is at most this value.
    pub max_price: Option<i64>,
    pub brand_name: Option<String>,
    pub is_active: Option<bool>,
    pub size: Option<String>,
    pub scent: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct KeywordQuery {
    pub keyword: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    pub fn clamp(&self, default: i64, max: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, max)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VariantListQuery {
    pub sort_by: Option<VariantSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderListQuery {
    pub order_status: Option<OrderStatus>,
    pub sort_by: Option<OrderSortBy>,
    pub sort_order: Option<SortOrder>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewFilterQuery {
    pub content: Option<String>,
    pub rating: Option<i32>,
    pub username: Option<String>,
    pub product_id: Option<Uuid>,
    pub product_variant_id: Option<Uuid>,
    pub sort_by: Option<ReviewSortBy>,
    pub sort_order: Option<SortOrder>,
}

/// Turns a user-supplied fragment into an `ILIKE` contains pattern.
pub fn contains_pattern(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let escaped = trimmed
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_defaults_and_clamps() {
        let (page, per_page, offset) = Pagination::default().normalize();
        assert_eq!((page, per_page, offset), (1, 20, 0));

        let p = Pagination {
            page: Some(3),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(), (3, 100, 200));

        let p = Pagination {
            page: Some(-2),
            per_page: Some(0),
        };
        assert_eq!(p.normalize(), (1, 1, 0));
    }

    #[test]
    fn huge_page_is_capped() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(100),
        };
        assert_eq!(p.normalize(), (MAX_PAGE, 100, (MAX_PAGE - 1) * 100));
    }

    #[test]
    fn limit_is_clamped() {
        assert_eq!(LimitQuery { limit: None }.clamp(10, 50), 10);
        assert_eq!(LimitQuery { limit: Some(0) }.clamp(10, 50), 1);
        assert_eq!(LimitQuery { limit: Some(99) }.clamp(4, 20), 20);
    }

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("  "), None);
        assert_eq!(contains_pattern("oud"), Some("%oud%".into()));
        assert_eq!(contains_pattern("50%_off"), Some("%50\\%\\_off%".into()));
    }

    #[test]
    fn sort_values_are_snake_case() {
        let order: SortOrder = serde_json::from_str("\"asc\"").unwrap();
        assert_eq!(order, SortOrder::Asc);
        assert_eq!(SortOrder::default(), SortOrder::Desc);
        let by: ProductSortBy = serde_json::from_str("\"min_price\"").unwrap();
        assert!(matches!(by, ProductSortBy::MinPrice));
        assert!(serde_json::from_str::<ProductSortBy>("\"stock\"").is_err());
    }
}
