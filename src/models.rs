use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

/// Declares a string-backed enum stored as TEXT and serialized in SCREAMING_SNAKE_CASE.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(AppError::BadRequest(format!(
                        concat!("Invalid ", stringify!($name), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum!(Role {
    Admin => "ADMIN",
    User => "USER",
});

text_enum!(OrderStatus {
    Pending => "PENDING",
    Processing => "PROCESSING",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
    Returned => "RETURNED",
    Refunded => "REFUNDED",
});

text_enum!(PaymentStatus {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Failed => "FAILED",
    Refunded => "REFUNDED",
    Cancelled => "CANCELLED",
});

text_enum!(DeliveryStatus {
    Preparing => "PREPARING",
    Delivering => "DELIVERING",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

text_enum!(
    /// Couriers offered at checkout.
    DeliveryMethod {
        ViettelPost => "VIETTEL_POST",
        GrabExpress => "GRAB_EXPRESS",
        ShopeeExpress => "SHOPEE_EXPRESS",
        RaumaniaExpress => "RAUMANIA_EXPRESS",
    }
);

text_enum!(PaymentMethod {
    Cash => "CASH",
    BankTransfer => "BANK_TRANSFER",
    CreditCard => "CREDIT_CARD",
    DebitCard => "DEBIT_CARD",
    Paypal => "PAYPAL",
    Stripe => "STRIPE",
    GooglePay => "GOOGLE_PAY",
    ApplePay => "APPLE_PAY",
    Cryptocurrency => "CRYPTOCURRENCY",
    Other => "OTHER",
});

impl DeliveryMethod {
    /// Flat delivery fee in minor currency units.
    pub fn fee(&self) -> i64 {
        match self {
            DeliveryMethod::ViettelPost => 2500,
            DeliveryMethod::GrabExpress => 3500,
            DeliveryMethod::ShopeeExpress => 2000,
            DeliveryMethod::RaumaniaExpress => 3600,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub image_url: Option<String>,
    pub role: String,
    pub email_verified: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub house_number: String,
    pub street_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct BrandName {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub size: String,
    pub scent: String,
    pub stock: i32,
    pub price: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductImage {
    pub id: Uuid,
    pub image: String,
}

/// Row shape of catalog listings and search results.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub brand_name: Option<String>,
    pub thumbnail_image: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct RelatedProduct {
    pub id: Uuid,
    pub name: String,
    pub thumbnail_image: Option<String>,
    pub min_price: Option<i64>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReviewStatistic {
    pub average_rating: f64,
    pub total_reviews: i64,
    pub five_star_reviews: i64,
    pub four_star_reviews: i64,
    pub three_star_reviews: i64,
    pub two_star_reviews: i64,
    pub one_star_reviews: i64,
}

impl ReviewStatistic {
    /// Builds the statistic from per-star counts, index 0 holding one-star reviews.
    pub fn from_star_counts(counts: [i64; 5]) -> Self {
        let total: i64 = counts.iter().sum();
        let average_rating = if total == 0 {
            0.0
        } else {
            let weighted: i64 = counts
                .iter()
                .enumerate()
                .map(|(idx, count)| (idx as i64 + 1) * count)
                .sum();
            (weighted as f64 / total as f64 * 10.0).round() / 10.0
        };
        Self {
            average_rating,
            total_reviews: total,
            one_star_reviews: counts[0],
            two_star_reviews: counts[1],
            three_star_reviews: counts[2],
            four_star_reviews: counts[3],
            five_star_reviews: counts[4],
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_variant_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub rating: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductDetail {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub product_material: Option<String>,
    pub inspiration: Option<String>,
    pub usage_instructions: Option<String>,
    pub thumbnail_image: Option<String>,
    pub is_active: bool,
    pub brand_id: Option<Uuid>,
    pub brand_name: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub product_variants: Vec<ProductVariant>,
    pub product_images: Vec<ProductImage>,
    pub five_latest_reviews: Vec<Review>,
    pub review_statistic: ReviewStatistic,
    pub related_products: Vec<RelatedProduct>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct CartItem {
    pub id: Uuid,
    pub product_variant_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub thumbnail_image: Option<String>,
    pub variant_name: String,
    pub size: String,
    pub scent: String,
    pub stock: i32,
    pub unit_price: i64,
    pub quantity: i32,
    pub line_total: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<CartItem>,
    pub total_items: i64,
    pub subtotal: i64,
}

impl Cart {
    pub fn new(id: Uuid, user_id: Uuid, items: Vec<CartItem>) -> Self {
        let total_items = items.iter().map(|item| item.quantity as i64).sum();
        let subtotal = items.iter().map(|item| item.line_total).sum();
        Self {
            id,
            user_id,
            items,
            total_items,
            subtotal,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_variant_id: Uuid,
    pub product_name: String,
    pub product_description: Option<String>,
    pub product_thumbnail: Option<String>,
    pub product_variant_name: String,
    pub product_variant_size: String,
    pub product_variant_scent: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total_price: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub total_amount: i64,
    pub delivery_fee: i64,
    pub order_status: String,
    pub payment_status: String,
    pub delivery_status: String,
    pub delivery_method: String,
    pub payment_method: String,
    pub house_number: String,
    pub street_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    pub order_items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub product_variant_name: Option<String>,
    pub product_variant_size: Option<String>,
    pub product_variant_scent: Option<String>,
    pub quantity: i64,
    pub delivery_status: String,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
}

mod convert {
    use chrono::Utc;

    use super::*;
    use crate::entity::{
        addresses, brands, order_items, product_images, product_variants, users,
    };

    impl From<users::Model> for User {
        fn from(model: users::Model) -> Self {
            Self {
                id: model.id,
                username: model.username,
                email: model.email,
                full_name: model.full_name,
                phone_number: model.phone_number,
                image_url: model.image_url,
                role: model.role,
                email_verified: model.email_verified,
                is_active: model.is_active,
                created_at: model.created_at.with_timezone(&Utc),
            }
        }
    }

    impl From<addresses::Model> for Address {
        fn from(model: addresses::Model) -> Self {
            Self {
                id: model.id,
                user_id: model.user_id,
                house_number: model.house_number,
                street_name: model.street_name,
                city: model.city,
                state: model.state,
                country: model.country,
                postal_code: model.postal_code,
                created_at: model.created_at.with_timezone(&Utc),
                updated_at: model.updated_at.with_timezone(&Utc),
            }
        }
    }

    impl From<brands::Model> for Brand {
        fn from(model: brands::Model) -> Self {
            Self {
                id: model.id,
                name: model.name,
                description: model.description,
                created_at: model.created_at.with_timezone(&Utc),
                updated_at: model.updated_at.with_timezone(&Utc),
            }
        }
    }

    impl From<product_variants::Model> for ProductVariant {
        fn from(model: product_variants::Model) -> Self {
            Self {
                id: model.id,
                product_id: model.product_id,
                name: model.name,
                size: model.size,
                scent: model.scent,
                stock: model.stock,
                price: model.price,
            }
        }
    }

    impl From<product_images::Model> for ProductImage {
        fn from(model: product_images::Model) -> Self {
            Self {
                id: model.id,
                image: model.image,
            }
        }
    }

    impl From<order_items::Model> for OrderItem {
        fn from(model: order_items::Model) -> Self {
            Self {
                id: model.id,
                product_id: model.product_id,
                product_variant_id: model.product_variant_id,
                product_name: model.product_name,
                product_description: model.product_description,
                product_thumbnail: model.product_thumbnail,
                product_variant_name: model.product_variant_name,
                product_variant_size: model.product_variant_size,
                product_variant_scent: model.product_variant_scent,
                quantity: model.quantity,
                unit_price: model.unit_price,
                total_price: model.total_price,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_fees_per_courier() {
        assert_eq!(DeliveryMethod::ViettelPost.fee(), 2500);
        assert_eq!(DeliveryMethod::GrabExpress.fee(), 3500);
        assert_eq!(DeliveryMethod::ShopeeExpress.fee(), 2000);
        assert_eq!(DeliveryMethod::RaumaniaExpress.fee(), 3600);
    }

    #[test]
    fn status_text_is_screaming_snake_case() {
        assert_eq!(DeliveryMethod::RaumaniaExpress.as_str(), "RAUMANIA_EXPRESS");
        assert_eq!(
            "BANK_TRANSFER".parse::<PaymentMethod>().ok(),
            Some(PaymentMethod::BankTransfer)
        );
        assert!("shipped".parse::<OrderStatus>().is_err());

        let json = serde_json::to_string(&PaymentStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        let parsed: DeliveryStatus = serde_json::from_str("\"DELIVERING\"").unwrap();
        assert_eq!(parsed, DeliveryStatus::Delivering);
    }

    #[test]
    fn every_status_is_listed_once() {
        assert_eq!(OrderStatus::ALL.len(), 7);
        assert_eq!(PaymentStatus::ALL.len(), 5);
        assert_eq!(DeliveryStatus::ALL.len(), 4);
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().ok(), Some(*status));
        }
    }

    #[test]
    fn review_statistic_rounds_average_to_one_decimal() {
        // 2x5, 1x4, 0x3, 0x2, 1x1 -> 15 / 4 = 3.75
        let stats = ReviewStatistic::from_star_counts([1, 0, 0, 1, 2]);
        assert_eq!(stats.total_reviews, 4);
        assert_eq!(stats.average_rating, 3.8);
        assert_eq!(stats.five_star_reviews, 2);
        assert_eq!(stats.one_star_reviews, 1);

        let empty = ReviewStatistic::from_star_counts([0; 5]);
        assert_eq!(empty, ReviewStatistic::default());
    }

    #[test]
    fn cart_totals_sum_lines() {
        let item = |quantity: i32, unit_price: i64| CartItem {
            id: Uuid::new_v4(),
            product_variant_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Santal Noir".into(),
            thumbnail_image: None,
            variant_name: "EDP".into(),
            size: "50ml".into(),
            scent: "Woody".into(),
            stock: 10,
            unit_price,
            quantity,
            line_total: unit_price * quantity as i64,
        };

        let cart = Cart::new(Uuid::new_v4(), Uuid::new_v4(), vec![item(2, 12_000), item(1, 5_500)]);
        assert_eq!(cart.total_items, 3);
        assert_eq!(cart.subtotal, 29_500);

        let empty = Cart::new(Uuid::new_v4(), Uuid::new_v4(), Vec::new());
        assert_eq!(empty.total_items, 0);
        assert_eq!(empty.subtotal, 0);
    }
}
