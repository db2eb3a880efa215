use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        addresses::{AddressList, AddressRequest, AdminCreateAddressRequest},
        auth::{
            ForgotPasswordRequest, LoginRequest, RefreshRequest, RegisterRequest,
            ResetPasswordRequest, TokenResponse,
        },
        brands::{BrandList, BrandNameList, BrandRequest},
        cart::{AddToCartRequest, UpdateCartItemRequest},
        dashboard::{DashboardSummary, RecentOrderList, RecentReviewList, StatusCountList},
        orders::{
            CheckoutRequest, OrderList, OrderStatusCounts, OrderSummaryList,
            UpdateOrderStatusRequest,
        },
        products::{
            CreateProductRequest, ImageUrlsRequest, ProductFilters, ProductImageList, ProductList,
            RelatedProductList, UpdateProductRequest,
        },
        reviews::{AdminCreateReviewRequest, CreateReviewRequest, ReviewList, UpdateReviewRequest},
        users::{AdminUpdateUserRequest, CreateUserRequest, UpdateMyInfoRequest, UpdatePasswordRequest, UserList},
        variants::{CreateVariantRequest, VariantFields, VariantList},
    },
    models::{
        Address, Brand, Cart, CartItem, DeliveryMethod, DeliveryStatus, Order, OrderItem,
        OrderStatus, PaymentMethod, PaymentStatus, ProductDetail, ProductVariant, Review, Role,
        User,
    },
    response::{ApiResponse, Meta},
    routes::{
        addresses, auth, brands, cart, dashboard, health, orders, params, products, reviews,
        users, variants,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::refresh,
        auth::logout,
        auth::forgot_password,
        auth::reset_password,
        users::my_info,
        users::update_my_info,
        users::update_password,
        users::create_user,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::list_users,
        users::search_users,
        addresses::create_my_address,
        addresses::list_my_addresses,
        addresses::update_my_address,
        addresses::delete_my_address,
        addresses::create_address,
        addresses::get_address,
        addresses::update_address,
        addresses::delete_address,
        brands::create_brand,
        brands::update_brand,
        brands::get_brand,
        brands::list_brand_names,
        brands::delete_brand,
        brands::list_brands,
        brands::search_brands,
        brands::list_brand_products,
        products::create_product,
        products::update_product,
        products::get_product,
        products::delete_product,
        products::add_images,
        products::delete_image,
        products::list_products,
        products::search_products,
        products::search_by_keyword,
        products::list_related,
        products::list_filters,
        variants::create_variant,
        variants::update_variant,
        variants::get_variant,
        variants::list_by_product,
        variants::delete_variant,
        cart::get_my_cart,
        cart::add_to_my_cart,
        cart::update_my_cart_item,
        cart::remove_from_my_cart,
        cart::get_user_cart,
        cart::add_to_user_cart,
        cart::update_user_cart_item,
        cart::remove_from_user_cart,
        orders::checkout,
        orders::pay_order,
        orders::my_orders,
        orders::get_order,
        orders::status_counts,
        orders::update_status,
        orders::delete_order,
        orders::list_all_orders,
        reviews::create_my_review,
        reviews::update_my_review,
        reviews::delete_my_review,
        reviews::create_review,
        reviews::update_review,
        reviews::get_review,
        reviews::delete_review,
        reviews::filter_reviews,
        reviews::list_all_reviews,
        dashboard::summary,
        dashboard::orders_by_status,
        dashboard::recent_orders,
        dashboard::recent_reviews
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            PaymentStatus,
            DeliveryStatus,
            DeliveryMethod,
            PaymentMethod,
            User,
            Address,
            Brand,
            ProductVariant,
            ProductDetail,
            Review,
            Cart,
            CartItem,
            Order,
            OrderItem,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            TokenResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            UpdateMyInfoRequest,
            UpdatePasswordRequest,
            CreateUserRequest,
            AdminUpdateUserRequest,
            UserList,
            AddressRequest,
            AdminCreateAddressRequest,
            AddressList,
            BrandRequest,
            BrandList,
            BrandNameList,
            CreateProductRequest,
            UpdateProductRequest,
            ImageUrlsRequest,
            ProductList,
            ProductImageList,
            RelatedProductList,
            ProductFilters,
            VariantFields,
            CreateVariantRequest,
            VariantList,
            AddToCartRequest,
            UpdateCartItemRequest,
            CheckoutRequest,
            UpdateOrderStatusRequest,
            OrderList,
            OrderSummaryList,
            OrderStatusCounts,
            CreateReviewRequest,
            AdminCreateReviewRequest,
            UpdateReviewRequest,
            ReviewList,
            DashboardSummary,
            StatusCountList,
            RecentOrderList,
            RecentReviewList,
            params::Pagination,
            Meta,
            ApiResponse<TokenResponse>,
            ApiResponse<ProductDetail>,
            ApiResponse<Cart>,
            ApiResponse<Order>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and password reset"),
        (name = "Users", description = "Profile and user administration"),
        (name = "Addresses", description = "Shipping addresses"),
        (name = "Brands", description = "Perfume brands"),
        (name = "Products", description = "Catalog, search and filters"),
        (name = "Product variants", description = "Sizes, scents, stock and prices"),
        (name = "Cart", description = "Shopping cart"),
        (name = "Orders", description = "Checkout, payment and order administration"),
        (name = "Reviews", description = "Product reviews"),
        (name = "Dashboard", description = "Admin dashboard statistics"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_router() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/auth/login",
            "/api/user/my-info",
            "/api/address/my",
            "/api/brand/{id}/products",
            "/api/product/search-es",
            "/api/product-variant/product/{product_id}",
            "/api/cart/user/{user_id}/remove/{cart_item_id}",
            "/api/orders/{id}/pay",
            "/api/review/filter",
            "/api/admin/dashboard/summary",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
