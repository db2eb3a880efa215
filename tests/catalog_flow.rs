mod common;

use raumania_api::{
    dto::{
        brands::BrandRequest,
        reviews::{CreateReviewRequest, UpdateReviewRequest},
        variants::CreateVariantRequest,
    },
    error::AppError,
    routes::params::{
        KeywordQuery, LimitQuery, Pagination, ProductFilterQuery, ProductListQuery,
        ReviewFilterQuery,
    },
    services::{brand_service, product_service, review_service, variant_service},
};

// Integration flow: brands, products and variants keep the price range and filters consistent.
#[tokio::test]
async fn catalog_price_range_search_and_reviews() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        return Ok(());
    };
    let _db = common::lock_db().await;
    let state = common::setup_state(&database_url).await?;
    let admin = common::admin();

    let lune_id = common::create_brand(&state, &admin, "Maison Lune").await?;
    common::create_brand(&state, &admin, "Cedar & Salt").await?;

    let duplicate = brand_service::create_brand(
        &state,
        &admin,
        BrandRequest {
            name: "MAISON LUNE".into(),
            description: None,
        },
    )
    .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let unknown_brand = common::create_product(
        &state,
        &admin,
        "Nowhere",
        "Ghost Note",
        common::variant("Eau de Parfum", "50ml", 1, 10_000),
    )
    .await;
    assert!(unknown_brand.is_err());

    let iris = common::create_product(
        &state,
        &admin,
        "Maison Lune",
        "Moonlit Iris",
        common::variant("Eau de Parfum", "50ml", 10, 50_000),
    )
    .await?;
    assert_eq!(iris.min_price, Some(50_000));
    assert_eq!(iris.max_price, Some(50_000));
    assert_eq!(iris.product_images.len(), 1);

    let driftwood = common::create_product(
        &state,
        &admin,
        "Cedar & Salt",
        "Driftwood",
        common::variant("Eau de Toilette", "100ml", 4, 120_000),
    )
    .await?;

    let large = variant_service::create_variant(
        &state,
        &admin,
        CreateVariantRequest {
            product_id: iris.id,
            variant: common::variant("Eau de Parfum", "100ml", 3, 90_000),
        },
    )
    .await?
    .data
    .expect("variant");

    let same_again = variant_service::create_variant(
        &state,
        &admin,
        CreateVariantRequest {
            product_id: iris.id,
            variant: common::variant("Eau de Parfum", "100ml", 1, 95_000),
        },
    )
    .await;
    assert!(matches!(same_again, Err(AppError::Conflict(_))));

    let detail = product_service::get_product(&state, iris.id).await?.data.expect("detail");
    assert_eq!(detail.min_price, Some(50_000));
    assert_eq!(detail.max_price, Some(90_000));
    assert_eq!(detail.product_variants.len(), 2);
    assert_eq!(detail.brand_name.as_deref(), Some("Maison Lune"));
    assert!(detail.related_products.iter().all(|p| p.id != iris.id));

    // Price ranges overlap: iris spans 50k..90k, driftwood is 120k
    let in_range = product_service::search_products(
        &state,
        Pagination::default(),
        ProductListQuery::default(),
        ProductFilterQuery {
            min_price: Some(80_000),
            max_price: Some(100_000),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("products");
    assert_eq!(in_range.items.len(), 1);
    assert_eq!(in_range.items[0].id, iris.id);

    let by_size = product_service::search_products(
        &state,
        Pagination::default(),
        ProductListQuery::default(),
        ProductFilterQuery {
            size: Some("100ML".into()),
            brand_name: Some("cedar & salt".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("products");
    assert_eq!(by_size.items.len(), 1);
    assert_eq!(by_size.items[0].id, driftwood.id);

    let keyword = product_service::search_by_keyword(
        &state,
        Pagination::default(),
        ProductListQuery::default(),
        ProductFilterQuery::default(),
        KeywordQuery {
            keyword: Some("toilette".into()),
        },
    )
    .await?
    .data
    .expect("products");
    assert_eq!(keyword.items.len(), 1);
    assert_eq!(keyword.items[0].id, driftwood.id);

    let filters = product_service::list_filters(&state).await?.data.expect("filters");
    assert_eq!(filters.sizes, vec!["100ml".to_string(), "50ml".to_string()]);
    assert_eq!(filters.brands.len(), 2);

    let related = product_service::list_related(&state, LimitQuery { limit: Some(50) })
        .await?
        .data
        .expect("related");
    assert_eq!(related.items.len(), 2);

    variant_service::delete_variant(&state, &admin, large.id).await?;
    let detail = product_service::get_product(&state, iris.id).await?.data.expect("detail");
    assert_eq!(detail.max_price, Some(50_000));

    let last = variant_service::delete_variant(&state, &admin, detail.product_variants[0].id).await;
    assert!(matches!(last, Err(AppError::BadRequest(_))));

    // Reviews feed the product statistic
    let reviewer = common::register(&state, "reviewer01").await?;
    let variant_id = detail.product_variants[0].id;
    let out_of_range = review_service::create_my_review(
        &state,
        &reviewer,
        CreateReviewRequest {
            product_id: iris.id,
            product_variant_id: variant_id,
            rating: 6,
            content: "Too good".into(),
        },
    )
    .await;
    assert!(matches!(out_of_range, Err(AppError::BadRequest(_))));

    let wrong_product = review_service::create_my_review(
        &state,
        &reviewer,
        CreateReviewRequest {
            product_id: driftwood.id,
            product_variant_id: variant_id,
            rating: 4,
            content: "Lovely".into(),
        },
    )
    .await;
    assert!(matches!(wrong_product, Err(AppError::BadRequest(_))));

    let review = review_service::create_my_review(
        &state,
        &reviewer,
        CreateReviewRequest {
            product_id: iris.id,
            product_variant_id: variant_id,
            rating: 3,
            content: "Soft and powdery".into(),
        },
    )
    .await?
    .data
    .expect("review");
    assert_eq!(review.user_name, "reviewer01");

    review_service::update_my_review(
        &state,
        &reviewer,
        UpdateReviewRequest {
            review_id: review.id,
            rating: 5,
            content: "Grew on me".into(),
        },
    )
    .await?;

    let other = common::register(&state, "otheruser01").await?;
    let not_mine = review_service::delete_my_review(&state, &other, review.id).await;
    assert!(matches!(not_mine, Err(AppError::NotFound(_))));

    let detail = product_service::get_product(&state, iris.id).await?.data.expect("detail");
    assert_eq!(detail.review_statistic.total_reviews, 1);
    assert_eq!(detail.review_statistic.five_star_reviews, 1);
    assert_eq!(detail.review_statistic.average_rating, 5.0);
    assert_eq!(detail.five_latest_reviews.len(), 1);

    let filtered = review_service::filter_reviews(
        &state,
        Pagination::default(),
        ReviewFilterQuery {
            username: Some("REVIEWER".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("reviews");
    assert_eq!(filtered.items.len(), 1);

    // Deleting a brand leaves its products without one
    brand_service::delete_brand(&state, &admin, lune_id).await?;
    let detail = product_service::get_product(&state, iris.id).await?.data.expect("detail");
    assert_eq!(detail.brand_id, None);

    Ok(())
}

#[tokio::test]
async fn racing_deletes_keep_one_variant() -> anyhow::Result<()> {
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
        "Maison Lune",
        "Velvet Fig",
        common::variant("Eau de Parfum", "50ml", 4, 70_000),
    )
    .await?;
    let second = variant_service::create_variant(
        &state,
        &admin,
        CreateVariantRequest {
            product_id: product.id,
            variant: common::variant("Eau de Parfum", "100ml", 4, 110_000),
        },
    )
    .await?
    .data
    .expect("variant");

    let (a, b) = tokio::join!(
        variant_service::delete_variant(&state, &admin, product.product_variants[0].id),
        variant_service::delete_variant(&state, &admin, second.id),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let refused = if a.is_err() { a } else { b };
    assert!(matches!(refused, Err(AppError::BadRequest(_))));

    let left = variant_service::list_by_product(
        &state,
        product.id,
        Pagination::default(),
        Default::default(),
    )
    .await?;
    assert_eq!(left.meta.as_ref().and_then(|m| m.total), Some(1));

    Ok(())
}
