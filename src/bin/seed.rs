use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use raumania_api::{
    config::AppConfig,
    db::create_pool,
    models::Role,
};
use uuid::Uuid;

struct SeedVariant {
    name: &'static str,
    size: &'static str,
    scent: &'static str,
    stock: i32,
    price: i64,
}

struct SeedProduct {
    brand: &'static str,
    name: &'static str,
    description: &'static str,
    inspiration: &'static str,
    variants: &'static [SeedVariant],
}

const BRANDS: &[(&str, &str)] = &[
    ("Maison Lune", "Soft, powdery fragrances inspired by night gardens"),
    ("Cedar & Salt", "Woody and marine compositions"),
    ("Atelier Saffron", "Warm oriental blends"),
];

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        brand: "Maison Lune",
        name: "Moonlit Iris",
        description: "Iris and white musk over a vanilla base",
        inspiration: "A quiet walk after midnight",
        variants: &[
            SeedVariant { name: "Eau de Parfum", size: "50ml", scent: "Floral", stock: 40, price: 89_000 },
            SeedVariant { name: "Eau de Parfum", size: "100ml", scent: "Floral", stock: 25, price: 139_000 },
        ],
    },
    SeedProduct {
        brand: "Cedar & Salt",
        name: "Driftwood",
        description: "Cedarwood, sea salt and vetiver",
        inspiration: "Morning on the northern coast",
        variants: &[
            SeedVariant { name: "Eau de Toilette", size: "30ml", scent: "Woody", stock: 60, price: 45_000 },
            SeedVariant { name: "Eau de Toilette", size: "100ml", scent: "Woody", stock: 30, price: 98_000 },
        ],
    },
    SeedProduct {
        brand: "Atelier Saffron",
        name: "Amber Road",
        description: "Saffron, amber and smoked oud",
        inspiration: "Spice markets at dusk",
        variants: &[
            SeedVariant { name: "Extrait", size: "50ml", scent: "Oriental", stock: 15, price: 175_000 },
        ],
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, config.max_connections).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "admin", "admin@raumania.test", "admin1234", Role::Admin).await?;
    let user_id = ensure_user(&pool, "customer", "customer@raumania.test", "customer1234", Role::User).await?;
    seed_catalog(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, username, email, password_hash, full_name, role, email_verified)
        VALUES ($1, $2, $3, $4, $5, $6, TRUE)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(username)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?;

    sqlx::query("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(pool)
        .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_catalog(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for (name, description) in BRANDS {
        sqlx::query(
            "INSERT INTO brands (id, name, description) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    }

    for product in PRODUCTS {
        let min_price = product.variants.iter().map(|v| v.price).min();
        let max_price = product.variants.iter().map(|v| v.price).max();

        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (id, brand_id, name, description, inspiration, min_price, max_price)
            SELECT $1, b.id, $3, $4, $5, $6, $7 FROM brands b WHERE b.name = $2
            ON CONFLICT (name) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.brand)
        .bind(product.name)
        .bind(product.description)
        .bind(product.inspiration)
        .bind(min_price)
        .bind(max_price)
        .fetch_optional(pool)
        .await?;

        let Some((product_id,)) = inserted else {
            continue;
        };
        for variant in product.variants {
            sqlx::query(
                r#"
                INSERT INTO product_variants (id, product_id, name, size, scent, stock, price)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (product_id, name, size, scent) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(product_id)
            .bind(variant.name)
            .bind(variant.size)
            .bind(variant.scent)
            .bind(variant.stock)
            .bind(variant.price)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded {} brands and {} products", BRANDS.len(), PRODUCTS.len());
    Ok(())
}
