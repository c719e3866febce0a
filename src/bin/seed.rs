use pharmacy_storefront::{config::AppConfig, db::create_pool};
use uuid::Uuid;

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    price: i64,
    discount_price: Option<i64>,
    image: &'static str,
    stock: i32,
}

const PRODUCTS: &[SeedProduct] = &[
    SeedProduct {
        name: "Napa 500mg (10 tablets)",
        description: "Paracetamol for fever and mild pain",
        price: 12,
        discount_price: None,
        image: "/images/napa-500.jpg",
        stock: 500,
    },
    SeedProduct {
        name: "Seclo 20mg (14 capsules)",
        description: "Omeprazole for acidity and ulcers",
        price: 84,
        discount_price: Some(78),
        image: "/images/seclo-20.jpg",
        stock: 200,
    },
    SeedProduct {
        name: "Digital Thermometer",
        description: "Fast-reading oral and underarm thermometer",
        price: 350,
        discount_price: Some(299),
        image: "/images/thermometer.jpg",
        stock: 40,
    },
    SeedProduct {
        name: "ORSaline-N (25 sachets)",
        description: "Oral rehydration salts",
        price: 150,
        discount_price: None,
        image: "/images/orsaline.jpg",
        stock: 120,
    },
    SeedProduct {
        name: "Surgical Face Mask (50 pcs)",
        description: "Three-ply disposable masks",
        price: 250,
        discount_price: Some(220),
        image: "/images/face-mask.jpg",
        stock: 5,
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    for product in PRODUCTS {
        let inserted = sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, discount_price, image, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.discount_price)
        .bind(product.image)
        .bind(product.stock)
        .execute(&pool)
        .await?
        .rows_affected();

        tracing::info!(name = product.name, inserted = inserted > 0, "seeded product");
    }

    tracing::info!(count = PRODUCTS.len(), "seed completed");
    Ok(())
}
