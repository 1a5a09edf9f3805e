//! Catalog seeding command.
//!
//! Inserts a small set of jewelry products and variants for local
//! development. Re-running is safe: products are keyed by handle and
//! existing ones are left untouched.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

use super::{CommandError, connect};

struct SeedVariant {
    material: &'static str,
    purity: Option<&'static str>,
    selected_size: Option<&'static str>,
    price: &'static str,
    stock: i32,
    weight: &'static str,
    weight_unit: &'static str,
    hs_code: Option<&'static str>,
    country_of_origin: Option<&'static str>,
}

struct SeedProduct {
    handle: &'static str,
    title: &'static str,
    description: &'static str,
    main_image: Option<&'static str>,
    variants: &'static [SeedVariant],
}

const CATALOG: &[SeedProduct] = &[
    SeedProduct {
        handle: "aurora-solitaire-ring",
        title: "Aurora Solitaire Ring",
        description: "A hand-set lab diamond solitaire in recycled gold.",
        main_image: Some("https://cdn.aurelia-jewelry.com/products/aurora.jpg"),
        variants: &[
            SeedVariant {
                material: "18k yellow gold",
                purity: Some("750"),
                selected_size: Some("6"),
                price: "1290.00",
                stock: 4,
                weight: "3.8",
                weight_unit: "grams",
                hs_code: Some("7113.19"),
                country_of_origin: Some("IT"),
            },
            SeedVariant {
                material: "18k yellow gold",
                purity: Some("750"),
                selected_size: Some("7"),
                price: "1290.00",
                stock: 2,
                weight: "3.9",
                weight_unit: "grams",
                hs_code: Some("7113.19"),
                country_of_origin: Some("IT"),
            },
            SeedVariant {
                material: "platinum",
                purity: Some("950"),
                selected_size: Some("6"),
                price: "1890.00",
                stock: 1,
                weight: "5.1",
                weight_unit: "grams",
                hs_code: Some("7113.19"),
                country_of_origin: Some("IT"),
            },
        ],
    },
    SeedProduct {
        handle: "lumen-curb-chain",
        title: "Lumen Curb Chain",
        description: "A substantial curb chain with a hidden box clasp.",
        main_image: Some("https://cdn.aurelia-jewelry.com/products/lumen.jpg"),
        variants: &[
            SeedVariant {
                material: "sterling silver",
                purity: Some("925"),
                selected_size: Some("18\""),
                price: "240.00",
                stock: 12,
                weight: "22.4",
                weight_unit: "grams",
                hs_code: Some("7113.11"),
                country_of_origin: Some("US"),
            },
            SeedVariant {
                material: "sterling silver",
                purity: Some("925"),
                selected_size: Some("20\""),
                price: "265.00",
                stock: 9,
                weight: "24.9",
                weight_unit: "grams",
                hs_code: Some("7113.11"),
                country_of_origin: Some("US"),
            },
        ],
    },
    SeedProduct {
        handle: "selene-pearl-studs",
        title: "Selene Pearl Studs",
        description: "Akoya pearl studs on hand-finished posts.",
        main_image: Some("https://cdn.aurelia-jewelry.com/products/selene.jpg"),
        variants: &[SeedVariant {
            material: "14k white gold",
            purity: Some("585"),
            selected_size: None,
            price: "420.00",
            stock: 7,
            weight: "2.6",
            weight_unit: "grams",
            hs_code: Some("7116.10"),
            country_of_origin: Some("JP"),
        }],
    },
];

/// Seed the catalog.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    let mut inserted = 0usize;
    for product in CATALOG {
        if seed_product(&pool, product).await? {
            inserted += 1;
        }
    }

    info!(
        inserted,
        skipped = CATALOG.len() - inserted,
        "Catalog seeding complete"
    );
    Ok(())
}

/// Insert one product and its variants. Returns `false` if the handle
/// already existed.
async fn seed_product(pool: &PgPool, product: &SeedProduct) -> Result<bool, CommandError> {
    let mut tx = pool.begin().await?;

    let row: Option<(i64,)> = sqlx::query_as(
        r"
        INSERT INTO product (handle, title, description, main_image)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (handle) DO NOTHING
        RETURNING id
        ",
    )
    .bind(product.handle)
    .bind(product.title)
    .bind(product.description)
    .bind(product.main_image)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((product_id,)) = row else {
        info!(handle = product.handle, "Product already seeded, skipping");
        return Ok(false);
    };

    for variant in product.variants {
        let price: Decimal = variant.price.parse().unwrap_or_default();
        let weight: Decimal = variant.weight.parse().unwrap_or_default();

        sqlx::query(
            r"
            INSERT INTO variant (
                product_id, material, purity, selected_size, price, currency,
                stock, weight, weight_unit, hs_code, country_of_origin
            )
            VALUES ($1, $2, $3, $4, $5, 'USD', $6, $7, $8, $9, $10)
            ",
        )
        .bind(product_id)
        .bind(variant.material)
        .bind(variant.purity)
        .bind(variant.selected_size)
        .bind(price)
        .bind(variant.stock)
        .bind(weight)
        .bind(variant.weight_unit)
        .bind(variant.hs_code)
        .bind(variant.country_of_origin)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(
        handle = product.handle,
        variants = product.variants.len(),
        "Seeded product"
    );
    Ok(true)
}
