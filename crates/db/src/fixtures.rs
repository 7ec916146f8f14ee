use sqlx::{Executor, Row};

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Seed contract for the demo store: the six-mattress catalog plus fifty
/// customer reviews.
const SEED_PRODUCT_IDS: &[&str] = &[
    "dream-sleep",
    "eco-green",
    "essential-plus",
    "luxury-cloud",
    "performance-sport",
    "ultra-comfort-mattress",
];

const SEED_REVIEW_COUNT: i64 = 50;

/// Deterministic catalog and review fixture.
///
/// Idempotent by construction: products upsert on id, reviews upsert on
/// (product_id, customer_id), so reseeding an existing database converges to
/// the same state.
pub struct StoreSeedDataset;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub products: usize,
    pub reviews: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub passed: bool,
    pub checks: Vec<SeedCheck>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl StoreSeedDataset {
    pub const SQL: &'static str = include_str!("../../../config/fixtures/store_seed.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            products: SEED_PRODUCT_IDS.len(),
            reviews: SEED_REVIEW_COUNT as usize,
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let product_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
            .fetch_one(pool)
            .await?;
        checks.push(SeedCheck {
            name: "product_count".to_string(),
            passed: product_count == SEED_PRODUCT_IDS.len() as i64,
            detail: format!("expected {}, found {product_count}", SEED_PRODUCT_IDS.len()),
        });

        let review_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM review").fetch_one(pool).await?;
        checks.push(SeedCheck {
            name: "review_count".to_string(),
            passed: review_count == SEED_REVIEW_COUNT,
            detail: format!("expected {SEED_REVIEW_COUNT}, found {review_count}"),
        });

        for product_id in SEED_PRODUCT_IDS {
            let present: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM product WHERE id = ?1")
                    .bind(product_id)
                    .fetch_one(pool)
                    .await?;
            checks.push(SeedCheck {
                name: format!("product:{product_id}"),
                passed: present == 1,
                detail: format!("found {present} rows"),
            });
        }

        let flagship_price: Option<String> =
            sqlx::query("SELECT price FROM product WHERE id = 'ultra-comfort-mattress'")
                .fetch_optional(pool)
                .await?
                .map(|row| row.get::<String, _>("price"));
        checks.push(SeedCheck {
            name: "flagship_price".to_string(),
            passed: flagship_price.as_deref() == Some("1299.00"),
            detail: format!("found {flagship_price:?}"),
        });

        let ratings_in_range: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM review WHERE rating BETWEEN 1 AND 5")
                .fetch_one(pool)
                .await?;
        checks.push(SeedCheck {
            name: "ratings_in_range".to_string(),
            passed: ratings_in_range == review_count,
            detail: format!("{ratings_in_range} of {review_count} in range"),
        });

        let passed = checks.iter().all(|check| check.passed);
        Ok(VerificationResult { passed, checks })
    }
}
