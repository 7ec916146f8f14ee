use sqlx::Row;

use snoozy_core::domain::product::ProductId;
use snoozy_core::domain::review::{Rating, Review};

use super::product::decode_timestamp;
use super::{RepositoryError, ReviewRepository};
use crate::DbPool;

pub struct SqlReviewRepository {
    pool: DbPool,
}

impl SqlReviewRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const REVIEW_COLUMNS: &str =
    "product_id, customer_id, rating, content, verified_purchase, created_at";

#[async_trait::async_trait]
impl ReviewRepository for SqlReviewRepository {
    async fn list_for_product(&self, id: &ProductId) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM review WHERE product_id = ?1 ORDER BY created_at, customer_id"
        ))
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_review).collect()
    }

    async fn list_all(&self) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {REVIEW_COLUMNS} FROM review ORDER BY product_id, created_at, customer_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_review).collect()
    }

    async fn insert(&self, review: Review) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO review (product_id, customer_id, rating, content, verified_purchase, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&review.product_id.0)
        .bind(&review.customer_id)
        .bind(i64::from(review.rating))
        .bind(&review.content)
        .bind(review.verified_purchase)
        .bind(review.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_seed(&self, review: Review) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM review WHERE product_id = ?1 AND customer_id = ?2")
            .bind(&review.product_id.0)
            .bind(&review.customer_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO review (product_id, customer_id, rating, content, verified_purchase, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&review.product_id.0)
        .bind(&review.customer_id)
        .bind(i64::from(review.rating))
        .bind(&review.content)
        .bind(review.verified_purchase)
        .bind(review.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn decode_review(row: sqlx::sqlite::SqliteRow) -> Result<Review, RepositoryError> {
    let rating = Rating::new(row.get::<i64, _>("rating"))
        .map_err(|err| RepositoryError::Decode(err.to_string()))?;

    Ok(Review {
        product_id: ProductId(row.get::<String, _>("product_id")),
        customer_id: row.get("customer_id"),
        rating,
        content: row.get("content"),
        verified_purchase: row.get("verified_purchase"),
        created_at: decode_timestamp(&row.get::<String, _>("created_at"))?,
    })
}
