use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use snoozy_core::domain::product::{MattressSize, Product, ProductId};

use super::{ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const PRODUCT_COLUMNS: &str = "id, name, price, product_type, height, construction_layers, \
     key_features, best_for, available_sizes, warranty, trial_period, created_at";

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?1 COLLATE NOCASE"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_product).transpose()
    }

    async fn find_by_name_prefix(&self, prefix: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE name LIKE ?1 || '%' ORDER BY id LIMIT 1"
        ))
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_product).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM product ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(decode_product).collect()
    }

    async fn upsert(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product (id, name, price, product_type, height, construction_layers, \
             key_features, best_for, available_sizes, warranty, trial_period, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12) \
             ON CONFLICT (id) DO UPDATE SET name = excluded.name, price = excluded.price, \
             product_type = excluded.product_type, height = excluded.height, \
             construction_layers = excluded.construction_layers, \
             key_features = excluded.key_features, best_for = excluded.best_for, \
             available_sizes = excluded.available_sizes, warranty = excluded.warranty, \
             trial_period = excluded.trial_period",
        )
        .bind(&product.id.0)
        .bind(&product.name)
        .bind(product.price.to_string())
        .bind(&product.kind)
        .bind(&product.height)
        .bind(encode_json(&product.construction_layers)?)
        .bind(encode_json(&product.key_features)?)
        .bind(encode_json(&product.best_for)?)
        .bind(encode_json(&product.available_sizes)?)
        .bind(&product.warranty)
        .bind(&product.trial_period)
        .bind(product.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn decode_product(row: sqlx::sqlite::SqliteRow) -> Result<Product, RepositoryError> {
    Ok(Product {
        id: ProductId(row.get::<String, _>("id")),
        name: row.get("name"),
        price: decode_decimal(&row.get::<String, _>("price"))?,
        kind: row.get("product_type"),
        height: row.get("height"),
        construction_layers: decode_json(&row.get::<String, _>("construction_layers"))?,
        key_features: decode_json(&row.get::<String, _>("key_features"))?,
        best_for: decode_json(&row.get::<String, _>("best_for"))?,
        available_sizes: decode_json::<Vec<MattressSize>>(
            &row.get::<String, _>("available_sizes"),
        )?,
        warranty: row.get("warranty"),
        trial_period: row.get("trial_period"),
        created_at: decode_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

pub(crate) fn decode_decimal(raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw).map_err(|err| RepositoryError::Decode(format!("bad decimal `{raw}`: {err}")))
}

pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| RepositoryError::Decode(format!("bad timestamp `{raw}`: {err}")))
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    raw: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(raw).map_err(|err| RepositoryError::Decode(format!("bad json `{raw}`: {err}")))
}

pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value).map_err(|err| RepositoryError::Decode(err.to_string()))
}
