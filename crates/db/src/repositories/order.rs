use sqlx::Row;

use snoozy_core::domain::order::{Order, OrderId, OrderStatus, PaymentMethod};
use snoozy_core::domain::product::{MattressSize, ProductId};

use super::product::{decode_decimal, decode_timestamp};
use super::{OrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_by_order_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT order_id, product_id, product_name, size, quantity, unit_price, total, \
             status, delivery_address, payment_method, created_at \
             FROM customer_order WHERE order_id = ?1",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_order).transpose()
    }

    async fn insert(&self, order: Order) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO customer_order (order_id, product_id, product_name, size, quantity, \
             unit_price, total, status, delivery_address, payment_method, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&order.order_id.0)
        .bind(&order.product_id.0)
        .bind(&order.product_name)
        .bind(order.size.as_str())
        .bind(i64::from(order.quantity))
        .bind(order.unit_price.to_string())
        .bind(order.total.to_string())
        .bind(order.status.as_str())
        .bind(&order.delivery_address)
        .bind(order.payment_method.as_str())
        .bind(order.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn decode_order(row: sqlx::sqlite::SqliteRow) -> Result<Order, RepositoryError> {
    let size_raw = row.get::<String, _>("size");
    let size = size_raw
        .parse::<MattressSize>()
        .map_err(RepositoryError::Decode)?;

    let status_raw = row.get::<String, _>("status");
    let status: OrderStatus = serde_json::from_value(serde_json::Value::String(status_raw.clone()))
        .map_err(|_| RepositoryError::Decode(format!("unknown order status `{status_raw}`")))?;

    let payment_raw = row.get::<String, _>("payment_method");
    let payment_method: PaymentMethod =
        serde_json::from_value(serde_json::Value::String(payment_raw.clone()))
            .map_err(|_| RepositoryError::Decode(format!("unknown payment method `{payment_raw}`")))?;

    let quantity_raw = row.get::<i64, _>("quantity");
    let quantity = u32::try_from(quantity_raw)
        .map_err(|_| RepositoryError::Decode(format!("bad quantity `{quantity_raw}`")))?;

    Ok(Order {
        order_id: OrderId(row.get::<String, _>("order_id")),
        product_id: ProductId(row.get::<String, _>("product_id")),
        product_name: row.get("product_name"),
        size,
        quantity,
        unit_price: decode_decimal(&row.get::<String, _>("unit_price"))?,
        total: decode_decimal(&row.get::<String, _>("total"))?,
        status,
        delivery_address: row.get("delivery_address"),
        payment_method,
        created_at: decode_timestamp(&row.get::<String, _>("created_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use snoozy_core::domain::order::{Order, OrderId, OrderStatus, PaymentMethod};
    use snoozy_core::domain::product::{MattressSize, ProductId};

    use crate::connect_with_settings;
    use crate::migrations::run_pending;
    use crate::repositories::{OrderRepository, SqlOrderRepository};

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        let repo = SqlOrderRepository::new(pool);

        let order = Order {
            order_id: OrderId("EG250115093212-4f2a".to_string()),
            product_id: ProductId("eco-green".to_string()),
            product_name: "Eco Green Mattress".to_string(),
            size: MattressSize::TwinXl,
            quantity: 1,
            unit_price: Decimal::new(119_900, 2),
            total: Decimal::new(119_900, 2),
            status: OrderStatus::Confirmed,
            delivery_address: "123 Main St, Springfield, MA".to_string(),
            payment_method: PaymentMethod::CreditCard,
            created_at: Utc::now(),
        };

        repo.insert(order.clone()).await.expect("insert");

        let found = repo
            .find_by_order_id(&order.order_id)
            .await
            .expect("find")
            .expect("order should exist");
        assert_eq!(found.product_name, order.product_name);
        assert_eq!(found.size, MattressSize::TwinXl);
        assert_eq!(found.total, order.total);
        assert_eq!(found.status, OrderStatus::Confirmed);
        assert_eq!(found.payment_method, PaymentMethod::CreditCard);
    }

    #[tokio::test]
    async fn unknown_order_id_is_none() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrations");
        let repo = SqlOrderRepository::new(pool);

        let found = repo
            .find_by_order_id(&OrderId("XX000000000000-0000".to_string()))
            .await
            .expect("find");
        assert!(found.is_none());
    }
}
