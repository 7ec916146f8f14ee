use async_trait::async_trait;
use thiserror::Error;

use snoozy_core::domain::order::{Order, OrderId};
use snoozy_core::domain::product::{Product, ProductId};
use snoozy_core::domain::review::Review;

pub mod memory;
pub mod order;
pub mod product;
pub mod review;

pub use memory::{InMemoryOrderRepository, InMemoryProductRepository, InMemoryReviewRepository};
pub use order::SqlOrderRepository;
pub use product::SqlProductRepository;
pub use review::SqlReviewRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Read-mostly catalog access. `upsert` exists for seeding; the support flow
/// never mutates products.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Case-insensitive match on a name prefix, mirroring the store's
    /// `^prefix` regex lookup.
    async fn find_by_name_prefix(&self, prefix: &str) -> Result<Option<Product>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn upsert(&self, product: Product) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn list_for_product(&self, id: &ProductId) -> Result<Vec<Review>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<Review>, RepositoryError>;

    async fn insert(&self, review: Review) -> Result<(), RepositoryError>;

    /// Seed-time upsert keyed by (product_id, customer_id). There is no
    /// table-level uniqueness, so the implementation replaces any prior row
    /// for that key before inserting.
    async fn upsert_seed(&self, review: Review) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_order_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn insert(&self, order: Order) -> Result<(), RepositoryError>;
}
