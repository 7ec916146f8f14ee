use std::collections::HashMap;

use tokio::sync::RwLock;

use snoozy_core::domain::order::{Order, OrderId};
use snoozy_core::domain::product::{Product, ProductId};
use snoozy_core::domain::review::Review;

use super::{OrderRepository, ProductRepository, RepositoryError, ReviewRepository};

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
}

impl InMemoryProductRepository {
    pub async fn with_products(products: Vec<Product>) -> Self {
        let repo = Self::default();
        {
            let mut map = repo.products.write().await;
            for product in products {
                map.insert(product.id.0.clone(), product);
            }
        }
        repo
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let products = self.products.read().await;
        Ok(products
            .values()
            .find(|product| product.id.0.eq_ignore_ascii_case(&id.0))
            .cloned())
    }

    async fn find_by_name_prefix(&self, prefix: &str) -> Result<Option<Product>, RepositoryError> {
        let needle = prefix.to_ascii_lowercase();
        let products = self.products.read().await;
        let mut matches: Vec<&Product> = products
            .values()
            .filter(|product| product.name.to_ascii_lowercase().starts_with(&needle))
            .collect();
        matches.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(matches.first().map(|product| (*product).clone()))
    }

    async fn list_all(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = self.products.read().await;
        let mut all: Vec<Product> = products.values().cloned().collect();
        all.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(all)
    }

    async fn upsert(&self, product: Product) -> Result<(), RepositoryError> {
        let mut products = self.products.write().await;
        products.insert(product.id.0.clone(), product);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryReviewRepository {
    reviews: RwLock<Vec<Review>>,
}

impl InMemoryReviewRepository {
    pub async fn with_reviews(reviews: Vec<Review>) -> Self {
        let repo = Self::default();
        *repo.reviews.write().await = reviews;
        repo
    }
}

#[async_trait::async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn list_for_product(&self, id: &ProductId) -> Result<Vec<Review>, RepositoryError> {
        let reviews = self.reviews.read().await;
        Ok(reviews.iter().filter(|review| review.product_id == *id).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<Review>, RepositoryError> {
        Ok(self.reviews.read().await.clone())
    }

    async fn insert(&self, review: Review) -> Result<(), RepositoryError> {
        self.reviews.write().await.push(review);
        Ok(())
    }

    async fn upsert_seed(&self, review: Review) -> Result<(), RepositoryError> {
        let mut reviews = self.reviews.write().await;
        reviews.retain(|existing| {
            !(existing.product_id == review.product_id
                && existing.customer_id == review.customer_id)
        });
        reviews.push(review);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_order_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders = self.orders.read().await;
        Ok(orders.get(&id.0).cloned())
    }

    async fn insert(&self, order: Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.order_id.0.clone(), order);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use snoozy_core::domain::product::{MattressSize, Product, ProductId};
    use snoozy_core::domain::review::{Rating, Review};

    use crate::repositories::{
        InMemoryProductRepository, InMemoryReviewRepository, ProductRepository, ReviewRepository,
    };

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: ProductId(id.to_string()),
            name: name.to_string(),
            price: Decimal::new(99_900, 2),
            kind: "All-Foam".to_string(),
            height: "10 inches".to_string(),
            construction_layers: Vec::new(),
            key_features: Vec::new(),
            best_for: Vec::new(),
            available_sizes: vec![MattressSize::Queen],
            warranty: "10 years".to_string(),
            trial_period: "100 nights".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn in_memory_product_lookup_matches_sql_semantics() {
        let repo = InMemoryProductRepository::with_products(vec![
            product("dream-sleep", "Dream Sleep Mattress"),
            product("eco-green", "Eco Green Mattress"),
        ])
        .await;

        let by_id = repo
            .find_by_id(&ProductId("DREAM-SLEEP".to_string()))
            .await
            .expect("find");
        assert!(by_id.is_some(), "id lookup should ignore case");

        let by_prefix = repo.find_by_name_prefix("eco green").await.expect("find");
        assert_eq!(by_prefix.map(|product| product.id.0), Some("eco-green".to_string()));
    }

    #[tokio::test]
    async fn in_memory_seed_upsert_replaces_matching_key() {
        let repo = InMemoryReviewRepository::default();
        let review = |rating: i64| Review {
            product_id: ProductId("dream-sleep".to_string()),
            customer_id: "maria_c".to_string(),
            rating: Rating::new(rating).expect("valid rating"),
            content: "text".to_string(),
            verified_purchase: true,
            created_at: Utc::now(),
        };

        repo.upsert_seed(review(5)).await.expect("upsert");
        repo.upsert_seed(review(3)).await.expect("upsert");

        let all = repo.list_all().await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].rating.value(), 3);
    }
}
