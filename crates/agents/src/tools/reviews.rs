use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use snoozy_core::domain::product::ProductId;
use snoozy_core::domain::review::{average_rating, Rating, Review};
use snoozy_db::repositories::{ProductRepository, ReviewRepository};

use super::{parse_args, ToolError};
use crate::llm::ToolSpec;

/// Review specialty: reading customer feedback, rating statistics, and
/// recording new reviews.
pub struct ReviewTools {
    products: Arc<dyn ProductRepository>,
    reviews: Arc<dyn ReviewRepository>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ReviewFilter {
    Positive,
    Negative,
    #[default]
    All,
}

impl ReviewFilter {
    fn keeps(&self, rating: Rating) -> bool {
        match self {
            ReviewFilter::Positive => rating.value() >= 4,
            ReviewFilter::Negative => rating.value() <= 2,
            ReviewFilter::All => true,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ReviewFilter::Positive => "positive",
            ReviewFilter::Negative => "negative",
            ReviewFilter::All => "all",
        }
    }
}

#[derive(Debug, Deserialize)]
struct GetProductReviewsArgs {
    product_id: String,
    #[serde(default)]
    filter_type: ReviewFilter,
}

#[derive(Debug, Deserialize)]
struct GetReviewStatsArgs {
    product_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateReviewArgs {
    product_id: String,
    rating: i64,
    content: String,
}

impl ReviewTools {
    pub fn new(products: Arc<dyn ProductRepository>, reviews: Arc<dyn ReviewRepository>) -> Self {
        Self { products, reviews }
    }

    pub fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "get_product_reviews",
                description: "Get reviews for a specific product",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "product_id": {
                            "type": "string",
                            "description": "ID or name of the product to get reviews for"
                        },
                        "filter_type": {
                            "type": "string",
                            "enum": ["positive", "negative", "all"],
                            "description": "Type of reviews to retrieve",
                            "default": "all"
                        }
                    },
                    "required": ["product_id"]
                }),
            },
            ToolSpec {
                name: "get_review_stats",
                description: "Get statistical information about product reviews",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "product_id": {
                            "type": "string",
                            "description": "ID or name of the product to get statistics for"
                        }
                    },
                    "required": ["product_id"]
                }),
            },
            ToolSpec {
                name: "create_review",
                description: "Create a new review for a product",
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "product_id": {
                            "type": "string",
                            "description": "ID of the product being reviewed"
                        },
                        "rating": {
                            "type": "integer",
                            "description": "Rating from 1 to 5 stars",
                            "minimum": 1,
                            "maximum": 5
                        },
                        "content": {
                            "type": "string",
                            "description": "Review text content"
                        }
                    },
                    "required": ["product_id", "rating", "content"]
                }),
            },
        ]
    }

    pub async fn execute(&self, name: &str, arguments: &Value) -> Result<Value, ToolError> {
        match name {
            "get_product_reviews" => {
                let args: GetProductReviewsArgs = parse_args("get_product_reviews", arguments)?;
                self.get_product_reviews(&args.product_id, args.filter_type).await
            }
            "get_review_stats" => {
                let args: GetReviewStatsArgs = parse_args("get_review_stats", arguments)?;
                self.get_review_stats(&args.product_id).await
            }
            "create_review" => {
                let args: CreateReviewArgs = parse_args("create_review", arguments)?;
                self.create_review(&args.product_id, args.rating, args.content).await
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// Reviews for one product. An unknown product or an empty filter result
    /// is a zero-count payload, not an error.
    async fn get_product_reviews(
        &self,
        reference: &str,
        filter: ReviewFilter,
    ) -> Result<Value, ToolError> {
        debug!(
            event_name = "tools.reviews.list",
            reference,
            filter = filter.as_str(),
            "getting product reviews"
        );

        let reviews = self.reviews_for_reference(reference).await?;
        let filtered: Vec<Review> =
            reviews.into_iter().filter(|review| filter.keeps(review.rating)).collect();

        let formatted: Vec<Value> = filtered
            .iter()
            .map(|review| {
                json!({
                    "rating": review.rating.value(),
                    "content": review.content,
                    "verified_purchase": review.verified_purchase,
                    "customer_id": review.customer_id,
                })
            })
            .collect();

        Ok(json!({
            "product_id": reference,
            "total_reviews": filtered.len(),
            "average_rating": average_rating(&filtered),
            "filter_type": filter.as_str(),
            "reviews": formatted,
        }))
    }

    async fn get_review_stats(&self, reference: &str) -> Result<Value, ToolError> {
        debug!(event_name = "tools.reviews.stats", reference, "getting review statistics");

        let reviews = self.reviews_for_reference(reference).await?;
        if reviews.is_empty() {
            return Ok(json!({
                "product_id": reference,
                "total_reviews": 0,
                "message": "No reviews found for this product",
            }));
        }

        let count_where = |check: fn(u8) -> bool| {
            reviews.iter().filter(|review| check(review.rating.value())).count()
        };

        Ok(json!({
            "product_id": reference,
            "total_reviews": reviews.len(),
            "average_rating": average_rating(&reviews),
            "rating_distribution": {
                "5_star": count_where(|rating| rating == 5),
                "4_star": count_where(|rating| rating == 4),
                "3_star": count_where(|rating| rating == 3),
                "2_star": count_where(|rating| rating == 2),
                "1_star": count_where(|rating| rating == 1),
            },
            "verified_purchases": reviews.iter().filter(|review| review.verified_purchase).count(),
        }))
    }

    async fn create_review(
        &self,
        reference: &str,
        rating: i64,
        content: String,
    ) -> Result<Value, ToolError> {
        info!(event_name = "tools.reviews.create", reference, rating, "creating review");

        // Rating bound first, so an invalid rating fails even when the
        // product reference is also bad.
        let rating = Rating::new(rating)?;

        let product = match self.products.find_by_id(&ProductId(reference.to_string())).await? {
            Some(product) => product,
            None => self
                .products
                .find_by_name_prefix(reference)
                .await?
                .ok_or_else(|| ToolError::ProductNotFound(reference.to_string()))?,
        };

        let review = Review::submitted(product.id.clone(), rating, content, Utc::now());
        self.reviews.insert(review.clone()).await?;

        Ok(json!({
            "success": true,
            "product_id": product.id.0,
            "rating": review.rating.value(),
            "content": review.content,
            "message": "Review submitted successfully",
        }))
    }

    /// Exact product-id match first, then the name-prefix fallback the store
    /// exposes. Misses collapse to an empty list.
    async fn reviews_for_reference(&self, reference: &str) -> Result<Vec<Review>, ToolError> {
        let direct =
            self.reviews.list_for_product(&ProductId(reference.to_string())).await?;
        if !direct.is_empty() {
            return Ok(direct);
        }

        if let Some(product) = self.products.find_by_name_prefix(reference).await? {
            return Ok(self.reviews.list_for_product(&product.id).await?);
        }

        Ok(Vec::new())
    }

    pub async fn system_prompt(&self) -> Result<String, ToolError> {
        let all_reviews = self.reviews.list_all().await?;

        let mut by_product: BTreeMap<ProductId, Vec<&Review>> = BTreeMap::new();
        for review in &all_reviews {
            by_product.entry(review.product_id.clone()).or_default().push(review);
        }

        let mut review_info = String::new();
        for (product_id, reviews) in &by_product {
            let product_name = self
                .products
                .find_by_id(product_id)
                .await?
                .map(|product| product.name)
                .unwrap_or_else(|| product_id.0.clone());

            let average: f64 = reviews
                .iter()
                .map(|review| f64::from(review.rating.value()))
                .sum::<f64>()
                / reviews.len() as f64;

            let mut samples = String::new();
            for review in reviews.iter().take(3) {
                let _ = writeln!(samples, "- {}★: {}", review.rating.value(), review.content);
            }

            let _ = write!(
                review_info,
                "\nProduct: {product_name}\nNumber of Reviews: {}\nAverage Rating: {average:.1}\nSample Reviews:\n{samples}",
                reviews.len(),
            );
        }

        Ok(format!(
            "You are a Reviews specialist for our mattress company.\n\
Your role is to help customers understand what other customers are saying about our products.\n\
\n\
Available Reviews in our Database:\n{review_info}\n\
When handling customer queries:\n\
1. Use the get_product_reviews function to fetch actual customer reviews\n\
2. Use the get_review_stats function to get statistical information\n\
3. Focus on providing balanced feedback, including both positive and critical reviews\n\
4. Highlight common themes in customer feedback\n\
5. If asked about a product with no reviews, acknowledge this and suggest looking at \
reviews for similar products\n\
\n\
Remember to maintain a helpful and professional tone while providing accurate review \
information from our database."
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::json;

    use snoozy_core::domain::product::{MattressSize, Product, ProductId};
    use snoozy_core::domain::review::{Rating, Review};
    use snoozy_core::errors::DomainError;
    use snoozy_db::repositories::{
        InMemoryProductRepository, InMemoryReviewRepository, ReviewRepository,
    };

    use super::ReviewTools;
    use crate::tools::ToolError;

    fn dream_sleep() -> Product {
        Product {
            id: ProductId("dream-sleep".to_string()),
            name: "Dream Sleep Mattress".to_string(),
            price: Decimal::new(89_900, 2),
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

    fn review(customer: &str, rating: i64) -> Review {
        Review {
            product_id: ProductId("dream-sleep".to_string()),
            customer_id: customer.to_string(),
            rating: Rating::new(rating).expect("valid rating"),
            content: format!("{rating} star experience"),
            verified_purchase: true,
            created_at: Utc::now(),
        }
    }

    async fn tools_with_reviews(reviews: Vec<Review>) -> (ReviewTools, Arc<InMemoryReviewRepository>) {
        let products =
            Arc::new(InMemoryProductRepository::with_products(vec![dream_sleep()]).await);
        let review_repo = Arc::new(InMemoryReviewRepository::with_reviews(reviews).await);
        (ReviewTools::new(products, review_repo.clone()), review_repo)
    }

    #[tokio::test]
    async fn positive_filter_keeps_only_four_stars_and_up() {
        let (tools, _) = tools_with_reviews(vec![
            review("a", 5),
            review("b", 4),
            review("c", 3),
            review("d", 1),
        ])
        .await;

        let result = tools
            .execute(
                "get_product_reviews",
                &json!({"product_id": "dream-sleep", "filter_type": "positive"}),
            )
            .await
            .expect("list reviews");

        assert_eq!(result["total_reviews"], 2);
        assert_eq!(result["average_rating"], 4.5);
        let ratings: Vec<u64> = result["reviews"]
            .as_array()
            .expect("reviews array")
            .iter()
            .map(|entry| entry["rating"].as_u64().expect("rating"))
            .collect();
        assert!(ratings.iter().all(|rating| *rating >= 4));
    }

    #[tokio::test]
    async fn filter_defaults_to_all() {
        let (tools, _) = tools_with_reviews(vec![review("a", 5), review("b", 1)]).await;

        let result = tools
            .execute("get_product_reviews", &json!({"product_id": "dream-sleep"}))
            .await
            .expect("list reviews");
        assert_eq!(result["total_reviews"], 2);
        assert_eq!(result["average_rating"], 3.0);
    }

    #[tokio::test]
    async fn unknown_product_returns_an_empty_payload() {
        let (tools, _) = tools_with_reviews(vec![review("a", 5)]).await;

        let result = tools
            .execute("get_product_reviews", &json!({"product_id": "cloud nine"}))
            .await
            .expect("empty result, not an error");
        assert_eq!(result["total_reviews"], 0);
        assert_eq!(result["average_rating"], 0.0);
    }

    #[tokio::test]
    async fn stats_build_a_full_histogram() {
        let (tools, _) = tools_with_reviews(vec![
            review("a", 5),
            review("b", 5),
            review("c", 4),
            review("d", 2),
        ])
        .await;

        let result = tools
            .execute("get_review_stats", &json!({"product_id": "dream-sleep"}))
            .await
            .expect("stats");

        assert_eq!(result["total_reviews"], 4);
        assert_eq!(result["rating_distribution"]["5_star"], 2);
        assert_eq!(result["rating_distribution"]["4_star"], 1);
        assert_eq!(result["rating_distribution"]["2_star"], 1);
        assert_eq!(result["rating_distribution"]["1_star"], 0);
        assert_eq!(result["verified_purchases"], 4);
    }

    #[tokio::test]
    async fn stats_without_reviews_return_a_message() {
        let (tools, _) = tools_with_reviews(Vec::new()).await;

        let result = tools
            .execute("get_review_stats", &json!({"product_id": "dream-sleep"}))
            .await
            .expect("no-review stats are not an error");
        assert_eq!(result["total_reviews"], 0);
        assert_eq!(result["message"], "No reviews found for this product");
    }

    #[tokio::test]
    async fn create_review_validates_the_rating_bounds() {
        let (tools, repo) = tools_with_reviews(Vec::new()).await;

        for bad in [0, 6] {
            let result = tools
                .execute(
                    "create_review",
                    &json!({"product_id": "dream-sleep", "rating": bad, "content": "text"}),
                )
                .await;
            assert!(
                matches!(
                    result,
                    Err(ToolError::Validation(DomainError::RatingOutOfRange(value))) if value == bad
                ),
                "rating {bad} should be rejected"
            );
        }

        assert!(repo.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn create_review_stores_and_echoes_the_review() {
        let (tools, repo) = tools_with_reviews(Vec::new()).await;

        let result = tools
            .execute(
                "create_review",
                &json!({"product_id": "dream-sleep", "rating": 5, "content": "Slept great"}),
            )
            .await
            .expect("create");

        assert_eq!(result["success"], true);
        assert_eq!(result["product_id"], "dream-sleep");
        assert_eq!(result["rating"], 5);

        let stored = repo.list_all().await.expect("list");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].customer_id, "anonymous");
        assert!(stored[0].verified_purchase);
    }

    #[tokio::test]
    async fn create_review_rejects_unknown_products() {
        let (tools, _) = tools_with_reviews(Vec::new()).await;

        let result = tools
            .execute(
                "create_review",
                &json!({"product_id": "cloud nine", "rating": 4, "content": "text"}),
            )
            .await;
        assert!(matches!(result, Err(ToolError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn system_prompt_summarizes_reviews_per_product() {
        let (tools, _) = tools_with_reviews(vec![review("a", 5), review("b", 3)]).await;
        let prompt = tools.system_prompt().await.expect("prompt");

        assert!(prompt.contains("Dream Sleep Mattress"));
        assert!(prompt.contains("Number of Reviews: 2"));
        assert!(prompt.contains("Average Rating: 4.0"));
    }
}
