use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::product::ProductId;
use crate::errors::DomainError;

/// Star rating, 1 through 5 inclusive. The bound is enforced at construction
/// so a stored review can never carry an out-of-range value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self, DomainError> {
        if (1..=5).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(DomainError::RatingOutOfRange(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

pub const ANONYMOUS_CUSTOMER: &str = "anonymous";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub product_id: ProductId,
    pub customer_id: String,
    pub rating: Rating,
    pub content: String,
    pub verified_purchase: bool,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Review submitted through the chat surface. The original store treats
    /// chat-submitted reviews as verified purchases.
    pub fn submitted(
        product_id: ProductId,
        rating: Rating,
        content: String,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_id,
            customer_id: ANONYMOUS_CUSTOMER.to_string(),
            rating,
            content,
            verified_purchase: true,
            created_at: at,
        }
    }
}

/// Average over a set of ratings; zero when the set is empty.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let sum: u32 = reviews.iter().map(|review| u32::from(review.rating.value())).sum();
    f64::from(sum) / reviews.len() as f64
}
