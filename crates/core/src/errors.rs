use thiserror::Error;

/// Invariant violations raised by domain constructors. These are validation
/// failures in the support flow: they never crash a turn, the agent runtime
/// converts them into an apology reply at its boundary.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),
    #[error("size {size} is not available for {product}")]
    SizeUnavailable { size: String, product: String },
    #[error("order quantity must be at least 1")]
    ZeroQuantity,
}
