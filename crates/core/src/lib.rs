//! Core domain and configuration for the Snoozy support backend.
//!
//! Everything here is deterministic and dependency-light: product catalog
//! types, reviews, orders, conversation turns, the configuration loader,
//! and the error taxonomy shared by the agent runtime and the transports.

pub mod config;
pub mod domain;
pub mod errors;

pub use domain::conversation::{recent_window, Role, Turn};
pub use domain::order::{Order, OrderId, OrderStatus, PaymentMethod};
pub use domain::product::{MattressSize, Product, ProductId};
pub use domain::review::{Rating, Review};
pub use errors::DomainError;
