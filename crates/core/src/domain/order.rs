use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::product::{MattressSize, Product, ProductId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    /// Order identifiers read as `<family tag><timestamp digits>-<suffix>`,
    /// e.g. `UC250115093212-4f2a` for an Ultra Comfort order. The tag comes
    /// from the product id's leading segments; the random hex suffix keeps
    /// two orders placed in the same second distinct.
    pub fn generate(product_id: &ProductId, at: DateTime<Utc>) -> Self {
        let tag: String = product_id
            .0
            .split('-')
            .take(2)
            .filter_map(|segment| segment.chars().next())
            .map(|ch| ch.to_ascii_uppercase())
            .collect();
        let tag = if tag.is_empty() { "OR".to_string() } else { tag };

        let stamp = at.format("%y%m%d%H%M%S");
        let suffix = &Uuid::new_v4().simple().to_string()[..4];
        Self(format!("{tag}{stamp}-{suffix}"))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Confirmed,
    Pending,
    Shipped,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Pending => "pending",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Paypal,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

/// A placed order. Name and unit price are snapshots taken at purchase time
/// so later catalog edits cannot rewrite history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub size: MattressSize,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Validate and build an order against the live product record. The size
    /// must be offered for that product and the quantity must be positive.
    pub fn place(
        product: &Product,
        size: MattressSize,
        quantity: u32,
        delivery_address: String,
        payment_method: PaymentMethod,
        at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::ZeroQuantity);
        }
        if !product.offers_size(size) {
            return Err(DomainError::SizeUnavailable {
                size: size.to_string(),
                product: product.name.clone(),
            });
        }

        let total = product.price * Decimal::from(quantity);
        Ok(Self {
            order_id: OrderId::generate(&product.id, at),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            size,
            quantity,
            unit_price: product.price,
            total,
            status: OrderStatus::Confirmed,
            delivery_address,
            payment_method,
            created_at: at,
        })
    }
}
