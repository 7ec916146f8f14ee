use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mattress sizes offered anywhere in the catalog. Individual products list
/// the subset they actually ship in (`Product::available_sizes`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MattressSize {
    Twin,
    #[serde(rename = "Twin XL")]
    TwinXl,
    Full,
    Queen,
    King,
    #[serde(rename = "California King")]
    CaliforniaKing,
    #[serde(rename = "Split King")]
    SplitKing,
}

impl MattressSize {
    pub const ALL: [MattressSize; 7] = [
        MattressSize::Twin,
        MattressSize::TwinXl,
        MattressSize::Full,
        MattressSize::Queen,
        MattressSize::King,
        MattressSize::CaliforniaKing,
        MattressSize::SplitKing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MattressSize::Twin => "Twin",
            MattressSize::TwinXl => "Twin XL",
            MattressSize::Full => "Full",
            MattressSize::Queen => "Queen",
            MattressSize::King => "King",
            MattressSize::CaliforniaKing => "California King",
            MattressSize::SplitKing => "Split King",
        }
    }
}

impl fmt::Display for MattressSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MattressSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown mattress size `{value}`"))
    }
}

/// One catalog entry. Immutable after seed load; the support flow only ever
/// reads products.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(rename = "type")]
    pub kind: String,
    pub height: String,
    pub construction_layers: Vec<String>,
    pub key_features: Vec<String>,
    pub best_for: Vec<String>,
    pub available_sizes: Vec<MattressSize>,
    pub warranty: String,
    pub trial_period: String,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn offers_size(&self, size: MattressSize) -> bool {
        self.available_sizes.contains(&size)
    }
}
