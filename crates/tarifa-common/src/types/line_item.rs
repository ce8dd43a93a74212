//! Line items submitted for pricing
//!
//! Fields other than product, quantity, and unit price are carried through
//! untouched so the priced batch can be returned as the caller sent it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::catalog::ProductId;

/// Quote or order line to be priced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "productoId", default)]
    pub product_id: Option<ProductId>,

    #[serde(rename = "cantidad", default)]
    pub quantity: Option<i64>,

    /// Caller-supplied fallback on input, computed price once priced
    ///
    /// Accepts numbers or strings; always written as a JSON number.
    #[serde(
        rename = "precioUnitario",
        default,
        serialize_with = "rust_decimal::serde::float_option::serialize"
    )]
    pub unit_price: Option<Decimal>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LineItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id: Some(product_id),
            quantity: Some(quantity),
            ..Default::default()
        }
    }

    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    /// Divisor for fixed-fee dilution; missing or non-positive counts as 1
    pub fn fee_divisor(&self) -> Decimal {
        Decimal::from(self.quantity.unwrap_or(1).max(1))
    }

    /// Quantity used for volume tiers; missing or negative counts as 0
    pub fn tier_quantity(&self) -> i64 {
        self.quantity.unwrap_or(0).max(0)
    }

    /// Fallback price when no catalog price can be derived
    pub fn fallback_price(&self) -> Decimal {
        self.unit_price.unwrap_or(Decimal::ZERO)
    }
}
