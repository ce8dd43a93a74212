//! # Tarifa Common
//!
//! Shared catalog types, pricing rules, and errors for the Tarifa pricing engine.
//!
//! ## Core Types
//!
//! - [`Product`]: Catalog entry carrying the pre-computed base cost
//! - [`Client`]: Customer with an optional [`ClientTier`]
//! - [`MarginRule`]: Multiplier plus fixed fee, scoped to a tier or general
//! - [`DiscountRule`]: Client-tier, category, or volume discount
//! - [`SpecialPrice`]: Per (client, product) override
//! - [`RuleSet`]: Validated bundle of margins, discounts, and special prices
//! - [`LineItem`]: Product reference + quantity submitted for pricing

pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use error::{Result, TarifaError};
pub use types::{
    catalog::{Client, ClientId, ClientTier, Product, ProductId},
    line_item::LineItem,
    money::round_currency,
    rules::{
        DiscountKind, DiscountRule, DiscountRuleId, MarginRule, MarginRuleId, MarginScope,
        RuleSet, SpecialPrice, VolumeTier,
    },
};

/// Tarifa version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decimal places of every computed price
pub const CURRENCY_SCALE: u32 = 2;

/// Annotation attached to line items whose product cannot be resolved
pub const PRODUCT_NOT_FOUND: &str = "Producto no encontrado";

/// Annotation attached to batches whose client cannot be resolved
pub const CLIENT_NOT_FOUND: &str = "Cliente no encontrado";
