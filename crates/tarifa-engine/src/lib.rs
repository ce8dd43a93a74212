//! # Tarifa Engine
//!
//! Line-item pricing for quotes and orders.
//!
//! ## Pricing Order
//!
//! ```text
//! special price  ->  (cost <= 0 ? cost)  ->  cost * multiplier + fee / qty  ->  * (1 - best discount)
//! ```
//!
//! Where:
//! - Special price: per (client, product) override, returned verbatim
//! - Margin: explicitly selected rule, else client-tier rule, else the general fallback
//! - Discount: the single largest of client-tier, category, and volume discounts
//!
//! Results are rounded to cents, half away from zero.

pub mod batch;
pub mod catalog;
pub mod pricing;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tarifa_common::{Result, TarifaError};

pub use batch::{BatchPricer, BatchPricingRequest, BatchPricingResponse, PricedLineItem};
pub use catalog::{CatalogSeed, InMemoryCatalog, PricingDataSource, PricingSnapshot};
pub use pricing::{
    AppliedDiscount, AppliedMargin, DiscountSource, MarginSource, PriceBreakdown, PricingContext,
    PricingEngine, UnitPrice,
};

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Multiplier used when no margin rule applies
    pub fallback_multiplier: Decimal,
    /// Fixed fee used when no margin rule applies
    pub fallback_fee: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_multiplier: dec!(1.3),
            fallback_fee: Decimal::ZERO,
        }
    }
}

impl EngineConfig {
    /// Reject fallback values a margin rule would not be allowed to have
    pub fn validate(&self) -> Result<()> {
        if self.fallback_multiplier <= Decimal::ZERO {
            return Err(TarifaError::Config(format!(
                "fallback multiplier must be > 0, got {}",
                self.fallback_multiplier
            )));
        }
        if self.fallback_fee < Decimal::ZERO {
            return Err(TarifaError::Config(format!(
                "fallback fee must be >= 0, got {}",
                self.fallback_fee
            )));
        }
        Ok(())
    }
}
