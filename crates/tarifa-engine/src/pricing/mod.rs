//! Pricing module
//!
//! Pure unit-price calculation with:
//! - Per-client special prices
//! - Margin selection (selected, client tier, fallback)
//! - Best-of-three discount selection

pub mod discount;
pub mod engine;
pub mod margin;

pub use discount::{AppliedDiscount, DiscountSource};
pub use engine::{PriceBreakdown, PricingContext, PricingEngine, UnitPrice};
pub use margin::{AppliedMargin, MarginSource};
