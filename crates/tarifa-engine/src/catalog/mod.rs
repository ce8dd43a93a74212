//! Catalog data access
//!
//! The engine never fetches data itself. A [`PricingDataSource`] returns
//! everything one batch needs in a single read, so every item of a quote is
//! priced against the same rule snapshot.

pub mod memory;

use async_trait::async_trait;
use std::collections::HashMap;
use tarifa_common::{Client, ClientId, Product, ProductId, Result, RuleSet};

pub use memory::{CatalogSeed, InMemoryCatalog};

/// Data read for one pricing batch
#[derive(Debug, Clone, Default)]
pub struct PricingSnapshot {
    /// Requested client, if it exists
    pub client: Option<Client>,
    /// Requested products that exist, by id
    pub products: HashMap<ProductId, Product>,
    /// All margins and discounts, plus the client's special prices
    pub rules: RuleSet,
}

impl PricingSnapshot {
    pub fn product(&self, id: Option<ProductId>) -> Option<&Product> {
        id.and_then(|id| self.products.get(&id))
    }
}

/// Trait for pricing data backends
#[async_trait]
pub trait PricingDataSource: Send + Sync {
    /// Load client, products, and rules for one batch
    ///
    /// Missing clients and products are left out of the snapshot; only
    /// backend failures and malformed stored rules are errors.
    async fn load_snapshot(
        &self,
        client_id: Option<ClientId>,
        product_ids: &[ProductId],
    ) -> Result<PricingSnapshot>;
}
