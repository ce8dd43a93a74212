//! In-memory catalog
//!
//! Uses DashMap for concurrent access to products, clients, and special
//! prices. Margins and discounts live behind one lock as a validated
//! [`RuleSet`] so a snapshot never mixes two rule generations.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tarifa_common::{
    Client, ClientId, DiscountRule, MarginRule, Product, ProductId, Result, RuleSet, SpecialPrice,
    TarifaError,
};
use tracing::{debug, info, instrument};

use super::{PricingDataSource, PricingSnapshot};

/// Catalog contents as stored in a JSON seed file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(rename = "productos", default)]
    pub products: Vec<Product>,
    #[serde(rename = "clientes", default)]
    pub clients: Vec<Client>,
    #[serde(rename = "margenes", default)]
    pub margins: Vec<MarginRule>,
    #[serde(rename = "descuentos", default)]
    pub discounts: Vec<DiscountRule>,
    #[serde(rename = "preciosEspeciales", default)]
    pub special_prices: Vec<SpecialPrice>,
}

/// Thread-safe in-memory pricing data source
pub struct InMemoryCatalog {
    products: DashMap<ProductId, Product>,
    clients: DashMap<ClientId, Client>,
    /// Special prices by client, then product
    special_prices: DashMap<ClientId, HashMap<ProductId, Decimal>>,
    /// Margins and discounts; never carries special prices
    rules: RwLock<RuleSet>,
}

impl InMemoryCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            products: DashMap::new(),
            clients: DashMap::new(),
            special_prices: DashMap::new(),
            rules: RwLock::new(RuleSet::empty()),
        }
    }

    /// Build a catalog from seed data, rejecting malformed rules
    pub fn from_seed(seed: CatalogSeed) -> Result<Self> {
        let catalog = Self::new();
        catalog.replace_rules(seed.margins, seed.discounts)?;

        for product in seed.products {
            catalog.upsert_product(product);
        }
        for client in seed.clients {
            catalog.upsert_client(client);
        }
        for special in seed.special_prices {
            catalog.set_special_price(special);
        }

        Ok(catalog)
    }

    /// Load a catalog from a JSON seed file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TarifaError::Config(format!("Failed to read catalog file {}: {}", path.display(), e))
        })?;

        let seed: CatalogSeed = serde_json::from_str(&content).map_err(|e| {
            TarifaError::Config(format!("Failed to parse catalog file {}: {}", path.display(), e))
        })?;

        let catalog = Self::from_seed(seed)?;
        info!(
            path = %path.display(),
            products = catalog.product_count(),
            clients = catalog.clients.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    pub fn upsert_product(&self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn remove_product(&self, id: ProductId) -> Option<Product> {
        self.products.remove(&id).map(|(_, p)| p)
    }

    pub fn upsert_client(&self, client: Client) {
        self.clients.insert(client.id, client);
    }

    /// Register or replace the special price of a (client, product) pair
    pub fn set_special_price(&self, special: SpecialPrice) {
        self.special_prices
            .entry(special.client_id)
            .or_default()
            .insert(special.product_id, special.price);
    }

    pub fn remove_special_price(&self, client_id: ClientId, product_id: ProductId) -> Option<Decimal> {
        self.special_prices
            .get_mut(&client_id)
            .and_then(|mut prices| prices.remove(&product_id))
    }

    /// Atomically replace every margin and discount rule
    ///
    /// The current rules are kept if the new ones fail validation.
    pub fn replace_rules(&self, margins: Vec<MarginRule>, discounts: Vec<DiscountRule>) -> Result<()> {
        let rules = RuleSet::new(margins, discounts, Vec::new())?;
        debug!(
            margins = rules.margins().len(),
            discounts = rules.discounts().len(),
            "Replacing pricing rules"
        );
        *self.rules.write() = rules;
        Ok(())
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }
}

impl Default for InMemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PricingDataSource for InMemoryCatalog {
    #[instrument(skip(self, product_ids), fields(products = product_ids.len()))]
    async fn load_snapshot(
        &self,
        client_id: Option<ClientId>,
        product_ids: &[ProductId],
    ) -> Result<PricingSnapshot> {
        let client = client_id.and_then(|id| self.clients.get(&id).map(|c| c.value().clone()));

        let products = product_ids
            .iter()
            .filter_map(|id| self.products.get(id).map(|p| (*id, p.value().clone())))
            .collect::<HashMap<_, _>>();

        let special_prices = client
            .as_ref()
            .and_then(|c| {
                self.special_prices.get(&c.id).map(|prices| {
                    prices
                        .iter()
                        .map(|(product_id, price)| SpecialPrice::new(c.id, *product_id, *price))
                        .collect::<Vec<_>>()
                })
            })
            .unwrap_or_default();

        let rules = {
            let rules = self.rules.read();
            RuleSet::new(
                rules.margins().to_vec(),
                rules.discounts().to_vec(),
                special_prices,
            )?
        };

        debug!(
            client_found = client.is_some(),
            products_found = products.len(),
            special_prices = rules.special_prices().len(),
            "Pricing snapshot loaded"
        );

        Ok(PricingSnapshot {
            client,
            products,
            rules,
        })
    }
}
