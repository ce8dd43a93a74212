//! Catalog entities read by the pricing engine
//!
//! Wire names follow the ERP's JSON records (`precioUnitario`, `tier`, ...);
//! the engine only ever reads these values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Product identifier
pub type ProductId = i64;

/// Client identifier
pub type ClientId = i64;

/// Client category label used to match margin and discount rules
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientTier(String);

impl ClientTier {
    /// Manufacturers buying for their own production
    pub const FABRICANTE: &'static str = "FABRICANTE";
    /// Resellers and workshops
    pub const INTERMEDIARIO: &'static str = "INTERMEDIARIO";
    /// Retail customers
    pub const CLIENTE_FINAL: &'static str = "CLIENTE FINAL";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientTier {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl fmt::Display for ClientTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,

    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Base cost, pre-computed from material tariff x area
    #[serde(rename = "precioUnitario")]
    pub unit_cost: Decimal,

    /// Material name, matched by category discounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,

    /// Sheet thickness in millimetres
    #[serde(rename = "grosor", default, skip_serializing_if = "Option::is_none")]
    pub thickness: Option<Decimal>,
}

impl Product {
    pub fn new(id: ProductId, unit_cost: Decimal) -> Self {
        Self {
            id,
            name: None,
            unit_cost,
            material: None,
            thickness: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_thickness(mut self, thickness: Decimal) -> Self {
        self.thickness = Some(thickness);
        self
    }
}

/// Customer placing the quote or order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,

    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<ClientTier>,
}

impl Client {
    pub fn new(id: ClientId) -> Self {
        Self {
            id,
            name: None,
            tier: None,
        }
    }

    pub fn with_tier(mut self, tier: impl Into<ClientTier>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
