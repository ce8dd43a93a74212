//! Pricing rules: margins, discounts, and special prices
//!
//! A [`RuleSet`] can only be obtained through validation, so the engine never
//! sees a non-positive multiplier, a negative fee, a discount outside `[0, 1)`,
//! or two volume tiers sharing a threshold.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::catalog::{ClientId, ClientTier, ProductId};
use crate::error::{Result, TarifaError};

/// Margin rule identifier
pub type MarginRuleId = i64;

/// Discount rule identifier
pub type DiscountRuleId = i64;

fn default_active() -> bool {
    true
}

/// Which line items a margin applies to when it is not selected explicitly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tipo")]
pub enum MarginScope {
    /// Applies automatically to clients of the given tier
    #[serde(rename = "Cliente")]
    Client {
        #[serde(rename = "tierCliente")]
        tier: ClientTier,
    },
    /// Only applied when the caller selects it by id
    #[serde(rename = "General")]
    General,
}

/// Markup applied to the base cost: `cost * multiplier + fee / quantity`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginRule {
    pub id: MarginRuleId,

    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "multiplicador")]
    pub multiplier: Decimal,

    /// Fixed fee per line, diluted across the quantity
    #[serde(rename = "gastoFijo", default)]
    pub fixed_fee: Decimal,

    #[serde(flatten)]
    pub scope: MarginScope,

    #[serde(rename = "activo", default = "default_active")]
    pub active: bool,
}

impl MarginRule {
    pub fn new(id: MarginRuleId, multiplier: Decimal, fixed_fee: Decimal, scope: MarginScope) -> Self {
        Self {
            id,
            name: None,
            multiplier,
            fixed_fee,
            scope,
            active: true,
        }
    }

    /// Margin applied automatically to clients of `tier`
    pub fn for_tier(id: MarginRuleId, tier: impl Into<ClientTier>, multiplier: Decimal, fixed_fee: Decimal) -> Self {
        Self::new(id, multiplier, fixed_fee, MarginScope::Client { tier: tier.into() })
    }

    /// Margin that only applies when selected by id
    pub fn general(id: MarginRuleId, multiplier: Decimal, fixed_fee: Decimal) -> Self {
        Self::new(id, multiplier, fixed_fee, MarginScope::General)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Whether this margin applies automatically to `tier`
    pub fn matches_tier(&self, tier: &ClientTier) -> bool {
        matches!(&self.scope, MarginScope::Client { tier: t } if t == tier)
    }

    fn label(&self) -> String {
        format!("margen {}", self.id)
    }

    fn validate(&self) -> Result<()> {
        if self.multiplier <= Decimal::ZERO {
            return Err(TarifaError::invalid_rule(
                self.label(),
                format!("multiplicador must be > 0, got {}", self.multiplier),
            ));
        }
        if self.fixed_fee < Decimal::ZERO {
            return Err(TarifaError::invalid_rule(
                self.label(),
                format!("gastoFijo must be >= 0, got {}", self.fixed_fee),
            ));
        }
        Ok(())
    }
}

/// Threshold of a volume discount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeTier {
    #[serde(rename = "cantidadMinima")]
    pub min_quantity: i64,

    #[serde(rename = "descuento")]
    pub rate: Decimal,
}

impl VolumeTier {
    pub fn new(min_quantity: i64, rate: Decimal) -> Self {
        Self { min_quantity, rate }
    }
}

/// Discount class and its matching criterion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tipo")]
pub enum DiscountKind {
    #[serde(rename = "cliente")]
    Client {
        #[serde(rename = "tierCliente")]
        tier: ClientTier,
    },
    /// Matched against the product's material name
    #[serde(rename = "categoria")]
    Category {
        #[serde(rename = "categoria")]
        category: String,
    },
    #[serde(rename = "volumen")]
    Volume {
        #[serde(default)]
        tiers: Vec<VolumeTier>,
    },
}

/// Percentage discount applied after the margin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountRule {
    pub id: DiscountRuleId,

    #[serde(rename = "nombre", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(flatten)]
    pub kind: DiscountKind,

    /// Rate in `[0, 1)`; volume rules carry their rates on the tiers
    #[serde(rename = "descuento", default)]
    pub rate: Decimal,

    #[serde(rename = "activo", default = "default_active")]
    pub active: bool,
}

impl DiscountRule {
    pub fn new(id: DiscountRuleId, kind: DiscountKind, rate: Decimal) -> Self {
        Self {
            id,
            name: None,
            kind,
            rate,
            active: true,
        }
    }

    pub fn client_tier(id: DiscountRuleId, tier: impl Into<ClientTier>, rate: Decimal) -> Self {
        Self::new(id, DiscountKind::Client { tier: tier.into() }, rate)
    }

    pub fn category(id: DiscountRuleId, category: impl Into<String>, rate: Decimal) -> Self {
        Self::new(
            id,
            DiscountKind::Category {
                category: category.into(),
            },
            rate,
        )
    }

    pub fn volume(id: DiscountRuleId, tiers: Vec<VolumeTier>) -> Self {
        Self::new(id, DiscountKind::Volume { tiers }, Decimal::ZERO)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    fn label(&self) -> String {
        format!("descuento {}", self.id)
    }

    fn validate(&self) -> Result<()> {
        check_rate(&self.label(), "descuento", self.rate)?;

        if let DiscountKind::Volume { tiers } = &self.kind {
            let mut thresholds = HashSet::with_capacity(tiers.len());
            for tier in tiers {
                check_rate(&self.label(), "tier descuento", tier.rate)?;
                if !thresholds.insert(tier.min_quantity) {
                    return Err(TarifaError::invalid_rule(
                        self.label(),
                        format!("duplicate cantidadMinima {}", tier.min_quantity),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn check_rate(label: &str, field: &str, rate: Decimal) -> Result<()> {
    if rate < Decimal::ZERO || rate >= Decimal::ONE {
        return Err(TarifaError::invalid_rule(
            label,
            format!("{field} must be in [0, 1), got {rate}"),
        ));
    }
    Ok(())
}

/// Price override for one (client, product) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialPrice {
    #[serde(rename = "clienteId")]
    pub client_id: ClientId,

    #[serde(rename = "productoId")]
    pub product_id: ProductId,

    #[serde(rename = "precio")]
    pub price: Decimal,
}

impl SpecialPrice {
    pub fn new(client_id: ClientId, product_id: ProductId, price: Decimal) -> Self {
        Self {
            client_id,
            product_id,
            price,
        }
    }
}

#[derive(Deserialize)]
struct RawRuleSet {
    #[serde(rename = "margenes", default)]
    margins: Vec<MarginRule>,
    #[serde(rename = "descuentos", default)]
    discounts: Vec<DiscountRule>,
    #[serde(rename = "preciosEspeciales", default)]
    special_prices: Vec<SpecialPrice>,
}

impl TryFrom<RawRuleSet> for RuleSet {
    type Error = TarifaError;

    fn try_from(raw: RawRuleSet) -> Result<Self> {
        RuleSet::new(raw.margins, raw.discounts, raw.special_prices)
    }
}

/// Validated snapshot of every rule that can affect a price
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRuleSet")]
pub struct RuleSet {
    #[serde(rename = "margenes")]
    margins: Vec<MarginRule>,
    #[serde(rename = "descuentos")]
    discounts: Vec<DiscountRule>,
    #[serde(rename = "preciosEspeciales")]
    special_prices: Vec<SpecialPrice>,
}

impl RuleSet {
    /// Validate and bundle rules; fails on the first malformed rule
    pub fn new(
        margins: Vec<MarginRule>,
        discounts: Vec<DiscountRule>,
        special_prices: Vec<SpecialPrice>,
    ) -> Result<Self> {
        let mut margin_ids = HashSet::with_capacity(margins.len());
        for margin in &margins {
            margin.validate()?;
            if !margin_ids.insert(margin.id) {
                return Err(TarifaError::invalid_rule(margin.label(), "duplicate margin id"));
            }
        }

        let mut discount_ids = HashSet::with_capacity(discounts.len());
        for discount in &discounts {
            discount.validate()?;
            if !discount_ids.insert(discount.id) {
                return Err(TarifaError::invalid_rule(discount.label(), "duplicate discount id"));
            }
        }

        Ok(Self {
            margins,
            discounts,
            special_prices,
        })
    }

    /// Rule set with no rules at all
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn margins(&self) -> &[MarginRule] {
        &self.margins
    }

    pub fn discounts(&self) -> &[DiscountRule] {
        &self.discounts
    }

    pub fn special_prices(&self) -> &[SpecialPrice] {
        &self.special_prices
    }

    /// Active margin with the given id
    pub fn margin(&self, id: MarginRuleId) -> Option<&MarginRule> {
        self.margins.iter().find(|m| m.id == id && m.active)
    }

    /// Active discounts in declaration order
    pub fn active_discounts(&self) -> impl Iterator<Item = &DiscountRule> {
        self.discounts.iter().filter(|d| d.active)
    }

    /// First special price registered for the pair
    pub fn special_price(&self, client_id: ClientId, product_id: ProductId) -> Option<Decimal> {
        self.special_prices
            .iter()
            .find(|sp| sp.client_id == client_id && sp.product_id == product_id)
            .map(|sp| sp.price)
    }
}
