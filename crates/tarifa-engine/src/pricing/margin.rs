//! Margin selection
//!
//! First match wins: the caller-selected rule, then the first active rule of
//! the client's tier, then the configured fallback.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tarifa_common::{Client, MarginRule, MarginRuleId, Result, RuleSet, TarifaError};
use tracing::debug;

use crate::EngineConfig;

/// Where the applied margin came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "ruleId")]
pub enum MarginSource {
    /// Rule forced by the caller
    Selected(MarginRuleId),
    /// Rule matching the client's tier
    ClientTier(MarginRuleId),
    /// No rule matched
    Fallback,
}

impl fmt::Display for MarginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarginSource::Selected(id) => write!(f, "margen seleccionado #{id}"),
            MarginSource::ClientTier(id) => write!(f, "margen de cliente #{id}"),
            MarginSource::Fallback => f.write_str("margen general"),
        }
    }
}

/// Margin parameters resolved for one line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedMargin {
    pub source: MarginSource,
    pub multiplier: Decimal,
    pub fixed_fee: Decimal,
}

impl AppliedMargin {
    fn from_rule(source: MarginSource, rule: &MarginRule) -> Self {
        Self {
            source,
            multiplier: rule.multiplier,
            fixed_fee: rule.fixed_fee,
        }
    }

    /// `cost * multiplier + fixed_fee / fee_divisor`
    pub fn apply(&self, cost: Decimal, fee_divisor: Decimal) -> Result<Decimal> {
        let marked_up = cost
            .checked_mul(self.multiplier)
            .ok_or(TarifaError::Overflow)?;
        let fee_per_unit = self
            .fixed_fee
            .checked_div(fee_divisor)
            .ok_or(TarifaError::Overflow)?;
        marked_up
            .checked_add(fee_per_unit)
            .ok_or(TarifaError::Overflow)
    }
}

impl fmt::Display for AppliedMargin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (x{}", self.source, self.multiplier.normalize())?;
        if !self.fixed_fee.is_zero() {
            write!(f, " + {} fijo", self.fixed_fee.normalize())?;
        }
        f.write_str(")")
    }
}

/// Resolve the margin for a line item
pub fn select_margin(
    rules: &RuleSet,
    client: Option<&Client>,
    selected: Option<MarginRuleId>,
    config: &EngineConfig,
) -> AppliedMargin {
    if let Some(id) = selected {
        match rules.margin(id) {
            Some(rule) => return AppliedMargin::from_rule(MarginSource::Selected(id), rule),
            None => debug!(margin_id = id, "Selected margin not found, falling through"),
        }
    }

    if let Some(tier) = client.and_then(|c| c.tier.as_ref()) {
        if let Some(rule) = rules
            .margins()
            .iter()
            .find(|m| m.active && m.matches_tier(tier))
        {
            return AppliedMargin::from_rule(MarginSource::ClientTier(rule.id), rule);
        }
    }

    AppliedMargin {
        source: MarginSource::Fallback,
        multiplier: config.fallback_multiplier,
        fixed_fee: config.fallback_fee,
    }
}
