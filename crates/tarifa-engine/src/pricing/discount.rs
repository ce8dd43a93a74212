//! Discount selection
//!
//! Three independent classes are evaluated (client tier, product category,
//! volume) and only the single largest rate is applied. Discounts never stack.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tarifa_common::{
    Client, DiscountKind, DiscountRule, DiscountRuleId, Product, Result, RuleSet, TarifaError,
};

/// Which rule produced the applied discount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DiscountSource {
    ClientTier {
        #[serde(rename = "ruleId")]
        rule_id: DiscountRuleId,
    },
    Category {
        #[serde(rename = "ruleId")]
        rule_id: DiscountRuleId,
    },
    Volume {
        #[serde(rename = "ruleId")]
        rule_id: DiscountRuleId,
        #[serde(rename = "cantidadMinima")]
        min_quantity: i64,
    },
}

impl fmt::Display for DiscountSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountSource::ClientTier { rule_id } => write!(f, "descuento de cliente #{rule_id}"),
            DiscountSource::Category { rule_id } => write!(f, "descuento de categoría #{rule_id}"),
            DiscountSource::Volume {
                rule_id,
                min_quantity,
            } => write!(f, "descuento por volumen #{rule_id} (desde {min_quantity} uds)"),
        }
    }
}

/// Discount chosen for one line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub source: DiscountSource,
    pub rate: Decimal,
}

impl AppliedDiscount {
    /// `price * (1 - rate)`
    pub fn apply(&self, price: Decimal) -> Result<Decimal> {
        price
            .checked_mul(Decimal::ONE - self.rate)
            .ok_or(TarifaError::Overflow)
    }
}

impl fmt::Display for AppliedDiscount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -{}%",
            self.source,
            (self.rate * Decimal::ONE_HUNDRED).normalize()
        )
    }
}

/// Largest applicable discount, or `None` when nothing above 0% applies
pub fn best_discount(
    rules: &RuleSet,
    client: Option<&Client>,
    product: &Product,
    tier_quantity: i64,
) -> Option<AppliedDiscount> {
    [
        client_tier_discount(rules, client),
        category_discount(rules, product),
        volume_discount(rules, tier_quantity),
    ]
    .into_iter()
    .flatten()
    .reduce(keep_larger)
    .filter(|d| d.rate > Decimal::ZERO)
}

/// Prefers the earlier candidate when rates tie
fn keep_larger(best: AppliedDiscount, candidate: AppliedDiscount) -> AppliedDiscount {
    if candidate.rate > best.rate {
        candidate
    } else {
        best
    }
}

fn client_tier_discount(rules: &RuleSet, client: Option<&Client>) -> Option<AppliedDiscount> {
    let tier = client?.tier.as_ref()?;
    best_of_class(rules, |rule| match &rule.kind {
        DiscountKind::Client { tier: t } if t == tier => Some(AppliedDiscount {
            source: DiscountSource::ClientTier { rule_id: rule.id },
            rate: rule.rate,
        }),
        _ => None,
    })
}

fn category_discount(rules: &RuleSet, product: &Product) -> Option<AppliedDiscount> {
    let material = product.material.as_deref()?;
    best_of_class(rules, |rule| match &rule.kind {
        DiscountKind::Category { category } if category == material => Some(AppliedDiscount {
            source: DiscountSource::Category { rule_id: rule.id },
            rate: rule.rate,
        }),
        _ => None,
    })
}

/// Per rule, the steepest tier the quantity clears; across rules, the largest rate
fn volume_discount(rules: &RuleSet, tier_quantity: i64) -> Option<AppliedDiscount> {
    if tier_quantity <= 0 {
        return None;
    }
    best_of_class(rules, |rule| {
        let DiscountKind::Volume { tiers } = &rule.kind else {
            return None;
        };
        tiers
            .iter()
            .filter(|t| tier_quantity >= t.min_quantity)
            .max_by_key(|t| t.min_quantity)
            .map(|t| AppliedDiscount {
                source: DiscountSource::Volume {
                    rule_id: rule.id,
                    min_quantity: t.min_quantity,
                },
                rate: t.rate,
            })
    })
}

fn best_of_class<F>(rules: &RuleSet, candidate: F) -> Option<AppliedDiscount>
where
    F: Fn(&DiscountRule) -> Option<AppliedDiscount>,
{
    rules
        .active_discounts()
        .filter_map(candidate)
        .reduce(keep_larger)
}
