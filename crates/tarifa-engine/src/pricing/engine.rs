//! Unit-price calculation
//!
//! Pure and synchronous: the caller fetches products, clients, and rules and
//! hands them in, so one rule snapshot can price a whole batch consistently.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tarifa_common::{
    round_currency, Client, LineItem, MarginRuleId, Product, Result, RuleSet, PRODUCT_NOT_FOUND,
};
use tracing::debug;

use super::discount::{best_discount, AppliedDiscount};
use super::margin::{select_margin, AppliedMargin};
use crate::EngineConfig;

/// Everything besides the line item and its product that can affect the price
#[derive(Debug, Clone, Copy)]
pub struct PricingContext<'a> {
    /// Client the line is priced for
    pub client: Option<&'a Client>,
    /// Margin forced by the caller, taking precedence over tier lookup
    pub selected_margin_id: Option<MarginRuleId>,
    /// Validated rules snapshot
    pub rules: &'a RuleSet,
}

impl<'a> PricingContext<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self {
            client: None,
            selected_margin_id: None,
            rules,
        }
    }

    pub fn with_client(mut self, client: &'a Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_selected_margin(mut self, margin_id: MarginRuleId) -> Self {
        self.selected_margin_id = Some(margin_id);
        self
    }
}

/// How a computed price was reached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base_cost: Decimal,
    pub margin: AppliedMargin,
    /// Price after margin, before discount and rounding
    pub price_before_discount: Decimal,
    pub discount: Option<AppliedDiscount>,
}

/// Engine output for one line item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitPrice {
    pub unit_price: Decimal,
    /// Human-readable rule path, for audit
    pub applied_rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Only present when margin and discount rules were evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<PriceBreakdown>,
}

impl UnitPrice {
    fn product_not_found(item: &LineItem) -> Self {
        Self {
            unit_price: item.fallback_price(),
            applied_rule: "precio de referencia".to_string(),
            error: Some(PRODUCT_NOT_FOUND.to_string()),
            breakdown: None,
        }
    }

    fn special(price: Decimal) -> Self {
        Self {
            unit_price: price,
            applied_rule: "precio especial".to_string(),
            error: None,
            breakdown: None,
        }
    }

    fn zero_cost(cost: Decimal) -> Self {
        Self {
            unit_price: cost,
            applied_rule: "costo sin margen".to_string(),
            error: None,
            breakdown: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Line-item pricing engine
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    config: EngineConfig,
}

impl PricingEngine {
    /// Engine with the default fallback margin (x1.3, no fee)
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with a custom fallback margin
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute the unit sell price of `item`
    ///
    /// `product` is the catalog entry resolved for `item.product_id`; a missing
    /// or mismatching product yields the item's fallback price annotated with
    /// [`PRODUCT_NOT_FOUND`]. Only arithmetic overflow is reported as an error.
    pub fn calculate_unit_price(
        &self,
        item: &LineItem,
        product: Option<&Product>,
        ctx: &PricingContext<'_>,
    ) -> Result<UnitPrice> {
        let product = match (item.product_id, product) {
            (Some(id), Some(product)) if product.id == id => product,
            _ => {
                debug!(product_id = ?item.product_id, "Product not resolved, keeping fallback price");
                return Ok(UnitPrice::product_not_found(item));
            }
        };

        if let Some(client) = ctx.client {
            if let Some(price) = ctx.rules.special_price(client.id, product.id) {
                debug!(client_id = client.id, product_id = product.id, %price, "Special price applied");
                return Ok(UnitPrice::special(price));
            }
        }

        let base_cost = product.unit_cost;
        if base_cost <= Decimal::ZERO {
            return Ok(UnitPrice::zero_cost(base_cost));
        }

        let margin = select_margin(ctx.rules, ctx.client, ctx.selected_margin_id, &self.config);
        let price_before_discount = margin.apply(base_cost, item.fee_divisor())?;

        let discount = best_discount(ctx.rules, ctx.client, product, item.tier_quantity());
        let discounted = match &discount {
            Some(discount) => discount.apply(price_before_discount)?,
            None => price_before_discount,
        };

        let applied_rule = match &discount {
            Some(discount) => format!("{margin}, {discount}"),
            None => margin.to_string(),
        };
        debug!(product_id = product.id, rule = %applied_rule, "Unit price computed");

        Ok(UnitPrice {
            unit_price: round_currency(discounted),
            applied_rule,
            error: None,
            breakdown: Some(PriceBreakdown {
                base_cost,
                margin,
                price_before_discount,
                discount,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::{DiscountSource, MarginSource};
    use rust_decimal_macros::dec;
    use tarifa_common::{ClientTier, DiscountRule, MarginRule, SpecialPrice, VolumeTier};

    fn engine() -> PricingEngine {
        PricingEngine::new()
    }

    #[test]
    fn test_fallback_margin() {
        let rules = RuleSet::empty();
        let ctx = PricingContext::new(&rules);
        let product = Product::new(1, dec!(10));

        let price = engine()
            .calculate_unit_price(&LineItem::new(1, 1), Some(&product), &ctx)
            .unwrap();

        assert_eq!(price.unit_price, dec!(13.00));
        assert_eq!(price.applied_rule, "margen general (x1.3)");
        let breakdown = price.breakdown.unwrap();
        assert_eq!(breakdown.margin.source, MarginSource::Fallback);
        assert!(breakdown.discount.is_none());
    }

    #[test]
    fn test_selected_margin_without_discount() {
        let rules = RuleSet::new(vec![MarginRule::general(1, dec!(1.5), dec!(0))], vec![], vec![]).unwrap();
        let ctx = PricingContext::new(&rules).with_selected_margin(1);
        let product = Product::new(1, dec!(10.50));

        let price = engine()
            .calculate_unit_price(&LineItem::new(1, 1), Some(&product), &ctx)
            .unwrap();
        assert_eq!(price.unit_price, dec!(15.75));
    }

    #[test]
    fn test_margin_then_category_discount() {
        let rules = RuleSet::new(
            vec![MarginRule::general(1, dec!(2.0), dec!(20))],
            vec![DiscountRule::category(1, "Metacrilato", dec!(0.10))],
            vec![],
        )
        .unwrap();
        let ctx = PricingContext::new(&rules).with_selected_margin(1);
        let product = Product::new(1, dec!(10.00)).with_material("Metacrilato");

        let price = engine()
            .calculate_unit_price(&LineItem::new(1, 4), Some(&product), &ctx)
            .unwrap();

        assert_eq!(price.unit_price, dec!(22.50));
        let breakdown = price.breakdown.unwrap();
        assert_eq!(breakdown.price_before_discount, dec!(25));
        assert_eq!(
            breakdown.discount.unwrap().source,
            DiscountSource::Category { rule_id: 1 }
        );
    }

    #[test]
    fn test_greatest_volume_rate_wins_across_rules() {
        let rules = RuleSet::new(
            vec![],
            vec![
                DiscountRule::volume(1, vec![VolumeTier::new(10, dec!(0.20))]),
                DiscountRule::volume(2, vec![VolumeTier::new(50, dec!(0.10))]),
            ],
            vec![],
        )
        .unwrap();
        let ctx = PricingContext::new(&rules);

        let price = engine()
            .calculate_unit_price(&LineItem::new(1, 60), Some(&Product::new(1, dec!(100))), &ctx)
            .unwrap();

        // 100 * 1.3 = 130, -20% from the lower threshold beats -10% from the higher one
        assert_eq!(price.unit_price, dec!(104.00));
        assert_eq!(
            price.applied_rule,
            "margen general (x1.3), descuento por volumen #1 (desde 10 uds) -20%"
        );
    }

    #[test]
    fn test_breakdown_wire_names() {
        let rules = RuleSet::new(
            vec![MarginRule::general(1, dec!(2.0), dec!(20))],
            vec![DiscountRule::volume(4, vec![VolumeTier::new(2, dec!(0.10))])],
            vec![],
        )
        .unwrap();
        let ctx = PricingContext::new(&rules).with_selected_margin(1);

        let price = engine()
            .calculate_unit_price(&LineItem::new(1, 4), Some(&Product::new(1, dec!(10))), &ctx)
            .unwrap();
        let value = serde_json::to_value(price.breakdown.unwrap()).unwrap();

        assert!(value.get("baseCost").is_some());
        assert!(value.get("priceBeforeDiscount").is_some());
        assert_eq!(value["margin"]["fixedFee"], "20");
        assert_eq!(value["margin"]["source"]["kind"], "selected");
        assert_eq!(value["margin"]["source"]["ruleId"], 1);
        assert_eq!(value["discount"]["source"]["kind"], "volume");
        assert_eq!(value["discount"]["source"]["ruleId"], 4);
        assert_eq!(value["discount"]["source"]["cantidadMinima"], 2);
        assert!(value["margin"].get("fixed_fee").is_none());
    }

    #[test]
    fn test_special_price_short_circuits() {
        let rules = RuleSet::new(
            vec![MarginRule::for_tier(1, ClientTier::FABRICANTE, dec!(3), dec!(50))],
            vec![DiscountRule::client_tier(1, ClientTier::FABRICANTE, dec!(0.5))],
            vec![SpecialPrice::new(7, 2, dec!(7.00))],
        )
        .unwrap();
        let client = Client::new(7).with_tier(ClientTier::FABRICANTE);
        let ctx = PricingContext::new(&rules).with_client(&client).with_selected_margin(1);
        let product = Product::new(2, dec!(100));

        let price = engine()
            .calculate_unit_price(&LineItem::new(2, 3), Some(&product), &ctx)
            .unwrap();

        assert_eq!(price.unit_price, dec!(7.00));
        assert_eq!(price.applied_rule, "precio especial");
        assert!(price.breakdown.is_none());
    }

    #[test]
    fn test_special_price_needs_client() {
        let rules = RuleSet::new(vec![], vec![], vec![SpecialPrice::new(7, 2, dec!(7.00))]).unwrap();
        let ctx = PricingContext::new(&rules);
        let product = Product::new(2, dec!(10));

        let price = engine()
            .calculate_unit_price(&LineItem::new(2, 1), Some(&product), &ctx)
            .unwrap();
        assert_eq!(price.unit_price, dec!(13.00));
    }

    #[test]
    fn test_zero_and_negative_cost_pass_through() {
        let rules = RuleSet::new(
            vec![MarginRule::general(1, dec!(2), dec!(100))],
            vec![DiscountRule::category(1, "PVC", dec!(0.5))],
            vec![],
        )
        .unwrap();
        let ctx = PricingContext::new(&rules).with_selected_margin(1);

        for cost in [dec!(0), dec!(-3.5)] {
            let product = Product::new(1, cost).with_material("PVC");
            let price = engine()
                .calculate_unit_price(&LineItem::new(1, 5), Some(&product), &ctx)
                .unwrap();
            assert_eq!(price.unit_price, cost);
            assert!(!price.is_error());
        }
    }

    #[test]
    fn test_missing_product_keeps_fallback() {
        let rules = RuleSet::empty();
        let ctx = PricingContext::new(&rules);

        let item = LineItem::new(42, 2).with_unit_price(dec!(9.99));
        let price = engine().calculate_unit_price(&item, None, &ctx).unwrap();
        assert_eq!(price.unit_price, dec!(9.99));
        assert_eq!(price.error.as_deref(), Some(PRODUCT_NOT_FOUND));

        let no_fallback = engine()
            .calculate_unit_price(&LineItem::new(42, 2), None, &ctx)
            .unwrap();
        assert_eq!(no_fallback.unit_price, Decimal::ZERO);
    }

    #[test]
    fn test_mismatched_product_is_not_used() {
        let rules = RuleSet::empty();
        let ctx = PricingContext::new(&rules);
        let other = Product::new(2, dec!(10));

        let price = engine()
            .calculate_unit_price(&LineItem::new(1, 1), Some(&other), &ctx)
            .unwrap();
        assert!(price.is_error());
    }

    #[test]
    fn test_missing_product_id_is_zero_effect() {
        let rules = RuleSet::empty();
        let ctx = PricingContext::new(&rules);
        let item = LineItem {
            unit_price: Some(dec!(3)),
            ..Default::default()
        };

        let price = engine()
            .calculate_unit_price(&item, Some(&Product::new(1, dec!(10))), &ctx)
            .unwrap();
        assert_eq!(price.unit_price, dec!(3));
        assert!(price.is_error());
    }

    #[test]
    fn test_zero_and_negative_quantity_do_not_divide_by_zero() {
        let rules = RuleSet::new(
            vec![MarginRule::general(1, dec!(1), dec!(100))],
            vec![DiscountRule::volume(1, vec![VolumeTier::new(0, dec!(0.5))])],
            vec![],
        )
        .unwrap();
        let ctx = PricingContext::new(&rules).with_selected_margin(1);
        let product = Product::new(1, dec!(10));

        for qty in [0, -4] {
            let price = engine()
                .calculate_unit_price(&LineItem::new(1, qty), Some(&product), &ctx)
                .unwrap();
            // fee over one unit, no volume tier qualifies
            assert_eq!(price.unit_price, dec!(110.00));
        }
    }

    #[test]
    fn test_rounds_half_away_from_zero() {
        // 1.5 * 1.3 = 1.95, fee 0.01 / 2 = 0.005 -> 1.955
        let rules = RuleSet::new(vec![MarginRule::general(1, dec!(1.3), dec!(0.01))], vec![], vec![]).unwrap();
        let ctx = PricingContext::new(&rules).with_selected_margin(1);
        let product = Product::new(1, dec!(1.5));

        let price = engine()
            .calculate_unit_price(&LineItem::new(1, 2), Some(&product), &ctx)
            .unwrap();
        assert_eq!(price.unit_price, dec!(1.96));
    }

    #[test]
    fn test_custom_fallback() {
        let engine = PricingEngine::with_config(EngineConfig {
            fallback_multiplier: dec!(2),
            fallback_fee: dec!(6),
        })
        .unwrap();
        let rules = RuleSet::empty();
        let ctx = PricingContext::new(&rules);

        let price = engine
            .calculate_unit_price(&LineItem::new(1, 3), Some(&Product::new(1, dec!(5))), &ctx)
            .unwrap();
        assert_eq!(price.unit_price, dec!(12.00));
    }
}
