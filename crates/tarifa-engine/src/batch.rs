//! Batch line-item pricing
//!
//! One snapshot read per batch, then the engine once per item. Unresolvable
//! products are annotated on their item; the batch itself only fails when it
//! is empty, when the data source fails, or when stored rules are malformed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tarifa_common::{
    round_currency, ClientId, LineItem, MarginRuleId, ProductId, Result, TarifaError,
    CLIENT_NOT_FOUND,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::catalog::PricingDataSource;
use crate::pricing::{PriceBreakdown, PricingContext, PricingEngine, UnitPrice};

/// Items to price for one client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPricingRequest {
    #[serde(rename = "clienteId", default)]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub selected_margin_id: Option<MarginRuleId>,
    pub items: Vec<LineItem>,
}

impl BatchPricingRequest {
    pub fn new(items: Vec<LineItem>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn for_client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_selected_margin(mut self, margin_id: MarginRuleId) -> Self {
        self.selected_margin_id = Some(margin_id);
        self
    }

    /// Distinct product ids referenced by the batch
    fn product_ids(&self) -> Vec<ProductId> {
        self.items
            .iter()
            .filter_map(|item| item.product_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Line item as submitted, with the computed unit price in `precioUnitario`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLineItem {
    #[serde(flatten)]
    pub item: LineItem,
    #[serde(rename = "reglaAplicada")]
    pub applied_rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "desglose", default, skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<PriceBreakdown>,
}

impl PricedLineItem {
    fn new(mut item: LineItem, price: UnitPrice) -> Self {
        item.unit_price = Some(price.unit_price);
        Self {
            item,
            applied_rule: price.applied_rule,
            error: price.error,
            breakdown: price.breakdown,
        }
    }

    /// Computed unit price, stored back into the item's `precioUnitario`
    pub fn unit_price(&self) -> Decimal {
        self.item.unit_price.unwrap_or_default()
    }

    /// Unit price times quantity; missing or negative quantities count as 0
    pub fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.item.tier_quantity())
    }
}

/// Priced batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPricingResponse {
    pub quote_id: Uuid,
    pub items: Vec<PricedLineItem>,
    /// Sum of line totals, rounded to cents
    #[serde(
        serialize_with = "rust_decimal::serde::float::serialize",
        deserialize_with = "rust_decimal::serde::float::deserialize"
    )]
    pub subtotal: Decimal,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub computed_at: DateTime<Utc>,
}

impl BatchPricingResponse {
    /// Items whose product could not be resolved
    pub fn unresolved(&self) -> impl Iterator<Item = &PricedLineItem> {
        self.items.iter().filter(|item| item.error.is_some())
    }
}

/// Prices whole batches against a data source
pub struct BatchPricer {
    engine: PricingEngine,
    source: Arc<dyn PricingDataSource>,
}

impl BatchPricer {
    pub fn new(engine: PricingEngine, source: Arc<dyn PricingDataSource>) -> Self {
        Self { engine, source }
    }

    pub fn engine(&self) -> &PricingEngine {
        &self.engine
    }

    /// Price every item of `request` against one consistent snapshot
    #[instrument(skip(self, request), fields(items = request.items.len(), client_id = ?request.client_id))]
    pub async fn price_batch(&self, request: &BatchPricingRequest) -> Result<BatchPricingResponse> {
        if request.items.is_empty() {
            return Err(TarifaError::EmptyBatch);
        }

        let snapshot = self
            .source
            .load_snapshot(request.client_id, &request.product_ids())
            .await?;

        let mut warnings = Vec::new();
        if let (Some(client_id), None) = (request.client_id, &snapshot.client) {
            warn!(client_id, "Client not found, pricing without client context");
            warnings.push(CLIENT_NOT_FOUND.to_string());
        }

        let ctx = PricingContext {
            client: snapshot.client.as_ref(),
            selected_margin_id: request.selected_margin_id,
            rules: &snapshot.rules,
        };

        let mut items = Vec::with_capacity(request.items.len());
        let mut subtotal = Decimal::ZERO;
        for item in &request.items {
            let price = self
                .engine
                .calculate_unit_price(item, snapshot.product(item.product_id), &ctx)?;
            if price.is_error() {
                warn!(product_id = ?item.product_id, "Product not found, keeping fallback price");
            }

            let priced = PricedLineItem::new(item.clone(), price);
            subtotal = subtotal
                .checked_add(priced.line_total())
                .ok_or(TarifaError::Overflow)?;
            items.push(priced);
        }

        let response = BatchPricingResponse {
            quote_id: Uuid::new_v4(),
            items,
            subtotal: round_currency(subtotal),
            warnings,
            computed_at: Utc::now(),
        };
        info!(
            quote_id = %response.quote_id,
            subtotal = %response.subtotal,
            unresolved = response.unresolved().count(),
            "Batch priced"
        );
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogSeed, InMemoryCatalog};
    use rust_decimal_macros::dec;
    use tarifa_common::{Client, ClientTier, DiscountRule, MarginRule, Product, PRODUCT_NOT_FOUND};

    fn pricer() -> BatchPricer {
        let catalog = InMemoryCatalog::from_seed(CatalogSeed {
            products: vec![
                Product::new(1, dec!(10)).with_material("Metacrilato"),
                Product::new(2, dec!(2)),
            ],
            clients: vec![Client::new(5).with_tier(ClientTier::INTERMEDIARIO)],
            margins: vec![
                MarginRule::for_tier(1, ClientTier::INTERMEDIARIO, dec!(1.5), dec!(0)),
                MarginRule::general(2, dec!(2), dec!(0)),
            ],
            discounts: vec![DiscountRule::category(1, "Metacrilato", dec!(0.10))],
            special_prices: vec![],
        })
        .unwrap();
        BatchPricer::new(PricingEngine::new(), Arc::new(catalog))
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let err = pricer()
            .price_batch(&BatchPricingRequest::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, TarifaError::EmptyBatch));
    }

    #[tokio::test]
    async fn test_prices_each_item_with_client_tier() {
        let request = BatchPricingRequest::new(vec![LineItem::new(1, 2), LineItem::new(2, 3)]).for_client(5);
        let response = pricer().price_batch(&request).await.unwrap();

        // 10 * 1.5 = 15, -10% = 13.50 ; 2 * 1.5 = 3.00
        assert_eq!(response.items[0].unit_price(), dec!(13.50));
        assert_eq!(response.items[1].unit_price(), dec!(3.00));
        assert_eq!(response.subtotal, dec!(36.00));
        assert!(response.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_selected_margin_applies_to_whole_batch() {
        let request = BatchPricingRequest::new(vec![LineItem::new(2, 1)])
            .for_client(5)
            .with_selected_margin(2);
        let response = pricer().price_batch(&request).await.unwrap();
        assert_eq!(response.items[0].unit_price(), dec!(4.00));
    }

    #[tokio::test]
    async fn test_unknown_product_annotated_not_failed() {
        let request = BatchPricingRequest::new(vec![
            LineItem::new(99, 1).with_unit_price(dec!(5.55)),
            LineItem::new(2, 1),
        ]);
        let response = pricer().price_batch(&request).await.unwrap();

        assert_eq!(response.items[0].unit_price(), dec!(5.55));
        assert_eq!(response.items[0].error.as_deref(), Some(PRODUCT_NOT_FOUND));
        assert_eq!(response.items[1].unit_price(), dec!(2.60));
        assert_eq!(response.unresolved().count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_client_warns() {
        let request = BatchPricingRequest::new(vec![LineItem::new(2, 1)]).for_client(404);
        let response = pricer().price_batch(&request).await.unwrap();

        assert_eq!(response.warnings, vec![CLIENT_NOT_FOUND.to_string()]);
        assert_eq!(response.items[0].unit_price(), dec!(2.60));
    }

    #[tokio::test]
    async fn test_prices_serialized_as_numbers_with_cents() {
        let request = BatchPricingRequest::new(vec![LineItem::new(2, 5)]);
        let response = pricer().price_batch(&request).await.unwrap();

        assert_eq!(response.items[0].unit_price().to_string(), "2.60");
        assert_eq!(response.subtotal.to_string(), "13.00");

        let value = serde_json::to_value(&response).unwrap();
        assert!(value["items"][0]["precioUnitario"].is_number());
        assert_eq!(value["items"][0]["precioUnitario"], 2.6);
        assert!(value["subtotal"].is_number());
        assert_eq!(value["subtotal"], 13.0);
    }

    #[test]
    fn test_request_wire_format() {
        let json = r#"{"clienteId": 5, "selectedMarginId": 2, "items": [{"productoId": 1, "cantidad": 3, "nota": "x"}]}"#;
        let request: BatchPricingRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.client_id, Some(5));
        assert_eq!(request.selected_margin_id, Some(2));
        assert_eq!(request.items[0].extra["nota"], "x");
        assert_eq!(request.product_ids(), vec![1]);
    }

    #[test]
    fn test_priced_item_keeps_caller_fields() {
        let mut item = LineItem::new(1, 2);
        item.extra.insert("descripcion".into(), "Panel".into());
        let priced = PricedLineItem::new(
            item,
            UnitPrice {
                unit_price: dec!(13.5),
                applied_rule: "precio especial".into(),
                error: None,
                breakdown: None,
            },
        );

        let value = serde_json::to_value(&priced).unwrap();
        assert_eq!(value["descripcion"], "Panel");
        assert_eq!(value["reglaAplicada"], "precio especial");
        assert_eq!(value["precioUnitario"], 13.5);
        assert!(value.get("error").is_none());
        assert_eq!(priced.line_total(), dec!(27.0));
    }
}
