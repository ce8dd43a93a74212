//! # Tarifa API
//!
//! HTTP surface of the Tarifa pricing engine.
//!
//! ## Endpoints
//!
//! - `POST /api/pricing/line-items`: price a batch of line items for a client
//! - `GET /metrics`: Prometheus counters

pub mod config;
pub mod metrics;
pub mod routes;

pub use config::ApiConfig;
pub use metrics::PricingMetrics;
pub use routes::{router, AppState};
