//! HTTP routes

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use tarifa_common::TarifaError;
use tarifa_engine::{BatchPricer, BatchPricingRequest, BatchPricingResponse};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;

use crate::metrics::PricingMetrics;

#[derive(Clone)]
pub struct AppState {
    pub pricer: Arc<BatchPricer>,
    pub metrics: Arc<PricingMetrics>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/pricing/line-items", post(price_line_items))
        .route("/metrics", get(render_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Error response body: `{ "error": message }`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<TarifaError> for ApiError {
    fn from(err: TarifaError) -> Self {
        if err.is_client_error() {
            return Self {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
            };
        }
        error!(error = %err, "Pricing failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn price_line_items(
    State(state): State<AppState>,
    payload: Result<Json<BatchPricingRequest>, JsonRejection>,
) -> Result<Json<BatchPricingResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        state.metrics.batches_rejected.inc();
        ApiError::from(TarifaError::InvalidRequest(rejection.body_text()))
    })?;

    let timer = state.metrics.batch_duration.start_timer();
    let result = state.pricer.price_batch(&request).await;
    timer.observe_duration();

    match result {
        Ok(response) => {
            state
                .metrics
                .line_items_priced
                .inc_by(response.items.len() as u64);
            state
                .metrics
                .products_not_found
                .inc_by(response.unresolved().count() as u64);
            Ok(Json(response))
        }
        Err(err) => {
            state.metrics.batches_rejected.inc();
            Err(err.into())
        }
    }
}

async fn render_metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state.metrics.render()?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response())
}
