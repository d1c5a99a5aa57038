use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

use crate::models::SeatTier;
use crate::services::pricing::PricingService;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/pricing/tiers", get(tier_info))
}

const FORMATS: [&str; 6] = [
    "IMAX_2D",
    "IMAX_3D",
    "FOUR_DX",
    "STANDARD_2D",
    "STANDARD_3D",
    "DOLBY_ATMOS",
];

// GET /api/pricing/tiers - справочная информация, в расчетах не участвует
async fn tier_info(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let multipliers: serde_json::Map<String, serde_json::Value> = SeatTier::ALL
        .iter()
        .map(|tier| {
            (
                tier.as_str().to_string(),
                json!(state.pricing.tier_multiplier(*tier)),
            )
        })
        .collect();

    let premiums: serde_json::Map<String, serde_json::Value> = FORMATS
        .iter()
        .map(|format| {
            (
                format.to_string(),
                json!(state.pricing.default_format_premium(format)),
            )
        })
        .collect();

    Json(json!({
        "success": true,
        "tier_multipliers": multipliers,
        "default_format_premiums": premiums,
        "explanation": PricingService::explain_tier_differences()
    }))
}
