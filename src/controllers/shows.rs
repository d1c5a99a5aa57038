use axum::{
    body::Body,
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Seat, SeatTier};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shows/{show_id}/seats", get(get_seat_map))
        .route("/shows/{show_id}/seats/count", get(get_seat_counts))
}

#[derive(Debug, Serialize)]
struct SeatMapEntry {
    id: i64,
    seat_number: String,
    row_label: Option<String>,
    tier: String,
    status: String,
    price: Decimal,
}

// GET /api/shows/{show_id}/seats
//
// Карта мест с эффективным статусом: истекшая блокировка отображается
// как AVAILABLE, даже если reaper ее еще не вернул.
async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    // 1. Пытаемся отдать готовый JSON из кеша
    if let Some(cached_json) = state.cache.get_cached_seat_map(show_id).await {
        return Ok(Response::builder()
            .header("Content-Type", "application/json")
            .header("X-Cache", "HIT")
            .body(Body::from(cached_json))
            .unwrap());
    }

    // 2. Cache Miss: собираем карту из БД
    let show = state
        .cache
        .get_show(show_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Show".to_string()))?;
    let movie = state
        .cache
        .get_movie(show.movie_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Movie".to_string()))?;

    let seats: Vec<Seat> = sqlx::query_as::<_, Seat>(
        "SELECT id, show_id, seat_number, row_label, tier, base_price, status,
                locked_by, locked_until
         FROM seats
         WHERE show_id = $1
         ORDER BY row_label, seat_number",
    )
    .bind(show_id)
    .fetch_all(&state.db.pool)
    .await?;

    let now = Utc::now();
    let payload = seats
        .iter()
        .map(|seat| {
            let tier = seat.seat_tier().ok_or_else(|| {
                ApiError::Integrity(format!(
                    "seat {} has unknown tier '{}'",
                    seat.seat_number, seat.tier
                ))
            })?;
            Ok(SeatMapEntry {
                id: seat.id,
                seat_number: seat.seat_number.clone(),
                row_label: seat.row_label.clone(),
                tier: seat.tier.clone(),
                status: seat.effective_status(now).to_string(),
                price: state.pricing.seat_price(&show, tier, Some(&movie)),
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    let count = payload.len();
    let body = json!({
        "success": true,
        "show_id": show_id,
        "seats": payload,
        "count": count
    });

    // 3. Сериализуем и сохраняем результат в кеш
    if let Ok(json_str) = serde_json::to_string(&body) {
        state.cache.cache_seat_map(show_id, &json_str).await;
        return Ok(Response::builder()
            .header("Content-Type", "application/json")
            .header("X-Cache", "MISS")
            .body(Body::from(json_str))
            .unwrap());
    }

    // Fallback в случае ошибки сериализации
    Ok(Json(body).into_response())
}

// GET /api/shows/{show_id}/seats/count
//
// Количество эффективно доступных мест по категориям + TOTAL.
async fn get_seat_counts(
    State(state): State<Arc<AppState>>,
    Path(show_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .cache
        .get_show(show_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Show".to_string()))?;

    let now: DateTime<Utc> = Utc::now();
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT tier, COUNT(*)
         FROM seats
         WHERE show_id = $1
           AND (status = 'AVAILABLE' OR (status = 'LOCKED' AND locked_until < $2))
         GROUP BY tier",
    )
    .bind(show_id)
    .bind(now)
    .fetch_all(&state.db.pool)
    .await?;

    let by_tier: HashMap<String, i64> = rows.into_iter().collect();
    let mut counts = serde_json::Map::new();
    let mut total = 0i64;
    for tier in SeatTier::ALL {
        let count = by_tier.get(tier.as_str()).copied().unwrap_or(0);
        total += count;
        counts.insert(tier.as_str().to_string(), json!(count));
    }
    counts.insert("TOTAL".to_string(), json!(total));

    Ok(Json(serde_json::Value::Object(counts)))
}
