use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new().route("/reset", post(reset_all_test_data))
}

// POST /api/reset - сброс инвентаря для нагрузочных прогонов.
// Структура мест и каталог сохраняются, статусы и брони очищаются.
async fn reset_all_test_data(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::warn!("RESET: wiping bookings and seat statuses");

    let mut tx = state.db.pool.begin().await.map_err(|e| {
        tracing::error!("RESET: failed to begin transaction: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to begin transaction".to_string(),
        )
    })?;

    // 1. Возвращаем все занятые места в AVAILABLE
    let freed: Vec<(i64, Uuid)> = sqlx::query_as(
        r#"
        UPDATE seats
        SET status = 'AVAILABLE', locked_by = NULL, locked_until = NULL
        WHERE status IN ('LOCKED', 'BOOKED')
        RETURNING id, show_id
        "#,
    )
    .fetch_all(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("RESET: failed to reset seats: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to reset seats".to_string(),
        )
    })?;

    // 2. Удаляем все брони (booking_seats уходят каскадом)
    let bookings_result = sqlx::query("DELETE FROM bookings")
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("RESET: failed to delete bookings: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete bookings".to_string(),
            )
        })?;

    tx.commit().await.map_err(|e| {
        tracing::error!("RESET: failed to commit: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to commit reset".to_string(),
        )
    })?;

    // 3. Инвалидируем кеш мест затронутых сеансов
    let shows: BTreeSet<Uuid> = freed.iter().map(|(_, show_id)| *show_id).collect();
    for show_id in &shows {
        state.cache.invalidate_seats(*show_id).await;
    }

    let response = serde_json::json!({
        "status": "success",
        "message": "Test data reset",
        "details": {
            "seats_reset": freed.len(),
            "bookings_deleted": bookings_result.rows_affected(),
            "shows_invalidated": shows.len()
        },
        "preserved": {
            "users": "kept",
            "shows": "kept",
            "seats_structure": "kept (statuses reset only)"
        }
    });

    tracing::warn!("RESET: done, {} seats freed", freed.len());

    Ok((StatusCode::OK, Json(response)))
}
