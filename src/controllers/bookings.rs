use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::Row;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::models::booking::BookingSeat;
use crate::services::booking::{BookingService, FinalizedBooking, PaymentProof};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings/lock", post(lock_seats))
        .route("/bookings/complete", post(complete_booking))
        .route("/bookings/my-bookings", get(my_bookings))
        .route("/bookings/my-tickets", get(my_tickets))
}

/* ---------- LOCK ---------- */

#[derive(Debug, Deserialize, Validate)]
struct LockSeatsRequest {
    // Верхнюю границу проверяет сервис по конфигу
    #[validate(length(min = 1, message = "seat_ids must not be empty"))]
    seat_ids: Vec<i64>,
}

// POST /api/bookings/lock
async fn lock_seats(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<LockSeatsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let locked = BookingService::new(state.clone())
        .lock_seats(user.user_id, &req.seat_ids)
        .await?;

    let count = locked.len();
    Ok((
        StatusCode::OK,
        Json(json!({
            "success": true,
            "seats": locked,
            "count": count
        })),
    ))
}

/* ---------- COMPLETE ---------- */

#[derive(Debug, Deserialize, Validate)]
struct CompleteBookingRequest {
    show_id: Uuid,
    #[validate(length(min = 1, message = "seat_ids must not be empty"))]
    seat_ids: Vec<i64>,
    // Подтверждение оплаты, уже провалидированное платежным слоем
    #[validate(length(min = 1, max = 32))]
    card_type: String,
    #[validate(length(equal = 4, message = "card_last_four must be 4 digits"))]
    card_last_four: String,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    id: i64,
    booking_ref: String,
    movie_title: String,
    movie_poster_url: Option<String>,
    theater_name: String,
    theater_city: Option<String>,
    show_date: String,
    show_time: String,
    format: String,
    seats: Vec<String>,
    // Пары (место, уплаченная цена); в истории не заполняются
    #[serde(skip_serializing_if = "Vec::is_empty")]
    booking_seats: Vec<BookingSeat>,
    total_amount: Decimal,
    payment_status: String,
    booked_at: DateTime<Utc>,
}

impl From<FinalizedBooking> for BookingResponse {
    fn from(finalized: FinalizedBooking) -> Self {
        let FinalizedBooking {
            booking,
            booking_seats,
            seat_numbers,
            show,
        } = finalized;
        BookingResponse {
            id: booking.id,
            booking_ref: booking.booking_ref,
            movie_title: show.movie_title,
            movie_poster_url: show.movie_poster_url,
            theater_name: show.theater_name,
            theater_city: show.theater_city,
            show_date: show.show_date.to_string(),
            show_time: show.show_time,
            format: show.format,
            seats: seat_numbers,
            booking_seats,
            total_amount: booking.total_amount,
            payment_status: booking.payment_status,
            booked_at: booking.booked_at,
        }
    }
}

// POST /api/bookings/complete
async fn complete_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CompleteBookingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    if !req.card_last_four.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::Validation(
            "card_last_four must be 4 digits".to_string(),
        ));
    }

    let finalized = BookingService::new(state.clone())
        .complete_booking(
            user.user_id,
            req.show_id,
            &req.seat_ids,
            PaymentProof {
                card_type: req.card_type,
                card_last_four: req.card_last_four,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(finalized))))
}

/* ---------- HISTORY ---------- */

// GET /api/bookings/my-bookings
async fn my_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = fetch_user_bookings(&state, user.user_id, false).await?;
    Ok(Json(bookings))
}

// GET /api/bookings/my-tickets - только предстоящие сеансы
async fn my_tickets(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = fetch_user_bookings(&state, user.user_id, true).await?;
    Ok(Json(bookings))
}

async fn fetch_user_bookings(
    state: &Arc<AppState>,
    user_id: i64,
    upcoming_only: bool,
) -> Result<Vec<BookingResponse>, ApiError> {
    let mut q = String::from(
        r#"
        SELECT b.id AS bid, b.booking_ref, b.total_amount, b.payment_status, b.booked_at,
               sh.movie_title, sh.movie_poster_url, sh.theater_name, sh.theater_city,
               sh.show_date, sh.show_time, sh.format,
               s.seat_number
        FROM bookings b
        JOIN shows sh ON sh.id = b.show_id
        JOIN booking_seats bs ON bs.booking_id = b.id
        JOIN seats s ON s.id = bs.seat_id
        WHERE b.user_id = $1
        "#,
    );
    if upcoming_only {
        q.push_str(" AND sh.show_date >= CURRENT_DATE - INTERVAL '1 day'");
    }
    q.push_str(" ORDER BY b.booked_at DESC, bs.id");

    let rows = sqlx::query(&q)
        .bind(user_id)
        .fetch_all(&state.db.pool)
        .await?;

    // Группируем строки по брони (одна строка на место)
    let mut map: BTreeMap<i64, BookingResponse> = BTreeMap::new();
    for r in rows {
        let bid: i64 = r.get("bid");
        let seat_number: String = r.get("seat_number");
        let entry = map.entry(bid).or_insert_with(|| BookingResponse {
            id: bid,
            booking_ref: r.get("booking_ref"),
            movie_title: r.get("movie_title"),
            movie_poster_url: r.get("movie_poster_url"),
            theater_name: r.get("theater_name"),
            theater_city: r.get("theater_city"),
            show_date: r.get::<chrono::NaiveDate, _>("show_date").to_string(),
            show_time: r.get("show_time"),
            format: r.get("format"),
            seats: Vec::new(),
            booking_seats: Vec::new(),
            total_amount: r.get("total_amount"),
            payment_status: r.get("payment_status"),
            booked_at: r.get("booked_at"),
        });
        entry.seats.push(seat_number);
    }

    // Новые брони первыми
    Ok(map.into_values().rev().collect())
}
