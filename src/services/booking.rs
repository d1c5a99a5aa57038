//! booking.rs
//!
//! Ядро резервирования: временная блокировка мест (lock) и атомарное
//! превращение блокировок в оплаченное бронирование (complete).
//!
//! Оба пути работают по одной схеме: отсортировать запрошенные id по
//! возрастанию (канонический порядок захвата - два пересекающихся
//! запроса не могут взаимоблокироваться), взять ровно эти строки
//! `SELECT ... FOR UPDATE` внутри транзакции, провалидировать и
//! изменить весь набор целиком либо ничего. Частичных блокировок и
//! частичных бронирований не существует.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::booking::{generate_booking_ref, BookingSeat, PaymentStatus};
use crate::models::{Booking, Movie, Seat, Show};
use crate::services::pricing::PricingService;
use crate::AppState;

/// Заблокированное место с котировкой для отображения клиенту.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LockedSeat {
    pub id: i64,
    pub seat_number: String,
    pub row_label: Option<String>,
    pub tier: String,
    pub status: String,
    pub locked_until: DateTime<Utc>,
    pub price: Decimal,
}

/// Подтверждение оплаты, проверенное вышестоящим слоем.
/// Платежный шлюз здесь не вызывается.
#[derive(Debug, Clone)]
pub struct PaymentProof {
    pub card_type: String,
    pub card_last_four: String,
}

/// Результат завершения бронирования: запись брони плюс упорядоченные
/// пары (место, уплаченная цена).
#[derive(Debug, Clone)]
pub struct FinalizedBooking {
    pub booking: Booking,
    pub booking_seats: Vec<BookingSeat>,
    pub seat_numbers: Vec<String>,
    pub show: Show,
}

pub struct BookingService {
    state: Arc<AppState>,
}

impl BookingService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Временная блокировка набора мест за покупателем.
    ///
    /// Все места должны быть эффективно доступны (свободны либо с
    /// истекшей чужой блокировкой); иначе весь запрос отклоняется с
    /// перечислением конфликтных мест и без каких-либо изменений.
    pub async fn lock_seats(
        &self,
        user_id: i64,
        seat_ids: &[i64],
    ) -> Result<Vec<LockedSeat>, ApiError> {
        let ids = canonical_ids(seat_ids, self.state.config.booking.max_seats_per_booking)?;
        let now = Utc::now();

        let mut tx = self.state.db.pool.begin().await?;

        // Захват строк в возрастающем порядке id
        let seats = fetch_seats_for_update(&mut tx, &ids).await?;
        ensure_all_lockable(&seats, &ids, now)?;

        let show_id = seats[0].show_id;
        let (show, movie) = self.resolve_catalog(show_id).await?;

        // Котировка считается до фиксации: ошибка ценообразования
        // откатывает блокировку целиком
        let locked_until = now + Duration::minutes(self.state.config.booking.seat_lock_minutes);
        let quoted = quote_seats(&seats, &show, Some(&movie), &self.state.pricing, locked_until)?;

        sqlx::query(
            "UPDATE seats SET status = 'LOCKED', locked_by = $1, locked_until = $2
             WHERE id = ANY($3)",
        )
        .bind(user_id)
        .bind(locked_until)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.state.cache.invalidate_seats(show_id).await;
        info!(
            "User {} locked {} seat(s) for show {} until {}",
            user_id,
            quoted.len(),
            show_id,
            locked_until
        );
        Ok(quoted)
    }

    /// Завершение бронирования: повторная проверка тех же блокировок,
    /// расчет итоговой цены и атомарная запись брони вместе с переводом
    /// мест в BOOKED.
    ///
    /// Проверка из lock_seats здесь не переиспользуется: время прошло,
    /// блокировка могла истечь или перейти к другому покупателю.
    pub async fn complete_booking(
        &self,
        user_id: i64,
        show_id: Uuid,
        seat_ids: &[i64],
        payment: PaymentProof,
    ) -> Result<FinalizedBooking, ApiError> {
        let ids = canonical_ids(seat_ids, self.state.config.booking.max_seats_per_booking)?;
        let now = Utc::now();

        let (show, movie) = self.resolve_catalog(show_id).await?;

        let mut tx = self.state.db.pool.begin().await?;

        let seats = fetch_seats_for_update(&mut tx, &ids).await?;
        ensure_finalizable(&seats, &ids, show_id, user_id, now)?;

        // Цена каждого места фиксируется в момент завершения
        let mut priced: Vec<(i64, String, Decimal)> = Vec::with_capacity(seats.len());
        let mut total = Decimal::ZERO;
        for seat in &seats {
            let price = price_seat(seat, &show, Some(&movie), &self.state.pricing)?;
            total += price;
            priced.push((seat.id, seat.seat_number.clone(), price));
        }

        sqlx::query(
            "UPDATE seats SET status = 'BOOKED', locked_by = NULL, locked_until = NULL
             WHERE id = ANY($1)",
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        // Бронь и пары (место, цена) пишутся в той же транзакции, что и
        // перевод мест в BOOKED: сбой любого шага откатывает все
        let booking = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings
                 (booking_ref, user_id, show_id, movie_id, theater_id, total_amount,
                  payment_status, card_type, card_last_four)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, booking_ref, user_id, show_id, movie_id, theater_id, total_amount,
                       payment_status, card_type, card_last_four, booked_at",
        )
        .bind(generate_booking_ref())
        .bind(user_id)
        .bind(show.id)
        .bind(show.movie_id)
        .bind(show.theater_id)
        .bind(total)
        .bind(PaymentStatus::Completed.as_str())
        .bind(&payment.card_type)
        .bind(&payment.card_last_four)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("booking insert failed after seat flips, rolling back: {:?}", e);
            ApiError::Integrity("booking record could not be written".to_string())
        })?;

        let mut booking_seats = Vec::with_capacity(priced.len());
        for (seat_id, _, price) in &priced {
            let pair = sqlx::query_as::<_, BookingSeat>(
                "INSERT INTO booking_seats (booking_id, seat_id, price_paid)
                 VALUES ($1, $2, $3)
                 RETURNING id, booking_id, seat_id, price_paid",
            )
            .bind(booking.id)
            .bind(seat_id)
            .bind(price)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                error!("booking_seats insert failed, rolling back: {:?}", e);
                ApiError::Integrity("booking seats could not be written".to_string())
            })?;
            booking_seats.push(pair);
        }

        tx.commit().await?;

        self.state.cache.invalidate_seats(show_id).await;
        info!(
            "User {} completed booking {} ({} seat(s), total {})",
            user_id,
            booking.booking_ref,
            priced.len(),
            total
        );

        Ok(FinalizedBooking {
            booking,
            booking_seats,
            seat_numbers: priced.into_iter().map(|(_, number, _)| number).collect(),
            show,
        })
    }

    // Сеанс и фильм нужны ценообразованию; неактивный сеанс не продается
    async fn resolve_catalog(&self, show_id: Uuid) -> Result<(Show, Movie), ApiError> {
        let show = self
            .state
            .cache
            .get_show(show_id)
            .await?
            .filter(|s| s.is_active)
            .ok_or_else(|| ApiError::NotFound("Show".to_string()))?;
        let movie = self
            .state
            .cache
            .get_movie(show.movie_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Movie".to_string()))?;
        Ok((show, movie))
    }
}

/* ---------- чистая логика, тестируемая без БД ---------- */

/// Санитизация списка мест: непустой, не больше лимита, канонический
/// возрастающий порядок без дубликатов.
fn canonical_ids(seat_ids: &[i64], max_per_booking: usize) -> Result<Vec<i64>, ApiError> {
    if seat_ids.is_empty() {
        return Err(ApiError::Validation("seat_ids must not be empty".to_string()));
    }
    if seat_ids.len() > max_per_booking {
        return Err(ApiError::Validation(format!(
            "Cannot book more than {} tickets at a time",
            max_per_booking
        )));
    }
    let mut ids = seat_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    Ok(ids)
}

/// Проверка перед блокировкой: все места найдены, принадлежат одному
/// сеансу и эффективно доступны. Любое нарушение отклоняет весь набор.
fn ensure_all_lockable(seats: &[Seat], ids: &[i64], now: DateTime<Utc>) -> Result<(), ApiError> {
    ensure_all_found(seats, ids)?;

    let show_id = seats[0].show_id;
    if seats.iter().any(|s| s.show_id != show_id) {
        return Err(ApiError::Validation(
            "All seats must belong to the same show".to_string(),
        ));
    }

    let unavailable: Vec<String> = seats
        .iter()
        .filter(|s| !s.is_available(now))
        .map(|s| s.seat_number.clone())
        .collect();
    if !unavailable.is_empty() {
        return Err(ApiError::SeatsUnavailable { seats: unavailable });
    }
    Ok(())
}

/// Проверка перед завершением: каждое место заблокировано именно этим
/// покупателем и срок блокировки не истек.
fn ensure_finalizable(
    seats: &[Seat],
    ids: &[i64],
    show_id: Uuid,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    ensure_all_found(seats, ids)?;

    if seats.iter().any(|s| s.show_id != show_id) {
        return Err(ApiError::Validation(
            "All seats must belong to the requested show".to_string(),
        ));
    }

    let mut expired = Vec::new();
    let mut not_locked = Vec::new();
    for seat in seats {
        if seat.is_locked_by(user_id, now) {
            continue;
        }
        let own_expired_lock = seat.seat_status() == Some(crate::models::SeatStatus::Locked)
            && seat.locked_by == Some(user_id);
        if own_expired_lock {
            expired.push(seat.seat_number.clone());
        } else {
            not_locked.push(seat.seat_number.clone());
        }
    }

    if !not_locked.is_empty() {
        return Err(ApiError::NotLockedByCaller { seats: not_locked });
    }
    if !expired.is_empty() {
        return Err(ApiError::LockExpired { seats: expired });
    }
    Ok(())
}

fn ensure_all_found(seats: &[Seat], ids: &[i64]) -> Result<(), ApiError> {
    if seats.len() == ids.len() {
        return Ok(());
    }
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !seats.iter().any(|s| s.id == **id))
        .map(|id| id.to_string())
        .collect();
    Err(ApiError::NotFound(format!("Seat(s) {}", missing.join(", "))))
}

fn price_seat(
    seat: &Seat,
    show: &Show,
    movie: Option<&Movie>,
    pricing: &PricingService,
) -> Result<Decimal, ApiError> {
    let tier = seat.seat_tier().ok_or_else(|| {
        ApiError::Integrity(format!(
            "seat {} has unknown tier '{}'",
            seat.seat_number, seat.tier
        ))
    })?;
    Ok(pricing.seat_price(show, tier, movie))
}

fn quote_seats(
    seats: &[Seat],
    show: &Show,
    movie: Option<&Movie>,
    pricing: &PricingService,
    locked_until: DateTime<Utc>,
) -> Result<Vec<LockedSeat>, ApiError> {
    seats
        .iter()
        .map(|seat| {
            let price = price_seat(seat, show, movie, pricing)?;
            Ok(LockedSeat {
                id: seat.id,
                seat_number: seat.seat_number.clone(),
                row_label: seat.row_label.clone(),
                tier: seat.tier.clone(),
                status: crate::models::SeatStatus::Locked.as_str().to_string(),
                locked_until,
                price,
            })
        })
        .collect()
}

async fn fetch_seats_for_update(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ids: &[i64],
) -> Result<Vec<Seat>, sqlx::Error> {
    sqlx::query_as::<_, Seat>(
        "SELECT id, show_id, seat_number, row_label, tier, base_price, status,
                locked_by, locked_until
         FROM seats WHERE id = ANY($1)
         ORDER BY id
         FOR UPDATE",
    )
    .bind(ids)
    .fetch_all(&mut **tx)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeatStatus;
    use rust_decimal_macros::dec;

    fn seat(id: i64, number: &str, status: &str) -> Seat {
        Seat {
            id,
            show_id: Uuid::nil(),
            seat_number: number.to_string(),
            row_label: Some(number[..1].to_string()),
            tier: "CLASSIC".to_string(),
            base_price: dec!(150),
            status: status.to_string(),
            locked_by: None,
            locked_until: None,
        }
    }

    fn locked_seat(id: i64, number: &str, holder: i64, until: DateTime<Utc>) -> Seat {
        let mut s = seat(id, number, SeatStatus::Locked.as_str());
        s.locked_by = Some(holder);
        s.locked_until = Some(until);
        s
    }

    /* ---- canonical_ids ---- */

    #[test]
    fn empty_request_is_rejected() {
        assert!(matches!(
            canonical_ids(&[], 10),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn eleven_seats_are_rejected_before_inventory_access() {
        let ids: Vec<i64> = (1..=11).collect();
        let err = canonical_ids(&ids, 10).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(err.to_string().contains("more than 10"));
    }

    #[test]
    fn ids_are_sorted_and_deduplicated() {
        let ids = canonical_ids(&[5, 3, 5, 1], 10).unwrap();
        assert_eq!(ids, vec![1, 3, 5]);
    }

    /* ---- ensure_all_lockable ---- */

    #[test]
    fn lock_validation_passes_for_available_seats() {
        let now = Utc::now();
        let seats = vec![seat(1, "A1", "AVAILABLE"), seat(2, "A2", "AVAILABLE")];
        assert!(ensure_all_lockable(&seats, &[1, 2], now).is_ok());
    }

    #[test]
    fn foreign_unexpired_lock_fails_whole_batch_naming_only_that_seat() {
        // U2 пытается взять A1 (занято U1) вместе со свободным A2:
        // отклоняется весь набор, в ошибке только A1
        let now = Utc::now();
        let seats = vec![
            locked_seat(1, "A1", 1, now + Duration::minutes(5)),
            seat(2, "A2", "AVAILABLE"),
        ];
        match ensure_all_lockable(&seats, &[1, 2], now) {
            Err(ApiError::SeatsUnavailable { seats }) => {
                assert_eq!(seats, vec!["A1".to_string()]);
            }
            other => panic!("expected SeatsUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn expired_lock_is_claimable_without_reaper() {
        // TTL прошел: новая блокировка возможна, даже если reaper не отработал
        let now = Utc::now();
        let seats = vec![locked_seat(1, "A1", 1, now - Duration::minutes(1))];
        assert!(ensure_all_lockable(&seats, &[1], now).is_ok());
    }

    #[test]
    fn booked_seat_is_never_lockable() {
        let now = Utc::now();
        let seats = vec![seat(1, "A1", "BOOKED")];
        assert!(matches!(
            ensure_all_lockable(&seats, &[1], now),
            Err(ApiError::SeatsUnavailable { .. })
        ));
    }

    #[test]
    fn missing_seats_are_reported_by_id() {
        let now = Utc::now();
        let seats = vec![seat(1, "A1", "AVAILABLE")];
        let err = ensure_all_lockable(&seats, &[1, 42], now).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn cross_show_batch_is_rejected() {
        let now = Utc::now();
        let mut other = seat(2, "B1", "AVAILABLE");
        other.show_id = Uuid::new_v4();
        let seats = vec![seat(1, "A1", "AVAILABLE"), other];
        assert!(matches!(
            ensure_all_lockable(&seats, &[1, 2], now),
            Err(ApiError::Validation(_))
        ));
    }

    /* ---- ensure_finalizable ---- */

    #[test]
    fn finalize_accepts_own_unexpired_locks() {
        let now = Utc::now();
        let until = now + Duration::minutes(5);
        let seats = vec![locked_seat(1, "A1", 7, until), locked_seat(2, "A2", 7, until)];
        assert!(ensure_finalizable(&seats, &[1, 2], Uuid::nil(), 7, now).is_ok());
    }

    #[test]
    fn finalize_rejects_foreign_lock_without_mutation() {
        let now = Utc::now();
        let until = now + Duration::minutes(5);
        let seats = vec![locked_seat(1, "A1", 7, until), locked_seat(2, "A2", 8, until)];
        match ensure_finalizable(&seats, &[1, 2], Uuid::nil(), 7, now) {
            Err(ApiError::NotLockedByCaller { seats }) => {
                assert_eq!(seats, vec!["A2".to_string()]);
            }
            other => panic!("expected NotLockedByCaller, got {:?}", other),
        }
    }

    #[test]
    fn finalize_rejects_expired_own_lock() {
        let now = Utc::now();
        let seats = vec![locked_seat(1, "A1", 7, now - Duration::seconds(30))];
        match ensure_finalizable(&seats, &[1], Uuid::nil(), 7, now) {
            Err(ApiError::LockExpired { seats }) => {
                assert_eq!(seats, vec!["A1".to_string()]);
            }
            other => panic!("expected LockExpired, got {:?}", other),
        }
    }

    #[test]
    fn finalize_rejects_unlocked_and_booked_seats() {
        let now = Utc::now();
        for status in ["AVAILABLE", "BOOKED"] {
            let seats = vec![seat(1, "A1", status)];
            assert!(matches!(
                ensure_finalizable(&seats, &[1], Uuid::nil(), 7, now),
                Err(ApiError::NotLockedByCaller { .. })
            ));
        }
    }

    /* ---- quoting ---- */

    #[test]
    fn unknown_tier_is_an_integrity_error() {
        let mut s = seat(1, "A1", "AVAILABLE");
        s.tier = "GOLD".to_string();
        let show = test_show();
        let pricing = PricingService::new(crate::services::pricing::PricingTables::standard());
        assert!(matches!(
            price_seat(&s, &show, None, &pricing),
            Err(ApiError::Integrity(_))
        ));
    }

    #[test]
    fn quote_carries_price_and_lock_expiry() {
        let now = Utc::now();
        let until = now + Duration::minutes(10);
        let seats = vec![seat(1, "A1", "AVAILABLE"), seat(2, "A2", "AVAILABLE")];
        let show = test_show();
        let pricing = PricingService::new(crate::services::pricing::PricingTables::standard());

        let quoted = quote_seats(&seats, &show, None, &pricing, until).unwrap();
        assert_eq!(quoted.len(), 2);
        // CLASSIC 150 × 1.0 + IMAX_3D 200
        assert!(quoted.iter().all(|q| q.price == dec!(350)));
        assert!(quoted.iter().all(|q| q.locked_until == until));
        assert!(quoted.iter().all(|q| q.status == "LOCKED"));
    }

    fn test_show() -> Show {
        Show {
            id: Uuid::nil(),
            movie_id: Uuid::nil(),
            theater_id: Uuid::nil(),
            screen_id: None,
            show_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            show_time: "18:00".to_string(),
            format: "IMAX_3D".to_string(),
            language: None,
            base_prices: None,
            is_active: true,
            movie_title: "Test Movie".to_string(),
            movie_poster_url: None,
            theater_name: "Test Theater".to_string(),
            theater_city: None,
        }
    }
}
