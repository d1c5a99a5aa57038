use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Статус оплаты. Бронирование существует только в терминальных статусах:
/// строка со статусом PENDING никогда не записывается, незавершенное
/// бронирование живет исключительно как LOCKED-места.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

/// Неизменяемая запись о покупке. total_amount равен сумме price_paid
/// всех мест на момент завершения.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub booking_ref: String,
    pub user_id: i64,
    pub show_id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    pub total_amount: Decimal,
    pub payment_status: String,
    pub card_type: Option<String>,
    pub card_last_four: Option<String>,
    pub booked_at: DateTime<Utc>,
}

/// Пара (место, уплаченная цена), принадлежащая ровно одному бронированию.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingSeat {
    pub id: i64,
    pub booking_id: i64,
    pub seat_id: i64,
    pub price_paid: Decimal,
}

/// Человекочитаемый номер брони: "BK" + millis + случайный суффикс.
pub fn generate_booking_ref() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("BK{}{}", Utc::now().timestamp_millis(), &suffix[..6])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_ref_has_expected_shape() {
        let reference = generate_booking_ref();
        assert!(reference.starts_with("BK"));
        // millis (13 знаков) + 6 символов суффикса
        assert_eq!(reference.len(), 2 + 13 + 6);
        assert!(reference[2..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn booking_refs_do_not_repeat() {
        let a = generate_booking_ref();
        let b = generate_booking_ref();
        assert_ne!(a, b);
    }

    #[test]
    fn payment_statuses_are_terminal_set() {
        assert_eq!(PaymentStatus::Completed.as_str(), "COMPLETED");
        assert_eq!(PaymentStatus::Failed.as_str(), "FAILED");
        assert_eq!(PaymentStatus::Refunded.as_str(), "REFUNDED");
    }
}
