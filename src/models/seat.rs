use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Статус места. В БД хранится как TEXT, в коде - через enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Locked,
    Booked,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Locked => "LOCKED",
            SeatStatus::Booked => "BOOKED",
        }
    }

    pub fn parse(s: &str) -> Option<SeatStatus> {
        match s {
            "AVAILABLE" => Some(SeatStatus::Available),
            "LOCKED" => Some(SeatStatus::Locked),
            "BOOKED" => Some(SeatStatus::Booked),
            _ => None,
        }
    }
}

/// Категория места с фиксированным ценовым множителем.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatTier {
    Classic,
    Prime,
    Premium,
    Vip,
}

impl SeatTier {
    pub const ALL: [SeatTier; 4] = [
        SeatTier::Classic,
        SeatTier::Prime,
        SeatTier::Premium,
        SeatTier::Vip,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeatTier::Classic => "CLASSIC",
            SeatTier::Prime => "PRIME",
            SeatTier::Premium => "PREMIUM",
            SeatTier::Vip => "VIP",
        }
    }

    pub fn parse(s: &str) -> Option<SeatTier> {
        match s {
            "CLASSIC" => Some(SeatTier::Classic),
            "PRIME" => Some(SeatTier::Prime),
            "PREMIUM" => Some(SeatTier::Premium),
            "VIP" => Some(SeatTier::Vip),
            _ => None,
        }
    }
}

/// Одно физическое место конкретного сеанса.
///
/// Блокировка не является отдельной сущностью: это проекция
/// status = LOCKED с непустыми locked_by / locked_until.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Seat {
    pub id: i64,
    pub show_id: Uuid,
    pub seat_number: String,
    pub row_label: Option<String>,
    pub tier: String,
    pub base_price: Decimal,
    pub status: String,
    pub locked_by: Option<i64>,
    pub locked_until: Option<DateTime<Utc>>,
}

impl Seat {
    pub fn seat_status(&self) -> Option<SeatStatus> {
        SeatStatus::parse(&self.status)
    }

    pub fn seat_tier(&self) -> Option<SeatTier> {
        SeatTier::parse(&self.tier)
    }

    /// Эффективная доступность, вычисляемая в момент чтения:
    /// AVAILABLE, либо LOCKED с истекшим сроком. Корректность не зависит
    /// от того, успел ли фоновый reaper вернуть место в пул.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        match self.seat_status() {
            Some(SeatStatus::Available) => true,
            Some(SeatStatus::Locked) => match self.locked_until {
                Some(until) => until < now,
                // LOCKED без срока невозможен по CHECK-ограничению; не продаем
                None => false,
            },
            _ => false,
        }
    }

    /// Действующая (неистекшая) блокировка, принадлежащая данному покупателю.
    pub fn is_locked_by(&self, user_id: i64, now: DateTime<Utc>) -> bool {
        self.seat_status() == Some(SeatStatus::Locked)
            && self.locked_by == Some(user_id)
            && self.locked_until.map(|until| until >= now).unwrap_or(false)
    }

    /// Статус для отображения: истекшая блокировка показывается как AVAILABLE.
    pub fn effective_status(&self, now: DateTime<Utc>) -> &str {
        if self.is_available(now) {
            SeatStatus::Available.as_str()
        } else {
            &self.status
        }
    }
}
