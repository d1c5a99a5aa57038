use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

/// Сеанс: конкретный показ фильма в зале. Каталог управляется извне,
/// здесь только read model для ценообразования и выдачи.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Show {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub theater_id: Uuid,
    pub screen_id: Option<String>,
    pub show_date: NaiveDate,
    pub show_time: String,
    /// IMAX_2D | IMAX_3D | FOUR_DX | STANDARD_2D | STANDARD_3D | DOLBY_ATMOS
    pub format: String,
    pub language: Option<String>,
    /// Базовые цены по категориям, например {"CLASSIC": 150, "PRIME": 250}
    pub base_prices: Option<Json<HashMap<String, Decimal>>>,
    pub is_active: bool,
    // Денормализованные поля для быстрой выдачи
    pub movie_title: String,
    pub movie_poster_url: Option<String>,
    pub theater_name: String,
    pub theater_city: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub poster_url: Option<String>,
    /// Надбавки за формат, переопределяющие таблицу по умолчанию,
    /// например {"IMAX_3D": 250}
    pub format_premiums: Option<Json<HashMap<String, Decimal>>>,
    pub created_at: DateTime<Utc>,
}
