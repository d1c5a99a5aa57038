//! pricing.rs
//!
//! Расчет цены места. Чистая функция без состояния:
//!
//! ```text
//! цена = базовая цена × множитель категории + надбавка за формат
//! ```
//!
//! Все константные таблицы (множители, базовые цены и надбавки по
//! умолчанию) - неизменяемые данные, создаваемые на старте и
//! инжектируемые в сервис, а не литералы в местах вызова. Вся
//! арифметика в `Decimal`: повторное суммирование воспроизводимо
//! до копейки.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{Movie, SeatTier, Show};

/// Неизменяемые таблицы констант ценообразования.
#[derive(Debug, Clone)]
pub struct PricingTables {
    pub tier_multipliers: HashMap<SeatTier, Decimal>,
    pub default_base_prices: HashMap<SeatTier, Decimal>,
    pub default_format_premiums: HashMap<String, Decimal>,
}

impl PricingTables {
    pub fn standard() -> Self {
        let tier_multipliers = HashMap::from([
            (SeatTier::Classic, dec!(1.0)),
            (SeatTier::Prime, dec!(1.2)),
            (SeatTier::Premium, dec!(1.5)),
            (SeatTier::Vip, dec!(2.0)),
        ]);

        let default_base_prices = HashMap::from([
            (SeatTier::Classic, dec!(150)),
            (SeatTier::Prime, dec!(250)),
            (SeatTier::Premium, dec!(350)),
            (SeatTier::Vip, dec!(500)),
        ]);

        let default_format_premiums = HashMap::from([
            ("IMAX_2D".to_string(), dec!(150)),
            ("IMAX_3D".to_string(), dec!(200)),
            ("FOUR_DX".to_string(), dec!(250)),
            ("STANDARD_2D".to_string(), Decimal::ZERO),
            ("STANDARD_3D".to_string(), dec!(50)),
            ("DOLBY_ATMOS".to_string(), dec!(100)),
        ]);

        Self {
            tier_multipliers,
            default_base_prices,
            default_format_premiums,
        }
    }
}

#[derive(Clone)]
pub struct PricingService {
    tables: Arc<PricingTables>,
}

impl PricingService {
    pub fn new(tables: PricingTables) -> Self {
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Итоговая цена одного места.
    pub fn seat_price(&self, show: &Show, tier: SeatTier, movie: Option<&Movie>) -> Decimal {
        let base = self.base_price(show, tier);
        let multiplier = self.tier_multiplier(tier);
        let premium = self.format_premium(&show.format, movie);
        base * multiplier + premium
    }

    /// Суммарная цена набора мест по количеству в каждой категории.
    pub fn total_price(
        &self,
        show: &Show,
        counts_by_tier: &HashMap<SeatTier, u32>,
        movie: Option<&Movie>,
    ) -> Decimal {
        counts_by_tier
            .iter()
            .map(|(tier, count)| self.seat_price(show, *tier, movie) * Decimal::from(*count))
            .sum()
    }

    pub fn tier_multiplier(&self, tier: SeatTier) -> Decimal {
        self.tables
            .tier_multipliers
            .get(&tier)
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    // Базовая цена: таблица сеанса, иначе значение по умолчанию для категории
    fn base_price(&self, show: &Show, tier: SeatTier) -> Decimal {
        if let Some(prices) = &show.base_prices {
            if let Some(price) = prices.get(tier.as_str()) {
                return *price;
            }
        }
        self.tables
            .default_base_prices
            .get(&tier)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Надбавка за формат: переопределение фильма, иначе таблица по
    /// умолчанию; неизвестный формат не доплачивается.
    pub fn format_premium(&self, format: &str, movie: Option<&Movie>) -> Decimal {
        if let Some(movie) = movie {
            if let Some(premiums) = &movie.format_premiums {
                if let Some(premium) = premiums.get(format) {
                    return *premium;
                }
            }
        }
        self.tables
            .default_format_premiums
            .get(format)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    pub fn default_format_premium(&self, format: &str) -> Decimal {
        self.tables
            .default_format_premiums
            .get(format)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Справка о категориях мест (для выдачи клиенту, в расчетах не участвует).
    pub fn explain_tier_differences() -> &'static str {
        "Seat Tier Differences:\n\
         \n\
         CLASSIC (1.0x) - Basic comfortable seating, great value for money\n\
         PRIME (1.2x) - Better viewing angle, middle section of the theater\n\
         PREMIUM (1.5x) - Wider seats, optimal sound and visual experience\n\
         VIP (2.0x) - Luxury recliners, best seats in the house, premium amenities\n\
         \n\
         Format Premiums:\n\
         - IMAX 2D: +150\n\
         - IMAX 3D: +200\n\
         - 4DX: +250\n\
         - Standard 3D: +50\n\
         - Dolby Atmos: +100"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn show(format: &str, base_prices: Option<HashMap<String, Decimal>>) -> Show {
        Show {
            id: Uuid::nil(),
            movie_id: Uuid::nil(),
            theater_id: Uuid::nil(),
            screen_id: None,
            show_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            show_time: "18:00".to_string(),
            format: format.to_string(),
            language: None,
            base_prices: base_prices.map(Json),
            is_active: true,
            movie_title: "Test Movie".to_string(),
            movie_poster_url: None,
            theater_name: "Test Theater".to_string(),
            theater_city: None,
        }
    }

    fn movie(format_premiums: Option<HashMap<String, Decimal>>) -> Movie {
        Movie {
            id: Uuid::nil(),
            title: "Test Movie".to_string(),
            poster_url: None,
            format_premiums: format_premiums.map(Json),
            created_at: chrono::Utc::now(),
        }
    }

    fn service() -> PricingService {
        PricingService::new(PricingTables::standard())
    }

    #[test]
    fn classic_imax3d_seat_costs_350() {
        // CLASSIC база 150, множитель 1.0, IMAX_3D надбавка 200
        let show = show(
            "IMAX_3D",
            Some(HashMap::from([("CLASSIC".to_string(), dec!(150))])),
        );
        let price = service().seat_price(&show, SeatTier::Classic, Some(&movie(None)));
        assert_eq!(price, dec!(350));
    }

    #[test]
    fn two_classic_imax3d_seats_total_700() {
        let show = show(
            "IMAX_3D",
            Some(HashMap::from([("CLASSIC".to_string(), dec!(150))])),
        );
        let counts = HashMap::from([(SeatTier::Classic, 2u32)]);
        let total = service().total_price(&show, &counts, Some(&movie(None)));
        assert_eq!(total, dec!(700));
    }

    #[test]
    fn missing_show_prices_fall_back_to_default_table() {
        let svc = service();
        let show = show("STANDARD_2D", None);
        assert_eq!(svc.seat_price(&show, SeatTier::Classic, None), dec!(150));
        assert_eq!(svc.seat_price(&show, SeatTier::Prime, None), dec!(300));
        assert_eq!(svc.seat_price(&show, SeatTier::Premium, None), dec!(525));
        assert_eq!(svc.seat_price(&show, SeatTier::Vip, None), dec!(1000));
    }

    #[test]
    fn movie_override_beats_default_premium() {
        let show = show("IMAX_3D", None);
        let movie = movie(Some(HashMap::from([("IMAX_3D".to_string(), dec!(275))])));
        // VIP: 500 × 2.0 + 275
        let price = service().seat_price(&show, SeatTier::Vip, Some(&movie));
        assert_eq!(price, dec!(1275));
    }

    #[test]
    fn unknown_format_has_zero_premium() {
        let show = show("DRIVE_IN", None);
        assert_eq!(service().format_premium("DRIVE_IN", None), Decimal::ZERO);
        assert_eq!(
            service().seat_price(&show, SeatTier::Classic, None),
            dec!(150)
        );
    }

    #[test]
    fn exact_decimal_arithmetic_has_no_drift() {
        // 1.2 × 250 повторенное много раз не накапливает ошибку
        let svc = service();
        let show = show("STANDARD_2D", None);
        let one = svc.seat_price(&show, SeatTier::Prime, None);
        let mut sum = Decimal::ZERO;
        for _ in 0..1000 {
            sum += one;
        }
        assert_eq!(sum, one * dec!(1000));
    }

    proptest! {
        #[test]
        fn price_is_deterministic(tier_idx in 0usize..4, base in 1u32..5000) {
            let tier = SeatTier::ALL[tier_idx];
            let svc = service();
            let show = show(
                "IMAX_2D",
                Some(HashMap::from([(tier.as_str().to_string(), Decimal::from(base))])),
            );
            let first = svc.seat_price(&show, tier, None);
            let second = svc.seat_price(&show, tier, None);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn total_equals_sum_of_per_seat_prices(
            classic in 0u32..10,
            prime in 0u32..10,
            premium in 0u32..10,
            vip in 0u32..10,
        ) {
            let svc = service();
            let show = show("DOLBY_ATMOS", None);
            let counts = HashMap::from([
                (SeatTier::Classic, classic),
                (SeatTier::Prime, prime),
                (SeatTier::Premium, premium),
                (SeatTier::Vip, vip),
            ]);

            let mut expected = Decimal::ZERO;
            for (tier, count) in &counts {
                for _ in 0..*count {
                    expected += svc.seat_price(&show, *tier, None);
                }
            }
            prop_assert_eq!(svc.total_price(&show, &counts, None), expected);
        }
    }
}
