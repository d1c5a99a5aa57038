use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub booking: BookingConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// Параметры резервирования мест
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// Максимум мест в одном запросе lock/complete.
    pub max_seats_per_booking: usize,
    /// Время жизни временной блокировки места.
    pub seat_lock_minutes: i64,
    /// Интервал фонового возврата просроченных блокировок.
    pub reaper_interval_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_booking=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").expect("REDIS_URL must be set"),
            },
            booking: BookingConfig {
                max_seats_per_booking: env::var("MAX_SEATS_PER_BOOKING")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("MAX_SEATS_PER_BOOKING must be a valid number"),
                seat_lock_minutes: env::var("SEAT_LOCK_MINUTES")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("SEAT_LOCK_MINUTES must be a valid number"),
                reaper_interval_seconds: env::var("LOCK_REAPER_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .expect("LOCK_REAPER_INTERVAL_SECONDS must be a valid number"),
            },
        }
    }
}
