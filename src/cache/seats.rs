use crate::cache::CacheService;
use redis::AsyncCommands;
use tracing::warn;
use uuid::Uuid;

// Карта мест живет недолго: статусы меняются при каждой блокировке
const SEAT_MAP_TTL_SECONDS: u64 = 10;

impl CacheService {
    /// Готовый JSON карты мест сеанса, если он есть в кеше.
    ///
    /// Кеш обслуживает только отображение: решения lock/complete всегда
    /// принимаются по строкам БД под FOR UPDATE, никогда по кешу.
    pub async fn get_cached_seat_map(&self, show_id: Uuid) -> Option<String> {
        let mut conn = self.redis.conn.clone();
        conn.get::<_, Option<String>>(seat_map_key(show_id))
            .await
            .ok()
            .flatten()
    }

    pub async fn cache_seat_map(&self, show_id: Uuid, json: &str) {
        let mut conn = self.redis.conn.clone();
        let result: Result<(), _> = conn
            .set_ex(seat_map_key(show_id), json, SEAT_MAP_TTL_SECONDS)
            .await;
        if let Err(e) = result {
            warn!("failed to cache seat map for show {}: {:?}", show_id, e);
        }
    }

    /// Сброс кеша мест сеанса после любой мутации инвентаря.
    pub async fn invalidate_seats(&self, show_id: Uuid) {
        let mut conn = self.redis.conn.clone();
        let result: Result<(), _> = conn.del(seat_map_key(show_id)).await;
        if let Err(e) = result {
            warn!("failed to invalidate seat map for show {}: {:?}", show_id, e);
        }
    }
}

fn seat_map_key(show_id: Uuid) -> String {
    format!("seats:{}", show_id)
}
