use crate::cache::CacheService;
use redis::AsyncCommands;

// Короткий TTL: запись нужна лишь чтобы не ходить в БД на каждый запрос
const AUTH_TTL_SECONDS: u64 = 300;

impl CacheService {
    /// Сохранить строку пользователя (JSON) в кеш авторизации.
    /// Проверка пароля все равно выполняется на каждый запрос -
    /// кеш снимает только поход в БД за записью.
    pub async fn cache_auth_user(&self, email: &str, user_json: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.set_ex(format!("auth:{}", email), user_json, AUTH_TTL_SECONDS)
            .await
    }

    /// Получить строку пользователя из кеша авторизации.
    pub async fn get_cached_auth_user(&self, email: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        conn.get(format!("auth:{}", email)).await
    }

    /// Обновлять last_logged_in не чаще раза в 15 минут на пользователя.
    pub async fn should_update_last_login(&self, user_id: i64) -> bool {
        let key = format!("last_login_update:{}", user_id);
        let mut conn = self.redis.conn.clone();
        let result: Result<String, _> = redis::cmd("SET")
            .arg(&key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(900)
            .query_async(&mut conn)
            .await;
        result.is_ok()
    }
}
