use crate::cache::CacheService;
use crate::models::{Movie, Show};
use redis::AsyncCommands;
use uuid::Uuid;

// Каталог меняется редко - час жизни записи достаточно
const CATALOG_TTL_SECONDS: u64 = 3600;

impl CacheService {
    /// Сеанс по id: сначала кеш, при промахе - БД с дозаписью в кеш.
    pub async fn get_show(&self, show_id: Uuid) -> Result<Option<Show>, sqlx::Error> {
        if let Ok(Some(show)) = self.get_show_from_cache(show_id).await {
            return Ok(Some(show));
        }

        let show = self.load_show_from_db(show_id).await?;
        if let Some(ref show) = show {
            let _ = self.save_show_to_cache(show).await;
        }
        Ok(show)
    }

    /// Фильм по id: кеш, затем БД.
    pub async fn get_movie(&self, movie_id: Uuid) -> Result<Option<Movie>, sqlx::Error> {
        if let Ok(Some(movie)) = self.get_movie_from_cache(movie_id).await {
            return Ok(Some(movie));
        }

        let movie = self.load_movie_from_db(movie_id).await?;
        if let Some(ref movie) = movie {
            let _ = self.save_movie_to_cache(movie).await;
        }
        Ok(movie)
    }

    pub(crate) async fn load_active_shows(&self) -> Result<Vec<Show>, sqlx::Error> {
        sqlx::query_as::<_, Show>(
            "SELECT id, movie_id, theater_id, screen_id, show_date, show_time, format, language,
                    base_prices, is_active, movie_title, movie_poster_url, theater_name, theater_city
             FROM shows
             WHERE is_active = true
             ORDER BY show_date, show_time",
        )
        .fetch_all(&self.db.pool)
        .await
    }

    async fn load_show_from_db(&self, show_id: Uuid) -> Result<Option<Show>, sqlx::Error> {
        sqlx::query_as::<_, Show>(
            "SELECT id, movie_id, theater_id, screen_id, show_date, show_time, format, language,
                    base_prices, is_active, movie_title, movie_poster_url, theater_name, theater_city
             FROM shows
             WHERE id = $1",
        )
        .bind(show_id)
        .fetch_optional(&self.db.pool)
        .await
    }

    async fn load_movie_from_db(&self, movie_id: Uuid) -> Result<Option<Movie>, sqlx::Error> {
        sqlx::query_as::<_, Movie>(
            "SELECT id, title, poster_url, format_premiums, created_at
             FROM movies
             WHERE id = $1",
        )
        .bind(movie_id)
        .fetch_optional(&self.db.pool)
        .await
    }

    /* === Работа с кешем === */

    async fn get_show_from_cache(&self, show_id: Uuid) -> Result<Option<Show>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(format!("show:{}", show_id)).await?;
        Ok(data.and_then(|json| serde_json::from_str(&json).ok()))
    }

    async fn save_show_to_cache(&self, show: &Show) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(show).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(format!("show:{}", show.id), data, CATALOG_TTL_SECONDS)
            .await
    }

    async fn get_movie_from_cache(
        &self,
        movie_id: Uuid,
    ) -> Result<Option<Movie>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(format!("movie:{}", movie_id)).await?;
        Ok(data.and_then(|json| serde_json::from_str(&json).ok()))
    }

    async fn save_movie_to_cache(&self, movie: &Movie) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(movie).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(format!("movie:{}", movie.id), data, CATALOG_TTL_SECONDS)
            .await
    }
}
