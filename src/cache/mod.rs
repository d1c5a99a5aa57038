use crate::{database::Database, redis_client::RedisClient};
use futures::future::join_all;
use tracing::info;

pub mod auth;
pub mod seats;
pub mod shows;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    db: Database,
}

impl CacheService {
    pub fn new(redis: RedisClient, db: Database) -> Self {
        Self { redis, db }
    }

    // Прогрев кеша при старте: каталог активных сеансов и их фильмы
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        let shows = self.load_active_shows().await.unwrap_or_default();
        let movie_ids: Vec<_> = shows.iter().map(|s| s.movie_id).collect();

        join_all(shows.iter().map(|show| self.get_show(show.id))).await;
        join_all(movie_ids.iter().map(|id| self.get_movie(*id))).await;

        info!("Cache warmup done ({} active shows)", shows.len());
    }
}
