use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::AppState;

/// Фоновый возврат просроченных блокировок в пул доступных мест.
///
/// Это оптимизация, а не источник корректности: lock и complete
/// перепроверяют срок блокировки в момент использования, поэтому sweep
/// безопасно выполнять с любой периодичностью и параллельно с ними.
pub struct LockReaper {
    state: Arc<AppState>,
}

impl LockReaper {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn run_forever(&self) {
        let interval = Duration::from_secs(self.state.config.booking.reaper_interval_seconds);
        info!("Lock reaper started, sweep interval {:?}", interval);
        loop {
            match self.reclaim_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(count) => info!("Reclaimed {} expired seat lock(s)", count),
                Err(e) => error!("Lock reaper sweep failed: {:?}", e),
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Одним UPDATE переводит все просроченные LOCKED-места обратно в
    /// AVAILABLE, очищая держателя и срок. Идемпотентно.
    pub async fn reclaim_expired(&self, now: DateTime<Utc>) -> Result<usize, sqlx::Error> {
        let freed: Vec<(i64, Uuid)> = sqlx::query_as(
            "UPDATE seats
             SET status = 'AVAILABLE', locked_by = NULL, locked_until = NULL
             WHERE status = 'LOCKED' AND locked_until < $1
             RETURNING id, show_id",
        )
        .bind(now)
        .fetch_all(&self.state.db.pool)
        .await?;

        if freed.is_empty() {
            return Ok(0);
        }

        // Сбрасываем кеш карт мест затронутых сеансов
        let shows: BTreeSet<Uuid> = freed.iter().map(|(_, show_id)| *show_id).collect();
        for show_id in shows {
            self.state.cache.invalidate_seats(show_id).await;
        }

        Ok(freed.len())
    }
}
