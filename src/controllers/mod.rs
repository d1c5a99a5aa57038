pub mod bookings;
pub mod pricing;
pub mod shows;
pub mod test;

use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<crate::AppState>> {
    Router::new()
        .merge(shows::routes())
        .merge(bookings::routes())
        .merge(pricing::routes())
        .merge(test::routes())
}
