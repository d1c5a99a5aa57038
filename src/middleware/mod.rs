use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;

use crate::models::User;

/// Аутентифицированный покупатель. Ядро доверяет числовому id,
/// полученному из этого экстрактора.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub full_name: String,
}

// Basic Auth extractor
impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Получаем заголовок Authorization
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        // Проверяем что это Basic auth
        let encoded = auth_header
            .strip_prefix("Basic ")
            .ok_or(StatusCode::UNAUTHORIZED)?;

        // Декодируем base64
        let decoded = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| StatusCode::UNAUTHORIZED)?;

        let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

        // Разделяем email:password
        let mut credentials = credentials.splitn(2, ':');
        let email = credentials.next().ok_or(StatusCode::UNAUTHORIZED)?;
        let password = credentials.next().ok_or(StatusCode::UNAUTHORIZED)?;

        // Запись пользователя: кеш, затем БД
        let user = match cached_user(state, email).await {
            Some(user) => user,
            None => {
                let user = User::find_by_email(email, &state.db)
                    .await
                    .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                    .ok_or(StatusCode::UNAUTHORIZED)?;
                if let Ok(json) = serde_json::to_string(&user) {
                    let _ = state.cache.cache_auth_user(email, &json).await;
                }
                user
            }
        };

        // Пароль проверяем на каждый запрос, кеш этого не отменяет
        if !user.verify_password(password) {
            return Err(StatusCode::UNAUTHORIZED);
        }

        // Обновляем last_logged_in с троттлингом
        if state.cache.should_update_last_login(user.id).await {
            sqlx::query("UPDATE users SET last_logged_in = NOW() WHERE id = $1")
                .bind(user.id)
                .execute(&state.db.pool)
                .await
                .ok(); // Игнорируем ошибку обновления
        }

        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
            full_name: user.full_name,
        })
    }
}

async fn cached_user(state: &Arc<crate::AppState>, email: &str) -> Option<User> {
    let json = state.cache.get_cached_auth_user(email).await.ok()??;
    serde_json::from_str(&json).ok()
}
