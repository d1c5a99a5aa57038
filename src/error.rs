use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Единая таксономия ошибок API.
///
/// Validation отклоняется до обращения к инвентарю, конфликтные варианты -
/// после проверки строк, но строго без мутаций.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Seat(s) not available: {}", .seats.join(", "))]
    SeatsUnavailable { seats: Vec<String> },

    #[error("Seat lock expired for: {}", .seats.join(", "))]
    LockExpired { seats: Vec<String> },

    #[error("Seat(s) not locked by you: {}", .seats.join(", "))]
    NotLockedByCaller { seats: Vec<String> },

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal inconsistency: {0}")]
    Integrity(String),

    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    seats: Option<Vec<String>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::SeatsUnavailable { .. }
            | ApiError::LockExpired { .. }
            | ApiError::NotLockedByCaller { .. } => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Integrity(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Идентификаторы мест, из-за которых запрос отклонен
    fn offending_seats(&self) -> Option<Vec<String>> {
        match self {
            ApiError::SeatsUnavailable { seats }
            | ApiError::LockExpired { seats }
            | ApiError::NotLockedByCaller { seats } => Some(seats.clone()),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self);
        }
        let body = ErrorBody {
            success: false,
            message: self.to_string(),
            seats: self.offending_seats(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_errors_map_to_409_and_name_seats() {
        let err = ApiError::SeatsUnavailable {
            seats: vec!["A1".to_string(), "A2".to_string()],
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Seat(s) not available: A1, A2");

        let err = ApiError::LockExpired {
            seats: vec!["B5".to_string()],
        };
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.offending_seats(), Some(vec!["B5".to_string()]));
    }

    #[test]
    fn validation_is_rejected_with_400() {
        let err = ApiError::Validation("too many seats".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.offending_seats().is_none());
    }

    #[test]
    fn database_errors_do_not_leak_details() {
        let err = ApiError::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Database error");
    }
}
