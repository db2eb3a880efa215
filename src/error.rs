use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::SqlErr;
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("You are not allowed to access this resource")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("Database error")]
    DbError(#[source] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[source] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

const DUPLICATE: &str = "Resource already exists";

// Unique violations surface as 409 so racing inserts match the pre-checks.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let unique = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            return AppError::Conflict(DUPLICATE.into());
        }
        AppError::DbError(err)
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(DUPLICATE.into()),
            _ => AppError::OrmError(err),
        }
    }
}

impl AppError {
    pub fn not_found(resource: &str) -> Self {
        AppError::NotFound(format!("{resource} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            match &self {
                AppError::DbError(err) => tracing::error!(error = %err, "database error"),
                AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
                AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
                _ => {}
            }
        }

        let body = ApiResponse {
            message: status.canonical_reason().unwrap_or("Error").to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_errors_map_to_401_and_403() {
        let unauthorized = AppError::Unauthorized("Invalid or expired token".into()).into_response();
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

        let forbidden = AppError::Forbidden.into_response();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn client_errors_keep_their_message() {
        let err = AppError::BadRequest("quantity must be greater than 0".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "quantity must be greater than 0");

        assert_eq!(AppError::not_found("Brand").to_string(), "Brand not found");
        assert_eq!(
            AppError::Conflict("Email is already in use".into()).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn other_db_errors_stay_internal() {
        let orm = AppError::from(sea_orm::DbErr::Custom("boom".into()));
        assert!(matches!(orm, AppError::OrmError(_)));
        assert_eq!(orm.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let sqlx = AppError::from(sqlx::Error::RowNotFound);
        assert!(matches!(sqlx, AppError::DbError(_)));
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::Internal(anyhow::anyhow!("connection reset by peer"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal Server Error");
    }
}
