//! Service-layer error type for qravy-cloud
//!
//! `ServiceError` bridges store errors (`sqlx::Error`, `BoxError`) and the
//! API-layer `AppError`, so the coordinator can use `?` on both.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

use crate::BoxError;

/// Service-layer error
///
/// - `Db`: store/infrastructure errors (logged, mapped to InternalError)
/// - `App`: business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_error_maps_to_database_code() {
        let err: ServiceError = BoxError::from("connection reset").into();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn test_app_error_passes_through() {
        let err: ServiceError = AppError::invalid_scope("bad scope").into();
        let app: AppError = err.into();
        assert_eq!(app.code, ErrorCode::InvalidScope);
        assert_eq!(app.message, "bad scope");
    }
}
