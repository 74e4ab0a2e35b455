//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 404 Not Found
            Self::NotFound
            | Self::LocationNotFound
            | Self::CategoryNotFound
            | Self::MenuItemNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::CategoryNameExists | Self::MenuItemNameExists => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenExpired | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }

            // 403 Forbidden
            Self::PermissionDenied | Self::LocationForbidden => StatusCode::FORBIDDEN,

            // 500 Internal Server Error
            Self::InternalError | Self::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,

            // 400 Bad Request (default for validation/scope errors)
            Self::ValidationFailed
            | Self::RequiredField
            | Self::InvalidScope => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_status() {
        assert_eq!(ErrorCode::ValidationFailed.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::RequiredField.http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::CategoryNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::LocationNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(
            ErrorCode::CategoryNameExists.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::MenuItemNameExists.http_status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_scope_and_permission_status() {
        assert_eq!(ErrorCode::InvalidScope.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::LocationForbidden.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ErrorCode::TokenExpired.http_status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
