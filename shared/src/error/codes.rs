//! Unified error codes for the Qravy catalog platform
//!
//! This module defines all error codes used across qravy-cloud, qravy-client and the dashboards.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Tenant errors
//! - 6xxx: Catalog errors (categories, menu items, visibility scopes)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Branch session targeted a location other than its own
    LocationForbidden = 2006,

    // ==================== 3xxx: Tenant ====================
    /// Location does not belong to the tenant
    LocationNotFound = 3101,

    // ==================== 6xxx: Catalog ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item name already exists in the same scope
    MenuItemNameExists = 6004,
    /// Category not found
    CategoryNotFound = 6101,
    /// Category name already exists in the same scope
    CategoryNameExists = 6103,
    /// Location/channel combination is impossible for the entity
    InvalidScope = 6901,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::RequiredField => "Required field is missing",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::LocationForbidden => "Branch session cannot target another location",

            // Tenant
            ErrorCode::LocationNotFound => "Location not found",

            // Catalog
            ErrorCode::MenuItemNotFound => "Menu item not found",
            ErrorCode::MenuItemNameExists => "Menu item name already exists",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::CategoryNameExists => "Category name already exists",
            ErrorCode::InvalidScope => "Scope is not valid for this entity",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            7 => Ok(ErrorCode::RequiredField),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2006 => Ok(ErrorCode::LocationForbidden),

            // Tenant
            3101 => Ok(ErrorCode::LocationNotFound),

            // Catalog
            6001 => Ok(ErrorCode::MenuItemNotFound),
            6004 => Ok(ErrorCode::MenuItemNameExists),
            6101 => Ok(ErrorCode::CategoryNotFound),
            6103 => Ok(ErrorCode::CategoryNameExists),
            6901 => Ok(ErrorCode::InvalidScope),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}
