//! Tenant JWT authentication for the catalog API

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;

/// Operator role inside a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Owner,
    Manager,
    Staff,
    /// Read-only dashboard access
    Viewer,
}

impl Role {
    pub fn can_write(&self) -> bool {
        !matches!(self, Role::Viewer)
    }
}

/// JWT claims for tenant authentication
#[derive(Debug, Serialize, Deserialize)]
pub struct TenantClaims {
    /// Tenant ID
    pub sub: String,
    /// Operator email
    pub email: String,
    #[serde(default)]
    pub role: Role,
    /// Set for branch sessions (bound to one location)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<i64>,
    /// Expiration (Unix timestamp seconds)
    pub exp: usize,
    /// Issued at (Unix timestamp seconds)
    pub iat: usize,
}

/// Authenticated caller extracted from JWT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub tenant_id: String,
    pub email: String,
    pub role: Role,
    pub location_id: Option<i64>,
}

impl CallerIdentity {
    /// Central (tenant-wide) session
    pub fn central(tenant_id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            email: email.into(),
            role,
            location_id: None,
        }
    }

    /// Session bound to one location
    pub fn branch(
        tenant_id: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        location_id: i64,
    ) -> Self {
        Self {
            location_id: Some(location_id),
            ..Self::central(tenant_id, email, role)
        }
    }

    pub fn require_write(&self) -> Result<(), AppError> {
        if self.role.can_write() {
            Ok(())
        } else {
            Err(AppError::forbidden("Role cannot modify the catalog"))
        }
    }

    /// Effective location for a request
    ///
    /// Branch sessions default to their own location and may not name another.
    pub fn scoped_location(&self, requested: Option<i64>) -> Result<Option<i64>, AppError> {
        match (self.location_id, requested) {
            (Some(own), None) => Ok(Some(own)),
            (Some(own), Some(req)) if req == own => Ok(Some(own)),
            (Some(_), Some(req)) => Err(AppError::location_forbidden(req)),
            (None, req) => Ok(req),
        }
    }

    /// Operator label recorded in audit entries
    pub fn operator(&self) -> String {
        match self.location_id {
            Some(loc) => format!("{}@{}", self.email, loc),
            None => self.email.clone(),
        }
    }
}

const JWT_EXPIRY_HOURS: i64 = 24;

/// Create a JWT token for a caller
pub fn create_token(
    identity: &CallerIdentity,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = TenantClaims {
        sub: identity.tenant_id.clone(),
        email: identity.email.clone(),
        role: identity.role,
        location_id: identity.location_id,
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify a token and return the caller it names
pub fn verify_token(token: &str, secret: &str) -> Result<CallerIdentity, AppError> {
    let token_data = jsonwebtoken::decode::<TenantClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::new(ErrorCode::TokenExpired),
            _ => AppError::invalid_token("Invalid token"),
        }
    })?;

    let claims = token_data.claims;
    Ok(CallerIdentity {
        tenant_id: claims.sub,
        email: claims.email,
        role: claims.role,
        location_id: claims.location_id,
    })
}

/// Middleware that extracts and verifies tenant JWT from Authorization header
pub async fn tenant_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::not_authenticated().into_response())?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::invalid_token("Invalid Authorization format").into_response())?;

    let identity =
        verify_token(token, &state.jwt_secret).map_err(|e| e.into_response())?;

    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
