//! API routes for qravy-cloud

pub mod audit;
pub mod catalog;
pub mod health;
pub mod locations;

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::{Json, Router, middleware};
use shared::error::AppError;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::tenant_auth::tenant_auth_middleware;
use crate::state::AppState;

pub type ApiResult<T> = Result<Json<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Tenant catalog API (JWT authenticated)
    let tenant = Router::new()
        .route("/api/tenant/locations", get(locations::list_locations))
        .route("/api/tenant/audit-log", get(audit::audit_log))
        .route(
            "/api/tenant/{kind}",
            get(catalog::list).post(catalog::create),
        )
        .route(
            "/api/tenant/{kind}/visibility",
            post(catalog::bulk_visibility),
        )
        .route(
            "/api/tenant/{kind}/{id}",
            put(catalog::update).delete(catalog::delete),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            tenant_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(tenant)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    http::StatusCode::REQUEST_TIMEOUT,
                    Duration::from_secs(30),
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
