/// Health check endpoint
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "pool": { "active_connections": 1, "idle_connections": 4 }
/// }
/// ```
///
/// The endpoint always answers 200; a failed database probe is reported as
/// `"status": "degraded"`.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::Serialize;
use teampulse_shared::db::pool::{get_pool_stats, health_check as probe, PoolStats};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,

    pub version: &'static str,

    pub database: &'static str,

    pub pool: PoolStats,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let (status, database) = match probe(&state.db).await {
        Ok(()) => ("healthy", "connected"),
        Err(err) => {
            tracing::warn!(error = %err, "Health check could not reach the database");
            ("degraded", "disconnected")
        }
    };

    Ok(Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        database,
        pool: get_pool_stats(&state.db),
    }))
}
