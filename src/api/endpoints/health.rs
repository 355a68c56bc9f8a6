//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db::sqlite::get_current_version;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub schema_version: i64,
    pub version: &'static str,
}

/// `GET /health`: liveness plus the applied schema version.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let schema_version = ctx.with_db(|conn| Ok(get_current_version(conn)))?;

    Ok(Json(HealthResponse {
        status: "ok",
        schema_version,
        version: crate::config::APP_VERSION,
    }))
}
