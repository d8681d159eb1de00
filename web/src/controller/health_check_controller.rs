use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use log::*;

/// GET liveness probe, including a database round trip
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "API router is up and the database answers", body = String),
        (status = 503, description = "Database is unreachable", body = String),
    )
)]
pub async fn health_check(State(app_state): State<AppState>) -> impl IntoResponse {
    match app_state.db_conn_ref().ping().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            warn!("Health check failed to reach the database: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable")
        }
    }
}
