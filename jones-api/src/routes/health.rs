use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::connection::SimpleConnection;

use jones_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

/// Liveness plus a `SELECT 1` against the pool.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let pool = state.db.clone();
    let database = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        conn.batch_execute("SELECT 1").map_err(|e| e.to_string())
    })
    .await
    .unwrap_or_else(|e| Err(e.to_string()));

    let check = match database {
        Ok(()) => HealthCheck { name: "database".into(), status: HealthStatus::Healthy, message: None },
        Err(e) => HealthCheck { name: "database".into(), status: HealthStatus::Unhealthy, message: Some(e) },
    };

    let response = HealthResponse::from_checks("jones-api", env!("CARGO_PKG_VERSION"), vec![check]);
    let status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Prometheus exposition.
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}
