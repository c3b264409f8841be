pub mod auth;
pub mod health;
pub mod reactions;
pub mod subscriptions;
pub mod users;
pub mod webhook;

use jones_shared::errors::{AppError, AppResult};

/// Run a synchronous service call (diesel, argon2) on the blocking pool.
pub async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        tracing::error!(error = %e, "blocking task failed");
        AppError::internal("internal server error")
    })?
}
