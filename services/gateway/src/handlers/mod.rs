pub mod account;
pub mod products;
pub mod purchase;
pub mod users;

use crate::error::AppError;
use axum::extract::rejection::JsonRejection;
use types::errors::VendingError;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Run a store-mutating call off the async workers.
///
/// The blocking task is not tied to the request future: if the client goes
/// away mid-request the call still runs to commit or abort.
pub async fn blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, VendingError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("blocking task failed: {}", e)))?
        .map_err(AppError::from)
}
