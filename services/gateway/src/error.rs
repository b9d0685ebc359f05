use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use types::errors::VendingError;

/// Central error type for the Gateway application
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Vending(#[from] VendingError),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Vending(err) => match err {
                VendingError::NotFound { .. } => StatusCode::NOT_FOUND,
                VendingError::InsufficientStock { .. }
                | VendingError::ConcurrentStockConflict { .. }
                | VendingError::TransactionAborted { .. } => StatusCode::CONFLICT,
                VendingError::InsufficientFunds { .. }
                | VendingError::InvalidInput(_)
                | VendingError::AccountExists { .. } => StatusCode::BAD_REQUEST,
                VendingError::Unauthorized { .. } | VendingError::ActiveSessionConflict { .. } => {
                    StatusCode::FORBIDDEN
                }
                VendingError::InvalidCredential
                | VendingError::InvalidToken
                | VendingError::ExpiredToken => StatusCode::UNAUTHORIZED,
                VendingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = match &self {
            AppError::Vending(VendingError::ActiveSessionConflict { termination_token }) => json!({
                "error": "ACTIVE_SESSION_CONFLICT",
                "message": self.to_string(),
                "retryable": false,
                "active_session": true,
                "token": termination_token,
            }),
            AppError::Vending(VendingError::Internal(_)) | AppError::InternalError(_) => json!({
                "error": "INTERNAL_ERROR",
                "message": "Internal server error",
                "retryable": false,
            }),
            AppError::Vending(err) => json!({
                "error": err.code(),
                "message": err.to_string(),
                "retryable": err.is_retryable(),
            }),
            AppError::RateLimitExceeded(msg) => json!({
                "error": "RATE_LIMIT_EXCEEDED",
                "message": msg,
                "retryable": true,
            }),
            AppError::BadRequest(msg) => json!({
                "error": "BAD_REQUEST",
                "message": msg,
                "retryable": false,
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use types::ids::ItemId;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_conflict_is_retryable_409() {
        let (status, body) = body_of(
            VendingError::ConcurrentStockConflict {
                item_id: ItemId::new(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CONCURRENT_STOCK_CONFLICT");
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn test_active_session_body_carries_termination_token() {
        let (status, body) = body_of(
            VendingError::ActiveSessionConflict {
                termination_token: "tt".into(),
            }
            .into(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["active_session"], true);
        assert_eq!(body["token"], "tt");
    }

    #[tokio::test]
    async fn test_internal_detail_is_hidden() {
        let (status, body) = body_of(VendingError::Internal("journal at /var/x".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (VendingError::InvalidCredential, StatusCode::UNAUTHORIZED),
            (VendingError::ExpiredToken, StatusCode::UNAUTHORIZED),
            (VendingError::unauthorized("x"), StatusCode::FORBIDDEN),
            (VendingError::not_found("Item", "1"), StatusCode::NOT_FOUND),
            (VendingError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }
}
