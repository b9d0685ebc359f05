use super::blocking;
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::{BalanceResponse, DepositRequest};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

/// Replace the caller's balance with the deposited amount.
pub async fn deposit(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<DepositRequest>, JsonRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let Json(request) = payload?;
    let accounts = state.accounts.clone();
    let balance = blocking(move || accounts.deposit(&user.account_id, request.deposit)).await?;
    Ok(Json(BalanceResponse { balance }))
}

pub async fn reset(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<BalanceResponse>, AppError> {
    let accounts = state.accounts.clone();
    let balance = blocking(move || accounts.reset(&user.account_id)).await?;
    Ok(Json(BalanceResponse { balance }))
}
