use super::blocking;
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::{BuyRequest, BuyResponse};
use crate::rate_limit::Limit;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

pub async fn buy(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<BuyRequest>, JsonRejection>,
) -> Result<Json<BuyResponse>, AppError> {
    let Json(request) = payload?;
    state
        .rate_limiter
        .check(&user.account_id.to_string(), "purchase", Limit::PURCHASE)?;

    let purchases = state.purchases.clone();
    let receipt = blocking(move || {
        purchases.purchase(user.account_id, request.item_id, request.quantity)
    })
    .await?;
    Ok(Json(receipt.into()))
}
