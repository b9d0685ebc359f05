use super::blocking;
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::DeletedResponse;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use types::ids::ItemId;
use types::item::{Item, ItemDetails};
use vending_engine::NewItem;

fn item_id(raw: &str) -> Result<ItemId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("'{}' is not an item id", raw)))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Item>>, AppError> {
    Ok(Json(state.catalog.list()?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(state.catalog.get(&item_id(&id)?)?))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Result<(StatusCode, Json<Item>), AppError> {
    let Json(new_item) = payload?;
    let catalog = state.catalog.clone();
    let item = blocking(move || catalog.create(&user.account_id, new_item)).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    payload: Result<Json<ItemDetails>, JsonRejection>,
) -> Result<Json<Item>, AppError> {
    let item_id = item_id(&id)?;
    let Json(details) = payload?;
    let catalog = state.catalog.clone();
    let item = blocking(move || catalog.update(&user.account_id, &item_id, details)).await?;
    Ok(Json(item))
}

pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, AppError> {
    let item_id = item_id(&id)?;
    let catalog = state.catalog.clone();
    let removed = blocking(move || catalog.remove(&user.account_id, &item_id)).await?;
    Ok(Json(DeletedResponse {
        deleted: removed.item_id,
    }))
}
