//! Item handlers

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use stockroom_api_types::ItemWriteRequest;

use super::item_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn list_items(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let items = state.items.list().await.map_err(item_to_api)?;
    Ok(Json(items))
}

pub async fn create_item(
    State(state): State<ApiState>,
    payload: Result<Json<ItemWriteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let item = state.items.create(&request).await.map_err(item_to_api)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_item(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state.items.get(id).await.map_err(item_to_api)?;
    Ok(Json(item))
}

pub async fn update_item(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    payload: Result<Json<ItemWriteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let item = state
        .items
        .update(id, &request)
        .await
        .map_err(item_to_api)?;
    Ok(Json(item))
}

pub async fn patch_item(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    payload: Result<Json<ItemWriteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let item = state.items.patch(id, request).await.map_err(item_to_api)?;
    Ok(Json(item))
}

pub async fn delete_item(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.items.delete(id).await.map_err(item_to_api)?;
    Ok(StatusCode::NO_CONTENT)
}
