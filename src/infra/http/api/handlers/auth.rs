//! Registration and token handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use stockroom_api_types::{LoginRequest, RefreshRequest, RegisterRequest};

use super::auth_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::state::ApiState;

pub async fn register(
    State(state): State<ApiState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let user = state.auth.register(&request).await.map_err(auth_to_api)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<ApiState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let tokens = state.auth.login(&request).await.map_err(auth_to_api)?;
    Ok(Json(tokens))
}

pub async fn refresh_token(
    State(state): State<ApiState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let access = state.auth.refresh(&request).await.map_err(auth_to_api)?;
    Ok(Json(access))
}
