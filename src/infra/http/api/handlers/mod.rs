//! API handlers organized by resource type.
//!
//! Error conversion helpers shared by the submodules live here.

mod auth;
mod items;

pub use auth::*;
pub use items::*;

use axum::http::StatusCode;

use crate::application::auth::{AuthError, AuthServiceError};
use crate::application::items::ItemError;
use crate::application::repos::RepoError;

use super::error::{ApiError, codes};

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        RepoError::Persistence(msg) => ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            codes::REPO,
            "Persistence error",
            Some(msg),
        ),
    }
}

pub(crate) fn item_to_api(err: ItemError) -> ApiError {
    match err {
        ItemError::Validation(errors) => ApiError::validation(errors),
        ItemError::NotFound => ApiError::not_found("item not found"),
        ItemError::Repo(repo) => repo_to_api(repo),
    }
}

pub(crate) fn auth_to_api(err: AuthServiceError) -> ApiError {
    match err {
        AuthServiceError::Validation(errors) => ApiError::validation(errors),
        AuthServiceError::Unauthorized(AuthError::Expired) => ApiError::token_expired(),
        AuthServiceError::Unauthorized(_) => ApiError::unauthorized(),
        AuthServiceError::Repo(repo) => repo_to_api(repo),
        AuthServiceError::Hash(detail) => ApiError::internal(detail),
    }
}
