//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::items::{Item, ItemDraft};
use crate::domain::users::{TokenKind, TokenRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Authoritative item collection. Names are unique; a clash surfaces as
/// [`RepoError::Duplicate`].
#[async_trait]
pub trait ItemsRepo: Send + Sync {
    /// All items ordered by id.
    async fn list_items(&self) -> Result<Vec<Item>, RepoError>;

    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, RepoError>;

    async fn find_item(&self, id: i64) -> Result<Option<Item>, RepoError>;

    /// Full replacement. Returns the canonical row, or `NotFound`.
    async fn update_item(&self, id: i64, draft: &ItemDraft) -> Result<Item, RepoError>;

    /// Returns `NotFound` when no row was removed.
    async fn delete_item(&self, id: i64) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateTokenParams {
    pub user_id: i64,
    pub kind: TokenKind,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
}

#[async_trait]
pub trait TokensRepo: Send + Sync {
    async fn create_token(&self, params: CreateTokenParams) -> Result<TokenRecord, RepoError>;

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<TokenRecord>, RepoError>;
}
