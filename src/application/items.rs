//! Item use cases.
//!
//! List and create talk to the store directly. Reads, updates and deletes of
//! a single item go through the [`ItemCacheCoordinator`].

use std::sync::Arc;

use stockroom_api_types::{ItemView, ItemWriteRequest};
use thiserror::Error;
use tracing::{info, warn};

use crate::application::repos::{ItemsRepo, RepoError};
use crate::cache::ItemCacheCoordinator;
use crate::domain::error::ValidationErrors;
use crate::domain::items::{ItemDraft, merge_write_requests};

const TARGET: &str = "stockroom::items";
pub const DUPLICATE_NAME_MESSAGE: &str = "item with this name already exists.";

#[derive(Debug, Error)]
pub enum ItemError {
    #[error("invalid item: {0}")]
    Validation(ValidationErrors),
    #[error("item not found")]
    NotFound,
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for ItemError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotFound => ItemError::NotFound,
            // The only unique constraint on items is the name.
            RepoError::Duplicate { .. } => ItemError::Validation(ValidationErrors::single(
                "name",
                DUPLICATE_NAME_MESSAGE,
            )),
            other => ItemError::Repo(other),
        }
    }
}

#[derive(Clone)]
pub struct ItemService {
    items: Arc<dyn ItemsRepo>,
    coordinator: ItemCacheCoordinator,
}

impl ItemService {
    pub fn new(items: Arc<dyn ItemsRepo>, coordinator: ItemCacheCoordinator) -> Self {
        Self { items, coordinator }
    }

    pub async fn list(&self) -> Result<Vec<ItemView>, ItemError> {
        let items = self.items.list_items().await?;
        Ok(items.iter().map(|item| item.to_view()).collect())
    }

    /// Store only: the cache entry is created lazily by the first read.
    pub async fn create(&self, request: &ItemWriteRequest) -> Result<ItemView, ItemError> {
        let draft = ItemDraft::validate(request).map_err(ItemError::Validation)?;

        match self.items.create_item(&draft).await {
            Ok(item) => {
                info!(target: TARGET, item_id = item.id, name = %item.name, "Item created");
                Ok(item.to_view())
            }
            Err(RepoError::Duplicate { constraint }) => {
                warn!(
                    target: TARGET,
                    name = %draft.name,
                    constraint = %constraint,
                    "Attempt to create item with duplicate name"
                );
                Err(RepoError::Duplicate { constraint }.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn get(&self, id: i64) -> Result<ItemView, ItemError> {
        self.coordinator.get(id).await.map_err(ItemError::from)
    }

    /// Full replacement; every required field must be present.
    pub async fn update(&self, id: i64, request: &ItemWriteRequest) -> Result<ItemView, ItemError> {
        let draft = ItemDraft::validate(request).map_err(ItemError::Validation)?;
        self.apply_update(id, &draft).await
    }

    /// Partial update: absent fields keep their stored values. The merged
    /// result is validated and written exactly like a full replacement.
    pub async fn patch(&self, id: i64, request: ItemWriteRequest) -> Result<ItemView, ItemError> {
        let current = self.items.find_item(id).await?.ok_or(ItemError::NotFound)?;
        let merged = merge_write_requests(current.to_write_request(), request);
        let draft = ItemDraft::validate(&merged).map_err(ItemError::Validation)?;
        self.apply_update(id, &draft).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ItemError> {
        self.coordinator.delete(id).await.map_err(ItemError::from)
    }

    async fn apply_update(&self, id: i64, draft: &ItemDraft) -> Result<ItemView, ItemError> {
        match self.coordinator.update(id, draft).await {
            Err(RepoError::Duplicate { constraint }) => {
                warn!(
                    target: TARGET,
                    item_id = id,
                    name = %draft.name,
                    constraint = %constraint,
                    "Attempt to rename item to a duplicate name"
                );
                Err(RepoError::Duplicate { constraint }.into())
            }
            other => other.map_err(ItemError::from),
        }
    }
}
