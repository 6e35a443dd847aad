use crate::application::repos::{ItemsRepo, RepoError};
use crate::domain::items::{Item, ItemDraft};

use super::{PostgresRepositories, map_sqlx_error};

const ITEM_COLUMNS: &str = "id, name, description, quantity, price_cents";

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: i64,
    name: String,
    description: String,
    quantity: i32,
    price_cents: i64,
}

impl TryFrom<ItemRow> for Item {
    type Error = RepoError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Item::from_stored(
            row.id,
            row.name,
            row.description,
            row.quantity,
            row.price_cents,
        )
        .map_err(RepoError::from_persistence)
    }
}

fn quantity_param(draft: &ItemDraft) -> Result<i32, RepoError> {
    i32::try_from(draft.quantity).map_err(|_| RepoError::InvalidInput {
        message: format!("quantity {} exceeds the storable range", draft.quantity),
    })
}

#[async_trait::async_trait]
impl ItemsRepo for PostgresRepositories {
    async fn list_items(&self) -> Result<Vec<Item>, RepoError> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY id"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(Item::try_from).collect()
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, RepoError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "INSERT INTO items (name, description, quantity, price_cents) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(quantity_param(draft)?)
        .bind(draft.price.cents())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Item::try_from(row)
    }

    async fn find_item(&self, id: i64) -> Result<Option<Item>, RepoError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(Item::try_from).transpose()
    }

    async fn update_item(&self, id: i64, draft: &ItemDraft) -> Result<Item, RepoError> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "UPDATE items \
             SET name = $2, description = $3, quantity = $4, price_cents = $5, updated_at = now() \
             WHERE id = $1 \
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(quantity_param(draft)?)
        .bind(draft.price.cents())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?
        .ok_or(RepoError::NotFound)?;

        Item::try_from(row)
    }

    async fn delete_item(&self, id: i64) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}
