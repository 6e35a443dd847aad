use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreateTokenParams, RepoError, TokensRepo};
use crate::domain::users::{TokenKind, TokenRecord};

use super::{PostgresRepositories, map_sqlx_error};

const TOKEN_COLUMNS: &str = "id, user_id, kind, prefix, hashed_secret, expires_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    user_id: i64,
    kind: String,
    prefix: String,
    hashed_secret: Vec<u8>,
    expires_at: OffsetDateTime,
    created_at: OffsetDateTime,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = RepoError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<TokenKind>()
            .map_err(RepoError::from_persistence)?;

        Ok(TokenRecord {
            id: row.id,
            user_id: row.user_id,
            kind,
            prefix: row.prefix,
            hashed_secret: row.hashed_secret,
            expires_at: row.expires_at,
            created_at: row.created_at,
        })
    }
}

#[async_trait::async_trait]
impl TokensRepo for PostgresRepositories {
    async fn create_token(&self, params: CreateTokenParams) -> Result<TokenRecord, RepoError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "INSERT INTO auth_tokens (id, user_id, kind, prefix, hashed_secret, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(params.user_id)
        .bind(params.kind.as_str())
        .bind(params.prefix)
        .bind(params.hashed_secret)
        .bind(params.expires_at)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        TokenRecord::try_from(row)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<TokenRecord>, RepoError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM auth_tokens WHERE prefix = $1"
        ))
        .bind(prefix)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(TokenRecord::try_from).transpose()
    }
}
