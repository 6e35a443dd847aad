//! Accounts, password login and opaque bearer tokens.
//!
//! Tokens render as `<tag>_<prefix>_<secret>`. Only the SHA-256 digest of the
//! secret is persisted; the prefix is the lookup key.

use std::sync::Arc;
use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};
use stockroom_api_types::{
    AccessToken, LoginRequest, RefreshRequest, RegisterRequest, TokenPair, UserView,
};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{
    CreateTokenParams, CreateUserParams, RepoError, TokensRepo, UsersRepo,
};
use crate::domain::error::{NON_FIELD, TextField, ValidationErrors};
use crate::domain::users::{Registration, TokenKind, TokenRecord, normalize_email};

const TARGET: &str = "stockroom::auth";
const MIN_SECRET_LEN: usize = 32;
const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";
const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
const DUPLICATE_EMAIL: &str = "user with this email already exists.";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing credentials")]
    Missing,
    #[error("invalid token")]
    Invalid,
    #[error("expired token")]
    Expired,
}

#[derive(Debug, Error)]
pub enum AuthServiceError {
    #[error("invalid request: {0}")]
    Validation(ValidationErrors),
    #[error(transparent)]
    Unauthorized(#[from] AuthError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Authenticated caller attached to requests by the API middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub token_id: Uuid,
}

#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::from_secs(300),
            refresh: Duration::from_secs(86_400),
        }
    }
}

#[derive(Debug)]
struct ParsedToken {
    kind: TokenKind,
    prefix: String,
    secret: String,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    tokens: Arc<dyn TokensRepo>,
    lifetimes: TokenLifetimes,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        tokens: Arc<dyn TokensRepo>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            users,
            tokens,
            lifetimes,
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserView, AuthServiceError> {
        let registration = Registration::validate(request).map_err(AuthServiceError::Validation)?;

        let password = registration.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|err| AuthServiceError::Hash(err.to_string()))??;

        let user = self
            .users
            .create_user(CreateUserParams {
                username: registration.username,
                email: registration.email,
                password_hash,
            })
            .await
            .map_err(|err| match err {
                RepoError::Duplicate { constraint } if constraint.contains("email") => {
                    AuthServiceError::Validation(ValidationErrors::single("email", DUPLICATE_EMAIL))
                }
                RepoError::Duplicate { .. } => AuthServiceError::Validation(
                    ValidationErrors::single("username", DUPLICATE_USERNAME),
                ),
                other => AuthServiceError::Repo(other),
            })?;

        info!(target: TARGET, user_id = user.id, username = %user.username, "User registered");
        Ok(user.to_view())
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<TokenPair, AuthServiceError> {
        let mut errors = ValidationErrors::new();
        let email = TextField::required(&mut errors, "email", request.email.as_ref());
        let password = TextField::required(&mut errors, "password", request.password.as_ref());
        let (Some(email), Some(password)) = (email, password) else {
            return Err(AuthServiceError::Validation(errors));
        };

        let invalid = || {
            AuthServiceError::Validation(ValidationErrors::single(NON_FIELD, INVALID_CREDENTIALS))
        };

        let Some(user) = self.users.find_by_email(&normalize_email(email)).await? else {
            return Err(invalid());
        };

        let stored_hash = user.password_hash.clone();
        let password = password.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
            .await
            .map_err(|err| AuthServiceError::Hash(err.to_string()))?;
        if !verified {
            return Err(invalid());
        }

        let refresh = self.issue(user.id, TokenKind::Refresh).await?;
        let access = self.issue(user.id, TokenKind::Access).await?;

        info!(target: TARGET, user_id = user.id, username = %user.username, "User logged in");
        Ok(TokenPair { refresh, access })
    }

    pub async fn refresh(&self, request: &RefreshRequest) -> Result<AccessToken, AuthServiceError> {
        let mut errors = ValidationErrors::new();
        let token = TextField::required(&mut errors, "refresh", request.refresh.as_ref());
        let Some(token) = token else {
            return Err(AuthServiceError::Validation(errors));
        };

        let record = self.verify(token, TokenKind::Refresh).await?;
        let access = self.issue(record.user_id, TokenKind::Access).await?;
        Ok(AccessToken { access })
    }

    /// The is-authenticated predicate: resolves an access token to its owner.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let record = self.verify(token, TokenKind::Access).await?;
        Ok(Principal {
            user_id: record.user_id,
            token_id: record.id,
        })
    }

    async fn issue(&self, user_id: i64, kind: TokenKind) -> Result<String, RepoError> {
        let prefix = Self::generate_prefix();
        let secret = Self::generate_secret();
        let token = format!("{}_{prefix}_{secret}", kind.tag());
        let ttl = match kind {
            TokenKind::Access => self.lifetimes.access,
            TokenKind::Refresh => self.lifetimes.refresh,
        };

        self.tokens
            .create_token(CreateTokenParams {
                user_id,
                kind,
                prefix,
                hashed_secret: Self::hash_secret(&secret),
                expires_at: OffsetDateTime::now_utc() + ttl,
            })
            .await?;

        Ok(token)
    }

    async fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenRecord, AuthError> {
        let parsed = Self::parse_token(token).ok_or(AuthError::Invalid)?;
        if parsed.kind != expected {
            return Err(AuthError::Invalid);
        }

        let record = self
            .tokens
            .find_by_prefix(&parsed.prefix)
            .await
            .map_err(|err| {
                warn!(target: TARGET, error = %err, "Token lookup failed");
                AuthError::Invalid
            })?
            .ok_or(AuthError::Invalid)?;

        if record.kind != expected {
            return Err(AuthError::Invalid);
        }

        let hashed_input = Self::hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(AuthError::Invalid);
        }

        if record.is_expired_at(OffsetDateTime::now_utc()) {
            return Err(AuthError::Expired);
        }

        Ok(record)
    }

    fn hash_secret(secret: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.finalize().to_vec()
    }

    fn generate_prefix() -> String {
        Uuid::new_v4().simple().to_string()[..12].to_string()
    }

    fn generate_secret() -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }

    fn parse_token(token: &str) -> Option<ParsedToken> {
        let mut parts = token.splitn(3, '_');
        let kind = TokenKind::from_tag(parts.next()?)?;
        let prefix = parts.next()?;
        let secret = parts.next()?;
        if secret.len() < MIN_SECRET_LEN || prefix.is_empty() {
            return None;
        }
        Some(ParsedToken {
            kind,
            prefix: prefix.to_string(),
            secret: secret.to_string(),
        })
    }
}

fn hash_password(password: &str) -> Result<String, AuthServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AuthServiceError::Hash(err.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            warn!(target: TARGET, error = %err, "Stored password hash is unreadable");
            false
        }
    }
}
