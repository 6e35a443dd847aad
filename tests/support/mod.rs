//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use stockroom::application::auth::{AuthService, TokenLifetimes};
use stockroom::application::items::ItemService;
use stockroom::application::repos::{
    CreateTokenParams, CreateUserParams, ItemsRepo, RepoError, TokensRepo, UsersRepo,
};
use stockroom::cache::{CacheConfig, CacheError, CacheStore, ItemCacheCoordinator, MemoryCacheStore};
use stockroom::domain::items::{Item, ItemDraft};
use stockroom::domain::users::{TokenRecord, UserRecord};
use stockroom::infra::http::{ApiState, build_api_router};

/// Items table double. Enforces name uniqueness like the real constraint and
/// counts every single-row read so tests can tell cache hits from store hits.
#[derive(Default)]
pub struct MemoryItemsRepo {
    rows: Mutex<BTreeMap<i64, Item>>,
    next_id: AtomicUsize,
    finds: AtomicUsize,
}

impl MemoryItemsRepo {
    pub fn finds(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    pub async fn row(&self, id: i64) -> Option<Item> {
        self.rows.lock().await.get(&id).cloned()
    }

    fn name_taken(rows: &BTreeMap<i64, Item>, name: &str, except: Option<i64>) -> bool {
        rows.values()
            .any(|item| item.name == name && Some(item.id) != except)
    }
}

fn duplicate_name() -> RepoError {
    RepoError::Duplicate {
        constraint: "items_name_key".to_string(),
    }
}

#[async_trait]
impl ItemsRepo for MemoryItemsRepo {
    async fn list_items(&self) -> Result<Vec<Item>, RepoError> {
        Ok(self.rows.lock().await.values().cloned().collect())
    }

    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, RepoError> {
        let mut rows = self.rows.lock().await;
        if Self::name_taken(&rows, &draft.name, None) {
            return Err(duplicate_name());
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
        let item = Item {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            quantity: draft.quantity,
            price: draft.price,
        };
        rows.insert(id, item.clone());
        Ok(item)
    }

    async fn find_item(&self, id: i64) -> Result<Option<Item>, RepoError> {
        self.finds.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn update_item(&self, id: i64, draft: &ItemDraft) -> Result<Item, RepoError> {
        let mut rows = self.rows.lock().await;
        if !rows.contains_key(&id) {
            return Err(RepoError::NotFound);
        }
        if Self::name_taken(&rows, &draft.name, Some(id)) {
            return Err(duplicate_name());
        }
        let item = Item {
            id,
            name: draft.name.clone(),
            description: draft.description.clone(),
            quantity: draft.quantity,
            price: draft.price,
        };
        rows.insert(id, item.clone());
        Ok(item)
    }

    async fn delete_item(&self, id: i64) -> Result<(), RepoError> {
        self.rows
            .lock()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[derive(Default)]
pub struct MemoryUsersRepo {
    rows: Mutex<Vec<UserRecord>>,
}

#[async_trait]
impl UsersRepo for MemoryUsersRepo {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut rows = self.rows.lock().await;
        if rows.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        if rows.iter().any(|user| user.email == params.email) {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }
        let user = UserRecord {
            id: rows.len() as i64 + 1,
            username: params.username,
            email: params.email,
            password_hash: params.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|user| user.email == email)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemoryTokensRepo {
    rows: Mutex<Vec<TokenRecord>>,
}

impl MemoryTokensRepo {
    /// Moves every stored token's expiry into the past.
    pub async fn expire_all(&self) {
        let past = OffsetDateTime::now_utc() - time::Duration::minutes(1);
        for record in self.rows.lock().await.iter_mut() {
            record.expires_at = past;
        }
    }
}

#[async_trait]
impl TokensRepo for MemoryTokensRepo {
    async fn create_token(&self, params: CreateTokenParams) -> Result<TokenRecord, RepoError> {
        let record = TokenRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            kind: params.kind,
            prefix: params.prefix,
            hashed_secret: params.hashed_secret,
            expires_at: params.expires_at,
            created_at: OffsetDateTime::now_utc(),
        };
        self.rows.lock().await.push(record.clone());
        Ok(record)
    }

    async fn find_by_prefix(&self, prefix: &str) -> Result<Option<TokenRecord>, RepoError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|record| record.prefix == prefix)
            .cloned())
    }
}

/// Substrate that is always down.
#[derive(Default)]
pub struct FailingCacheStore {
    pub calls: AtomicUsize,
}

#[async_trait]
impl CacheStore for FailingCacheStore {
    fn backend(&self) -> &'static str {
        "failing"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub items: Arc<MemoryItemsRepo>,
    pub tokens: Arc<MemoryTokensRepo>,
    pub cache: Arc<dyn CacheStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_cache(Arc::new(MemoryCacheStore::new(&CacheConfig::default())))
    }

    pub fn with_cache(cache: Arc<dyn CacheStore>) -> Self {
        let items = Arc::new(MemoryItemsRepo::default());
        let users = Arc::new(MemoryUsersRepo::default());
        let tokens = Arc::new(MemoryTokensRepo::default());

        let items_repo: Arc<dyn ItemsRepo> = items.clone();
        let coordinator = ItemCacheCoordinator::new(items_repo.clone(), cache.clone());
        let state = ApiState {
            items: Arc::new(ItemService::new(items_repo, coordinator)),
            auth: Arc::new(AuthService::new(
                users,
                tokens.clone(),
                TokenLifetimes::default(),
            )),
        };

        Self {
            router: build_api_router(state),
            items,
            tokens,
            cache,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should collect")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body should be json")
        };
        (status, json)
    }

    /// Registers a fresh account and returns its access token.
    pub async fn login(&self) -> String {
        let (status, _) = self
            .request(
                Method::POST,
                "/api/register/",
                None,
                Some(serde_json::json!({
                    "username": "clerk",
                    "email": "clerk@example.com",
                    "password": "inventory-pass",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .request(
                Method::POST,
                "/api/login/",
                None,
                Some(serde_json::json!({
                    "email": "clerk@example.com",
                    "password": "inventory-pass",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["access"]
            .as_str()
            .expect("access token in login response")
            .to_string()
    }
}
