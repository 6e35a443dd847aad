//! Wire types for the Stockroom HTTP API.
//!
//! Request types keep every field optional and loosely typed so the server
//! can report missing or wrong-typed fields individually instead of
//! rejecting the whole body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Public representation of an inventory item.
///
/// `price` is always rendered with exactly two fractional digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub price: String,
}

/// Body for `POST /api/items/` and `PUT /api/items/{id}/`.
///
/// `quantity` and `price` accept JSON numbers or numeric strings; `name` and
/// `description` must be strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemWriteRequest {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub password: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access: String,
}
