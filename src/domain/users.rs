//! Accounts and the opaque tokens issued to them.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use stockroom_api_types::{RegisterRequest, UserView};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::{TextField, ValidationErrors};

pub const USERNAME_MAX_CHARS: usize = 150;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}

impl UserRecord {
    pub fn to_view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

/// Registration fields that passed validation. The password is still plain text.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    pub fn validate(request: &RegisterRequest) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let username = required_trimmed(&mut errors, "username", request.username.as_ref());
        if let Some(name) = username.as_deref() {
            if name.chars().count() > USERNAME_MAX_CHARS {
                errors.add(
                    "username",
                    format!("Ensure this field has no more than {USERNAME_MAX_CHARS} characters."),
                );
            } else if !name
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
            {
                errors.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }

        let email = required_trimmed(&mut errors, "email", request.email.as_ref());
        if email
            .as_deref()
            .is_some_and(|address| {
                address.chars().count() > EMAIL_MAX_CHARS || !is_plausible_email(address)
            })
        {
            errors.add("email", "Enter a valid email address.");
        }

        let password = TextField::required(&mut errors, "password", request.password.as_ref())
            .and_then(|raw| {
                if raw.chars().count() < PASSWORD_MIN_CHARS {
                    errors.add(
                        "password",
                        format!(
                            "This password is too short. It must contain at least {PASSWORD_MIN_CHARS} characters."
                        ),
                    );
                    None
                } else {
                    Some(raw.to_string())
                }
            });

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) if errors.is_empty() => Ok(Self {
                username,
                email: normalize_email(&email),
                password,
            }),
            _ => Err(errors),
        }
    }
}

fn required_trimmed(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<&Value>,
) -> Option<String> {
    TextField::required(errors, field, value).map(|raw| raw.trim().to_string())
}

fn is_plausible_email(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !address.chars().any(char::is_whitespace)
        && domain
            .split('.')
            .filter(|label| !label.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Lowercases the domain part; the local part is kept as entered.
pub fn normalize_email(address: &str) -> String {
    match address.trim().rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_ascii_lowercase()),
        None => address.trim().to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }

    /// Leading tag of the rendered token string.
    pub fn tag(self) -> &'static str {
        match self {
            TokenKind::Access => "at",
            TokenKind::Refresh => "rt",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "at" => Some(TokenKind::Access),
            "rt" => Some(TokenKind::Refresh),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(format!("unknown token kind `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub id: Uuid,
    pub user_id: i64,
    pub kind: TokenKind,
    pub prefix: String,
    pub hashed_secret: Vec<u8>,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl TokenRecord {
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }
}
