//! Inventory items and their field rules.

use std::fmt;

use serde_json::Value;
use stockroom_api_types::{ItemView, ItemWriteRequest};
use thiserror::Error;

use super::error::{DomainError, NOT_A_STRING, REQUIRED, TextField, ValidationErrors};

pub const NAME_MAX_CHARS: usize = 100;
pub const QUANTITY_MAX: u32 = i32::MAX as u32;
const PRICE_DECIMAL_PLACES: usize = 2;
const PRICE_MAX_WHOLE_DIGITS: usize = 8;

/// Non-negative amount with two fractional digits, held as integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price {
    cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("A valid number is required.")]
    Invalid,
    #[error("Ensure this value is greater than or equal to 0.")]
    Negative,
    #[error("Ensure that there are no more than 2 decimal places.")]
    TooManyDecimalPlaces,
    #[error("Ensure that there are no more than 8 digits before the decimal point.")]
    TooManyWholeDigits,
}

impl Price {
    pub const MAX_CENTS: i64 = 9_999_999_999;

    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if cents < 0 {
            return Err(PriceError::Negative);
        }
        if cents > Self::MAX_CENTS {
            return Err(PriceError::TooManyWholeDigits);
        }
        Ok(Self { cents })
    }

    pub fn cents(self) -> i64 {
        self.cents
    }

    /// Parse a plain decimal literal such as `9.5`, `"19.00"` or `150`.
    ///
    /// Trailing zeros in the fraction do not count towards the two allowed
    /// decimal places.
    pub fn parse(raw: &str) -> Result<Self, PriceError> {
        let trimmed = raw.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(PriceError::Invalid);
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(PriceError::Invalid);
        }

        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > PRICE_DECIMAL_PLACES {
            return Err(PriceError::TooManyDecimalPlaces);
        }

        let whole = whole.trim_start_matches('0');
        if whole.len() > PRICE_MAX_WHOLE_DIGITS {
            return Err(PriceError::TooManyWholeDigits);
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| PriceError::Invalid)?
        };
        let fraction_value = fraction
            .bytes()
            .zip([10_i64, 1])
            .map(|(digit, weight)| i64::from(digit - b'0') * weight)
            .sum::<i64>();

        let cents = whole_value * 100 + fraction_value;
        if negative && cents > 0 {
            return Err(PriceError::Negative);
        }

        Self::from_cents(cents)
    }

    /// Accepts a JSON number or a numeric string.
    pub fn from_json(value: &Value) -> Result<Self, PriceError> {
        match value {
            Value::Number(number) => Self::parse(&number.to_string()),
            Value::String(text) => Self::parse(text),
            _ => Err(PriceError::Invalid),
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

/// Authoritative item row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub price: Price,
}

impl Item {
    /// Rebuild an item from stored columns.
    pub fn from_stored(
        id: i64,
        name: String,
        description: String,
        quantity: i32,
        price_cents: i64,
    ) -> Result<Self, DomainError> {
        let quantity = u32::try_from(quantity).map_err(|_| {
            DomainError::invariant(format!("item {id} has negative quantity {quantity}"))
        })?;
        let price = Price::from_cents(price_cents).map_err(|err| {
            DomainError::invariant(format!("item {id} has invalid price {price_cents}: {err}"))
        })?;

        Ok(Self {
            id,
            name,
            description,
            quantity,
            price,
        })
    }

    pub fn to_view(&self) -> ItemView {
        ItemView {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            quantity: self.quantity,
            price: self.price.to_string(),
        }
    }

    /// Current field values as a full write request, used as the base for partial updates.
    pub fn to_write_request(&self) -> ItemWriteRequest {
        ItemWriteRequest {
            name: Some(Value::String(self.name.clone())),
            description: Some(Value::String(self.description.clone())),
            quantity: Some(Value::from(self.quantity)),
            price: Some(Value::String(self.price.to_string())),
        }
    }
}

/// Validated field set for creating or fully replacing an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: String,
    pub description: String,
    pub quantity: u32,
    pub price: Price,
}

impl ItemDraft {
    /// Validate every field, reporting all failures at once.
    pub fn validate(request: &ItemWriteRequest) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = TextField::required(&mut errors, "name", request.name.as_ref())
            .map(str::trim)
            .and_then(|name| {
                if name.chars().count() > NAME_MAX_CHARS {
                    errors.add(
                        "name",
                        format!("Ensure this field has no more than {NAME_MAX_CHARS} characters."),
                    );
                    None
                } else {
                    Some(name.to_string())
                }
            });

        let description = match TextField::read(request.description.as_ref()) {
            TextField::Absent => String::new(),
            TextField::Text(raw) => raw.trim().to_string(),
            TextField::WrongType => {
                errors.add("description", NOT_A_STRING);
                String::new()
            }
        };

        let quantity = match request.quantity.as_ref() {
            None => Some(0),
            Some(value) => match parse_quantity(value) {
                Ok(quantity) => Some(quantity),
                Err(message) => {
                    errors.add("quantity", message);
                    None
                }
            },
        };

        let price = match request.price.as_ref() {
            None => {
                errors.add("price", REQUIRED);
                None
            }
            Some(value) => match Price::from_json(value) {
                Ok(price) => Some(price),
                Err(err) => {
                    errors.add("price", err.to_string());
                    None
                }
            },
        };

        match (name, quantity, price) {
            (Some(name), Some(quantity), Some(price)) if errors.is_empty() => Ok(Self {
                name,
                description,
                quantity,
                price,
            }),
            _ => Err(errors),
        }
    }
}

/// Overlay the fields present in `patch` onto `base`.
pub fn merge_write_requests(base: ItemWriteRequest, patch: ItemWriteRequest) -> ItemWriteRequest {
    ItemWriteRequest {
        name: patch.name.or(base.name),
        description: patch.description.or(base.description),
        quantity: patch.quantity.or(base.quantity),
        price: patch.price.or(base.price),
    }
}

fn parse_quantity(value: &Value) -> Result<u32, String> {
    const INVALID: &str = "A valid integer is required.";
    const NEGATIVE: &str = "Ensure this value is greater than or equal to 0.";

    let parsed: i128 = match value {
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                i128::from(unsigned)
            } else if let Some(signed) = number.as_i64() {
                i128::from(signed)
            } else {
                match number.as_f64() {
                    Some(float) if float.fract() == 0.0 && float.abs() < 1e18 => float as i128,
                    _ => return Err(INVALID.to_string()),
                }
            }
        }
        Value::String(text) => text.trim().parse().map_err(|_| INVALID.to_string())?,
        _ => return Err(INVALID.to_string()),
    };

    if parsed < 0 {
        return Err(NEGATIVE.to_string());
    }
    if parsed > i128::from(QUANTITY_MAX) {
        return Err(format!(
            "Ensure this value is less than or equal to {QUANTITY_MAX}."
        ));
    }
    Ok(parsed as u32)
}
