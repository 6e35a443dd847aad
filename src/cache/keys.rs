//! Cache key derivation.

const ITEM_NAMESPACE: &str = "item_";

/// Substrate key for an item's cached view. Pure and injective over ids.
pub fn item_key(id: i64) -> String {
    format!("{ITEM_NAMESPACE}{id}")
}
