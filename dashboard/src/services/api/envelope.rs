//! Response shape normalization.
//!
//! The backend is inconsistent: some endpoints return the entity directly,
//! others wrap it as `{"order": {...}}` or `{"data": {...}}`, and collections
//! come back either as a bare array or as `{"<plural>": [...]}`. These helpers
//! hide that from the domain services.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::client::ApiBody;
use crate::core::error::{AppError, Result};

const GENERIC_WRAPPERS: [&str; 2] = ["data", "result"];
const GENERIC_LIST_WRAPPERS: [&str; 4] = ["data", "items", "content", "results"];

/// Unwrap a single entity. `keys` are the entity-specific wrapper names tried
/// before the generic `data`/`result`.
pub fn entity<T: DeserializeOwned>(body: ApiBody, keys: &[&str]) -> Result<T> {
    let value = body.into_json();
    let inner = unwrap_object(&value, keys, &GENERIC_WRAPPERS).unwrap_or(&value);
    serde_json::from_value(inner.clone()).map_err(|e| AppError::Parse(e.to_string()))
}

/// Unwrap a collection. `null` and `{}` are treated as empty.
pub fn list<T: DeserializeOwned>(body: ApiBody, keys: &[&str]) -> Result<Vec<T>> {
    let value = body.into_json();

    let items = match &value {
        Value::Array(_) => &value,
        Value::Null => return Ok(Vec::new()),
        Value::Object(map) if map.is_empty() => return Ok(Vec::new()),
        Value::Object(_) => match unwrap_array(&value, keys) {
            Some(items) => items,
            None => {
                return Err(AppError::Parse(format!(
                    "Expected a list (keys tried: {:?})",
                    keys
                )))
            }
        },
        _ => return Err(AppError::Parse("Expected a list".to_string())),
    };

    serde_json::from_value(items.clone()).map_err(|e| AppError::Parse(e.to_string()))
}

/// Map a 404 to `None`; every other error propagates.
pub fn absent_on_404<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Map a 404 to an empty collection; every other error propagates.
pub fn empty_on_404<T>(result: Result<Vec<T>>) -> Result<Vec<T>> {
    absent_on_404(result).map(Option::unwrap_or_default)
}

fn unwrap_object<'a>(value: &'a Value, keys: &[&str], generic: &[&str]) -> Option<&'a Value> {
    let map = value.as_object()?;
    keys.iter()
        .chain(generic.iter())
        .filter_map(|key| map.get(*key))
        .find(|inner| inner.is_object() || inner.is_array())
}

fn unwrap_array<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let map = value.as_object()?;
    let direct = keys
        .iter()
        .chain(GENERIC_LIST_WRAPPERS.iter())
        .filter_map(|key| map.get(*key))
        .find(|inner| inner.is_array());

    // `{"data": {"orders": [...]}}`
    direct.or_else(|| {
        GENERIC_WRAPPERS
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|inner| unwrap_array(inner, keys))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i64,
    }

    #[test]
    fn test_entity_direct_and_wrapped() {
        let direct: Item = entity(ApiBody::Json(json!({ "id": 1 })), &["order"]).unwrap();
        let wrapped: Item =
            entity(ApiBody::Json(json!({ "order": { "id": 2 }, "message": "ok" })), &["order"]).unwrap();
        let data: Item = entity(ApiBody::Json(json!({ "data": { "id": 3 } })), &["order"]).unwrap();
        assert_eq!(direct, Item { id: 1 });
        assert_eq!(wrapped, Item { id: 2 });
        assert_eq!(data, Item { id: 3 });
    }

    #[test]
    fn test_list_shapes() {
        let bare: Vec<Item> = list(ApiBody::Json(json!([{ "id": 1 }])), &["orders"]).unwrap();
        let keyed: Vec<Item> = list(ApiBody::Json(json!({ "orders": [{ "id": 2 }] })), &["orders"]).unwrap();
        let nested: Vec<Item> =
            list(ApiBody::Json(json!({ "data": { "orders": [{ "id": 3 }] } })), &["orders"]).unwrap();
        let empty: Vec<Item> = list(ApiBody::Json(json!({})), &["orders"]).unwrap();
        assert_eq!(bare, vec![Item { id: 1 }]);
        assert_eq!(keyed, vec![Item { id: 2 }]);
        assert_eq!(nested, vec![Item { id: 3 }]);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_list_rejects_scalar() {
        let result: Result<Vec<Item>> = list(ApiBody::Json(json!(42)), &["orders"]);
        assert!(matches!(result, Err(AppError::Parse(_))));
    }

    #[test]
    fn test_absent_on_404() {
        let not_found: Result<i32> = Err(AppError::Http {
            status: 404,
            message: "missing".to_string(),
            body: None,
        });
        assert_eq!(absent_on_404(not_found).unwrap(), None);

        let server_error: Result<i32> = Err(AppError::Http {
            status: 500,
            message: "boom".to_string(),
            body: None,
        });
        assert!(absent_on_404(server_error).is_err());
    }
}
