//! Request validation for grocery items.
//!
//! Each field has its own check that turns a raw JSON value into a normalized
//! value or a message. [`validate_create`] and [`validate_update`] run every
//! check, collect the failures into [`FieldErrors`] and only then consult the
//! store for name uniqueness.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::models::{ItemChanges, NewItem, DEFAULT_CATEGORY, DEFAULT_QUANTITY, MAX_TEXT_LENGTH};
use crate::store::ItemStore;

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const BLANK: &str = "This field may not be blank.";
pub const TOO_LONG: &str = "Ensure this field has no more than 100 characters.";
pub const DUPLICATE_NAME: &str = "grocery item with this name already exists.";
pub const NOT_AN_INTEGER: &str = "A valid integer is required.";
pub const QUANTITY_TOO_SMALL: &str = "Ensure this value is greater than or equal to 1.";
pub const NOT_A_BOOLEAN: &str = "Must be a valid boolean.";
pub const NULL_CHARACTER: &str = "Null characters are not allowed.";

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Field name to messages, serialized as a plain JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Keep the value on success, record the message on failure.
    pub fn check<T>(&mut self, field: &str, result: Result<T, &'static str>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Strings pass through; numbers become their decimal text.
fn coerce_string(value: &Value) -> Result<String, &'static str> {
    match value {
        Value::Null => Err(NOT_NULL),
        Value::String(s) if s.contains('\0') => Err(NULL_CHARACTER),
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(NOT_A_STRING),
    }
}

/// `"12.0"` and `"12."` read as `12`; any other fraction is left for the
/// integer parse to reject.
fn strip_zero_fraction(text: &str) -> &str {
    match text.split_once('.') {
        Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole,
        _ => text,
    }
}

fn check_length(text: String) -> Result<String, &'static str> {
    if text.chars().count() > MAX_TEXT_LENGTH {
        Err(TOO_LONG)
    } else {
        Ok(text)
    }
}

pub fn validate_name(value: &Value) -> Result<String, &'static str> {
    let name = coerce_string(value)?;
    if name.is_empty() {
        return Err(BLANK);
    }
    check_length(name)
}

pub fn validate_category(value: &Value) -> Result<String, &'static str> {
    coerce_string(value).and_then(check_length)
}

pub fn validate_quantity(value: &Value) -> Result<i64, &'static str> {
    let quantity = match value {
        Value::Null => return Err(NOT_NULL),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i,
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e18 => f as i64,
            _ => return Err(NOT_AN_INTEGER),
        },
        Value::String(s) => strip_zero_fraction(s.trim())
            .parse::<i64>()
            .map_err(|_| NOT_AN_INTEGER)?,
        _ => return Err(NOT_AN_INTEGER),
    };
    if quantity < 1 {
        return Err(QUANTITY_TOO_SMALL);
    }
    Ok(quantity)
}

/// Exact spellings only: `"yes"` and `"YES"` pass, `"yEs"` does not.
pub fn validate_purchased(value: &Value) -> Result<bool, &'static str> {
    const TRUE_VALUES: [&str; 13] = [
        "t", "T", "y", "Y", "yes", "Yes", "YES", "true", "True", "TRUE", "on", "On", "ON",
    ];
    const FALSE_VALUES: [&str; 13] = [
        "f", "F", "n", "N", "no", "No", "NO", "false", "False", "FALSE", "off", "Off", "OFF",
    ];

    match value {
        Value::Null => Err(NOT_NULL),
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Ok(true),
            Some(f) if f == 0.0 => Ok(false),
            _ => Err(NOT_A_BOOLEAN),
        },
        Value::String(s) if s == "1" || TRUE_VALUES.contains(&s.as_str()) => Ok(true),
        Value::String(s) if s == "0" || FALSE_VALUES.contains(&s.as_str()) => Ok(false),
        _ => Err(NOT_A_BOOLEAN),
    }
}

fn as_object(payload: &Value) -> Result<&Map<String, Value>, FieldErrors> {
    payload.as_object().ok_or_else(|| {
        let kind = match payload {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "str",
            Value::Array(_) => "list",
            Value::Object(_) => "dict",
        };
        FieldErrors::single(
            NON_FIELD_ERRORS,
            format!("Invalid data. Expected a dictionary, but got {kind}."),
        )
    })
}

/// Field-level checks for a create payload, without touching the store.
pub fn parse_new_item(payload: &Value) -> Result<NewItem, FieldErrors> {
    let fields = as_object(payload)?;
    let mut errors = FieldErrors::default();

    let name = match fields.get("name") {
        Some(value) => errors.check("name", validate_name(value)),
        None => {
            errors.add("name", REQUIRED);
            None
        }
    };
    let category = fields
        .get("category")
        .map(|v| errors.check("category", validate_category(v)));
    let purchased = fields
        .get("purchased")
        .map(|v| errors.check("purchased", validate_purchased(v)));
    let quantity = fields
        .get("quantity")
        .map(|v| errors.check("quantity", validate_quantity(v)));

    match name {
        Some(name) if errors.is_empty() => Ok(NewItem {
            name,
            category: category
                .flatten()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            purchased: purchased.flatten().unwrap_or(false),
            quantity: quantity.flatten().unwrap_or(DEFAULT_QUANTITY),
        }),
        _ => Err(errors),
    }
}

/// Field-level checks for a partial update. Absent fields stay `None`; `id`
/// and unknown keys are ignored.
pub fn parse_changes(payload: &Value) -> Result<ItemChanges, FieldErrors> {
    let fields = as_object(payload)?;
    let mut errors = FieldErrors::default();

    let changes = ItemChanges {
        name: fields
            .get("name")
            .and_then(|v| errors.check("name", validate_name(v))),
        category: fields
            .get("category")
            .and_then(|v| errors.check("category", validate_category(v))),
        purchased: fields
            .get("purchased")
            .and_then(|v| errors.check("purchased", validate_purchased(v))),
        quantity: fields
            .get("quantity")
            .and_then(|v| errors.check("quantity", validate_quantity(v))),
    };
    errors.into_result(changes)
}

/// Full create validation, including the uniqueness check against `store`.
pub async fn validate_create(store: &ItemStore, payload: &Value) -> Result<NewItem, ApiError> {
    let (item, mut errors) = match parse_new_item(payload) {
        Ok(item) => (Some(item), FieldErrors::default()),
        Err(errors) => (None, errors),
    };

    // Report a duplicate alongside other field errors when the name itself
    // is well formed.
    let name = match &item {
        Some(item) => Some(item.name.clone()),
        None if !errors.contains("name") => payload
            .get("name")
            .and_then(|v| validate_name(v).ok()),
        None => None,
    };
    if let Some(name) = name {
        if store.name_taken(&name, None).await? {
            errors.add("name", DUPLICATE_NAME);
        }
    }

    match item {
        Some(item) if errors.is_empty() => Ok(item),
        _ => Err(ApiError::Validation(errors)),
    }
}

/// Partial update validation for the item `id`, which is excluded from the
/// uniqueness check.
pub async fn validate_update(
    store: &ItemStore,
    id: i64,
    payload: &Value,
) -> Result<ItemChanges, ApiError> {
    let (changes, mut errors) = match parse_changes(payload) {
        Ok(changes) => (Some(changes), FieldErrors::default()),
        Err(errors) => (None, errors),
    };

    let name = match &changes {
        Some(changes) => changes.name.clone(),
        None if !errors.contains("name") => payload
            .get("name")
            .and_then(|v| validate_name(v).ok()),
        None => None,
    };
    if let Some(name) = name {
        if store.name_taken(&name, Some(id)).await? {
            errors.add("name", DUPLICATE_NAME);
        }
    }

    match changes {
        Some(changes) if errors.is_empty() => Ok(changes),
        _ => Err(ApiError::Validation(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_name_trims_and_rejects_blank() {
        assert_eq!(validate_name(&json!("  Milk ")), Ok("Milk".to_string()));
        assert_eq!(validate_name(&json!("")), Err(BLANK));
        assert_eq!(validate_name(&json!("   ")), Err(BLANK));
        assert_eq!(validate_name(&Value::Null), Err(NOT_NULL));
        assert_eq!(validate_name(&json!(["Milk"])), Err(NOT_A_STRING));
        assert_eq!(validate_name(&json!(true)), Err(NOT_A_STRING));
    }

    #[test]
    fn test_validate_name_length_counts_characters() {
        assert!(validate_name(&json!("a".repeat(100))).is_ok());
        assert_eq!(validate_name(&json!("a".repeat(101))), Err(TOO_LONG));
        assert!(validate_name(&json!("é".repeat(100))).is_ok());
    }

    #[test]
    fn test_validate_name_accepts_numbers() {
        assert_eq!(validate_name(&json!(7)), Ok("7".to_string()));
    }

    #[test]
    fn test_validate_category_allows_empty() {
        assert_eq!(validate_category(&json!("")), Ok(String::new()));
        assert_eq!(validate_category(&json!("b".repeat(101))), Err(TOO_LONG));
    }

    #[test]
    fn test_validate_quantity() {
        assert_eq!(validate_quantity(&json!(12)), Ok(12));
        assert_eq!(validate_quantity(&json!(3.0)), Ok(3));
        assert_eq!(validate_quantity(&json!(" 4 ")), Ok(4));
        assert_eq!(validate_quantity(&json!(0)), Err(QUANTITY_TOO_SMALL));
        assert_eq!(validate_quantity(&json!(-5)), Err(QUANTITY_TOO_SMALL));
        assert_eq!(validate_quantity(&json!(1.5)), Err(NOT_AN_INTEGER));
        assert_eq!(validate_quantity(&json!("lots")), Err(NOT_AN_INTEGER));
        assert_eq!(validate_quantity(&json!(true)), Err(NOT_AN_INTEGER));
        assert_eq!(validate_quantity(&Value::Null), Err(NOT_NULL));
    }

    #[test]
    fn test_validate_purchased() {
        assert_eq!(validate_purchased(&json!(true)), Ok(true));
        assert_eq!(validate_purchased(&json!("False")), Ok(false));
        assert_eq!(validate_purchased(&json!("yes")), Ok(true));
        assert_eq!(validate_purchased(&json!(0)), Ok(false));
        assert_eq!(validate_purchased(&json!(2)), Err(NOT_A_BOOLEAN));
        assert_eq!(validate_purchased(&json!("maybe")), Err(NOT_A_BOOLEAN));
    }

    #[test]
    fn test_validate_purchased_short_and_exact_spellings() {
        assert_eq!(validate_purchased(&json!("t")), Ok(true));
        assert_eq!(validate_purchased(&json!("Y")), Ok(true));
        assert_eq!(validate_purchased(&json!("f")), Ok(false));
        assert_eq!(validate_purchased(&json!("n")), Ok(false));
        assert_eq!(validate_purchased(&json!("1")), Ok(true));
        assert_eq!(validate_purchased(&json!(1.0)), Ok(true));
        assert_eq!(validate_purchased(&json!(0.0)), Ok(false));
        assert_eq!(validate_purchased(&json!("yEs")), Err(NOT_A_BOOLEAN));
        assert_eq!(validate_purchased(&json!(" true")), Err(NOT_A_BOOLEAN));
        assert_eq!(validate_purchased(&json!(0.5)), Err(NOT_A_BOOLEAN));
    }

    #[test]
    fn test_null_characters_rejected() {
        assert_eq!(validate_name(&json!("c\u{0000}d")), Err(NULL_CHARACTER));
        assert_eq!(validate_category(&json!("Dai\u{0000}ry")), Err(NULL_CHARACTER));
    }

    #[test]
    fn test_validate_quantity_accepts_zero_fraction_strings() {
        assert_eq!(validate_quantity(&json!("12.0")), Ok(12));
        assert_eq!(validate_quantity(&json!("12.")), Ok(12));
        assert_eq!(validate_quantity(&json!("12.000")), Ok(12));
        assert_eq!(validate_quantity(&json!("12.5")), Err(NOT_AN_INTEGER));
        assert_eq!(validate_quantity(&json!("0.0")), Err(QUANTITY_TOO_SMALL));
    }

    #[test]
    fn test_parse_new_item_applies_defaults() {
        let item = parse_new_item(&json!({"name": "Milk"})).unwrap();
        assert_eq!(item, NewItem::named("Milk"));
    }

    #[test]
    fn test_parse_new_item_ignores_id() {
        let item = parse_new_item(&json!({"id": 99, "name": "Milk", "quantity": 2})).unwrap();
        assert_eq!(item.name, "Milk");
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn test_parse_new_item_reports_every_field() {
        let errors = parse_new_item(&json!({"category": "Dairy", "quantity": 0})).unwrap_err();
        assert_eq!(errors.get("name"), Some(&[REQUIRED.to_string()][..]));
        assert_eq!(
            errors.get("quantity"),
            Some(&[QUANTITY_TOO_SMALL.to_string()][..])
        );
        assert!(!errors.contains("category"));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        let errors = parse_new_item(&json!(["Milk"])).unwrap_err();
        assert_eq!(
            errors.get(NON_FIELD_ERRORS),
            Some(&["Invalid data. Expected a dictionary, but got list.".to_string()][..])
        );
        assert!(parse_changes(&json!("Milk")).is_err());
    }

    #[test]
    fn test_parse_changes_keeps_absent_fields_unset() {
        let changes = parse_changes(&json!({"id": 5, "purchased": true})).unwrap();
        assert_eq!(
            changes,
            ItemChanges {
                purchased: Some(true),
                ..Default::default()
            }
        );

        assert!(parse_changes(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn test_parse_changes_rejects_null_fields() {
        let errors = parse_changes(&json!({"category": null})).unwrap_err();
        assert_eq!(errors.get("category"), Some(&[NOT_NULL.to_string()][..]));
    }

    #[test]
    fn test_field_errors_serialize_as_plain_object() {
        let mut errors = FieldErrors::default();
        errors.add("name", REQUIRED);
        errors.add("quantity", QUANTITY_TOO_SMALL);
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            json!({"name": [REQUIRED], "quantity": [QUANTITY_TOO_SMALL]})
        );
    }

    #[tokio::test]
    async fn test_validate_create_detects_duplicate_name() {
        let store = ItemStore::in_memory().await.unwrap();
        store.create(&NewItem::named("Milk")).await.unwrap();

        let err = validate_create(&store, &json!({"name": "Milk"})).await.unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.get("name"), Some(&[DUPLICATE_NAME.to_string()][..]))
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        assert!(validate_create(&store, &json!({"name": "milk"})).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_create_reports_duplicate_with_other_errors() {
        let store = ItemStore::in_memory().await.unwrap();
        store.create(&NewItem::named("Milk")).await.unwrap();

        let err = validate_create(&store, &json!({"name": "Milk", "quantity": 0}))
            .await
            .unwrap_err();
        let ApiError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains("name"));
        assert!(errors.contains("quantity"));
    }

    #[tokio::test]
    async fn test_validate_update_allows_own_name() {
        let store = ItemStore::in_memory().await.unwrap();
        let milk = store.create(&NewItem::named("Milk")).await.unwrap();
        let bread = store.create(&NewItem::named("Bread")).await.unwrap();

        let changes = validate_update(&store, milk.id, &json!({"name": "Milk"}))
            .await
            .unwrap();
        assert_eq!(changes.name.as_deref(), Some("Milk"));

        let err = validate_update(&store, bread.id, &json!({"name": "Milk"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.contains("name")));
    }
}
