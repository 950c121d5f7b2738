// API model tests that need no server or database
// Tests the wire formats and field validation

use serde_json::json;

#[test]
fn test_item_validation() {
    use grocery_list::validation::{validate_name, validate_quantity, BLANK, TOO_LONG};

    // Valid name
    assert_eq!(validate_name(&json!("Test Item")), Ok("Test Item".to_string()));

    // Empty name
    assert_eq!(validate_name(&json!("")), Err(BLANK));

    // Whitespace only
    assert_eq!(validate_name(&json!("   ")), Err(BLANK));

    // Too long
    let long_name = "a".repeat(101);
    assert_eq!(validate_name(&json!(long_name)), Err(TOO_LONG));

    // Quantity floor
    assert!(validate_quantity(&json!(1)).is_ok());
    assert!(validate_quantity(&json!(0)).is_err());
}

#[test]
fn test_grocery_item_serialization() {
    use grocery_list::GroceryItem;

    let item = GroceryItem {
        id: 7,
        name: "Eggs".to_string(),
        category: "Dairy".to_string(),
        purchased: false,
        quantity: 12,
    };
    assert_eq!(
        serde_json::to_value(&item).unwrap(),
        json!({"id": 7, "name": "Eggs", "category": "Dairy", "purchased": false, "quantity": 12})
    );

    let json = r#"{"id":1,"name":"Milk","category":"Other","purchased":true,"quantity":1}"#;
    let item: GroceryItem = serde_json::from_str(json).unwrap();
    assert_eq!(item.name, "Milk");
    assert!(item.purchased);
}

#[test]
fn test_count_responses_serialization() {
    use grocery_list::{DeletedResponse, UpdatedResponse};

    assert_eq!(
        serde_json::to_string(&DeletedResponse { deleted: 3 }).unwrap(),
        r#"{"deleted":3}"#
    );
    assert_eq!(
        serde_json::to_string(&UpdatedResponse { updated: 0 }).unwrap(),
        r#"{"updated":0}"#
    );
}

#[test]
fn test_field_errors_wire_format() {
    use grocery_list::validation::{parse_new_item, REQUIRED};

    let errors = parse_new_item(&json!({"category": "Dairy"})).unwrap_err();
    assert_eq!(serde_json::to_value(&errors).unwrap(), json!({"name": [REQUIRED]}));
}

#[test]
fn test_error_response_serialization() {
    use grocery_list::ErrorResponse;

    let json = r#"{"error":"purchased field is required"}"#;
    let body: ErrorResponse = serde_json::from_str(json).unwrap();
    assert_eq!(body.error, "purchased field is required");
}
