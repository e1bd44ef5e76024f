use std::error::Error;
use repairshop::errors::ShopError;

#[test]
fn test_shop_error_implements_error_trait() {
    fn assert_error<T: Error>(_: &T) {}

    let error = ShopError::ParseError("test error".to_string());
    assert_error(&error);
}

#[test]
fn test_shop_error_display() {
    let error = ShopError::Validation("email: must be a valid email address".to_string());
    assert_eq!(
        format!("{error}"),
        "Invalid request: email: must be a valid email address"
    );

    let error = ShopError::OutOfStock("Clear Case".to_string());
    assert_eq!(format!("{error}"), "Out of stock: Clear Case");

    let error = ShopError::HttpError("Connection error".to_string());
    assert_eq!(
        format!("{error}"),
        "Failed to send HTTP request: Connection error"
    );
}

#[test]
fn test_status_codes() {
    assert_eq!(ShopError::Validation(String::new()).status_code(), 400);
    assert_eq!(ShopError::ParseError(String::new()).status_code(), 400);
    assert_eq!(ShopError::Unauthorized(String::new()).status_code(), 401);
    assert_eq!(ShopError::NotFound(String::new()).status_code(), 404);
    assert_eq!(ShopError::Conflict(String::new()).status_code(), 409);
    assert_eq!(ShopError::OutOfStock(String::new()).status_code(), 409);
    assert_eq!(ShopError::EmailError(String::new()).status_code(), 502);
    assert_eq!(ShopError::StorageError(String::new()).status_code(), 500);
}

#[test]
fn test_internal_details_are_hidden() {
    let error = ShopError::StorageError("table shop-data: throttled".to_string());
    assert!(!error.public_message().contains("shop-data"));

    let error = ShopError::NotFound("part 'abc' not found".to_string());
    assert_eq!(error.public_message(), "Not found: part 'abc' not found");
}

#[test]
fn test_shop_error_from_conversions() {
    let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
    let shop_err: ShopError = err.into();
    assert!(matches!(shop_err, ShopError::ParseError(_)));

    // Only checks the conversion compiles; building a reqwest::Error by hand
    // is not possible.
    #[allow(unused)]
    #[allow(clippy::items_after_statements)]
    fn _check_reqwest_conversion(err: reqwest::Error) -> ShopError {
        ShopError::from(err)
    }
}
