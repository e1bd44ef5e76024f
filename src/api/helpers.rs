//! Response builders for the API Gateway proxy format.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use crate::errors::ShopError;

/// JSON response with the given status and serialized body.
#[must_use]
pub fn json_response<T: Serialize>(status_code: u16, body: &T) -> Value {
    match serde_json::to_string(body) {
        Ok(body) => json!({
            "statusCode": status_code,
            "headers": { "Content-Type": "application/json" },
            "body": body
        }),
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            err_response(500, "Failed to serialize response")
        }
    }
}

#[must_use]
pub fn ok<T: Serialize>(body: &T) -> Value {
    json_response(200, body)
}

#[must_use]
pub fn created<T: Serialize>(body: &T) -> Value {
    json_response(201, body)
}

#[must_use]
pub fn no_content() -> Value {
    json!({ "statusCode": 204, "body": "" })
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> Value {
    json!({
        "statusCode": status_code,
        "headers": { "Content-Type": "application/json" },
        "body": json!({ "error": message }).to_string()
    })
}

#[must_use]
pub fn from_error(err: &ShopError) -> Value {
    err_response(err.status_code(), &err.public_message())
}

/// Attach a `Set-Cookie` header to a response built above.
#[must_use]
pub fn with_cookie(mut response: Value, cookie: &str) -> Value {
    if let Some(obj) = response.as_object_mut() {
        let headers = obj.entry("headers").or_insert_with(|| json!({}));
        if let Some(h) = headers.as_object_mut() {
            h.insert("Set-Cookie".to_string(), Value::String(cookie.to_string()));
        }
    }
    response
}
