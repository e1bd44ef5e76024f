//! Turning an API Gateway event into a [`Request`].

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ShopError;

pub const SESSION_HEADER: &str = "x-session-id";
pub const SESSION_COOKIE: &str = "session_id";
pub const TENANT_HEADER: &str = "x-tenant-id";

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

pub fn v_str<'a>(root: &'a Value, path: &[&str]) -> Option<&'a str> {
    v_path(root, path).and_then(|v| v.as_str())
}

pub fn get_header_value<'a>(headers: &'a Value, name: &str) -> Option<&'a str> {
    if let Some(v) = headers.get(name).and_then(|s| s.as_str()) {
        return Some(v);
    }
    headers.as_object().and_then(|map| {
        map.iter().find_map(|(k, v)| {
            if k.eq_ignore_ascii_case(name) {
                v.as_str()
            } else {
                None
            }
        })
    })
}

/// Value of one cookie from a `Cookie` header.
#[must_use]
pub fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}

/// Session ids end up inside store keys, so only a safe alphabet is accepted.
#[must_use]
pub fn is_valid_session_id(id: &str) -> bool {
    (8..=128).contains(&id.len())
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub headers: Value,
    pub query: HashMap<String, String>,
    pub body: Option<String>,
}

impl Request {
    /// Accepts HTTP API (v2) events and falls back to REST API (v1) fields.
    ///
    /// # Errors
    ///
    /// `ParseError` when the event has no method or path, or a base64 body
    /// that does not decode.
    pub fn from_event(payload: &Value) -> Result<Self, ShopError> {
        let method = v_str(payload, &["requestContext", "http", "method"])
            .or_else(|| v_str(payload, &["httpMethod"]))
            .ok_or_else(|| ShopError::ParseError("missing HTTP method".to_string()))?
            .to_ascii_uppercase();
        let path = v_str(payload, &["rawPath"])
            .or_else(|| v_str(payload, &["path"]))
            .ok_or_else(|| ShopError::ParseError("missing request path".to_string()))?
            .to_string();
        let headers = payload.get("headers").cloned().unwrap_or(Value::Null);

        let mut query: HashMap<String, String> = match v_str(payload, &["rawQueryString"]) {
            Some(raw) => url::form_urlencoded::parse(raw.as_bytes())
                .into_owned()
                .collect(),
            None => HashMap::new(),
        };
        if let Some(params) = payload
            .get("queryStringParameters")
            .and_then(Value::as_object)
        {
            for (k, v) in params {
                if let Some(s) = v.as_str() {
                    query.entry(k.clone()).or_insert_with(|| s.to_string());
                }
            }
        }

        let body = match payload.get("body").and_then(Value::as_str) {
            Some(raw) if payload.get("isBase64Encoded").and_then(Value::as_bool) == Some(true) => {
                let bytes = BASE64
                    .decode(raw)
                    .map_err(|e| ShopError::ParseError(format!("invalid base64 body: {e}")))?;
                Some(
                    String::from_utf8(bytes)
                        .map_err(|e| ShopError::ParseError(format!("body is not UTF-8: {e}")))?,
                )
            }
            Some(raw) => Some(raw.to_string()),
            None => None,
        };

        Ok(Self {
            method,
            path,
            headers,
            query,
            body,
        })
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        get_header_value(&self.headers, name)
    }

    /// The `Cookie` header; HTTP API v2 moves cookies into a `cookies` array,
    /// which callers see joined back as one header.
    #[must_use]
    pub fn cookie_header(&self) -> Option<&str> {
        self.header("cookie")
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Path segments after `/api`, percent-decoded.
    #[must_use]
    pub fn segments(&self) -> Vec<String> {
        self.path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .skip_while(|s| *s != "api")
            .skip(1)
            .map(|s| {
                urlencoding::decode(s)
                    .map(std::borrow::Cow::into_owned)
                    .unwrap_or_else(|_| s.to_string())
            })
            .collect()
    }

    #[must_use]
    pub fn tenant<'a>(&'a self, default_tenant: &'a str) -> &'a str {
        self.header(TENANT_HEADER)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(default_tenant)
    }

    /// Storefront session from the `x-session-id` header or `session_id` cookie.
    ///
    /// # Errors
    ///
    /// `Validation` when neither is present or the id is malformed.
    pub fn session_id(&self) -> Result<&str, ShopError> {
        let id = self
            .header(SESSION_HEADER)
            .or_else(|| {
                self.cookie_header()
                    .and_then(|c| cookie_value(c, SESSION_COOKIE))
            })
            .map(str::trim)
            .ok_or_else(|| ShopError::Validation("missing session id".to_string()))?;
        if !is_valid_session_id(id) {
            return Err(ShopError::Validation("malformed session id".to_string()));
        }
        Ok(id)
    }

    /// Deserialize the JSON body.
    ///
    /// # Errors
    ///
    /// `ParseError` when the body is missing or does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ShopError> {
        let body = self
            .body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| ShopError::ParseError("missing request body".to_string()))?;
        Ok(serde_json::from_str(body)?)
    }
}

/// HTTP API v2 delivers cookies separately from headers; fold them back in.
pub(crate) fn merge_v2_cookies(payload: &mut Value) {
    let Some(cookies) = payload.get("cookies").and_then(Value::as_array) else {
        return;
    };
    let joined = cookies
        .iter()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>()
        .join("; ");
    if joined.is_empty() {
        return;
    }
    if let Some(headers) = payload.get_mut("headers").and_then(Value::as_object_mut) {
        headers
            .entry("cookie")
            .or_insert_with(|| Value::String(joined));
    } else if let Some(obj) = payload.as_object_mut() {
        obj.insert("headers".to_string(), serde_json::json!({ "cookie": joined }));
    }
}
