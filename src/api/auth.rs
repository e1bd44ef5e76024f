//! Signed admin bearer tokens.
//!
//! The admin sign-in lives in an external auth service; it hands out tokens
//! of the form `{subject}.{expiresUnix}.{hex hmac-sha256(secret, "subject.expires")}`
//! which this module verifies.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{error, warn};

use crate::errors::ShopError;

type HmacSha256 = Hmac<Sha256>;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

fn mac_for(secret: &str, subject: &str, expires: u64) -> Option<HmacSha256> {
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mut mac) => {
            mac.update(format!("{subject}.{expires}").as_bytes());
            Some(mac)
        }
        Err(e) => {
            error!("Failed to create HMAC: {}", e);
            None
        }
    }
}

/// Issue a token for `subject` valid for `ttl_secs` from now.
#[must_use]
pub fn issue_admin_token(secret: &str, subject: &str, ttl_secs: u64) -> String {
    let expires = now_secs() + ttl_secs;
    let signature = mac_for(secret, subject, expires)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("{subject}.{expires}.{signature}")
}

/// Verify a token at time `now`. Returns the subject on success.
///
/// # Errors
///
/// `Unauthorized` when the token is malformed, tampered with or expired.
pub fn verify_admin_token_at(secret: &str, token: &str, now: u64) -> Result<String, ShopError> {
    let unauthorized = || ShopError::Unauthorized("invalid admin token".to_string());

    // Subjects may contain dots (emails), so split from the right.
    let mut parts = token.rsplitn(3, '.');
    let (Some(signature), Some(expires), Some(subject)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(unauthorized());
    };
    if subject.is_empty() {
        return Err(unauthorized());
    }
    let expires: u64 = expires.parse().map_err(|_| unauthorized())?;
    let provided = hex::decode(signature).map_err(|_| unauthorized())?;

    let mac = mac_for(secret, subject, expires).ok_or_else(unauthorized)?;
    // verify_slice compares in constant time.
    if mac.verify_slice(&provided).is_err() {
        warn!(subject, "Admin token signature mismatch");
        return Err(unauthorized());
    }
    if expires <= now {
        warn!(subject, expires, "Admin token expired");
        return Err(ShopError::Unauthorized("admin token expired".to_string()));
    }
    Ok(subject.to_string())
}

/// Verify a token against the current clock.
///
/// # Errors
///
/// See [`verify_admin_token_at`].
pub fn verify_admin_token(secret: &str, token: &str) -> Result<String, ShopError> {
    verify_admin_token_at(secret, token, now_secs())
}

/// Pull the token out of an `Authorization: Bearer ...` header.
#[must_use]
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let (scheme, token) = value.split_once(' ')?;
    scheme
        .eq_ignore_ascii_case("bearer")
        .then(|| token.trim())
        .filter(|t| !t.is_empty())
}
