//! Field validation for storefront and admin forms.
//!
//! Errors are collected per field so that a form can show every problem at
//! once, in the same `field -> message` shape the storefront renders inline.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::ShopError;

/// Maximum length accepted for free-text fields (issues, messages, notes).
pub const MAX_TEXT_LEN: usize = 4000;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static regex compile")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9 ()\-.]{7,20}$").expect("static regex compile"));

#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Accepts the usual punctuation people type; requires at least 7 digits.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    let trimmed = phone.trim();
    PHONE_RE.is_match(trimmed) && trimmed.chars().filter(char::is_ascii_digit).count() >= 7
}

/// Accumulates field errors for one form submission.
#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Map<String, Value>,
}

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: &str) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| Value::String(message.to_string()));
    }

    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "This field is required");
        } else if value.len() > MAX_TEXT_LEN {
            self.add(field, "This field is too long");
        }
    }

    pub fn require_email(&mut self, field: &str, value: &str) {
        self.require(field, value);
        if !value.trim().is_empty() && !is_valid_email(value) {
            self.add(field, "Please enter a valid email address");
        }
    }

    pub fn require_phone(&mut self, field: &str, value: &str) {
        self.require(field, value);
        if !value.trim().is_empty() && !is_valid_phone(value) {
            self.add(field, "Please enter a valid phone number");
        }
    }

    pub fn optional_phone(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value
            && !v.trim().is_empty()
            && !is_valid_phone(v)
        {
            self.add(field, "Please enter a valid phone number");
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Ok when nothing was flagged, otherwise a `Validation` error listing the fields.
    pub fn into_result(self) -> Result<(), ShopError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let detail = self
            .errors
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v.as_str().unwrap_or_default()))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ShopError::Validation(detail))
    }
}

/// Lowercase, ASCII-only slug for URLs.
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Strip control characters and collapse surrounding whitespace.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect::<String>()
        .trim()
        .to_string()
}

/// Single-line variant of [`clean_text`] for names and subjects: line breaks
/// and other control characters become spaces and runs of whitespace collapse.
#[must_use]
pub fn clean_line(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
