//! Cookie consent: the preferences cookie, the gating of optional scripts and
//! the server-side audit trail of consent decisions.

use chrono::{DateTime, Utc};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::AppState;
use crate::errors::ShopError;
use crate::store::{Record, new_id};

pub const CONSENT_COOKIE: &str = "cookie_consent";

/// Bumped when the categories change; older cookies ask again.
pub const CONSENT_VERSION: u32 = 1;

const ONE_YEAR_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConsentCategory {
    Necessary,
    Functional,
    Analytics,
    Marketing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentPreferences {
    #[serde(default = "always")]
    pub necessary: bool,
    #[serde(default)]
    pub functional: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub marketing: bool,
    #[serde(default)]
    pub version: u32,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn always() -> bool {
    true
}

impl Default for ConsentPreferences {
    /// Nothing beyond strictly necessary cookies.
    fn default() -> Self {
        Self {
            necessary: true,
            functional: false,
            analytics: false,
            marketing: false,
            version: CONSENT_VERSION,
            updated_at: Utc::now(),
        }
    }
}

impl ConsentPreferences {
    #[must_use]
    pub fn accept_all() -> Self {
        Self {
            functional: true,
            analytics: true,
            marketing: true,
            ..Self::default()
        }
    }

    /// Read preferences from a `Cookie` header value. Missing, malformed or
    /// outdated cookies yield `None`, meaning the visitor has not decided yet.
    #[must_use]
    pub fn from_cookie_header(header: &str) -> Option<Self> {
        let raw = header.split(';').find_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == CONSENT_COOKIE).then_some(value)
        })?;
        Self::from_cookie_value(raw)
    }

    #[must_use]
    pub fn from_cookie_value(raw: &str) -> Option<Self> {
        let decoded = percent_decode_str(raw).decode_utf8().ok()?;
        let mut prefs: Self = match serde_json::from_str(&decoded) {
            Ok(p) => p,
            Err(e) => {
                debug!("Ignoring malformed consent cookie: {}", e);
                return None;
            }
        };
        if prefs.version != CONSENT_VERSION {
            return None;
        }
        prefs.necessary = true;
        Some(prefs)
    }

    #[must_use]
    pub fn to_cookie_value(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        utf8_percent_encode(&json, NON_ALPHANUMERIC).to_string()
    }

    /// Full `Set-Cookie` header value.
    #[must_use]
    pub fn set_cookie_header(&self, secure: bool) -> String {
        let mut header = format!(
            "{}={}; Path=/; Max-Age={}; SameSite=Lax",
            CONSENT_COOKIE,
            self.to_cookie_value(),
            ONE_YEAR_SECS
        );
        if secure {
            header.push_str("; Secure");
        }
        header
    }

    #[must_use]
    pub fn allows(&self, category: ConsentCategory) -> bool {
        match category {
            ConsentCategory::Necessary => true,
            ConsentCategory::Functional => self.functional,
            ConsentCategory::Analytics => self.analytics,
            ConsentCategory::Marketing => self.marketing,
        }
    }

    /// Categories of scripts the page may load.
    #[must_use]
    pub fn allowed_scripts(&self) -> Vec<ConsentCategory> {
        [
            ConsentCategory::Necessary,
            ConsentCategory::Functional,
            ConsentCategory::Analytics,
            ConsentCategory::Marketing,
        ]
        .into_iter()
        .filter(|c| self.allows(*c))
        .collect()
    }
}

/// Answer for the page: whether to show the banner and what may load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentStatus {
    pub decided: bool,
    pub preferences: ConsentPreferences,
    pub allowed_scripts: Vec<ConsentCategory>,
}

#[must_use]
pub fn status(cookie_header: Option<&str>) -> ConsentStatus {
    let current = cookie_header.and_then(ConsentPreferences::from_cookie_header);
    let decided = current.is_some();
    let preferences = current.unwrap_or_default();
    ConsentStatus {
        decided,
        allowed_scripts: preferences.allowed_scripts(),
        preferences,
    }
}

/// Audit record of one consent decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentRecord {
    pub id: String,
    pub session_id: String,
    pub preferences: ConsentPreferences,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for ConsentRecord {
    const PREFIX: &'static str = "consent:";
    const NAME: &'static str = "consent record";

    fn key_value(&self) -> String {
        self.id.clone()
    }
}

/// Persist the decision and return the `Set-Cookie` header to send back.
pub async fn record(
    state: &AppState,
    tenant: &str,
    session_id: &str,
    mut preferences: ConsentPreferences,
    user_agent: Option<&str>,
) -> Result<(ConsentRecord, String), ShopError> {
    preferences.necessary = true;
    preferences.version = CONSENT_VERSION;
    preferences.updated_at = Utc::now();

    let record = ConsentRecord {
        id: new_id(),
        session_id: session_id.to_string(),
        preferences,
        user_agent: user_agent.map(ToString::to_string),
        created_at: Utc::now(),
    };
    let record = state.repo::<ConsentRecord>(tenant).insert(record).await?;
    info!(
        tenant,
        session_id,
        analytics = record.preferences.analytics,
        marketing = record.preferences.marketing,
        "Consent recorded"
    );
    let secure = state.config.site_url.starts_with("https://");
    let cookie = record.preferences.set_cookie_header(secure);
    Ok((record, cookie))
}
