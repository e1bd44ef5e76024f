use std::env;

/// Which transport delivers transactional email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailProvider {
    Ses,
    Resend,
    Mock,
}

impl EmailProvider {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ses" => Ok(Self::Ses),
            "resend" => Ok(Self::Resend),
            "mock" | "" => Ok(Self::Mock),
            other => Err(format!("EMAIL_PROVIDER: unknown provider '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// DynamoDB table; `None` keeps everything in memory.
    pub table_name: Option<String>,
    pub email_provider: EmailProvider,
    pub email_from: String,
    pub admin_email: String,
    pub resend_api_key: Option<String>,
    pub admin_token_secret: String,
    pub site_url: String,
    pub shop_name: String,
    pub shop_timezone: chrono_tz::Tz,
    pub shipping_flat_cents: i64,
    pub default_tenant: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let mut email_provider =
            EmailProvider::parse(&env::var("EMAIL_PROVIDER").unwrap_or_default())?;
        let force_mock = env::var("USE_MOCK_EMAIL")
            .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "yes"))
            .unwrap_or(false);
        if force_mock {
            email_provider = EmailProvider::Mock;
        }

        let resend_api_key = env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty());
        if email_provider == EmailProvider::Resend && resend_api_key.is_none() {
            return Err("RESEND_API_KEY: required when EMAIL_PROVIDER=resend".to_string());
        }

        let shop_timezone = env::var("SHOP_TIMEZONE")
            .unwrap_or_else(|_| "UTC".to_string())
            .parse::<chrono_tz::Tz>()
            .map_err(|e| format!("SHOP_TIMEZONE: {}", e))?;

        let shipping_flat_cents = match env::var("SHIPPING_FLAT_CENTS") {
            Ok(raw) => raw
                .parse::<i64>()
                .map_err(|e| format!("SHIPPING_FLAT_CENTS: {}", e))?,
            Err(_) => 0,
        };

        Ok(Self {
            table_name: env::var("TABLE_NAME").ok().filter(|t| !t.is_empty()),
            email_provider,
            email_from: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "no-reply@localhost".to_string()),
            admin_email: env::var("ADMIN_EMAIL").map_err(|e| format!("ADMIN_EMAIL: {}", e))?,
            resend_api_key,
            admin_token_secret: env::var("ADMIN_TOKEN_SECRET")
                .map_err(|e| format!("ADMIN_TOKEN_SECRET: {}", e))?,
            site_url: env::var("SITE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            shop_name: env::var("SHOP_NAME").unwrap_or_else(|_| "Repair Shop".to_string()),
            shop_timezone,
            shipping_flat_cents,
            default_tenant: env::var("DEFAULT_TENANT").unwrap_or_else(|_| "default".to_string()),
        })
    }

    /// Configuration for local runs and tests: memory store, mock email.
    #[must_use]
    pub fn local(admin_email: &str, admin_token_secret: &str) -> Self {
        Self {
            table_name: None,
            email_provider: EmailProvider::Mock,
            email_from: "no-reply@localhost".to_string(),
            admin_email: admin_email.to_string(),
            resend_api_key: None,
            admin_token_secret: admin_token_secret.to_string(),
            site_url: "http://localhost:3000".to_string(),
            shop_name: "Repair Shop".to_string(),
            shop_timezone: chrono_tz::UTC,
            shipping_flat_cents: 0,
            default_tenant: "default".to_string(),
        }
    }
}
