use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Out of stock: {0}")]
    OutOfStock(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Failed to parse request: {0}")]
    ParseError(String),

    #[error("Storage failure: {0}")]
    StorageError(String),

    #[error("Failed to send email: {0}")]
    EmailError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ShopError {
    /// HTTP status code the API returns for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Validation(_) | ShopError::ParseError(_) => 400,
            ShopError::Unauthorized(_) => 401,
            ShopError::NotFound(_) => 404,
            ShopError::Conflict(_) | ShopError::OutOfStock(_) => 409,
            ShopError::EmailError(_) | ShopError::HttpError(_) => 502,
            ShopError::StorageError(_) | ShopError::ConfigError(_) => 500,
        }
    }

    /// Message safe to show to a storefront visitor.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            ShopError::StorageError(_) | ShopError::ConfigError(_) => {
                "Something went wrong on our side. Please try again later.".to_string()
            }
            ShopError::EmailError(_) | ShopError::HttpError(_) => {
                "An upstream service is unavailable. Please try again later.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for ShopError {
    fn from(error: reqwest::Error) -> Self {
        ShopError::HttpError(error.to_string())
    }
}

impl From<serde_json::Error> for ShopError {
    fn from(error: serde_json::Error) -> Self {
        ShopError::ParseError(error.to_string())
    }
}

// DynamoDB failures surface as storage errors.
impl<E, R> From<aws_sdk_dynamodb::error::SdkError<E, R>> for ShopError
where
    E: std::fmt::Debug,
    R: std::fmt::Debug,
{
    fn from(error: aws_sdk_dynamodb::error::SdkError<E, R>) -> Self {
        ShopError::StorageError(format!("{error:?}"))
    }
}
