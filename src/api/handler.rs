//! API Lambda entrypoint.
//!
//! This module handles:
//! - Building the shared [`AppState`] once per cold start
//! - Turning the API Gateway event into a [`Request`]
//! - Mapping service errors onto JSON error responses

use lambda_runtime::{Error, LambdaEvent};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use super::helpers;
use super::parsing::{self, Request};
use super::routes;
use crate::app::AppState;
use crate::core::config::AppConfig;

pub use self::function_handler as handler;

static STATE: OnceCell<AppState> = OnceCell::const_new();

async fn state() -> Result<&'static AppState, Error> {
    STATE
        .get_or_try_init(|| async {
            let config = AppConfig::from_env().map_err(|e| {
                error!("Config error: {}", e);
                Error::from(e)
            })?;
            AppState::from_config(config).await.map_err(|e| {
                error!("Failed to initialize application state: {}", e);
                Error::from(e.to_string())
            })
        })
        .await
}

/// Lambda handler for the API entrypoint.
///
/// # Errors
///
/// Returns an error only when configuration or state setup fails; request
/// level failures become JSON error responses.
#[tracing::instrument(level = "info", skip(event), fields(request_id = %event.context.request_id))]
pub async fn function_handler(event: LambdaEvent<Value>) -> Result<impl Serialize, Error> {
    let state = state().await?;
    Ok(handle_event(state, event.payload).await)
}

/// Route one API Gateway event against `state`.
pub async fn handle_event(state: &AppState, mut payload: Value) -> Value {
    parsing::merge_v2_cookies(&mut payload);
    let request = match Request::from_event(&payload) {
        Ok(r) => r,
        Err(e) => {
            error!("Malformed API event: {}", e);
            return helpers::from_error(&e);
        }
    };
    info!(method = %request.method, path = %request.path, "API request");

    match routes::route(state, &request).await {
        Ok(response) => response,
        Err(e) => {
            let status = e.status_code();
            if status >= 500 {
                error!(method = %request.method, path = %request.path, "Request failed: {}", e);
            } else {
                warn!(method = %request.method, path = %request.path, status, "Request rejected: {}", e);
            }
            helpers::from_error(&e)
        }
    }
}
