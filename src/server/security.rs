use axum::http::HeaderMap;

use crate::core::config::settings::resolve_api_key;
use crate::core::config::ServerSettings;
use crate::core::errors::ApiError;

const API_KEY_HEADER: &str = "x-api-key";

/// Environment fallback for `server.api_token`.
pub const API_TOKEN_ENV: &str = "NOC_ORACLE_API_TOKEN";

/// Token that mutating routes expect, if one is configured.
#[derive(Debug, Clone, Default)]
pub struct ApiToken {
    value: Option<String>,
}

impl ApiToken {
    pub fn new(value: Option<String>) -> Self {
        Self { value }
    }

    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self::new(resolve_api_key(settings.api_token.as_deref(), API_TOKEN_ENV))
    }

    pub fn is_enabled(&self) -> bool {
        self.value.is_some()
    }
}

pub fn require_api_key(headers: &HeaderMap, expected: &ApiToken) -> Result<(), ApiError> {
    let Some(expected) = expected.value.as_deref() else {
        return Ok(());
    };

    let header_value = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if header_value.is_empty() || header_value != expected {
        return Err(ApiError::Unauthorized);
    }

    Ok(())
}
