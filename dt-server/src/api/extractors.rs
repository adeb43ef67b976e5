//! Custom Axum extractors for the identity and tracing headers.
//!
//! Provides:
//! - `PlatformIdentity` — the `(platform_id, platform_user_id)` pair the
//!   authentication layer validated upstream, plus the optional display
//!   name.
//! - `TraceId` — the request trace id, generated when the caller did not
//!   send one.
//!
//! No cryptography happens here: signatures were checked before the
//! request reached this service.

use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use dt_sdk::codes;

use super::error::failure_with_message;

/// Header carrying the integrating platform's id.
pub const PLATFORM_ID_HEADER: &str = "X-Platform-Id";
/// Header carrying the platform-scoped user id.
pub const PLATFORM_USER_ID_HEADER: &str = "X-Platform-User-Id";
/// Header carrying the optional display name.
pub const PLATFORM_USER_NAME_HEADER: &str = "X-Platform-User-Name";
/// Header carrying the request trace id.
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

const MAX_USER_ID_LEN: usize = 64;

/// The authenticated platform user on whose behalf the request runs.
#[derive(Debug, Clone)]
pub struct PlatformIdentity {
    pub platform_id: i16,
    pub platform_user_id: String,
    pub platform_user_name: String,
}

/// Errors raised while reading the identity headers.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("missing {0} header")]
    Missing(&'static str),
    #[error("invalid {0} header")]
    Invalid(&'static str),
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        failure_with_message(
            StatusCode::BAD_REQUEST,
            codes::BAD_REQUEST,
            &self.to_string(),
            "",
        )
    }
}

impl<S: Send + Sync> FromRequestParts<S> for PlatformIdentity {
    type Rejection = IdentityError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let platform_id = parts
            .headers
            .get(PLATFORM_ID_HEADER)
            .ok_or(IdentityError::Missing(PLATFORM_ID_HEADER))?
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i16>().ok())
            .ok_or(IdentityError::Invalid(PLATFORM_ID_HEADER))?;

        let platform_user_id = parts
            .headers
            .get(PLATFORM_USER_ID_HEADER)
            .ok_or(IdentityError::Missing(PLATFORM_USER_ID_HEADER))?
            .to_str()
            .map_err(|_| IdentityError::Invalid(PLATFORM_USER_ID_HEADER))?
            .trim()
            .to_string();

        if !is_valid_user_id(&platform_user_id) {
            return Err(IdentityError::Invalid(PLATFORM_USER_ID_HEADER));
        }

        let platform_user_name = parts
            .headers
            .get(PLATFORM_USER_NAME_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(PlatformIdentity {
            platform_id,
            platform_user_id,
            platform_user_name,
        })
    }
}

/// `[A-Za-z0-9_-]{1,64}`
fn is_valid_user_id(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_USER_ID_LEN
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Request trace id, taken from the header or freshly generated.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for TraceId {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let trace_id = parts
            .headers
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= MAX_USER_ID_LEN)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Ok(TraceId(trace_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_charset() {
        assert!(is_valid_user_id("user_01-A"));
        assert!(is_valid_user_id(&"a".repeat(64)));
        assert!(!is_valid_user_id(""));
        assert!(!is_valid_user_id(&"a".repeat(65)));
        assert!(!is_valid_user_id("user 01"));
        assert!(!is_valid_user_id("user@01"));
        assert!(!is_valid_user_id("名前"));
    }
}
