//! HTTP clients for the wagering APIs.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod operator;
mod platform;

pub use operator::OperatorClient;
pub use platform::PlatformClient;

use reqwest::StatusCode;

use crate::objects::ApiResponse;

/// Header carrying the integrating platform's id.
pub const PLATFORM_ID_HEADER: &str = "X-Platform-Id";
/// Header carrying the platform-scoped user id.
pub const PLATFORM_USER_ID_HEADER: &str = "X-Platform-User-Id";
/// Header carrying the optional display name.
pub const PLATFORM_USER_NAME_HEADER: &str = "X-Platform-User-Name";
/// Header carrying the request trace id.
pub const TRACE_ID_HEADER: &str = "X-Trace-Id";

/// Errors produced by the SDK HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-zero business code.
    #[error("api error: status {status}, code {code}: {message}")]
    Api {
        status: StatusCode,
        code: u32,
        message: String,
    },

    /// The envelope decoded but carried no `data`.
    #[error("api response missing data")]
    MissingData,

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

/// Decode the uniform envelope, turning non-zero business codes into
/// [`ClientError::Api`].
pub(crate) async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    let body = resp.text().await?;
    let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
    if envelope.code != 0 {
        return Err(ClientError::Api {
            status,
            code: envelope.code,
            message: envelope.message,
        });
    }
    envelope.data.ok_or(ClientError::MissingData)
}

/// Variant of [`parse_response`] for endpoints whose success `data` may
/// legitimately be absent.
pub(crate) async fn parse_optional_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<Option<T>, ClientError> {
    let status = resp.status();
    let body = resp.text().await?;
    let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
    if envelope.code != 0 {
        return Err(ClientError::Api {
            status,
            code: envelope.code,
            message: envelope.message,
        });
    }
    Ok(envelope.data)
}
