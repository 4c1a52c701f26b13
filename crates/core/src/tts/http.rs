//! Mapping of HTTP outcomes onto [`ProviderError`].

use crate::tts::ProviderError;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Response, StatusCode};
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 512;

/// Classify a non-success status. Auth and rate limiting get their own
/// variants so they can be logged separately.
pub fn classify_status(status: u16, headers: &HeaderMap, body: String) -> ProviderError {
    match status {
        401 | 403 => ProviderError::Auth { status },
        429 => ProviderError::RateLimited {
            retry_after: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs),
        },
        _ => ProviderError::Status {
            status,
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        },
    }
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::Transport(err.to_string())
    }
}

/// Returns the response untouched on 2xx, otherwise drains the body into an error.
pub(crate) async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status: StatusCode = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status.as_u16(), &headers, body))
}
