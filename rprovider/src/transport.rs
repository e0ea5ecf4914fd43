//! SSE transport contract and upstream status mapping.

use std::pin::Pin;

use futures_core::Stream;
use http::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::{ProviderError, ProviderFuture, ProviderId, SseEvent};

pub type SseEventStream<'a> =
    Pin<Box<dyn Stream<Item = Result<SseEvent, ProviderError>> + Send + 'a>>;

/// Fully built outbound vendor call.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>, headers: HeaderMap, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers,
            body,
        }
    }
}

pub trait SseTransport: Send + Sync + std::fmt::Debug {
    /// Sends `request` and returns its SSE events.
    ///
    /// Non-success statuses are mapped to typed errors before any event is
    /// produced. Cancelling `cancel` drops the connection.
    fn open<'a>(
        &'a self,
        provider: ProviderId,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<SseEventStream<'a>, ProviderError>>;
}

/// Maps a non-success HTTP status and body to a typed error.
pub fn status_error(status: u16, body: &str) -> ProviderError {
    let message = extract_error_message(body)
        .unwrap_or_else(|| format!("upstream request failed with status {status}"));

    let error = match status {
        401 | 403 => ProviderError::configuration(message),
        429 => ProviderError::rate_limited(message),
        408 | 500..=599 => ProviderError::transient(message),
        400 | 404 | 422 => ProviderError::configuration(message),
        _ => ProviderError::protocol(message),
    };

    if body.is_empty() {
        error
    } else {
        error.with_detail(body)
    }
}

/// Reads `error.message` from OpenAI- and Anthropic-style error envelopes.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok()?;
    parsed
        .get("error")?
        .get("message")?
        .as_str()
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}
