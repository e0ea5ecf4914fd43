//! Chat-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use rprovider::{ProviderError, ProviderErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatErrorKind {
    Configuration,
    RateLimited,
    Transient,
    Protocol,
    Cancelled,
    Store,
}

impl ChatErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient_upstream",
            Self::Protocol => "protocol_error",
            Self::Cancelled => "cancelled",
            Self::Store => "store_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Configuration, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Protocol, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ChatErrorKind::Cancelled, "turn cancelled by caller")
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Rate limits and transient upstream failures may be retried by an outer policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ChatErrorKind::RateLimited | ChatErrorKind::Transient
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ChatErrorKind::Cancelled
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let kind = match value.kind {
            ProviderErrorKind::Configuration => ChatErrorKind::Configuration,
            ProviderErrorKind::RateLimited => ChatErrorKind::RateLimited,
            ProviderErrorKind::Transient => ChatErrorKind::Transient,
            ProviderErrorKind::Protocol => ChatErrorKind::Protocol,
            ProviderErrorKind::Cancelled => ChatErrorKind::Cancelled,
        };

        Self {
            kind,
            message: value.message,
            detail: value.detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_keep_kind_and_detail() {
        let error = ChatError::from(
            ProviderError::protocol("malformed chunk").with_detail("<html>"),
        );

        assert_eq!(error.kind, ChatErrorKind::Protocol);
        assert_eq!(error.detail.as_deref(), Some("<html>"));
        assert_eq!(error.to_string(), "protocol_error: malformed chunk");
        assert!(!error.is_retryable());
    }

    #[test]
    fn rate_limits_stay_distinguishable() {
        let error = ChatError::from(ProviderError::rate_limited("slow down"));
        assert_eq!(error.code(), "rate_limited");
        assert!(error.is_retryable());
        assert!(ChatError::cancelled().is_cancelled());
        assert_eq!(ChatError::store("disk full").code(), "store_error");
    }
}
