//! Shared provider error kinds and error value helpers.
//!
//! ```rust
//! use rprovider::{ProviderError, ProviderErrorKind};
//!
//! let auth = ProviderError::configuration("bad key");
//! assert!(!auth.retryable);
//! assert_eq!(auth.code(), "configuration_error");
//!
//! let busy = ProviderError::transient("upstream overloaded");
//! assert!(busy.retryable);
//! assert_eq!(busy.kind, ProviderErrorKind::Transient);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upper bound for raw vendor payloads kept on an error.
pub const MAX_ERROR_DETAIL_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    Configuration,
    RateLimited,
    Transient,
    Protocol,
    Cancelled,
}

impl ProviderErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::RateLimited => "rate_limited",
            Self::Transient => "transient_upstream",
            Self::Protocol => "protocol_error",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub detail: Option<String>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            detail: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Configuration, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transient, message, true)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Protocol, message, false)
    }

    pub fn cancelled() -> Self {
        Self::new(ProviderErrorKind::Cancelled, "turn cancelled by caller", false)
    }

    /// Attaches the raw vendor payload, truncated on a char boundary.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let mut detail = detail.into();
        if detail.len() > MAX_ERROR_DETAIL_BYTES {
            let mut cut = MAX_ERROR_DETAIL_BYTES;
            while !detail.is_char_boundary(cut) {
                cut -= 1;
            }
            detail.truncate(cut);
        }
        self.detail = Some(detail);
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ProviderErrorKind::Cancelled
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)
    }
}

impl Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_constructors_set_retryable_flag() {
        assert!(!ProviderError::configuration("x").retryable);
        assert!(ProviderError::rate_limited("x").retryable);
        assert!(ProviderError::transient("x").retryable);
        assert!(!ProviderError::protocol("x").retryable);
        assert!(!ProviderError::cancelled().retryable);
        assert!(ProviderError::cancelled().is_cancelled());
    }

    #[test]
    fn detail_is_truncated_on_char_boundary() {
        let raw = "é".repeat(MAX_ERROR_DETAIL_BYTES);
        let error = ProviderError::protocol("bad payload").with_detail(raw);
        let detail = error.detail.expect("detail should be kept");

        assert!(detail.len() <= MAX_ERROR_DETAIL_BYTES);
        assert!(detail.chars().all(|ch| ch == 'é'));
    }

    #[test]
    fn display_uses_stable_code() {
        let error = ProviderError::rate_limited("slow down");
        assert_eq!(error.to_string(), "rate_limited: slow down");
    }
}
