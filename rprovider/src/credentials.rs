//! Secret handling and API key validation.

use crate::{ProviderError, ProviderId};

#[derive(PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// Validates the shape of a provider API key and wraps it.
///
/// Keys are trimmed. Anthropic keys must carry the `sk-ant-` prefix.
pub fn validate_api_key(
    provider: ProviderId,
    api_key: impl Into<String>,
) -> Result<SecretString, ProviderError> {
    let raw = api_key.into();
    let secret = SecretString::new(raw.trim());
    // zero the untrimmed copy as well
    drop(SecretString::new(raw));

    if secret.is_empty() {
        return Err(ProviderError::configuration(format!(
            "api key for '{provider}' must not be empty"
        )));
    }

    if secret.expose().chars().any(char::is_whitespace) {
        return Err(ProviderError::configuration(format!(
            "api key for '{provider}' must not contain whitespace"
        )));
    }

    if provider == ProviderId::Anthropic && !secret.expose().starts_with("sk-ant-") {
        return Err(ProviderError::configuration(
            "anthropic api keys must start with 'sk-ant-'",
        ));
    }

    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn secret_debug_is_redacted() {
        let secret = SecretString::new("sk-live-123");
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(secret.expose(), "sk-live-123");
    }

    #[test]
    fn validate_trims_and_rejects_empty_keys() {
        let secret = validate_api_key(ProviderId::OpenAi, "  sk-abc  ").expect("key should pass");
        assert_eq!(secret.expose(), "sk-abc");

        let err = validate_api_key(ProviderId::DeepSeek, "   ").expect_err("empty key");
        assert_eq!(err.kind, ProviderErrorKind::Configuration);
        assert!(!err.retryable);
    }

    #[test]
    fn anthropic_keys_need_vendor_prefix() {
        assert!(validate_api_key(ProviderId::Anthropic, "sk-ant-api03-xyz").is_ok());
        let err = validate_api_key(ProviderId::Anthropic, "sk-openai").expect_err("wrong prefix");
        assert!(err.message.contains("sk-ant-"));
    }

    #[test]
    fn inner_whitespace_is_rejected() {
        assert!(validate_api_key(ProviderId::QianFan, "bce v3").is_err());
    }
}
