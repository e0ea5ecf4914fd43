//! Stable adapter construction surface for facade consumers.

use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "transport-reqwest")]
use crate::{AdapterRegistry, ReqwestTransport};
use crate::{
    ProviderError, ProviderId, ProviderOperationHooks, RetryPolicy, SecretString, SseTransport,
    VendorAdapter, validate_api_key,
};

#[derive(Clone)]
pub struct ProviderBuildConfig {
    pub provider_id: ProviderId,
    pub api_key: String,
    pub base_url: Option<String>,
    /// Vendor-specific JSON, e.g. `{"app_id": "..."}` for QianFan.
    pub vendor_config: Option<String>,
    pub connect_timeout: Duration,
    /// Longest silence allowed between response chunks. A stream that keeps
    /// producing chunks is never cut off, however long the turn runs.
    pub timeout: Duration,
    pub retry_policy: RetryPolicy,
    pub hooks: Option<Arc<dyn ProviderOperationHooks>>,
}

impl std::fmt::Debug for ProviderBuildConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderBuildConfig")
            .field("provider_id", &self.provider_id)
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("vendor_config", &self.vendor_config)
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .field("retry_policy", &self.retry_policy)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

impl ProviderBuildConfig {
    pub fn new(provider_id: ProviderId, api_key: impl Into<String>) -> Self {
        Self {
            provider_id,
            api_key: api_key.into(),
            base_url: None,
            vendor_config: None,
            connect_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(90),
            retry_policy: RetryPolicy::default(),
            hooks: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_vendor_config(mut self, vendor_config: impl Into<String>) -> Self {
        self.vendor_config = Some(vendor_config.into());
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }
}

#[cfg(feature = "transport-reqwest")]
pub fn build_adapter_from_api_key(
    provider_id: ProviderId,
    api_key: impl Into<String>,
) -> Result<Arc<dyn VendorAdapter>, ProviderError> {
    build_adapter_with_config(ProviderBuildConfig::new(provider_id, api_key))
}

#[cfg(feature = "transport-reqwest")]
pub fn build_adapter_with_config(
    config: ProviderBuildConfig,
) -> Result<Arc<dyn VendorAdapter>, ProviderError> {
    let mut transport = ReqwestTransport::with_timeouts(config.connect_timeout, config.timeout)?
        .with_retry_policy(config.retry_policy.clone());
    if let Some(hooks) = config.hooks.clone() {
        transport = transport.with_hooks(hooks);
    }

    build_adapter_with_transport(config, Arc::new(transport))
}

#[cfg(feature = "transport-reqwest")]
/// Builds one adapter per config and registers it under its provider id.
///
/// A later config for the same provider replaces the earlier one.
pub fn build_registry(
    configs: impl IntoIterator<Item = ProviderBuildConfig>,
) -> Result<AdapterRegistry, ProviderError> {
    let mut registry = AdapterRegistry::new();
    for config in configs {
        registry.register_shared(build_adapter_with_config(config)?);
    }
    Ok(registry)
}

/// Builds an adapter over a caller-supplied transport.
///
/// Timeouts, `retry_policy` and `hooks` only apply to the default reqwest
/// transport and are ignored here.
pub fn build_adapter_with_transport(
    config: ProviderBuildConfig,
    transport: Arc<dyn SseTransport>,
) -> Result<Arc<dyn VendorAdapter>, ProviderError> {
    let api_key = validate_api_key(config.provider_id, config.api_key.as_str())?;

    match config.provider_id {
        ProviderId::OpenAi | ProviderId::DeepSeek => build_openai_adapter(config, api_key, transport),
        ProviderId::Anthropic => build_anthropic_adapter(config, api_key, transport),
        ProviderId::QianFan => build_qianfan_adapter(config, api_key, transport),
    }
}

#[cfg(feature = "provider-openai")]
fn build_openai_adapter(
    config: ProviderBuildConfig,
    api_key: SecretString,
    transport: Arc<dyn SseTransport>,
) -> Result<Arc<dyn VendorAdapter>, ProviderError> {
    use rprovider::adapters::openai::OpenAiCompatibleAdapter;

    let mut adapter = match config.provider_id {
        ProviderId::DeepSeek => OpenAiCompatibleAdapter::deepseek(api_key, transport),
        _ => OpenAiCompatibleAdapter::openai(api_key, transport),
    };
    if let Some(base_url) = config.base_url {
        adapter = adapter.with_base_url(base_url);
    }
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "provider-openai"))]
fn build_openai_adapter(
    config: ProviderBuildConfig,
    _api_key: SecretString,
    _transport: Arc<dyn SseTransport>,
) -> Result<Arc<dyn VendorAdapter>, ProviderError> {
    Err(ProviderError::configuration(format!(
        "provider-openai feature is not enabled on chatrelay (requested '{}')",
        config.provider_id
    )))
}

#[cfg(feature = "provider-anthropic")]
fn build_anthropic_adapter(
    config: ProviderBuildConfig,
    api_key: SecretString,
    transport: Arc<dyn SseTransport>,
) -> Result<Arc<dyn VendorAdapter>, ProviderError> {
    let mut adapter = rprovider::adapters::anthropic::AnthropicAdapter::new(api_key, transport)?;
    if let Some(base_url) = config.base_url {
        adapter = adapter.with_base_url(base_url);
    }
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "provider-anthropic"))]
fn build_anthropic_adapter(
    _config: ProviderBuildConfig,
    _api_key: SecretString,
    _transport: Arc<dyn SseTransport>,
) -> Result<Arc<dyn VendorAdapter>, ProviderError> {
    Err(ProviderError::configuration(
        "provider-anthropic feature is not enabled on chatrelay",
    ))
}

#[cfg(feature = "provider-qianfan")]
fn build_qianfan_adapter(
    config: ProviderBuildConfig,
    api_key: SecretString,
    transport: Arc<dyn SseTransport>,
) -> Result<Arc<dyn VendorAdapter>, ProviderError> {
    use rprovider::adapters::qianfan::{QianFanAdapter, QianFanConfig};

    let raw = config.vendor_config.as_deref().ok_or_else(|| {
        ProviderError::configuration("qianfan requires a vendor config with an app_id")
    })?;
    let vendor = QianFanConfig::from_json(raw)?;

    let mut adapter = QianFanAdapter::new(api_key, vendor, transport)?;
    if let Some(base_url) = config.base_url {
        adapter = adapter.with_base_url(base_url);
    }
    Ok(Arc::new(adapter))
}

#[cfg(not(feature = "provider-qianfan"))]
fn build_qianfan_adapter(
    _config: ProviderBuildConfig,
    _api_key: SecretString,
    _transport: Arc<dyn SseTransport>,
) -> Result<Arc<dyn VendorAdapter>, ProviderError> {
    Err(ProviderError::configuration(
        "provider-qianfan feature is not enabled on chatrelay",
    ))
}
