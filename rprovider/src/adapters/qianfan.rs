//! Baidu QianFan v2 adapter.
//!
//! QianFan speaks the Chat Completions dialect with two quirks: an `appid`
//! header next to the bearer key, and `"finish_reason":"normal"` on ordinary
//! mid-stream chunks. The sentinel is rewritten to `null` before parsing.

use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::adapters::openai::{OpenAiCompatibleAdapter, WebSearchStyle};
use crate::{
    BearerAuthPolicy, BoxedSegmentStream, ChatRequest, ProviderError, ProviderFuture,
    ProviderId, ReplaceTextPolicy, RequestPipeline, SecretString, SseTransport,
    StaticHeaderPolicy, VendorAdapter,
};

pub const QIANFAN_BASE_URL: &str = "https://qianfan.baidubce.com/v2";

/// Vendor settings supplied as JSON, e.g. `{"app_id": "app-xxxx"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QianFanConfig {
    pub app_id: String,
}

impl QianFanConfig {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ProviderError> {
        let config = serde_json::from_str::<Self>(raw).map_err(|err| {
            ProviderError::configuration(format!("invalid qianfan vendor config: {err}"))
        })?;

        if config.app_id.trim().is_empty() {
            return Err(ProviderError::configuration(
                "qianfan vendor config requires a non-empty app_id",
            ));
        }

        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct QianFanAdapter {
    inner: OpenAiCompatibleAdapter,
}

impl QianFanAdapter {
    pub fn new(
        api_key: SecretString,
        config: QianFanConfig,
        transport: Arc<dyn SseTransport>,
    ) -> Result<Self, ProviderError> {
        let pipeline = RequestPipeline::new()
            .with_policy(BearerAuthPolicy::new(api_key))
            .with_policy(StaticHeaderPolicy::new("appid", config.app_id.trim())?)
            .with_policy(ReplaceTextPolicy::qianfan_normal_finish());

        let inner = OpenAiCompatibleAdapter::new(
            ProviderId::QianFan,
            QIANFAN_BASE_URL,
            pipeline,
            transport,
        )
        .with_web_search_style(WebSearchStyle::EnableFlag);

        Ok(Self { inner })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner = self.inner.with_base_url(base_url);
        self
    }

    pub fn base_url(&self) -> &str {
        self.inner.base_url()
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        self.inner.pipeline()
    }
}

impl VendorAdapter for QianFanAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::QianFan
    }

    fn open_stream<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<BoxedSegmentStream<'a>, ProviderError>> {
        self.inner.open_stream(request, cancel)
    }
}
