//! Anthropic Messages API adapter over the shared SSE transport.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    ApiKeyHeaderPolicy, BoxedSegmentStream, ChatRequest, HttpRequest, PipelinePolicy,
    ProviderError, ProviderFuture, ProviderId, RequestPipeline, SecretString, SseTransport,
    StaticHeaderPolicy, VendorAdapter, estimate_prompt_tokens,
};

use super::decoder::EventDecoder;
use super::serde_api::{ANTHROPIC_VERSION, build_api_request};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

#[derive(Clone)]
pub struct AnthropicAdapter {
    base_url: String,
    pipeline: RequestPipeline,
    transport: Arc<dyn SseTransport>,
}

impl AnthropicAdapter {
    pub fn new(api_key: SecretString, transport: Arc<dyn SseTransport>) -> Result<Self, ProviderError> {
        let pipeline = RequestPipeline::new()
            .with_policy(ApiKeyHeaderPolicy::new("x-api-key", api_key)?)
            .with_policy(StaticHeaderPolicy::new("anthropic-version", ANTHROPIC_VERSION)?);

        Ok(Self::with_pipeline(pipeline, transport))
    }

    pub fn with_pipeline(pipeline: RequestPipeline, transport: Arc<dyn SseTransport>) -> Self {
        Self {
            base_url: ANTHROPIC_BASE_URL.to_string(),
            pipeline,
            transport,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_policy<P>(mut self, policy: P) -> Self
    where
        P: PipelinePolicy + 'static,
    {
        self.pipeline = self.pipeline.with_policy(policy);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    pub(crate) fn build_http_request(&self, request: &ChatRequest) -> Result<HttpRequest, ProviderError> {
        let body = build_api_request(request)?;
        let body = serde_json::to_value(body).map_err(|err| {
            ProviderError::configuration(format!("failed to encode request body: {err}"))
        })?;

        Ok(HttpRequest::post(
            format!("{}/messages", self.base_url.trim_end_matches('/')),
            self.pipeline.headers()?,
            body,
        ))
    }
}

impl std::fmt::Debug for AnthropicAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicAdapter")
            .field("base_url", &self.base_url)
            .field("policies", &self.pipeline.policy_names())
            .finish_non_exhaustive()
    }
}

impl VendorAdapter for AnthropicAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn open_stream<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<BoxedSegmentStream<'a>, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let input_estimate = estimate_prompt_tokens(&request.history);
            let http_request = self.build_http_request(&request)?;

            tracing::debug!(
                provider = %ProviderId::Anthropic,
                model = %request.config.model,
                url = %http_request.url,
                "opening messages stream"
            );

            let mut events = self
                .transport
                .open(ProviderId::Anthropic, http_request, cancel)
                .await?;
            let mut decoder = EventDecoder::new(input_estimate);
            let pipeline = &self.pipeline;

            let stream = try_stream! {
                yield decoder.first_segment();

                while let Some(event) = events.next().await {
                    let event = event?;
                    let payload = pipeline.rewrite(&event.data);
                    let payload = payload.trim();
                    if payload.is_empty() {
                        continue;
                    }

                    if let Some(segment) = decoder.decode(payload)? {
                        yield segment;
                    }
                    if decoder.is_stopped() {
                        break;
                    }
                }

                if let Some(terminal) = decoder.finish() {
                    yield terminal;
                }
            };

            Ok(Box::pin(stream) as BoxedSegmentStream<'a>)
        })
    }
}
