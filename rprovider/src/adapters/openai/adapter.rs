//! OpenAI-compatible adapter over the shared SSE transport.

use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    BearerAuthPolicy, BoxedSegmentStream, ChatRequest, HttpRequest, PipelinePolicy,
    ProviderError, ProviderFuture, ProviderId, RequestPipeline, SecretString, SseTransport,
    VendorAdapter, estimate_prompt_tokens,
};

use super::decoder::ChunkDecoder;
use super::serde_api::{TokenParameter, WebSearchStyle, build_api_request};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

#[derive(Clone)]
pub struct OpenAiCompatibleAdapter {
    id: ProviderId,
    base_url: String,
    pipeline: RequestPipeline,
    transport: Arc<dyn SseTransport>,
    web_search: WebSearchStyle,
    token_parameter: Option<TokenParameter>,
}

impl OpenAiCompatibleAdapter {
    pub fn new(
        id: ProviderId,
        base_url: impl Into<String>,
        pipeline: RequestPipeline,
        transport: Arc<dyn SseTransport>,
    ) -> Self {
        let web_search = match id {
            ProviderId::OpenAi => WebSearchStyle::SearchOptions,
            ProviderId::QianFan => WebSearchStyle::EnableFlag,
            ProviderId::DeepSeek | ProviderId::Anthropic => WebSearchStyle::Unsupported,
        };

        Self {
            id,
            base_url: base_url.into(),
            pipeline,
            transport,
            web_search,
            token_parameter: None,
        }
    }

    pub fn openai(api_key: SecretString, transport: Arc<dyn SseTransport>) -> Self {
        Self::new(
            ProviderId::OpenAi,
            OPENAI_BASE_URL,
            RequestPipeline::new().with_policy(BearerAuthPolicy::new(api_key)),
            transport,
        )
    }

    /// DeepSeek streams chain-of-thought in `delta.reasoning_content`.
    pub fn deepseek(api_key: SecretString, transport: Arc<dyn SseTransport>) -> Self {
        Self::new(
            ProviderId::DeepSeek,
            DEEPSEEK_BASE_URL,
            RequestPipeline::new().with_policy(BearerAuthPolicy::new(api_key)),
            transport,
        )
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

    pub fn with_web_search_style(mut self, style: WebSearchStyle) -> Self {
        self.web_search = style;
        self
    }

    /// Pins the token limit field instead of choosing it from the model name.
    pub fn with_token_parameter(mut self, parameter: TokenParameter) -> Self {
        self.token_parameter = Some(parameter);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    pub fn web_search_style(&self) -> WebSearchStyle {
        self.web_search
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub(crate) fn build_http_request(&self, request: &ChatRequest) -> Result<HttpRequest, ProviderError> {
        let token_parameter = self
            .token_parameter
            .unwrap_or_else(|| TokenParameter::for_model(&request.config.model));
        let body = build_api_request(self.id, request, token_parameter, self.web_search)?;
        let body = serde_json::to_value(body).map_err(|err| {
            ProviderError::configuration(format!("failed to encode request body: {err}"))
        })?;

        Ok(HttpRequest::post(
            self.endpoint("chat/completions"),
            self.pipeline.headers()?,
            body,
        ))
    }
}

impl std::fmt::Debug for OpenAiCompatibleAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleAdapter")
            .field("id", &self.id)
            .field("base_url", &self.base_url)
            .field("policies", &self.pipeline.policy_names())
            .field("web_search", &self.web_search)
            .finish_non_exhaustive()
    }
}

impl VendorAdapter for OpenAiCompatibleAdapter {
    fn id(&self) -> ProviderId {
        self.id
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
                provider = %self.id,
                model = %request.config.model,
                url = %http_request.url,
                "opening chat completion stream"
            );

            let mut events = self.transport.open(self.id, http_request, cancel).await?;
            let mut decoder = ChunkDecoder::new(self.id, input_estimate);
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
                    if payload == "[DONE]" {
                        break;
                    }

                    for segment in decoder.decode(payload)? {
                        yield segment;
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
