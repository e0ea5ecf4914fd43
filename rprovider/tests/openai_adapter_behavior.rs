#![cfg(feature = "provider-openai")]

use std::sync::{Arc, Mutex};

use futures_util::{StreamExt, stream};
use rprovider::adapters::openai::OpenAiCompatibleAdapter;
use rprovider::{
    CancellationToken, ChatRequest, Configuration, ConversationSegment, FinishReason,
    HttpRequest, Message, ProviderError, ProviderErrorKind, ProviderFuture, ProviderId, Role,
    SecretString, SseEvent, SseEventStream, SseTransport, VendorAdapter, estimate_prompt_tokens,
};

#[derive(Debug, Default)]
struct ScriptedTransport {
    events: Mutex<Option<Vec<Result<SseEvent, ProviderError>>>>,
    open_error: Mutex<Option<ProviderError>>,
    captured: Mutex<Option<(ProviderId, HttpRequest)>>,
}

impl ScriptedTransport {
    fn with_data(lines: &[&str]) -> Arc<Self> {
        let events = lines.iter().map(|line| Ok(SseEvent::data(*line))).collect();
        Arc::new(Self {
            events: Mutex::new(Some(events)),
            ..Self::default()
        })
    }

    fn failing(error: ProviderError) -> Arc<Self> {
        Arc::new(Self {
            open_error: Mutex::new(Some(error)),
            ..Self::default()
        })
    }

    fn captured(&self) -> (ProviderId, HttpRequest) {
        self.captured
            .lock()
            .expect("capture lock")
            .clone()
            .expect("request should be captured")
    }
}

impl SseTransport for ScriptedTransport {
    fn open<'a>(
        &'a self,
        provider: ProviderId,
        request: HttpRequest,
        _cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<SseEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            *self.captured.lock().expect("capture lock") = Some((provider, request));
            if let Some(error) = self.open_error.lock().expect("error lock").take() {
                return Err(error);
            }

            let events = self
                .events
                .lock()
                .expect("events lock")
                .take()
                .unwrap_or_default();
            Ok(Box::pin(stream::iter(events)) as SseEventStream<'a>)
        })
    }
}

fn hi_request(model: &str) -> ChatRequest {
    ChatRequest::new(
        vec![Message::new(Role::User, "hi")],
        Configuration::new(ProviderId::OpenAi, model),
    )
}

async fn collect(
    adapter: &OpenAiCompatibleAdapter,
    request: ChatRequest,
) -> Vec<Result<ConversationSegment, ProviderError>> {
    let stream = adapter
        .open_stream(request, CancellationToken::new())
        .await
        .expect("stream should open");
    stream.collect().await
}

#[tokio::test]
async fn stream_emits_usage_first_and_finish_last() {
    let transport = ScriptedTransport::with_data(&[
        r#"{"id":"c1","choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#,
        r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"Hel"}}]}"#,
        r#"{"id":"c1","choices":[{"index":0,"delta":{"content":"lo"},"finish_reason":"stop"}]}"#,
        r#"{"id":"c1","choices":[],"usage":{"prompt_tokens":10,"completion_tokens":2,"total_tokens":12}}"#,
        "[DONE]",
    ]);
    let adapter = OpenAiCompatibleAdapter::openai(SecretString::new("sk-live"), transport.clone());

    let segments = collect(&adapter, hi_request("gpt-4o-mini"))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("segments should decode");

    assert_eq!(segments.len(), 3);
    let first = &segments[0];
    assert_eq!(first.output_tokens, 0);
    assert_eq!(
        first.input_tokens,
        estimate_prompt_tokens(&[Message::new(Role::User, "hi")])
    );
    assert!(!first.has_content());

    assert_eq!(segments[1].text, "Hel");
    let last = segments.last().expect("terminal segment");
    assert_eq!(last.text, "lo");
    assert_eq!(last.finish_reason, Some(FinishReason::Stop));
    assert_eq!((last.input_tokens, last.output_tokens), (10, 2));

    let (provider, request) = transport.captured();
    assert_eq!(provider, ProviderId::OpenAi);
    assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
    assert_eq!(request.body["model"], "gpt-4o-mini");
    assert_eq!(request.body["messages"][0]["content"], "hi");
    assert_eq!(
        request
            .headers
            .get("authorization")
            .map(|value| value.as_bytes()),
        Some(&b"Bearer sk-live"[..])
    );
}

#[tokio::test]
async fn fragmented_tool_arguments_reassemble_per_index() {
    let transport = ScriptedTransport::with_data(&[
        r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","type":"function","function":{"name":"search","arguments":""}},{"index":1,"id":"call_b","type":"function","function":{"name":"fetch","arguments":"{\"u"}}]}}]}"#,
        r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"q\":"}}]}}]}"#,
        r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"function":{"arguments":"rl\":\"x\"}"}}]}}]}"#,
        r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"rust\"}"}}]},"finish_reason":"tool_calls"}]}"#,
        "[DONE]",
    ]);
    let adapter = OpenAiCompatibleAdapter::openai(SecretString::new("sk-live"), transport);

    let segments = collect(&adapter, hi_request("gpt-4o"))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("segments should decode");

    let mut arguments = [String::new(), String::new()];
    let mut introductions = 0;
    for fragment in segments.iter().flat_map(|segment| &segment.tool_calls) {
        if fragment.introduces_call() {
            introductions += 1;
        }
        arguments[fragment.index as usize].push_str(&fragment.arguments_chunk);
    }

    assert_eq!(introductions, 2);
    assert_eq!(arguments[0], r#"{"q":"rust"}"#);
    assert_eq!(arguments[1], r#"{"url":"x"}"#);
    assert_eq!(
        segments.last().and_then(|segment| segment.finish_reason.clone()),
        Some(FinishReason::ToolCalls)
    );
}

#[tokio::test]
async fn stream_without_finish_reason_ends_at_done() {
    let transport = ScriptedTransport::with_data(&[
        r#"{"choices":[{"delta":{"content":"partial"}}]}"#,
        "[DONE]",
        r#"{"choices":[{"delta":{"content":"ignored"}}]}"#,
    ]);
    let adapter = OpenAiCompatibleAdapter::openai(SecretString::new("sk-live"), transport);

    let segments = collect(&adapter, hi_request("gpt-4o")).await;
    assert_eq!(segments.len(), 2);
    let last = segments[1].as_ref().expect("text segment");
    assert_eq!(last.text, "partial");
    assert!(last.finish_reason.is_none());
}

#[tokio::test]
async fn length_finish_flows_trailing_text() {
    let transport = ScriptedTransport::with_data(&[
        r#"{"choices":[{"index":0,"delta":{"content":"Hel"}}]}"#,
        r#"{"choices":[{"index":0,"delta":{"content":"lo wor"},"finish_reason":"length"}]}"#,
        r#"{"choices":[{"index":0,"delta":{"content":"IGNORED"}}]}"#,
        "[DONE]",
    ]);
    let adapter = OpenAiCompatibleAdapter::openai(SecretString::new("sk-live"), transport);

    let segments = collect(&adapter, hi_request("gpt-4o"))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("segments should decode");

    let text = segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<String>();
    assert_eq!(text, "Hello wor");

    let last = segments.last().expect("terminal segment");
    assert_eq!(last.text, "lo wor");
    assert_eq!(last.finish_reason, Some(FinishReason::Length));
    assert_eq!(
        segments.iter().filter(|segment| segment.is_terminal()).count(),
        1
    );
}

#[tokio::test]
async fn malformed_chunk_surfaces_protocol_error_with_detail() {
    let transport = ScriptedTransport::with_data(&[
        r#"{"choices":[{"delta":{"content":"ok"}}]}"#,
        "<html>gateway</html>",
    ]);
    let adapter = OpenAiCompatibleAdapter::openai(SecretString::new("sk-live"), transport);

    let segments = collect(&adapter, hi_request("gpt-4o")).await;
    let error = segments
        .last()
        .expect("error item")
        .as_ref()
        .expect_err("last item should be an error");

    assert_eq!(error.kind, ProviderErrorKind::Protocol);
    assert_eq!(error.detail.as_deref(), Some("<html>gateway</html>"));
}

#[tokio::test]
async fn transport_errors_propagate_from_open() {
    let transport = ScriptedTransport::failing(ProviderError::rate_limited("too many requests"));
    let adapter = OpenAiCompatibleAdapter::openai(SecretString::new("sk-live"), transport);

    let error = adapter
        .open_stream(hi_request("gpt-4o"), CancellationToken::new())
        .await
        .err()
        .expect("open should fail");

    assert_eq!(error.kind, ProviderErrorKind::RateLimited);
    assert!(error.retryable);
}

#[tokio::test]
async fn invalid_configuration_fails_before_transport() {
    let transport = ScriptedTransport::with_data(&[]);
    let adapter = OpenAiCompatibleAdapter::openai(SecretString::new("sk-live"), transport.clone());
    let request = ChatRequest::new(
        vec![Message::new(Role::User, "hi")],
        Configuration::new(ProviderId::OpenAi, "gpt-4o").with_max_tokens(0),
    );

    let error = adapter
        .open_stream(request, CancellationToken::new())
        .await
        .err()
        .expect("open should fail");

    assert_eq!(error.kind, ProviderErrorKind::Configuration);
    assert!(transport.captured.lock().expect("capture lock").is_none());
}

#[tokio::test]
async fn deepseek_reasoning_content_streams_as_reasoning() {
    let transport = ScriptedTransport::with_data(&[
        r#"{"choices":[{"delta":{"reasoning_content":"Let me think."}}]}"#,
        r#"{"choices":[{"delta":{"content":"42"},"finish_reason":"stop"}],"usage":{"prompt_tokens":8,"completion_tokens":9,"completion_tokens_details":{"reasoning_tokens":6}}}"#,
        "[DONE]",
    ]);
    let adapter = OpenAiCompatibleAdapter::deepseek(SecretString::new("sk-ds"), transport.clone());
    let request = ChatRequest::new(
        vec![Message::new(Role::User, "meaning of life?")],
        Configuration::new(ProviderId::DeepSeek, "deepseek-reasoner"),
    );

    let segments = collect(&adapter, request)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("segments should decode");

    assert_eq!(segments[1].reasoning.as_deref(), Some("Let me think."));
    let last = segments.last().expect("terminal");
    assert_eq!(last.text, "42");
    assert_eq!(last.reasoning_tokens, 6);
    assert_eq!(
        transport.captured().1.url,
        "https://api.deepseek.com/v1/chat/completions"
    );
}
