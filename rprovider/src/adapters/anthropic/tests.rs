//! Focused unit tests for Anthropic adapter internals.

#![cfg(test)]

use std::sync::Arc;

use rcommon::ReasoningEffort;
use tokio_util::sync::CancellationToken;

use crate::{
    ChatRequest, Configuration, FinishReason, HttpRequest, Message, ProviderError,
    ProviderErrorKind, ProviderFuture, ProviderId, Role, SecretString, SseEventStream,
    SseTransport, ToolCall, ToolDefinition,
};

use super::adapter::AnthropicAdapter;
use super::decoder::{EventDecoder, map_stop_reason};

#[derive(Debug)]
struct NoopTransport;

impl SseTransport for NoopTransport {
    fn open<'a>(
        &'a self,
        _provider: ProviderId,
        _request: HttpRequest,
        _cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<SseEventStream<'a>, ProviderError>> {
        Box::pin(async { Err(ProviderError::protocol("not used")) })
    }
}

fn adapter() -> AnthropicAdapter {
    AnthropicAdapter::new(SecretString::new("sk-ant-test"), Arc::new(NoopTransport))
        .expect("adapter should build")
}

#[test]
fn system_messages_are_lifted_and_headers_applied() {
    let history = vec![
        Message::new(Role::System, "Be terse."),
        Message::new(Role::User, "hi"),
    ];
    let config = Configuration::new(ProviderId::Anthropic, "claude-sonnet-4").with_temperature(0.4);

    let built = adapter()
        .build_http_request(&ChatRequest::new(history, config))
        .expect("request should build");

    assert_eq!(built.url, "https://api.anthropic.com/v1/messages");
    assert_eq!(built.body["system"], "Be terse.");
    assert_eq!(built.body["messages"].as_array().map(Vec::len), Some(1));
    assert_eq!(built.body["messages"][0]["content"][0]["text"], "hi");
    assert_eq!(built.body["max_tokens"], 8192);
    assert_eq!(built.body["temperature"], 0.4_f32 as f64);
    assert_eq!(
        built.headers.get("anthropic-version").map(|v| v.as_bytes()),
        Some(&b"2023-06-01"[..])
    );
    assert!(built.headers.contains_key("x-api-key"));
}

#[test]
fn reasoning_effort_enables_thinking_and_drops_temperature() {
    let config = Configuration::new(ProviderId::Anthropic, "claude-sonnet-4")
        .with_temperature(0.7)
        .with_max_tokens(2048)
        .with_reasoning_effort(ReasoningEffort::Medium);
    let built = adapter()
        .build_http_request(&ChatRequest::new(vec![Message::new(Role::User, "why?")], config))
        .expect("request should build");

    assert_eq!(built.body["thinking"]["type"], "enabled");
    assert_eq!(built.body["thinking"]["budget_tokens"], 4096);
    assert!(built.body.get("temperature").is_none());
    assert_eq!(built.body["max_tokens"], 4096 + 1024);
}

#[test]
fn tools_web_search_and_tool_history_are_encoded() {
    let history = vec![
        Message::new(Role::User, "weather?"),
        Message::assistant_with_tool_calls(
            "checking",
            vec![ToolCall {
                id: "toolu_1".into(),
                name: "weather".into(),
                arguments: r#"{"city":"Oslo"}"#.into(),
            }],
        ),
        Message::tool_result("toolu_1", "cold"),
    ];
    let config = Configuration::new(ProviderId::Anthropic, "claude-sonnet-4")
        .with_web_search(true)
        .with_tools(vec![ToolDefinition::new(
            "weather",
            "Weather lookup",
            r#"{"type":"object"}"#,
        )]);

    let built = adapter()
        .build_http_request(&ChatRequest::new(history, config))
        .expect("request should build");

    let tools = built.body["tools"].as_array().expect("tools");
    assert_eq!(tools[0]["name"], "weather");
    assert_eq!(tools[0]["input_schema"]["type"], "object");
    assert_eq!(tools[1]["type"], "web_search_20250305");

    let messages = built.body["messages"].as_array().expect("messages");
    assert_eq!(messages[1]["content"][1]["type"], "tool_use");
    assert_eq!(messages[1]["content"][1]["input"]["city"], "Oslo");
    assert_eq!(messages[2]["role"], "user");
    assert_eq!(messages[2]["content"][0]["type"], "tool_result");
    assert_eq!(messages[2]["content"][0]["tool_use_id"], "toolu_1");
}

#[test]
fn stop_reasons_map_to_canonical_values() {
    assert_eq!(map_stop_reason("end_turn"), FinishReason::Stop);
    assert_eq!(map_stop_reason("stop_sequence"), FinishReason::Stop);
    assert_eq!(map_stop_reason("max_tokens"), FinishReason::Length);
    assert_eq!(map_stop_reason("tool_use"), FinishReason::ToolCalls);
    assert_eq!(map_stop_reason("refusal"), FinishReason::ContentFilter);
    assert_eq!(
        map_stop_reason("pause_turn"),
        FinishReason::Other("pause_turn".into())
    );
}

#[test]
fn decoder_folds_a_full_event_sequence() {
    let mut decoder = EventDecoder::new(5);
    assert_eq!(decoder.first_segment().input_tokens, 5);

    let start = decoder
        .decode(r#"{"type":"message_start","message":{"id":"msg_1","usage":{"input_tokens":25,"output_tokens":1}}}"#)
        .expect("event decodes")
        .expect("usage segment");
    assert_eq!((start.input_tokens, start.output_tokens), (25, 0));

    decoder
        .decode(r#"{"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":""}}"#)
        .expect("event decodes");
    let thinking = decoder
        .decode(r#"{"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"hmm"}}"#)
        .expect("event decodes")
        .expect("reasoning segment");
    assert_eq!(thinking.reasoning.as_deref(), Some("hmm"));

    assert!(
        decoder
            .decode(r#"{"type":"content_block_delta","index":0,"delta":{"type":"signature_delta","signature":"abc"}}"#)
            .expect("event decodes")
            .is_none()
    );

    decoder
        .decode(r#"{"type":"content_block_start","index":1,"content_block":{"type":"text","text":""}}"#)
        .expect("event decodes");
    let text = decoder
        .decode(r#"{"type":"content_block_delta","index":1,"delta":{"type":"text_delta","text":"Hi"}}"#)
        .expect("event decodes")
        .expect("text segment");
    assert_eq!(text.text, "Hi");

    let tool = decoder
        .decode(r#"{"type":"content_block_start","index":2,"content_block":{"type":"tool_use","id":"toolu_9","name":"lookup","input":{}}}"#)
        .expect("event decodes")
        .expect("tool segment");
    assert_eq!(tool.tool_calls[0].index, 0);
    assert_eq!(tool.tool_calls[0].id.as_deref(), Some("toolu_9"));
    assert_eq!(tool.tool_calls[0].arguments_chunk, "");

    let args = decoder
        .decode(r#"{"type":"content_block_delta","index":2,"delta":{"type":"input_json_delta","partial_json":"{\"q\":1}"}}"#)
        .expect("event decodes")
        .expect("args segment");
    assert_eq!(args.tool_calls[0].arguments_chunk, "{\"q\":1}");
    assert!(!args.tool_calls[0].introduces_call());

    assert!(
        decoder
            .decode(r#"{"type":"message_delta","delta":{"stop_reason":"tool_use"},"usage":{"output_tokens":42}}"#)
            .expect("event decodes")
            .is_none()
    );
    assert!(
        decoder
            .decode(r#"{"type":"content_block_delta","index":1,"delta":{"type":"text_delta","text":"late"}}"#)
            .expect("event decodes")
            .is_none()
    );
    decoder
        .decode(r#"{"type":"message_stop"}"#)
        .expect("event decodes");
    assert!(decoder.is_stopped());

    let terminal = decoder.finish().expect("terminal segment");
    assert_eq!(terminal.finish_reason, Some(FinishReason::ToolCalls));
    assert_eq!((terminal.input_tokens, terminal.output_tokens), (25, 42));
    assert!(!terminal.has_content());
}

#[test]
fn decoder_maps_error_events() {
    let mut decoder = EventDecoder::new(1);
    let overloaded = decoder
        .decode(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
        .expect_err("error event");
    assert_eq!(overloaded.kind, ProviderErrorKind::Transient);
    assert!(overloaded.detail.is_some());

    let throttled = decoder
        .decode(r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow"}}"#)
        .expect_err("error event");
    assert_eq!(throttled.kind, ProviderErrorKind::RateLimited);

    let invalid = decoder
        .decode(r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#)
        .expect_err("error event");
    assert_eq!(invalid.kind, ProviderErrorKind::Protocol);
}

#[test]
fn unknown_events_and_ping_are_ignored() {
    let mut decoder = EventDecoder::new(1);
    assert!(decoder.decode(r#"{"type":"ping"}"#).expect("ping").is_none());
    assert!(
        decoder
            .decode(r#"{"type":"brand_new_event","data":1}"#)
            .expect("unknown")
            .is_none()
    );
}
