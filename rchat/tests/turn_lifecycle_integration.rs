use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::StreamExt;
use rchat::{
    ChatEngine, ChatError, ChatErrorKind, ChatFuture, InMemoryTurnSink, OutwardEvent,
    StaticPriceTable, Turn, TurnSink, TurnState,
};
use rprovider::{
    AdapterRegistry, BoxedSegmentStream, CancellationToken, ChatRequest, Configuration,
    ConversationSegment, FinishReason, Message, ModelPrices, ProviderError, ProviderFuture,
    ProviderId, Role, ToolCallFragment, Usage, VecSegmentStream, VendorAdapter,
};
use rust_decimal::Decimal;

#[derive(Debug)]
struct ScriptedAdapter {
    segments: Mutex<Option<Vec<Result<ConversationSegment, ProviderError>>>>,
}

impl ScriptedAdapter {
    fn new(segments: Vec<ConversationSegment>) -> Self {
        Self {
            segments: Mutex::new(Some(segments.into_iter().map(Ok).collect())),
        }
    }
}

impl VendorAdapter for ScriptedAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn open_stream<'a>(
        &'a self,
        _request: ChatRequest,
        _cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<BoxedSegmentStream<'a>, ProviderError>> {
        Box::pin(async move {
            let segments = self
                .segments
                .lock()
                .expect("segments lock")
                .take()
                .unwrap_or_default();
            Ok(Box::pin(VecSegmentStream::new(segments)) as BoxedSegmentStream<'a>)
        })
    }
}

struct CloseFlag(Arc<AtomicBool>);

impl Drop for CloseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Emits a prompt count and one text delta, then waits forever.
#[derive(Debug, Default)]
struct StallingAdapter {
    closed: Arc<AtomicBool>,
}

impl VendorAdapter for StallingAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn open_stream<'a>(
        &'a self,
        _request: ChatRequest,
        _cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<BoxedSegmentStream<'a>, ProviderError>> {
        let closed = self.closed.clone();
        Box::pin(async move {
            let stream = async_stream::stream! {
                let _flag = CloseFlag(closed);
                yield Ok::<_, ProviderError>(ConversationSegment::usage_only(5, 0));
                yield Ok(ConversationSegment::text("Hel"));
                std::future::pending::<()>().await;
            };
            Ok(Box::pin(stream) as BoxedSegmentStream<'a>)
        })
    }
}

#[derive(Debug, Default)]
struct FailingSink {
    salvaged: Mutex<Vec<Turn>>,
}

impl TurnSink for FailingSink {
    fn commit<'a>(&'a self, _turn: &'a Turn) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async { Err(ChatError::protocol("database unavailable")) })
    }

    fn salvage_partial<'a>(&'a self, turn: &'a Turn) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.salvaged
                .lock()
                .expect("salvaged lock")
                .push(turn.clone());
            Ok(())
        })
    }
}

fn request(provider: ProviderId, model: &str) -> ChatRequest {
    ChatRequest::new(
        vec![Message::new(Role::User, "hi")],
        Configuration::new(provider, model),
    )
}

fn hello_segments() -> Vec<ConversationSegment> {
    vec![
        ConversationSegment::usage_only(10, 0),
        ConversationSegment::text("Hel"),
        ConversationSegment::text("lo")
            .with_usage(Usage::new(10, 2))
            .with_finish_reason(FinishReason::Stop),
    ]
}

fn engine_with(adapter: impl VendorAdapter + 'static, sink: Arc<dyn TurnSink>) -> ChatEngine {
    let mut adapters = AdapterRegistry::new();
    adapters.register(adapter);
    ChatEngine::new(adapters, sink)
}

#[tokio::test]
async fn hello_turn_streams_events_in_order_and_commits_once() {
    let sink = Arc::new(InMemoryTurnSink::new());
    let prices = StaticPriceTable::new().with_model(
        "gpt-x",
        ModelPrices::new(Decimal::from(2), Decimal::from(8)),
    );
    let engine = engine_with(ScriptedAdapter::new(hello_segments()), sink.clone())
        .with_price_table(Arc::new(prices));

    let events = engine
        .stream_turn(request(ProviderId::OpenAi, "gpt-x"), CancellationToken::new())
        .collect::<Vec<_>>()
        .await;

    assert_eq!(
        events.iter().map(OutwardEvent::kind).collect::<Vec<_>>(),
        vec![
            "start_response",
            "text_segment",
            "text_segment",
            "end_step",
            "end_turn"
        ]
    );
    assert!(matches!(
        events[0],
        OutwardEvent::StartResponse { input_tokens: 10, .. }
    ));

    let OutwardEvent::EndTurn { turn } = &events[4] else {
        panic!("expected end_turn");
    };
    assert_eq!(turn.text, "Hello");
    assert_eq!(turn.usage, Usage::new(10, 2));
    assert_eq!(turn.state, TurnState::Committed);
    let cost = turn.cost.expect("priced model");
    assert_eq!(cost.total(), Decimal::new(36, 6));

    let committed = sink.committed().expect("committed");
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].text, "Hello");
    assert!(sink.salvaged().expect("salvaged").is_empty());
}

#[tokio::test]
async fn cancellation_after_first_text_salvages_without_commit() {
    let sink = Arc::new(InMemoryTurnSink::new());
    let adapter = StallingAdapter::default();
    let closed = adapter.closed.clone();
    let engine = engine_with(adapter, sink.clone());
    let cancel = CancellationToken::new();

    let mut events = engine.stream_turn(request(ProviderId::Anthropic, "claude-x"), cancel.clone());
    let mut terminal = None;
    while let Some(event) = events.next().await {
        match event {
            OutwardEvent::TextSegment(_) => cancel.cancel(),
            event if event.is_terminal() => {
                terminal = Some(event);
                break;
            }
            _ => {}
        }
    }

    let Some(OutwardEvent::Error { error, partial }) = terminal else {
        panic!("expected error event");
    };
    assert_eq!(error.kind, ChatErrorKind::Cancelled);
    assert_eq!(partial.state, TurnState::Failed);
    assert_eq!(partial.text, "Hel");
    assert!(closed.load(Ordering::SeqCst), "vendor stream should be dropped");

    let salvaged = sink.salvaged().expect("salvaged");
    assert_eq!(salvaged.len(), 1);
    assert_eq!(salvaged[0].text, "Hel");
    assert!(sink.committed().expect("committed").is_empty());
}

#[tokio::test]
async fn failing_commit_fails_the_turn_with_store_error() {
    let sink = Arc::new(FailingSink::default());
    let engine = engine_with(ScriptedAdapter::new(hello_segments()), sink.clone());

    let failure = engine
        .run_turn(request(ProviderId::OpenAi, "gpt-x"), CancellationToken::new())
        .await
        .expect_err("commit failure should fail the turn");

    assert_eq!(failure.error.kind, ChatErrorKind::Store);
    assert_eq!(failure.partial.state, TurnState::Failed);
    assert_eq!(failure.partial.text, "Hello");
    assert_eq!(sink.salvaged.lock().expect("salvaged lock").len(), 1);
}

#[tokio::test]
async fn repeated_usage_reports_keep_the_last_value() {
    let sink = Arc::new(InMemoryTurnSink::new());
    let engine = engine_with(
        ScriptedAdapter::new(vec![
            ConversationSegment::usage_only(8, 0),
            ConversationSegment::text("a").with_usage(Usage::new(8, 1)),
            ConversationSegment::text("b").with_usage(Usage::new(9, 4)),
            ConversationSegment::default()
                .with_usage(Usage::new(11, 6).with_reasoning_tokens(2))
                .with_finish_reason(FinishReason::Stop),
        ]),
        sink,
    );

    let turn = engine
        .run_turn(request(ProviderId::OpenAi, "gpt-x"), CancellationToken::new())
        .await
        .expect("turn should commit");

    assert_eq!(turn.usage, Usage::new(11, 6).with_reasoning_tokens(2));
    assert!(turn.cost.is_none());
}

#[tokio::test]
async fn tool_call_turn_completes_tools_before_end_step() {
    let sink = Arc::new(InMemoryTurnSink::new());
    let engine = engine_with(
        ScriptedAdapter::new(vec![
            ConversationSegment::usage_only(4, 0),
            ConversationSegment::default()
                .with_tool_call(ToolCallFragment::first(0, "call_1", "weather", "{\"ci")),
            ConversationSegment::default()
                .with_tool_call(ToolCallFragment::continuation(0, "ty\":\"Oslo\"}"))
                .with_usage(Usage::new(4, 12))
                .with_finish_reason(FinishReason::ToolCalls),
        ]),
        sink,
    );

    let events = engine
        .stream_turn(request(ProviderId::OpenAi, "gpt-x"), CancellationToken::new())
        .collect::<Vec<_>>()
        .await;

    let completed = events
        .iter()
        .position(|event| matches!(event, OutwardEvent::ToolCompleted { .. }))
        .expect("tool completed");
    let end_step = events
        .iter()
        .position(|event| matches!(event, OutwardEvent::EndStep { .. }))
        .expect("end step");
    assert!(completed < end_step);
    assert_eq!(
        events[completed],
        OutwardEvent::ToolCompleted {
            index: 0,
            id: "call_1".into(),
            name: "weather".into(),
            arguments: "{\"city\":\"Oslo\"}".into(),
        }
    );

    let OutwardEvent::EndTurn { turn } = events.last().expect("terminal") else {
        panic!("expected end_turn");
    };
    assert_eq!(turn.tool_calls[0].arguments, "{\"city\":\"Oslo\"}");
    assert_eq!(turn.to_message().tool_calls.len(), 1);
}

#[tokio::test]
async fn stream_without_finish_reason_still_completes_tools_before_end_turn() {
    let sink = Arc::new(InMemoryTurnSink::new());
    let engine = engine_with(
        ScriptedAdapter::new(vec![
            ConversationSegment::usage_only(5, 0),
            ConversationSegment::default()
                .with_tool_call(ToolCallFragment::first(0, "call_a", "search", "{\"q\":1}")),
        ]),
        sink.clone(),
    );

    let events = engine
        .stream_turn(request(ProviderId::OpenAi, "gpt-x"), CancellationToken::new())
        .collect::<Vec<_>>()
        .await;

    assert_eq!(
        events.iter().map(OutwardEvent::kind).collect::<Vec<_>>(),
        vec![
            "start_response",
            "tool_call_invocation",
            "tool_progress",
            "tool_completed",
            "end_step",
            "end_turn",
        ]
    );
    assert_eq!(
        events[4],
        OutwardEvent::EndStep {
            finish_reason: None,
            usage: Usage::new(5, 0),
        }
    );

    let OutwardEvent::EndTurn { turn } = events.last().expect("terminal") else {
        panic!("expected end_turn");
    };
    assert_eq!(turn.state, TurnState::Committed);
    assert_eq!(turn.tool_calls[0].arguments, "{\"q\":1}");
    assert_eq!(sink.committed().expect("committed").len(), 1);
}
