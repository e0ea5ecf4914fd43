#![cfg(feature = "provider-qianfan")]

use std::sync::{Arc, Mutex};

use futures_util::{StreamExt, stream};
use rprovider::adapters::qianfan::{QianFanAdapter, QianFanConfig};
use rprovider::{
    CancellationToken, ChatRequest, Configuration, FinishReason, HttpRequest, Message,
    ProviderError, ProviderFuture, ProviderId, Role, SecretString, SseEvent, SseEventStream,
    SseTransport, VendorAdapter,
};

#[derive(Debug, Default)]
struct ScriptedTransport {
    events: Mutex<Option<Vec<Result<SseEvent, ProviderError>>>>,
    captured: Mutex<Option<(ProviderId, HttpRequest)>>,
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

#[tokio::test]
async fn normal_finish_sentinel_does_not_end_the_turn() {
    let transport = Arc::new(ScriptedTransport {
        events: Mutex::new(Some(vec![
            Ok(SseEvent::data(
                r#"{"choices":[{"index":0,"delta":{"content":"你好"},"finish_reason":"normal"}]}"#,
            )),
            Ok(SseEvent::data(
                r#"{"choices":[{"index":0,"delta":{"content":"，世界"},"finish_reason":"normal"}]}"#,
            )),
            Ok(SseEvent::data(
                r#"{"choices":[{"index":0,"delta":{"content":""},"finish_reason":"stop"}],"usage":{"prompt_tokens":3,"completion_tokens":4}}"#,
            )),
            Ok(SseEvent::data("[DONE]")),
        ])),
        captured: Mutex::new(None),
    });
    let adapter = QianFanAdapter::new(
        SecretString::new("bce-v3/key"),
        QianFanConfig::new("app-42"),
        transport.clone(),
    )
    .expect("adapter should build");

    let request = ChatRequest::new(
        vec![Message::new(Role::User, "say hello")],
        Configuration::new(ProviderId::QianFan, "ernie-4.0-8k").with_web_search(true),
    );
    let segments = adapter
        .open_stream(request, CancellationToken::new())
        .await
        .expect("stream should open")
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .expect("segments should decode");

    let text = segments
        .iter()
        .map(|segment| segment.text.as_str())
        .collect::<String>();
    assert_eq!(text, "你好，世界");
    assert_eq!(
        segments.iter().filter(|segment| segment.is_terminal()).count(),
        1
    );
    let terminal = segments.last().expect("terminal");
    assert_eq!(terminal.finish_reason, Some(FinishReason::Stop));
    assert_eq!((terminal.input_tokens, terminal.output_tokens), (3, 4));

    let (provider, http) = transport
        .captured
        .lock()
        .expect("capture lock")
        .clone()
        .expect("request captured");
    assert_eq!(provider, ProviderId::QianFan);
    assert_eq!(http.url, "https://qianfan.baidubce.com/v2/chat/completions");
    assert_eq!(
        http.headers.get("appid").map(|value| value.as_bytes()),
        Some(&b"app-42"[..])
    );
    assert_eq!(http.body["web_search"]["enable"], true);
    assert!(http.body.get("web_search_options").is_none());
}
