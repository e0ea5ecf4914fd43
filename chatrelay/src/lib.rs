//! Unified facade over the chatrelay workspace crates.
//!
//! This crate is designed to be the single dependency for most applications.
//! It re-exports the provider, chat, and observability crates and adds
//! convenience builders and macros for common setup flows.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chatrelay::prelude::*;
//!
//! # fn main() -> Result<(), ProviderError> {
//! let adapters = build_registry([ProviderBuildConfig::new(ProviderId::OpenAi, "sk-...")])?;
//! let engine = ChatEngine::new(adapters, Arc::new(InMemoryTurnSink::new()));
//!
//! let request = chat_request(
//!     cr_messages![user => "Hello"],
//!     cr_config!(openai, "gpt-4o-mini", max_tokens = 256),
//! );
//! let _events = engine.stream_turn(request, CancellationToken::new());
//! # Ok(())
//! # }
//! ```

mod macros;

pub mod prelude;
pub mod providers;
pub mod util;

pub use rchat;
pub use rcommon;
pub use robserve;
pub use rprovider;

pub use rchat::{
    ChatCompletionChunk, ChatEngine, ChatError, ChatErrorKind, ChunkEncoder, DONE_FRAME,
    EventEmitter, InMemoryTurnSink, NoopTurnLifecycleHooks, OutwardEvent, OutwardEventStream,
    PriceTable, StaticPriceTable, Turn, TurnAggregator, TurnFailure, TurnLifecycleHooks,
    TurnSink, TurnState, sse_frame,
};
pub use rcommon::{
    BoxFuture, GenerationOptions, ImageSize, MetadataMap, ReasoningEffort, TurnId,
};
pub use robserve::{
    MetricsObservabilityHooks, SafeProviderHooks, SafeTurnHooks, TracingObservabilityHooks,
};
pub use rprovider::{
    AdapterRegistry, BoxedSegmentStream, CancellationToken, ChatRequest, Configuration,
    ConfigurationBuilder, ConversationSegment, Cost, FinishReason, ImagePayload, Message,
    ModelPrices, NoopOperationHooks, ProviderError, ProviderErrorKind, ProviderFuture, ProviderId,
    ProviderOperationHooks, RetryPolicy, Role, SecretString, SseTransport,
    ToolCall, ToolDefinition, Usage, VendorAdapter, validate_api_key,
};

#[cfg(feature = "transport-reqwest")]
pub use providers::{build_adapter_from_api_key, build_adapter_with_config, build_registry};
pub use providers::{ProviderBuildConfig, build_adapter_with_transport};
#[cfg(feature = "transport-reqwest")]
pub use rprovider::ReqwestTransport;
pub use util::{
    assistant_message, assistant_tool_calls, chat_request, configuration, parse_provider_id,
    system_message, tool_message, user_message,
};

#[cfg(test)]
mod tests {
    use crate::{ProviderId, ReasoningEffort, Role};

    #[test]
    fn cr_msg_macro_creates_expected_message() {
        let message = crate::cr_msg!(user => "hello");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.content, "hello");

        let tool = crate::cr_msg!(tool("call_1") => "42");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn cr_messages_macro_builds_message_vector() {
        let messages = crate::cr_messages![
            system => "You are concise.",
            user => "Summarize the repo",
        ];

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn cr_config_macro_supports_provider_shorthand_and_options() {
        let config = crate::cr_config!(
            qianfan,
            "ernie-4.5",
            temperature = 0.2,
            reasoning_effort = ReasoningEffort::High,
            web_search = true,
        );

        assert_eq!(config.provider, ProviderId::QianFan);
        assert_eq!(config.model, "ernie-4.5");
        assert_eq!(config.options.temperature, Some(0.2));
        assert_eq!(config.options.reasoning_effort, Some(ReasoningEffort::High));
        assert!(config.options.web_search);

        let explicit = crate::cr_config!(ProviderId::DeepSeek, "deepseek-chat");
        assert_eq!(explicit.provider, ProviderId::DeepSeek);
        assert_eq!(explicit.options.max_tokens, None);
    }
}
