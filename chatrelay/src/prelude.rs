//! Common imports for most chatrelay applications.

pub use crate::{
    assistant_message, assistant_tool_calls, chat_request, configuration, parse_provider_id,
    system_message, tool_message, user_message,
};
pub use crate::{ProviderBuildConfig, build_adapter_with_transport};
#[cfg(feature = "transport-reqwest")]
pub use crate::{build_adapter_from_api_key, build_adapter_with_config, build_registry};
pub use crate::{cr_config, cr_messages, cr_msg};
pub use crate::{
    AdapterRegistry, BoxFuture, CancellationToken, ChatEngine, ChatError, ChatErrorKind,
    ChatRequest, Configuration, ConversationSegment, FinishReason, InMemoryTurnSink, Message,
    OutwardEvent, OutwardEventStream, PriceTable, ProviderError, ProviderErrorKind, ProviderId,
    Role, StaticPriceTable, ToolCall, ToolDefinition, Turn, TurnFailure, TurnId,
    TurnLifecycleHooks, TurnSink, TurnState, Usage, VendorAdapter,
};
