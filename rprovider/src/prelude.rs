//! Common `rprovider` imports for downstream crates.

pub use crate::{
    AdapterRegistry, BoxedSegmentStream, CancellationToken, ChatRequest, Configuration,
    ConversationSegment, Cost, FinishReason, ImagePayload, ImageSegment, Message, ModelPrices,
    NoopOperationHooks, ProviderError, ProviderErrorKind, ProviderId, ProviderOperationHooks,
    RequestPipeline, RetryPolicy, Role, SecretString, ToolCall, ToolCallFragment,
    ToolDefinition, Usage, VendorAdapter,
};
pub use rcommon::{BoxFuture, MetadataMap, ReasoningEffort};
