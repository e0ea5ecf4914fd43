//! Provider-normalized streaming primitives.
//!
//! Vendor adapters turn an upstream SSE response into one canonical sequence of
//! [`ConversationSegment`] values, regardless of the wire dialect.
//!
//! ```rust
//! use rprovider::{ConversationSegment, FinishReason, Usage};
//!
//! let segment = ConversationSegment::text("Hello")
//!     .with_usage(Usage::new(10, 2))
//!     .with_finish_reason(FinishReason::Stop);
//!
//! assert!(segment.is_terminal());
//! assert_eq!(segment.usage().total(), 12);
//! ```

pub mod accounting;
pub mod adapters;
pub mod credentials;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod prelude;
pub mod provider;
pub mod registry;
#[cfg(feature = "transport-reqwest")]
pub mod reqwest_transport;
pub mod resilience;
pub mod segment;
pub mod sse;
pub mod stream;
pub mod transport;

pub use accounting::{
    Cost, ModelPrices, TokenCounter, compute_cost, estimate_output_tokens, estimate_prompt_tokens,
};
pub use credentials::{SecretString, validate_api_key};
pub use error::{MAX_ERROR_DETAIL_BYTES, ProviderError, ProviderErrorKind};
pub use model::{
    ChatRequest, Configuration, ConfigurationBuilder, Message, ProviderId, Role, ToolCall,
    ToolDefinition, Usage,
};
pub use pipeline::{
    ApiKeyHeaderPolicy, BearerAuthPolicy, PipelinePolicy, ReplaceTextPolicy, RequestPipeline,
    StaticHeaderPolicy,
};
pub use provider::{ProviderFuture, VendorAdapter};
pub use registry::AdapterRegistry;
pub use resilience::{
    NoopOperationHooks, ProviderOperationHooks, RetryPolicy, execute_with_retry,
};
pub use segment::{ConversationSegment, FinishReason, ImagePayload, ImageSegment, ToolCallFragment};
pub use sse::{SseDecoder, SseEvent};
pub use stream::{BoxedSegmentStream, SegmentStream, VecSegmentStream};
#[cfg(feature = "transport-reqwest")]
pub use reqwest_transport::ReqwestTransport;
pub use transport::{HttpRequest, SseEventStream, SseTransport, status_error};

pub use rcommon::{GenerationOptions, ImageSize, MetadataMap, ReasoningEffort};
pub use tokio_util::sync::CancellationToken;
