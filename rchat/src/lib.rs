//! Turn orchestration over normalized provider streams.
//!
//! A [`ChatEngine`] resolves the vendor adapter for a request, folds its
//! segment stream into a [`Turn`] with a [`TurnAggregator`], re-emits
//! [`OutwardEvent`]s, and hands the finished turn to a [`TurnSink`].

mod aggregator;
mod emitter;
mod error;
mod hooks;
mod pricing;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        ChatEngine, ChatError, ChatErrorKind, ChunkEncoder, EventEmitter, InMemoryTurnSink,
        OutwardEvent, OutwardEventStream, PriceTable, StaticPriceTable, Turn, TurnAggregator,
        TurnFailure, TurnLifecycleHooks, TurnSink, TurnState,
    };
    pub use rcommon::{MetadataMap, TurnId};
}

pub use aggregator::TurnAggregator;
pub use emitter::{
    ChatCompletionChunk, ChunkChoice, ChunkCompletionDetails, ChunkDelta, ChunkEncoder,
    ChunkFunction, ChunkImage, ChunkImageUrl, ChunkToolCall, ChunkUsage, DONE_FRAME,
    EventEmitter, sse_frame,
};
pub use error::{ChatError, ChatErrorKind};
pub use hooks::{NoopTurnLifecycleHooks, TurnLifecycleHooks};
pub use pricing::{PriceTable, StaticPriceTable};
pub use service::ChatEngine;
pub use store::{ChatFuture, InMemoryTurnSink, TurnSink};
pub use types::{OutwardEvent, OutwardEventStream, Turn, TurnFailure, TurnState};
pub use rcommon::{MetadataMap, TurnId};
