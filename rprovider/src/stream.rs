//! Segment stream contracts and in-memory stream utilities.
//!
//! ```rust
//! use rprovider::{BoxedSegmentStream, ConversationSegment, VecSegmentStream};
//!
//! let stream = VecSegmentStream::new(vec![Ok(ConversationSegment::text("hello"))]);
//! let _boxed: BoxedSegmentStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;

use crate::{ConversationSegment, ProviderError};

/// Adapter stream contract.
///
/// Invariants for consumers:
/// - The first item carries the prompt token count, zero output tokens, and no content.
/// - Segments arrive in vendor order.
/// - A segment with a finish reason is the last item.
/// - Once the stream yields `None`, it must not yield additional items.
pub trait SegmentStream: Stream<Item = Result<ConversationSegment, ProviderError>> + Send {}

impl<T> SegmentStream for T where T: Stream<Item = Result<ConversationSegment, ProviderError>> + Send {}

pub type BoxedSegmentStream<'a> = Pin<Box<dyn SegmentStream + 'a>>;

#[derive(Debug)]
pub struct VecSegmentStream {
    segments: VecDeque<Result<ConversationSegment, ProviderError>>,
}

impl VecSegmentStream {
    pub fn new(segments: Vec<Result<ConversationSegment, ProviderError>>) -> Self {
        Self {
            segments: segments.into(),
        }
    }
}

impl Stream for VecSegmentStream {
    type Item = Result<ConversationSegment, ProviderError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<ConversationSegment, ProviderError>>> {
        Poll::Ready(self.segments.pop_front())
    }
}
