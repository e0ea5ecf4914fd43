use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use crate::{BoxedSegmentStream, ChatRequest, ProviderError, ProviderId};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One upstream protocol family.
///
/// `open_stream` issues the vendor call and returns a finite, non-restartable
/// segment stream. Cancelling `cancel` closes the upstream connection and makes
/// the stream yield a `Cancelled` error.
pub trait VendorAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    fn open_stream<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<BoxedSegmentStream<'a>, ProviderError>>;
}
