//! reqwest-backed [`SseTransport`].

use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::{
    HttpRequest, NoopOperationHooks, ProviderError, ProviderFuture, ProviderId,
    ProviderOperationHooks, RetryPolicy, SseDecoder, SseEventStream, SseTransport,
    execute_with_retry, status_error,
};

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    retry_policy: RetryPolicy,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry_policy: RetryPolicy::single_attempt(),
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    /// Builds a client that bounds connecting and each silent gap between
    /// body reads.
    ///
    /// There is no total deadline, so a stream that keeps producing chunks is
    /// never cut off by wall-clock time.
    pub fn with_timeouts(
        connect_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(idle_timeout)
            .build()
            .map_err(|err| ProviderError::configuration(format!("failed to build http client: {err}")))?;
        Ok(Self::new(client))
    }

    /// Retries connection establishment only; a stream that has started is never replayed.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    async fn connect(
        &self,
        request: &HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, ProviderError> {
        let send = self
            .client
            .post(&request.url)
            .headers(request.headers.clone())
            .header(http::header::ACCEPT, "text/event-stream")
            .json(&request.body)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::cancelled()),
            response = send => response.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = tokio::select! {
            _ = cancel.cancelled() => return Err(ProviderError::cancelled()),
            body = response.text() => body.unwrap_or_default(),
        };
        Err(status_error(status.as_u16(), &body))
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

enum NextChunk<T> {
    Cancelled,
    Bytes(T),
    Closed,
}

impl SseTransport for ReqwestTransport {
    fn open<'a>(
        &'a self,
        provider: ProviderId,
        request: HttpRequest,
        cancel: CancellationToken,
    ) -> ProviderFuture<'a, Result<SseEventStream<'a>, ProviderError>> {
        Box::pin(async move {
            let request = &request;
            let connect_cancel = &cancel;
            let response = execute_with_retry(
                provider,
                "open_stream",
                &self.retry_policy,
                self.hooks.as_ref(),
                &cancel,
                move |_| self.connect(request, connect_cancel),
            )
            .await?;

            let stream = try_stream! {
                let mut body = response.bytes_stream();
                let mut decoder = SseDecoder::new();

                loop {
                    let next = tokio::select! {
                        _ = cancel.cancelled() => NextChunk::Cancelled,
                        item = body.next() => match item {
                            Some(item) => NextChunk::Bytes(item),
                            None => NextChunk::Closed,
                        },
                    };

                    match next {
                        NextChunk::Cancelled => {
                            Err::<(), _>(ProviderError::cancelled())?;
                        }
                        NextChunk::Bytes(item) => {
                            let bytes = item.map_err(map_reqwest_error)?;
                            for event in decoder.push(&bytes)? {
                                yield event;
                            }
                        }
                        NextChunk::Closed => {
                            if let Some(event) = decoder.finish()? {
                                yield event;
                            }
                            break;
                        }
                    }
                }
            };

            Ok(Box::pin(stream) as SseEventStream<'a>)
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_builder() {
        ProviderError::configuration(err.to_string())
    } else {
        ProviderError::transient(err.to_string())
    }
}

