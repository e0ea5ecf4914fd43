//! Turn driver: adapter stream → aggregator → outward events → persistence.

use std::sync::Arc;
use std::time::Instant;

use async_stream::stream;
use futures_util::StreamExt;
use rcommon::TurnId;
use rprovider::{
    AdapterRegistry, ChatRequest, ConversationSegment, ProviderError, VendorAdapter,
};
use tokio_util::sync::CancellationToken;

use crate::{
    ChatError, ChatErrorKind, EventEmitter, NoopTurnLifecycleHooks, OutwardEvent,
    OutwardEventStream, PriceTable, StaticPriceTable, Turn, TurnAggregator, TurnFailure,
    TurnLifecycleHooks, TurnSink, TurnState,
};

enum NextSegment {
    Cancelled,
    Item(Option<Result<ConversationSegment, ProviderError>>),
}

#[derive(Clone)]
pub struct ChatEngine {
    adapters: AdapterRegistry,
    sink: Arc<dyn TurnSink>,
    prices: Arc<dyn PriceTable>,
    hooks: Arc<dyn TurnLifecycleHooks>,
}

impl ChatEngine {
    pub fn new(adapters: AdapterRegistry, sink: Arc<dyn TurnSink>) -> Self {
        Self {
            adapters,
            sink,
            prices: Arc::new(StaticPriceTable::new()),
            hooks: Arc::new(NoopTurnLifecycleHooks),
        }
    }

    pub fn with_price_table(mut self, prices: Arc<dyn PriceTable>) -> Self {
        self.prices = prices;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn TurnLifecycleHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Streams one turn as outward events, ending with `EndTurn` or `Error`.
    pub fn stream_turn<'a>(
        &'a self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> OutwardEventStream<'a> {
        self.stream_turn_with_id(TurnId::generate(), request, cancel)
    }

    pub fn stream_turn_with_id<'a>(
        &'a self,
        turn_id: TurnId,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> OutwardEventStream<'a> {
        Box::pin(stream! {
            let started = Instant::now();
            let provider = request.config.provider;
            let model = request.config.model.clone();
            let mut aggregator = TurnAggregator::new(turn_id.clone(), request.config.clone());
            let mut emitter = EventEmitter::new(turn_id.clone(), model.clone());

            tracing::debug!(turn_id = %turn_id, provider = %provider, model = %model, "turn started");
            self.hooks.on_turn_started(&turn_id, provider, &model);

            let adapter: Arc<dyn VendorAdapter> = match self.adapters.resolve(provider) {
                Ok(adapter) => adapter,
                Err(error) => {
                    yield self.fail_turn(&mut aggregator, &emitter, error.into(), started).await;
                    return;
                }
            };

            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ChatError::cancelled()),
                opened = adapter.open_stream(request, cancel.clone()) => opened.map_err(ChatError::from),
            };
            let mut segments = match opened {
                Ok(segments) => segments,
                Err(error) => {
                    yield self.fail_turn(&mut aggregator, &emitter, error, started).await;
                    return;
                }
            };

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => NextSegment::Cancelled,
                    item = segments.next() => NextSegment::Item(item),
                };

                let segment = match next {
                    NextSegment::Cancelled => {
                        drop(segments);
                        tracing::debug!(turn_id = %turn_id, "turn cancelled while streaming");
                        yield self.fail_turn(&mut aggregator, &emitter, ChatError::cancelled(), started).await;
                        return;
                    }
                    NextSegment::Item(None) => break,
                    NextSegment::Item(Some(Err(error))) => {
                        drop(segments);
                        yield self.fail_turn(&mut aggregator, &emitter, error.into(), started).await;
                        return;
                    }
                    NextSegment::Item(Some(Ok(segment))) => segment,
                };

                let before = aggregator.state();
                if let Err(error) = aggregator.apply(&segment) {
                    drop(segments);
                    yield self.fail_turn(&mut aggregator, &emitter, error, started).await;
                    return;
                }
                self.notify_transition(&turn_id, before, aggregator.state());

                for event in emitter.on_segment(&segment) {
                    yield event;
                }
            }

            drop(segments);
            for event in emitter.on_stream_end(aggregator.turn().usage) {
                yield event;
            }
            yield self.commit_turn(&mut aggregator, &emitter, started).await;
        })
    }

    /// Drives a turn to completion, returning the committed turn or the failure
    /// with its partial content.
    pub async fn run_turn(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<Turn, TurnFailure> {
        let turn_id = TurnId::generate();
        let config = request.config.clone();
        let mut events = self.stream_turn_with_id(turn_id.clone(), request, cancel);

        while let Some(event) = events.next().await {
            match event {
                OutwardEvent::EndTurn { turn } => return Ok(*turn),
                OutwardEvent::Error { error, partial } => {
                    return Err(TurnFailure::new(error, *partial));
                }
                _ => {}
            }
        }

        Err(TurnFailure::new(
            ChatError::protocol("turn stream ended without a terminal event"),
            Turn::new(turn_id, config),
        ))
    }

    async fn commit_turn(
        &self,
        aggregator: &mut TurnAggregator,
        emitter: &EventEmitter,
        started: Instant,
    ) -> OutwardEvent {
        let prices = self.prices.prices(&aggregator.turn().config.model);
        let before = aggregator.state();
        if let Err(error) = aggregator.finalize(prices.as_ref()) {
            return self.fail_turn(aggregator, emitter, error, started).await;
        }
        self.notify_transition(&aggregator.turn().id, before, TurnState::Finalizing);

        if let Err(error) = self.sink.commit(aggregator.turn()).await {
            let error = ChatError {
                kind: ChatErrorKind::Store,
                ..error
            };
            return self.fail_turn(aggregator, emitter, error, started).await;
        }

        let turn = match aggregator.commit() {
            Ok(turn) => turn,
            Err(error) => return self.fail_turn(aggregator, emitter, error, started).await,
        };
        self.notify_transition(&turn.id, TurnState::Finalizing, TurnState::Committed);

        tracing::debug!(
            turn_id = %turn.id,
            input_tokens = turn.usage.input_tokens,
            output_tokens = turn.usage.output_tokens,
            "turn committed"
        );
        self.hooks
            .on_turn_committed(&turn.id, &turn.usage, started.elapsed());
        emitter.on_commit(turn)
    }

    async fn fail_turn(
        &self,
        aggregator: &mut TurnAggregator,
        emitter: &EventEmitter,
        error: ChatError,
        started: Instant,
    ) -> OutwardEvent {
        let before = aggregator.state();
        let partial = aggregator.fail(&error);
        self.notify_transition(&partial.id, before, partial.state);

        if let Err(store_error) = self.sink.salvage_partial(&partial).await {
            tracing::warn!(
                turn_id = %partial.id,
                error = %store_error,
                "failed to salvage partial turn"
            );
        }

        self.hooks
            .on_turn_failed(&partial.id, &error, started.elapsed());
        emitter.on_failure(TurnFailure::new(error, partial))
    }

    fn notify_transition(&self, turn_id: &TurnId, from: TurnState, to: TurnState) {
        if from != to {
            self.hooks.on_state_changed(turn_id, from, to);
        }
    }
}
