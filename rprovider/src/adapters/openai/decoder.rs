//! Chunk-by-chunk decoding of Chat Completions stream payloads into segments.

use std::collections::{HashMap, HashSet};

use crate::{
    ConversationSegment, FinishReason, ImagePayload, ImageSegment, ProviderError, ProviderId,
    TokenCounter, ToolCallFragment,
};

use super::serde_api::{OpenAiApiStreamChunk, OpenAiApiToolCallDelta, OpenAiApiUsage};

#[derive(Debug)]
pub(crate) struct ChunkDecoder {
    provider: ProviderId,
    counter: TokenCounter,
    announced: HashSet<u32>,
    ids: HashMap<String, u32>,
    last_index: Option<u32>,
    images: u32,
    terminal: Option<ConversationSegment>,
}

impl ChunkDecoder {
    pub(crate) fn new(provider: ProviderId, input_estimate: u32) -> Self {
        Self {
            provider,
            counter: TokenCounter::new(input_estimate),
            announced: HashSet::new(),
            ids: HashMap::new(),
            last_index: None,
            images: 0,
            terminal: None,
        }
    }

    pub(crate) fn first_segment(&self) -> ConversationSegment {
        ConversationSegment::usage_only(self.counter.usage().input_tokens, 0)
    }

    pub(crate) fn decode(&mut self, payload: &str) -> Result<Vec<ConversationSegment>, ProviderError> {
        let chunk = serde_json::from_str::<OpenAiApiStreamChunk>(payload).map_err(|err| {
            ProviderError::protocol(format!("malformed {} stream chunk: {err}", self.provider))
                .with_detail(payload)
        })?;

        if let Some(error) = chunk.error {
            return Err(error.into_provider_error(payload));
        }

        let usage_reported = chunk.usage.is_some();
        let choice = chunk.choices.into_iter().next();
        let (delta, finish_reason) = match choice {
            Some(choice) => (
                choice.delta.unwrap_or_default(),
                choice
                    .finish_reason
                    .filter(|reason| !reason.is_empty())
                    .map(|reason| FinishReason::parse(&reason)),
            ),
            None => (Default::default(), None),
        };

        let mut segment = ConversationSegment::default();
        if let Some(text) = delta.content {
            segment.text = text;
        }
        segment.reasoning = delta
            .reasoning_content
            .or(delta.reasoning)
            .filter(|reasoning| !reasoning.is_empty());

        let fragments = delta
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|call| self.normalize_tool_call(call))
            .collect::<Vec<_>>();
        segment.tool_calls = fragments;

        let mut images = delta
            .images
            .unwrap_or_default()
            .into_iter()
            .filter_map(|image| image.image_url)
            .map(|image_url| {
                let index = self.images;
                self.images += 1;
                ImageSegment::Generated {
                    index,
                    payload: ImagePayload::from_url(image_url.url),
                }
            })
            .collect::<Vec<_>>()
            .into_iter();
        segment.image = images.next();

        if self.terminal.is_some() {
            if segment.has_content() || finish_reason.is_some() {
                tracing::warn!(
                    provider = %self.provider,
                    "dropping stream content received after finish reason"
                );
            }
            if let Some(usage) = chunk.usage {
                self.apply_vendor_usage(usage);
                let usage = self.counter.usage();
                if let Some(terminal) = self.terminal.as_mut() {
                    terminal.input_tokens = usage.input_tokens;
                    terminal.output_tokens = usage.output_tokens;
                    terminal.reasoning_tokens = usage.reasoning_tokens;
                }
            }
            return Ok(Vec::new());
        }

        match chunk.usage {
            Some(usage) => self.apply_vendor_usage(usage),
            None => {
                self.counter.add_output_estimate(&segment.text);
                if let Some(reasoning) = &segment.reasoning {
                    self.counter.add_reasoning_estimate(reasoning);
                }
                for fragment in &segment.tool_calls {
                    self.counter.add_output_estimate(&fragment.arguments_chunk);
                }
            }
        }

        if !segment.has_content() && !usage_reported && finish_reason.is_none() {
            return Ok(Vec::new());
        }

        let usage = self.counter.usage();
        let mut segments = vec![segment.with_usage(usage)];
        segments.extend(images.map(|image| {
            ConversationSegment::default()
                .with_image(image)
                .with_usage(usage)
        }));

        if let Some(reason) = finish_reason
            && let Some(last) = segments.pop()
        {
            self.terminal = Some(last.with_finish_reason(reason));
        }

        Ok(segments)
    }

    /// Releases the held terminal segment once the vendor closes the stream.
    pub(crate) fn finish(&mut self) -> Option<ConversationSegment> {
        self.terminal.take()
    }

    fn apply_vendor_usage(&mut self, usage: OpenAiApiUsage) {
        self.counter.set_input(usage.prompt_tokens);
        self.counter.set_output(usage.completion_tokens);
        if let Some(reasoning) = usage
            .completion_tokens_details
            .and_then(|details| details.reasoning_tokens)
        {
            self.counter.set_reasoning(reasoning);
        }
    }

    /// Emits metadata once per index and drops repeated metadata-only deltas.
    fn normalize_tool_call(&mut self, call: OpenAiApiToolCallDelta) -> Option<ToolCallFragment> {
        let id = call.id.filter(|id| !id.is_empty());
        let index = match (call.index, id.as_ref()) {
            (Some(index), _) => index,
            (None, Some(id)) => match self.ids.get(id) {
                Some(index) => *index,
                None => u32::try_from(self.announced.len()).unwrap_or(u32::MAX),
            },
            (None, None) => self.last_index.unwrap_or(0),
        };
        self.last_index = Some(index);

        let function = call.function.unwrap_or_default();
        let arguments = function.arguments.unwrap_or_default();

        if self.announced.insert(index) {
            if let Some(id) = &id {
                self.ids.insert(id.clone(), index);
            }
            return Some(ToolCallFragment {
                index,
                id,
                kind: Some(call.kind.unwrap_or_else(|| "function".to_string())),
                function_name: function.name.filter(|name| !name.is_empty()),
                arguments_chunk: arguments,
            });
        }

        if arguments.is_empty() {
            return None;
        }

        Some(ToolCallFragment::continuation(index, arguments))
    }
}
