//! Event-by-event decoding of Messages API streams into segments.

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    ConversationSegment, FinishReason, ProviderError, ProviderId, TokenCounter, ToolCallFragment,
};

use super::serde_api::{
    AnthropicApiBlockDelta, AnthropicApiContentBlock, AnthropicApiEvent, AnthropicApiUsage,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Text,
    Thinking,
    ToolUse { tool_index: u32 },
    Ignored,
}

pub(crate) fn map_stop_reason(reason: &str) -> FinishReason {
    match reason {
        "end_turn" | "stop_sequence" => FinishReason::Stop,
        "max_tokens" => FinishReason::Length,
        "tool_use" => FinishReason::ToolCalls,
        "refusal" => FinishReason::ContentFilter,
        other => FinishReason::Other(other.to_string()),
    }
}

#[derive(Debug)]
pub(crate) struct EventDecoder {
    counter: TokenCounter,
    blocks: HashMap<u32, BlockKind>,
    next_tool_index: u32,
    terminal: Option<FinishReason>,
    stopped: bool,
}

impl EventDecoder {
    pub(crate) fn new(input_estimate: u32) -> Self {
        Self {
            counter: TokenCounter::new(input_estimate),
            blocks: HashMap::new(),
            next_tool_index: 0,
            terminal: None,
            stopped: false,
        }
    }

    pub(crate) fn first_segment(&self) -> ConversationSegment {
        ConversationSegment::usage_only(self.counter.usage().input_tokens, 0)
    }

    /// `message_stop` has been received.
    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(crate) fn decode(
        &mut self,
        payload: &str,
    ) -> Result<Option<ConversationSegment>, ProviderError> {
        let event = serde_json::from_str::<AnthropicApiEvent>(payload).map_err(|err| {
            ProviderError::protocol(format!("malformed anthropic stream event: {err}"))
                .with_detail(payload)
        })?;

        let segment = match event {
            AnthropicApiEvent::MessageStart { message } => {
                // output_tokens on message_start is a placeholder
                match message.usage.and_then(|usage| usage.total_input()) {
                    Some(input) => {
                        self.counter.set_input(input);
                        return Ok(self.usage_segment());
                    }
                    None => return Ok(None),
                }
            }
            AnthropicApiEvent::ContentBlockStart {
                index,
                content_block,
            } => self.start_block(index, content_block),
            AnthropicApiEvent::ContentBlockDelta { index, delta } => self.apply_delta(index, delta),
            AnthropicApiEvent::ContentBlockStop | AnthropicApiEvent::Ping => return Ok(None),
            AnthropicApiEvent::MessageDelta { delta, usage } => {
                if let Some(usage) = usage {
                    self.apply_vendor_usage(&usage);
                }
                if let Some(reason) = delta.stop_reason.filter(|reason| !reason.is_empty())
                    && self.terminal.is_none()
                {
                    self.terminal = Some(map_stop_reason(&reason));
                    return Ok(None);
                }
                return Ok(self.usage_segment());
            }
            AnthropicApiEvent::MessageStop => {
                self.stopped = true;
                return Ok(None);
            }
            AnthropicApiEvent::Error { error } => return Err(error.into_provider_error(payload)),
            AnthropicApiEvent::Unknown => {
                tracing::debug!(provider = %ProviderId::Anthropic, "ignoring unknown stream event");
                return Ok(None);
            }
        };

        let Some(segment) = segment else {
            return Ok(None);
        };

        if self.terminal.is_some() {
            tracing::warn!(
                provider = %ProviderId::Anthropic,
                "dropping stream content received after stop reason"
            );
            return Ok(None);
        }

        self.counter.add_output_estimate(&segment.text);
        if let Some(reasoning) = &segment.reasoning {
            self.counter.add_reasoning_estimate(reasoning);
        }
        for fragment in &segment.tool_calls {
            self.counter.add_output_estimate(&fragment.arguments_chunk);
        }

        Ok(Some(segment.with_usage(self.counter.usage())))
    }

    /// Releases the terminal segment once the stream closes.
    pub(crate) fn finish(&mut self) -> Option<ConversationSegment> {
        let reason = self.terminal.take()?;
        Some(
            ConversationSegment::default()
                .with_usage(self.counter.usage())
                .with_finish_reason(reason),
        )
    }

    fn usage_segment(&mut self) -> Option<ConversationSegment> {
        if self.terminal.is_some() {
            return None;
        }
        Some(ConversationSegment::default().with_usage(self.counter.usage()))
    }

    fn apply_vendor_usage(&mut self, usage: &AnthropicApiUsage) {
        if let Some(input) = usage.total_input() {
            self.counter.set_input(input);
        }
        if let Some(output) = usage.output_tokens {
            self.counter.set_output(output);
        }
    }

    fn start_block(
        &mut self,
        index: u32,
        block: AnthropicApiContentBlock,
    ) -> Option<ConversationSegment> {
        match block {
            AnthropicApiContentBlock::Text { text } => {
                self.blocks.insert(index, BlockKind::Text);
                (!text.is_empty()).then(|| ConversationSegment::text(text))
            }
            AnthropicApiContentBlock::Thinking { thinking } => {
                self.blocks.insert(index, BlockKind::Thinking);
                (!thinking.is_empty()).then(|| ConversationSegment::reasoning(thinking))
            }
            AnthropicApiContentBlock::ToolUse { id, name, input } => {
                let tool_index = self.next_tool_index;
                self.next_tool_index += 1;
                self.blocks.insert(index, BlockKind::ToolUse { tool_index });

                let arguments = match input {
                    Value::Object(map) if !map.is_empty() => Value::Object(map).to_string(),
                    _ => String::new(),
                };
                Some(
                    ConversationSegment::default()
                        .with_tool_call(ToolCallFragment::first(tool_index, id, name, arguments)),
                )
            }
            AnthropicApiContentBlock::ServerToolUse { name } => {
                tracing::debug!(
                    provider = %ProviderId::Anthropic,
                    tool = %name,
                    "server tool executed by vendor"
                );
                self.blocks.insert(index, BlockKind::Ignored);
                None
            }
            AnthropicApiContentBlock::Other => {
                self.blocks.insert(index, BlockKind::Ignored);
                None
            }
        }
    }

    fn apply_delta(
        &mut self,
        index: u32,
        delta: AnthropicApiBlockDelta,
    ) -> Option<ConversationSegment> {
        let kind = self.blocks.get(&index).copied().unwrap_or(BlockKind::Ignored);

        match (kind, delta) {
            (BlockKind::Text, AnthropicApiBlockDelta::TextDelta { text }) if !text.is_empty() => {
                Some(ConversationSegment::text(text))
            }
            (BlockKind::Thinking, AnthropicApiBlockDelta::ThinkingDelta { thinking })
                if !thinking.is_empty() =>
            {
                Some(ConversationSegment::reasoning(thinking))
            }
            (
                BlockKind::ToolUse { tool_index },
                AnthropicApiBlockDelta::InputJsonDelta { partial_json },
            ) if !partial_json.is_empty() => Some(
                ConversationSegment::default()
                    .with_tool_call(ToolCallFragment::continuation(tool_index, partial_json)),
            ),
            _ => None,
        }
    }
}
