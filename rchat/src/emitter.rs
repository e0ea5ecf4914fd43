//! Canonical-to-wire re-emission.
//!
//! [`EventEmitter`] maps segments onto the outward event protocol, and
//! [`ChunkEncoder`] renders them as OpenAI-compatible `chat.completion.chunk`
//! SSE frames.
//!
//! ```rust
//! use rchat::{ChunkEncoder, DONE_FRAME, sse_frame};
//! use rprovider::ConversationSegment;
//!
//! let mut encoder = ChunkEncoder::new("chatcmpl-1", "gpt-x", 1_700_000_000);
//! let chunk = encoder.encode(&ConversationSegment::text("Hi"));
//! let frame = sse_frame(&chunk).unwrap();
//!
//! assert!(frame.starts_with("data: {"));
//! assert!(frame.ends_with("\n\n"));
//! assert_eq!(DONE_FRAME, "data: [DONE]\n\n");
//! ```

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use rcommon::TurnId;
use rprovider::{ConversationSegment, FinishReason, ImageSegment, Usage};
use serde::{Deserialize, Serialize};

use crate::{ChatError, OutwardEvent, Turn, TurnFailure};

pub const DONE_FRAME: &str = "data: [DONE]\n\n";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StartedToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Stateful per-turn mapping from segments to outward events.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    turn_id: TurnId,
    model: String,
    started: bool,
    reasoning_started: bool,
    step_ended: bool,
    tools: BTreeMap<u32, StartedToolCall>,
}

impl EventEmitter {
    pub fn new(turn_id: TurnId, model: impl Into<String>) -> Self {
        Self {
            turn_id,
            model: model.into(),
            started: false,
            reasoning_started: false,
            step_ended: false,
            tools: BTreeMap::new(),
        }
    }

    pub fn on_segment(&mut self, segment: &ConversationSegment) -> Vec<OutwardEvent> {
        let mut events = Vec::new();

        if !self.started {
            self.started = true;
            events.push(OutwardEvent::StartResponse {
                turn_id: self.turn_id.clone(),
                model: self.model.clone(),
                input_tokens: segment.input_tokens,
            });
        }

        if let Some(reasoning) = segment
            .reasoning
            .as_ref()
            .filter(|reasoning| !reasoning.is_empty())
        {
            if !self.reasoning_started {
                self.reasoning_started = true;
                events.push(OutwardEvent::StartReasoning);
            }
            events.push(OutwardEvent::ReasoningSegment(reasoning.clone()));
        }

        if !segment.text.is_empty() {
            events.push(OutwardEvent::TextSegment(segment.text.clone()));
        }

        for fragment in &segment.tool_calls {
            let index = fragment.index;
            if !self.tools.contains_key(&index) {
                let started = StartedToolCall {
                    id: fragment
                        .id
                        .clone()
                        .unwrap_or_else(|| format!("call_{index}")),
                    name: fragment.function_name.clone().unwrap_or_default(),
                    arguments: String::new(),
                };
                events.push(OutwardEvent::ToolCallInvocation {
                    index,
                    id: started.id.clone(),
                    name: started.name.clone(),
                });
                self.tools.insert(index, started);
            }

            if fragment.arguments_chunk.is_empty() {
                continue;
            }
            if let Some(started) = self.tools.get_mut(&index) {
                started.arguments.push_str(&fragment.arguments_chunk);
            }
            events.push(OutwardEvent::ToolProgress {
                index,
                arguments_chunk: fragment.arguments_chunk.clone(),
            });
        }

        match &segment.image {
            Some(ImageSegment::Generating { index }) => {
                events.push(OutwardEvent::ImageGenerating { index: *index });
            }
            Some(ImageSegment::Generated { index, payload }) => {
                events.push(OutwardEvent::ImageGenerated {
                    index: *index,
                    payload: payload.clone(),
                });
            }
            None => {}
        }

        if segment.is_terminal() {
            self.end_step(segment.finish_reason.clone(), segment.usage(), &mut events);
        }

        events
    }

    /// Flushes a step the vendor closed without a finish reason.
    ///
    /// Returns nothing when a terminal segment already ended the step or when
    /// no segment was ever seen.
    pub fn on_stream_end(&mut self, usage: Usage) -> Vec<OutwardEvent> {
        let mut events = Vec::new();
        if self.started && !self.step_ended {
            self.end_step(None, usage, &mut events);
        }
        events
    }

    fn end_step(
        &mut self,
        finish_reason: Option<FinishReason>,
        usage: Usage,
        events: &mut Vec<OutwardEvent>,
    ) {
        self.step_ended = true;
        events.extend(self.tools.iter().map(|(index, started)| {
            OutwardEvent::ToolCompleted {
                index: *index,
                id: started.id.clone(),
                name: started.name.clone(),
                arguments: started.arguments.clone(),
            }
        }));
        events.push(OutwardEvent::EndStep {
            finish_reason,
            usage,
        });
    }

    pub fn on_commit(&self, turn: Turn) -> OutwardEvent {
        OutwardEvent::EndTurn {
            turn: Box::new(turn),
        }
    }

    pub fn on_failure(&self, failure: TurnFailure) -> OutwardEvent {
        OutwardEvent::Error {
            error: failure.error,
            partial: Box::new(failure.partial),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<ChunkUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: ChunkDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ChunkImage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ChunkToolCall>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkImage {
    #[serde(rename = "type")]
    pub kind: String,
    pub image_url: ChunkImageUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkToolCall {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub function: ChunkFunction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFunction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_tokens_details: Option<ChunkCompletionDetails>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkCompletionDetails {
    pub reasoning_tokens: u32,
}

impl From<Usage> for ChunkUsage {
    fn from(usage: Usage) -> Self {
        Self {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.total(),
            completion_tokens_details: (usage.reasoning_tokens > 0).then_some(
                ChunkCompletionDetails {
                    reasoning_tokens: usage.reasoning_tokens,
                },
            ),
        }
    }
}

/// Renders segments as OpenAI-compatible streaming chunks.
///
/// The first chunk carries `role: assistant`; usage is attached to the chunk
/// that carries the finish reason.
#[derive(Debug, Clone)]
pub struct ChunkEncoder {
    id: String,
    model: String,
    created: u64,
    role_sent: bool,
}

impl ChunkEncoder {
    pub fn new(id: impl Into<String>, model: impl Into<String>, created: u64) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            created,
            role_sent: false,
        }
    }

    pub fn for_turn(turn_id: &TurnId, model: impl Into<String>) -> Self {
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        Self::new(format!("chatcmpl-{turn_id}"), model, created)
    }

    pub fn encode(&mut self, segment: &ConversationSegment) -> ChatCompletionChunk {
        let mut delta = ChunkDelta::default();
        if !self.role_sent {
            self.role_sent = true;
            delta.role = Some("assistant".to_string());
        }

        if !segment.text.is_empty() {
            delta.content = Some(segment.text.clone());
        }
        delta.reasoning_content = segment
            .reasoning
            .clone()
            .filter(|reasoning| !reasoning.is_empty());

        if let Some(ImageSegment::Generated { payload, .. }) = &segment.image {
            delta.images.push(ChunkImage {
                kind: "image_url".to_string(),
                image_url: ChunkImageUrl {
                    url: payload.to_url(),
                },
            });
        }

        delta.tool_calls = segment
            .tool_calls
            .iter()
            .map(|fragment| ChunkToolCall {
                index: fragment.index,
                id: fragment.id.clone(),
                kind: fragment.kind.clone(),
                function: ChunkFunction {
                    name: fragment.function_name.clone(),
                    arguments: fragment.arguments_chunk.clone(),
                },
            })
            .collect();

        let finish_reason = segment
            .finish_reason
            .as_ref()
            .map(|reason| reason.as_str().to_string());
        let usage = finish_reason
            .is_some()
            .then(|| ChunkUsage::from(segment.usage()));

        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
            usage,
        }
    }
}

pub fn sse_frame(chunk: &ChatCompletionChunk) -> Result<String, ChatError> {
    let json = serde_json::to_string(chunk)
        .map_err(|err| ChatError::protocol(format!("failed to encode chunk: {err}")))?;
    Ok(format!("data: {json}\n\n"))
}
