//! Turn, lifecycle state, and outward event types.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::pin::Pin;

use futures_core::Stream;
use rcommon::TurnId;
use rprovider::{Configuration, Cost, FinishReason, ImagePayload, Message, ToolCall, Usage};

use crate::ChatError;

/// Lifecycle of one exchange: `Pending → Streaming → Finalizing → {Committed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TurnState {
    Pending,
    Streaming,
    Finalizing,
    Committed,
    Failed,
}

impl TurnState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Streaming => "streaming",
            Self::Finalizing => "finalizing",
            Self::Committed => "committed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Failed)
    }
}

impl Display for TurnState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The accumulated assistant response for one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub id: TurnId,
    pub config: Configuration,
    pub state: TurnState,
    pub text: String,
    pub reasoning: String,
    pub tool_calls: Vec<ToolCall>,
    pub images: Vec<ImagePayload>,
    pub usage: Usage,
    pub cost: Option<Cost>,
    pub finish_reason: Option<FinishReason>,
}

impl Turn {
    pub fn new(id: TurnId, config: Configuration) -> Self {
        Self {
            id,
            config,
            state: TurnState::Pending,
            text: String::new(),
            reasoning: String::new(),
            tool_calls: Vec::new(),
            images: Vec::new(),
            usage: Usage::default(),
            cost: None,
            finish_reason: None,
        }
    }

    pub fn has_content(&self) -> bool {
        !self.text.is_empty()
            || !self.reasoning.is_empty()
            || !self.tool_calls.is_empty()
            || !self.images.is_empty()
    }

    /// Renders the turn as an assistant history entry for the next request.
    pub fn to_message(&self) -> Message {
        Message::assistant_with_tool_calls(self.text.clone(), self.tool_calls.clone())
    }
}

/// A failed turn together with whatever content was accumulated before the failure.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnFailure {
    pub error: ChatError,
    pub partial: Turn,
}

impl TurnFailure {
    pub fn new(error: ChatError, partial: Turn) -> Self {
        Self { error, partial }
    }
}

impl Display for TurnFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn {} failed: {}", self.partial.id, self.error)
    }
}

impl Error for TurnFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

/// Outward protocol events, independent of the vendor that produced the turn.
#[derive(Debug, Clone, PartialEq)]
pub enum OutwardEvent {
    StartResponse {
        turn_id: TurnId,
        model: String,
        input_tokens: u32,
    },
    StartReasoning,
    TextSegment(String),
    ReasoningSegment(String),
    ToolCallInvocation {
        index: u32,
        id: String,
        name: String,
    },
    ToolProgress {
        index: u32,
        arguments_chunk: String,
    },
    ToolCompleted {
        index: u32,
        id: String,
        name: String,
        arguments: String,
    },
    ImageGenerating {
        index: u32,
    },
    ImageGenerated {
        index: u32,
        payload: ImagePayload,
    },
    EndStep {
        finish_reason: Option<FinishReason>,
        usage: Usage,
    },
    EndTurn {
        turn: Box<Turn>,
    },
    Error {
        error: ChatError,
        partial: Box<Turn>,
    },
}

impl OutwardEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StartResponse { .. } => "start_response",
            Self::StartReasoning => "start_reasoning",
            Self::TextSegment(_) => "text_segment",
            Self::ReasoningSegment(_) => "reasoning_segment",
            Self::ToolCallInvocation { .. } => "tool_call_invocation",
            Self::ToolProgress { .. } => "tool_progress",
            Self::ToolCompleted { .. } => "tool_completed",
            Self::ImageGenerating { .. } => "image_generating",
            Self::ImageGenerated { .. } => "image_generated",
            Self::EndStep { .. } => "end_step",
            Self::EndTurn { .. } => "end_turn",
            Self::Error { .. } => "error",
        }
    }

    /// `EndTurn` and `Error` close the outward stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::EndTurn { .. } | Self::Error { .. })
    }
}

pub type OutwardEventStream<'a> = Pin<Box<dyn Stream<Item = OutwardEvent> + Send + 'a>>;
