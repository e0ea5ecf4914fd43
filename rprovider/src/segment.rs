//! Canonical segment vocabulary shared by every vendor adapter.
//!
//! ```rust
//! use rprovider::{ConversationSegment, FinishReason, ToolCallFragment};
//!
//! let first = ConversationSegment::usage_only(12, 0);
//! assert!(!first.has_content());
//!
//! let last = ConversationSegment::text("done")
//!     .with_tool_call(ToolCallFragment::first(0, "call_1", "lookup", "{}"))
//!     .with_finish_reason(FinishReason::ToolCalls);
//! assert!(last.is_terminal());
//! ```

use std::fmt::{Display, Formatter};

use crate::Usage;

/// One streamed piece of a tool call.
///
/// `id`, `kind`, and `function_name` are only set on the fragment that
/// introduces `index`; `arguments_chunk` is concatenated per index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallFragment {
    pub index: u32,
    pub id: Option<String>,
    pub kind: Option<String>,
    pub function_name: Option<String>,
    pub arguments_chunk: String,
}

impl ToolCallFragment {
    pub fn first(
        index: u32,
        id: impl Into<String>,
        function_name: impl Into<String>,
        arguments_chunk: impl Into<String>,
    ) -> Self {
        Self {
            index,
            id: Some(id.into()),
            kind: Some("function".to_string()),
            function_name: Some(function_name.into()),
            arguments_chunk: arguments_chunk.into(),
        }
    }

    pub fn continuation(index: u32, arguments_chunk: impl Into<String>) -> Self {
        Self {
            index,
            id: None,
            kind: None,
            function_name: None,
            arguments_chunk: arguments_chunk.into(),
        }
    }

    pub fn introduces_call(&self) -> bool {
        self.id.is_some() || self.function_name.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    Url(String),
    Base64 { media_type: String, data: String },
}

impl ImagePayload {
    /// Splits `data:<media>;base64,<data>` URLs; anything else stays a URL.
    pub fn from_url(url: impl Into<String>) -> Self {
        let url = url.into();
        if let Some(rest) = url.strip_prefix("data:")
            && let Some((header, data)) = rest.split_once(',')
            && let Some(media_type) = header.strip_suffix(";base64")
        {
            return Self::Base64 {
                media_type: media_type.to_string(),
                data: data.to_string(),
            };
        }

        Self::Url(url)
    }

    pub fn to_url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSegment {
    Generating { index: u32 },
    Generated { index: u32, payload: ImagePayload },
}

impl ImageSegment {
    pub fn index(&self) -> u32 {
        match self {
            Self::Generating { index } | Self::Generated { index, .. } => *index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn parse(value: &str) -> Self {
        match value {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "tool_calls" | "function_call" => Self::ToolCalls,
            "content_filter" => Self::ContentFilter,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ToolCalls => "tool_calls",
            Self::ContentFilter => "content_filter",
            Self::Other(value) => value.as_str(),
        }
    }

    pub fn is_truncation(&self) -> bool {
        matches!(self, Self::Length)
    }
}

impl Display for FinishReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One incremental update of an assistant turn.
///
/// Token counts are running totals for the turn so far, not per-segment deltas.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationSegment {
    pub text: String,
    pub reasoning: Option<String>,
    pub image: Option<ImageSegment>,
    pub tool_calls: Vec<ToolCallFragment>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub reasoning_tokens: u32,
    pub finish_reason: Option<FinishReason>,
}

impl ConversationSegment {
    pub fn usage_only(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn reasoning(reasoning: impl Into<String>) -> Self {
        Self {
            reasoning: Some(reasoning.into()),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_image(mut self, image: ImageSegment) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_tool_call(mut self, fragment: ToolCallFragment) -> Self {
        self.tool_calls.push(fragment);
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.input_tokens = usage.input_tokens;
        self.output_tokens = usage.output_tokens;
        self.reasoning_tokens = usage.reasoning_tokens;
        self
    }

    pub fn with_finish_reason(mut self, reason: FinishReason) -> Self {
        self.finish_reason = Some(reason);
        self
    }

    pub fn usage(&self) -> Usage {
        Usage {
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            reasoning_tokens: self.reasoning_tokens,
        }
    }

    pub fn has_content(&self) -> bool {
        !self.text.is_empty()
            || self.reasoning.as_deref().is_some_and(|value| !value.is_empty())
            || self.image.is_some()
            || !self.tool_calls.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }
}
