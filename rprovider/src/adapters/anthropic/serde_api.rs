//! Messages API payload serde models and request construction.

use rcommon::ReasoningEffort;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ChatRequest, Message, ProviderError, Role};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 8192;
const MIN_RESPONSE_TOKENS: u32 = 1024;
const WEB_SEARCH_MAX_USES: u32 = 5;

pub fn thinking_budget(effort: ReasoningEffort) -> u32 {
    match effort {
        ReasoningEffort::Low => 1024,
        ReasoningEffort::Medium => 4096,
        ReasoningEffort::High => 16384,
    }
}

pub(crate) fn build_api_request(request: &ChatRequest) -> Result<AnthropicApiRequest, ProviderError> {
    let config = &request.config;

    let system = request
        .history
        .iter()
        .filter(|message| message.role == Role::System)
        .map(|message| message.content.as_str())
        .filter(|content| !content.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut messages: Vec<AnthropicApiMessage> = Vec::new();
    for message in request
        .history
        .iter()
        .filter(|message| message.role != Role::System)
    {
        let next = AnthropicApiMessage::try_from(message)?;
        if next.content.is_empty() {
            continue;
        }
        match messages.last_mut() {
            Some(previous) if previous.role == next.role => previous.merge(next),
            _ => messages.push(next),
        }
    }

    if messages.is_empty() {
        return Err(ProviderError::configuration(
            "anthropic requests need at least one non-system message",
        ));
    }

    let mut tools = config
        .tools
        .iter()
        .map(|tool| {
            let input_schema = serde_json::from_str::<Value>(&tool.input_schema).map_err(|_| {
                ProviderError::configuration(format!(
                    "input schema for tool '{}' must be valid JSON",
                    tool.name
                ))
            })?;
            Ok(AnthropicApiTool::Function {
                name: tool.name.clone(),
                description: tool.description.clone(),
                input_schema,
            })
        })
        .collect::<Result<Vec<_>, ProviderError>>()?;

    if config.options.web_search {
        tools.push(AnthropicApiTool::Server {
            kind: "web_search_20250305",
            name: "web_search",
            max_uses: WEB_SEARCH_MAX_USES,
        });
    }

    let thinking = config
        .options
        .reasoning_effort
        .map(|effort| AnthropicApiThinking {
            kind: "enabled",
            budget_tokens: thinking_budget(effort),
        });

    let mut max_tokens = config.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
    if let Some(thinking) = &thinking
        && max_tokens <= thinking.budget_tokens
    {
        max_tokens = thinking.budget_tokens.saturating_add(MIN_RESPONSE_TOKENS);
    }

    Ok(AnthropicApiRequest {
        model: config.model.clone(),
        max_tokens,
        messages,
        system: (!system.is_empty()).then_some(system),
        temperature: if thinking.is_some() {
            None
        } else {
            config.options.temperature
        },
        stream: true,
        tools: (!tools.is_empty()).then_some(tools),
        thinking,
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicApiRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<AnthropicApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<AnthropicApiThinking>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicApiThinking {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub budget_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum AnthropicApiTool {
    Function {
        name: String,
        description: String,
        input_schema: Value,
    },
    Server {
        #[serde(rename = "type")]
        kind: &'static str,
        name: &'static str,
        max_uses: u32,
    },
}

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicApiMessage {
    pub role: &'static str,
    pub content: Vec<AnthropicApiBlock>,
}

impl AnthropicApiMessage {
    fn merge(&mut self, next: AnthropicApiMessage) {
        self.content.extend(next.content);
    }
}

impl TryFrom<&Message> for AnthropicApiMessage {
    type Error = ProviderError;

    fn try_from(value: &Message) -> Result<Self, Self::Error> {
        match value.role {
            Role::Tool => {
                let tool_use_id = value.tool_call_id.clone().ok_or_else(|| {
                    ProviderError::configuration("tool result messages need a tool_call_id")
                })?;
                Ok(Self {
                    role: "user",
                    content: vec![AnthropicApiBlock::ToolResult {
                        tool_use_id,
                        content: value.content.clone(),
                    }],
                })
            }
            Role::Assistant => {
                let mut content = Vec::new();
                if !value.content.is_empty() {
                    content.push(AnthropicApiBlock::Text {
                        text: value.content.clone(),
                    });
                }
                for call in &value.tool_calls {
                    let input = if call.arguments.trim().is_empty() {
                        Value::Object(serde_json::Map::new())
                    } else {
                        serde_json::from_str(&call.arguments).map_err(|_| {
                            ProviderError::configuration(format!(
                                "arguments for tool call '{}' must be valid JSON",
                                call.id
                            ))
                        })?
                    };
                    content.push(AnthropicApiBlock::ToolUse {
                        id: call.id.clone(),
                        name: call.name.clone(),
                        input,
                    });
                }
                Ok(Self {
                    role: "assistant",
                    content,
                })
            }
            Role::User | Role::System => Ok(Self {
                role: "user",
                content: vec![AnthropicApiBlock::Text {
                    text: value.content.clone(),
                }],
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicApiBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicApiEvent {
    MessageStart {
        message: AnthropicApiMessageStart,
    },
    ContentBlockStart {
        index: u32,
        content_block: AnthropicApiContentBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: AnthropicApiBlockDelta,
    },
    ContentBlockStop,
    MessageDelta {
        delta: AnthropicApiMessageDelta,
        #[serde(default)]
        usage: Option<AnthropicApiUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: AnthropicApiError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicApiMessageStart {
    #[serde(default)]
    pub usage: Option<AnthropicApiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicApiContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ServerToolUse {
        name: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicApiBlockDelta {
    TextDelta { text: String },
    ThinkingDelta { thinking: String },
    InputJsonDelta { partial_json: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicApiMessageDelta {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicApiUsage {
    #[serde(default)]
    pub input_tokens: Option<u32>,
    #[serde(default)]
    pub output_tokens: Option<u32>,
    #[serde(default)]
    pub cache_creation_input_tokens: Option<u32>,
    #[serde(default)]
    pub cache_read_input_tokens: Option<u32>,
}

impl AnthropicApiUsage {
    /// Cached prompt tokens are billed input, reported separately.
    pub(crate) fn total_input(&self) -> Option<u32> {
        let input = self.input_tokens?;
        Some(
            input
                .saturating_add(self.cache_creation_input_tokens.unwrap_or(0))
                .saturating_add(self.cache_read_input_tokens.unwrap_or(0)),
        )
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicApiError {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

impl AnthropicApiError {
    pub(crate) fn into_provider_error(self, raw: &str) -> ProviderError {
        let message = if self.message.is_empty() {
            format!("anthropic stream error: {}", self.kind)
        } else {
            self.message
        };

        let error = match self.kind.as_str() {
            "overloaded_error" | "api_error" => ProviderError::transient(message),
            "rate_limit_error" => ProviderError::rate_limited(message),
            _ => ProviderError::protocol(message),
        };
        error.with_detail(raw)
    }
}
