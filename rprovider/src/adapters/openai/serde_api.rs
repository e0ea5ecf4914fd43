//! Chat Completions payload serde models and request construction.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ChatRequest, Message, ProviderError, ProviderId, Role, ToolDefinition};

/// Name of the output token limit field in the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenParameter {
    MaxTokens,
    MaxCompletionTokens,
}

impl TokenParameter {
    /// Reasoning model families reject `max_tokens`.
    pub fn for_model(model: &str) -> Self {
        let model = model.trim().to_ascii_lowercase();
        let model = model.rsplit('/').next().unwrap_or(model.as_str());
        if ["o1", "o3", "o4", "gpt-5"]
            .iter()
            .any(|family| model.starts_with(family))
        {
            Self::MaxCompletionTokens
        } else {
            Self::MaxTokens
        }
    }
}

/// How a vendor expects the web-search toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebSearchStyle {
    /// `web_search_options: {}`
    SearchOptions,
    /// `web_search: {"enable": true}`
    EnableFlag,
    Unsupported,
}

pub(crate) fn build_api_request(
    provider: ProviderId,
    request: &ChatRequest,
    token_parameter: TokenParameter,
    web_search: WebSearchStyle,
) -> Result<OpenAiApiRequest, ProviderError> {
    let config = &request.config;
    let messages = request
        .history
        .iter()
        .map(OpenAiApiMessage::from)
        .collect::<Vec<_>>();

    let tools = if config.tools.is_empty() {
        None
    } else {
        Some(
            config
                .tools
                .iter()
                .map(OpenAiApiTool::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        )
    };

    let (max_tokens, max_completion_tokens) = match token_parameter {
        TokenParameter::MaxTokens => (config.options.max_tokens, None),
        TokenParameter::MaxCompletionTokens => (None, config.options.max_tokens),
    };

    let mut web_search_options = None;
    let mut web_search_flag = None;
    if config.options.web_search {
        match web_search {
            WebSearchStyle::SearchOptions => {
                web_search_options = Some(Value::Object(serde_json::Map::new()));
            }
            WebSearchStyle::EnableFlag => {
                web_search_flag = Some(OpenAiApiWebSearchFlag { enable: true });
            }
            WebSearchStyle::Unsupported => {
                tracing::warn!(
                    provider = %provider,
                    model = %config.model,
                    "web search requested but not supported by this vendor, ignoring"
                );
            }
        }
    }

    Ok(OpenAiApiRequest {
        model: config.model.clone(),
        messages,
        stream: true,
        stream_options: OpenAiApiStreamOptions {
            include_usage: true,
        },
        tools,
        temperature: config.options.temperature,
        max_tokens,
        max_completion_tokens,
        reasoning_effort: config
            .options
            .reasoning_effort
            .map(|effort| effort.as_str().to_string()),
        web_search_options,
        web_search: web_search_flag,
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiRequest {
    pub model: String,
    pub messages: Vec<OpenAiApiMessage>,
    pub stream: bool,
    pub stream_options: OpenAiApiStreamOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search_options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_search: Option<OpenAiApiWebSearchFlag>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiStreamOptions {
    pub include_usage: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiWebSearchFlag {
    pub enable: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiMessage {
    pub role: &'static str,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAiApiToolCall>>,
}

impl From<&Message> for OpenAiApiMessage {
    fn from(value: &Message) -> Self {
        let tool_calls = (!value.tool_calls.is_empty()).then(|| {
            value
                .tool_calls
                .iter()
                .map(|call| OpenAiApiToolCall {
                    id: call.id.clone(),
                    kind: "function",
                    function: OpenAiApiToolCallFunction {
                        name: call.name.clone(),
                        arguments: call.arguments.clone(),
                    },
                })
                .collect()
        });

        let content = if value.role == Role::Assistant
            && tool_calls.is_some()
            && value.content.is_empty()
        {
            None
        } else {
            Some(value.content.clone())
        };

        Self {
            role: value.role.as_str(),
            content,
            tool_call_id: value.tool_call_id.clone(),
            tool_calls,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: OpenAiApiToolCallFunction,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiToolCallFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: OpenAiApiFunction,
}

impl TryFrom<&ToolDefinition> for OpenAiApiTool {
    type Error = ProviderError;

    fn try_from(value: &ToolDefinition) -> Result<Self, Self::Error> {
        let parameters = serde_json::from_str::<Value>(&value.input_schema).map_err(|_| {
            ProviderError::configuration(format!(
                "input schema for tool '{}' must be valid JSON",
                value.name
            ))
        })?;

        Ok(Self {
            kind: "function",
            function: OpenAiApiFunction {
                name: value.name.clone(),
                description: value.description.clone(),
                parameters,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamChunk {
    #[serde(default)]
    pub choices: Vec<OpenAiApiStreamChoice>,
    #[serde(default)]
    pub usage: Option<OpenAiApiUsage>,
    #[serde(default)]
    pub error: Option<OpenAiApiStreamError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamChoice {
    #[serde(default)]
    pub delta: Option<OpenAiApiDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiDelta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiApiToolCallDelta>>,
    #[serde(default)]
    pub images: Option<Vec<OpenAiApiImageDelta>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiToolCallDelta {
    #[serde(default)]
    pub index: Option<u32>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub function: Option<OpenAiApiFunctionDelta>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiFunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiImageDelta {
    #[serde(default)]
    pub image_url: Option<OpenAiApiImageUrl>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub completion_tokens_details: Option<OpenAiApiCompletionDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiCompletionDetails {
    #[serde(default)]
    pub reasoning_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiStreamError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<Value>,
}

impl OpenAiApiStreamError {
    /// Maps a mid-stream error object by its `code`/`type`.
    pub(crate) fn into_provider_error(self, raw: &str) -> ProviderError {
        let code = match &self.code {
            Some(Value::String(code)) => code.to_ascii_lowercase(),
            Some(Value::Number(code)) => code.to_string(),
            _ => String::new(),
        };
        let kind = self.kind.unwrap_or_default().to_ascii_lowercase();
        let message = self
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "upstream reported a stream error".to_string());
        let mentions = |needle: &str| code.contains(needle) || kind.contains(needle);

        let error = if mentions("rate_limit") || code == "429" {
            ProviderError::rate_limited(message)
        } else if mentions("overloaded") || mentions("server_error") || code.starts_with('5') {
            ProviderError::transient(message)
        } else {
            ProviderError::protocol(message)
        };

        error.with_detail(raw)
    }
}
