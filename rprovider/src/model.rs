//! Provider-agnostic request, message, and usage model types.
//!
//! ```rust
//! use rprovider::{ChatRequest, Configuration, Message, ProviderErrorKind, ProviderId, Role};
//!
//! let config = Configuration::new(ProviderId::OpenAi, "gpt-4o-mini");
//! let ok = ChatRequest::new(vec![Message::new(Role::User, "Summarize this diff")], config);
//! assert!(ok.validate().is_ok());
//!
//! let err = Configuration::builder(ProviderId::OpenAi, "")
//!     .build()
//!     .err()
//!     .expect("empty model should fail");
//! assert_eq!(err.kind, ProviderErrorKind::Configuration);
//! ```

use std::fmt::{Display, Formatter};

use rcommon::{GenerationOptions, ImageSize, MetadataMap, ReasoningEffort};

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
    DeepSeek,
    Anthropic,
    QianFan,
}

impl ProviderId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Anthropic => "anthropic",
            Self::QianFan => "qianfan",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "deepseek" => Some(Self::DeepSeek),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "qianfan" | "baidu" => Some(Self::QianFan),
            _ => None,
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub tool_call_id: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    /// Assistant message that requested tool invocations.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, output)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: String,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: input_schema.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub reasoning_tokens: u32,
}

impl Usage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
            reasoning_tokens: 0,
        }
    }

    pub fn with_reasoning_tokens(mut self, reasoning_tokens: u32) -> Self {
        self.reasoning_tokens = reasoning_tokens;
        self
    }

    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// Per-turn settings, read-only once a turn starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub provider: ProviderId,
    pub model: String,
    pub options: GenerationOptions,
    pub tools: Vec<ToolDefinition>,
    pub metadata: MetadataMap,
}

impl Configuration {
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            options: GenerationOptions::default(),
            tools: Vec::new(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn builder(provider: ProviderId, model: impl Into<String>) -> ConfigurationBuilder {
        ConfigurationBuilder::new(provider, model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.options.reasoning_effort = Some(effort);
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.options.web_search = enabled;
        self
    }

    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.options.image_size = Some(size);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.model.trim().is_empty() {
            return Err(ProviderError::configuration("model must not be empty"));
        }

        if let Some(max_tokens) = self.options.max_tokens
            && max_tokens == 0
        {
            return Err(ProviderError::configuration(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.options.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ProviderError::configuration(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(ProviderError::configuration("tool name must not be empty"));
            }

            if serde_json::from_str::<serde_json::Value>(&tool.input_schema).is_err() {
                return Err(ProviderError::configuration(format!(
                    "input schema for tool '{}' must be valid JSON",
                    tool.name
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationBuilder {
    config: Configuration,
}

impl ConfigurationBuilder {
    pub fn new(provider: ProviderId, model: impl Into<String>) -> Self {
        Self {
            config: Configuration::new(provider, model),
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.options.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.config.options.reasoning_effort = Some(effort);
        self
    }

    pub fn web_search(mut self, enabled: bool) -> Self {
        self.config.options.web_search = enabled;
        self
    }

    pub fn image_size(mut self, size: ImageSize) -> Self {
        self.config.options.image_size = Some(size);
        self
    }

    pub fn tool(mut self, tool: ToolDefinition) -> Self {
        self.config.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.config.tools.extend(tools);
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.metadata.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> Result<Configuration, ProviderError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub history: Vec<Message>,
    pub config: Configuration,
}

impl ChatRequest {
    pub fn new(history: Vec<Message>, config: Configuration) -> Self {
        Self { history, config }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.history.is_empty() {
            return Err(ProviderError::configuration(
                "at least one message is required",
            ));
        }

        self.config.validate()
    }
}
