//! Small convenience constructors for common types.

use crate::{ChatRequest, Configuration, Message, ProviderId, Role, ToolCall};

pub fn system_message(content: impl Into<String>) -> Message {
    Message::new(Role::System, content)
}

pub fn user_message(content: impl Into<String>) -> Message {
    Message::new(Role::User, content)
}

pub fn assistant_message(content: impl Into<String>) -> Message {
    Message::new(Role::Assistant, content)
}

pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Message {
    Message::assistant_with_tool_calls(content, tool_calls)
}

pub fn tool_message(tool_call_id: impl Into<String>, output: impl Into<String>) -> Message {
    Message::tool_result(tool_call_id, output)
}

pub fn configuration(provider: ProviderId, model: impl Into<String>) -> Configuration {
    Configuration::new(provider, model)
}

pub fn chat_request(history: Vec<Message>, config: Configuration) -> ChatRequest {
    ChatRequest::new(history, config)
}

pub fn parse_provider_id(value: &str) -> Option<ProviderId> {
    ProviderId::parse(value)
}
