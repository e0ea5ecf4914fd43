mod adapter;
mod decoder;
mod serde_api;
mod tests;

pub use adapter::{ANTHROPIC_BASE_URL, AnthropicAdapter};
pub use serde_api::{ANTHROPIC_VERSION, DEFAULT_MAX_TOKENS, thinking_budget};
