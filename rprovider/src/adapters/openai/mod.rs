mod adapter;
mod decoder;
mod serde_api;

pub use adapter::{DEEPSEEK_BASE_URL, OPENAI_BASE_URL, OpenAiCompatibleAdapter};
pub use serde_api::{TokenParameter, WebSearchStyle};
