//! Token estimation and cost computation.
//!
//! The tokenizer is process-wide and read-only. Every function here is pure.
//!
//! ```rust
//! use rprovider::{ModelPrices, Usage, compute_cost, estimate_output_tokens};
//! use rust_decimal::Decimal;
//!
//! assert_eq!(estimate_output_tokens(""), 0);
//! assert!(estimate_output_tokens("hello world") > 0);
//!
//! let prices = ModelPrices::new(Decimal::new(3, 0), Decimal::new(15, 0));
//! let cost = compute_cost(&Usage::new(1_000_000, 2_000_000), &prices);
//! assert_eq!(cost.total(), Decimal::new(33, 0));
//! ```

use std::sync::OnceLock;

use rust_decimal::Decimal;
use tiktoken_rs::CoreBPE;

use crate::{Message, Usage};

const MESSAGE_FRAMING_TOKENS: u32 = 4;
const REPLY_PRIMER_TOKENS: u32 = 3;

fn tokenizer() -> Option<&'static CoreBPE> {
    static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();

    CL100K
        .get_or_init(|| match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "cl100k tokenizer unavailable, estimating tokens from character count"
                );
                None
            }
        })
        .as_ref()
}

/// Estimates tokens for a text delta with the shared `cl100k_base` tokenizer.
pub fn estimate_output_tokens(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }

    let count = match tokenizer() {
        Some(bpe) => bpe.encode_ordinary(text).len(),
        None => text.chars().count().div_ceil(4),
    };
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Estimates prompt tokens using the chat framing convention.
pub fn estimate_prompt_tokens(history: &[Message]) -> u32 {
    history
        .iter()
        .map(|message| {
            let calls = message
                .tool_calls
                .iter()
                .map(|call| estimate_output_tokens(&call.name) + estimate_output_tokens(&call.arguments))
                .sum::<u32>();
            estimate_output_tokens(&message.content)
                .saturating_add(calls)
                .saturating_add(MESSAGE_FRAMING_TOKENS)
        })
        .fold(REPLY_PRIMER_TOKENS, u32::saturating_add)
}

/// Prices per one million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelPrices {
    pub input_price_1m: Decimal,
    pub output_price_1m: Decimal,
}

impl ModelPrices {
    pub fn new(input_price_1m: Decimal, output_price_1m: Decimal) -> Self {
        Self {
            input_price_1m,
            output_price_1m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cost {
    pub input_cost: Decimal,
    pub output_cost: Decimal,
}

impl Cost {
    pub fn total(&self) -> Decimal {
        self.input_cost + self.output_cost
    }
}

pub fn compute_cost(usage: &Usage, prices: &ModelPrices) -> Cost {
    let per_token = Decimal::from(1_000_000_u32);

    Cost {
        input_cost: Decimal::from(usage.input_tokens) * prices.input_price_1m / per_token,
        output_cost: Decimal::from(usage.output_tokens) * prices.output_price_1m / per_token,
    }
}

/// Running token counts for one streamed turn.
///
/// Vendor-reported usage overwrites the running value; deltas without usage
/// add estimated tokens on top of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenCounter {
    usage: Usage,
}

impl TokenCounter {
    pub fn new(input_estimate: u32) -> Self {
        Self {
            usage: Usage::new(input_estimate, 0),
        }
    }

    pub fn add_output_estimate(&mut self, text: &str) {
        self.usage.output_tokens = self
            .usage
            .output_tokens
            .saturating_add(estimate_output_tokens(text));
    }

    pub fn add_reasoning_estimate(&mut self, text: &str) {
        let tokens = estimate_output_tokens(text);
        self.usage.output_tokens = self.usage.output_tokens.saturating_add(tokens);
        self.usage.reasoning_tokens = self.usage.reasoning_tokens.saturating_add(tokens);
    }

    pub fn set_input(&mut self, input_tokens: u32) {
        self.usage.input_tokens = input_tokens;
    }

    pub fn set_output(&mut self, output_tokens: u32) {
        self.usage.output_tokens = output_tokens;
    }

    pub fn set_reasoning(&mut self, reasoning_tokens: u32) {
        self.usage.reasoning_tokens = reasoning_tokens;
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::Role;

    #[test]
    fn estimation_is_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog.";
        assert_eq!(estimate_output_tokens(text), estimate_output_tokens(text));
        assert!(estimate_output_tokens(text) >= 5);
    }

    #[test]
    fn prompt_estimate_includes_framing() {
        let empty = estimate_prompt_tokens(&[]);
        assert_eq!(empty, REPLY_PRIMER_TOKENS);

        let history = vec![Message::new(Role::User, "hi")];
        assert_eq!(
            estimate_prompt_tokens(&history),
            REPLY_PRIMER_TOKENS + MESSAGE_FRAMING_TOKENS + estimate_output_tokens("hi")
        );
    }

    #[test]
    fn cost_uses_per_million_prices() {
        let prices = ModelPrices::new(
            Decimal::from_str("2.50").expect("decimal"),
            Decimal::from_str("10").expect("decimal"),
        );
        let cost = compute_cost(&Usage::new(10, 2), &prices);

        assert_eq!(cost.input_cost, Decimal::from_str("0.000025").expect("decimal"));
        assert_eq!(cost.output_cost, Decimal::from_str("0.00002").expect("decimal"));
        assert_eq!(cost.total(), Decimal::from_str("0.000045").expect("decimal"));
    }

    #[test]
    fn counter_overwrites_with_vendor_values_and_accumulates_estimates() {
        let mut counter = TokenCounter::new(12);
        counter.add_output_estimate("hello there");
        let estimated = counter.usage().output_tokens;
        assert!(estimated > 0);

        counter.set_output(40);
        counter.add_reasoning_estimate("thinking");
        let usage = counter.usage();
        assert!(usage.output_tokens > 40);
        assert_eq!(usage.reasoning_tokens, estimate_output_tokens("thinking"));
        assert_eq!(usage.input_tokens, 12);
    }
}
