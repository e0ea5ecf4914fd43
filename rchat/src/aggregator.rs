//! Folds an adapter's segment sequence into one [`Turn`].
//!
//! ```rust
//! use rchat::{TurnAggregator, TurnState};
//! use rcommon::TurnId;
//! use rprovider::{Configuration, ConversationSegment, FinishReason, ProviderId, Usage};
//!
//! let config = Configuration::new(ProviderId::OpenAi, "gpt-x");
//! let mut aggregator = TurnAggregator::new(TurnId::new("turn-1"), config);
//!
//! aggregator.apply(&ConversationSegment::usage_only(10, 0)).unwrap();
//! aggregator.apply(&ConversationSegment::text("Hel")).unwrap();
//! aggregator
//!     .apply(
//!         &ConversationSegment::text("lo")
//!             .with_usage(Usage::new(10, 2))
//!             .with_finish_reason(FinishReason::Stop),
//!     )
//!     .unwrap();
//!
//! let turn = aggregator.finish(None).unwrap();
//! assert_eq!(turn.text, "Hello");
//! assert_eq!(turn.usage, Usage::new(10, 2));
//! assert_eq!(turn.state, TurnState::Committed);
//! ```

use std::collections::BTreeMap;

use rcommon::TurnId;
use rprovider::{
    Configuration, ConversationSegment, ImageSegment, ModelPrices, ToolCall, ToolCallFragment,
    compute_cost,
};

use crate::{ChatError, Turn, TurnState};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ToolCallAccumulator {
    id: Option<String>,
    kind: Option<String>,
    name: Option<String>,
    arguments: String,
}

impl ToolCallAccumulator {
    fn merge(&mut self, index: u32, fragment: &ToolCallFragment) -> Result<(), ChatError> {
        merge_field(&mut self.id, fragment.id.as_ref(), index, "id")?;
        merge_field(&mut self.kind, fragment.kind.as_ref(), index, "type")?;
        merge_field(&mut self.name, fragment.function_name.as_ref(), index, "name")?;
        self.arguments.push_str(&fragment.arguments_chunk);
        Ok(())
    }

    fn build(&self, index: u32) -> ToolCall {
        ToolCall {
            id: self
                .id
                .clone()
                .unwrap_or_else(|| format!("call_{index}")),
            name: self.name.clone().unwrap_or_default(),
            arguments: self.arguments.clone(),
        }
    }
}

fn merge_field(
    recorded: &mut Option<String>,
    incoming: Option<&String>,
    index: u32,
    field: &str,
) -> Result<(), ChatError> {
    let Some(incoming) = incoming else {
        return Ok(());
    };

    match recorded {
        Some(existing) if existing != incoming => Err(ChatError::protocol(format!(
            "tool call {index} changed {field} from '{existing}' to '{incoming}'"
        ))),
        Some(_) => Ok(()),
        None => {
            *recorded = Some(incoming.clone());
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
pub struct TurnAggregator {
    turn: Turn,
    tools: BTreeMap<u32, ToolCallAccumulator>,
}

impl TurnAggregator {
    pub fn new(turn_id: TurnId, config: Configuration) -> Self {
        Self {
            turn: Turn::new(turn_id, config),
            tools: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> TurnState {
        self.turn.state
    }

    pub fn turn(&self) -> &Turn {
        &self.turn
    }

    /// Started tool calls in index order, as accumulated so far.
    pub fn tool_calls(&self) -> Vec<(u32, ToolCall)> {
        self.tools
            .iter()
            .map(|(index, accumulator)| (*index, accumulator.build(*index)))
            .collect()
    }

    pub fn apply(&mut self, segment: &ConversationSegment) -> Result<(), ChatError> {
        match self.turn.state {
            TurnState::Pending => self.turn.state = TurnState::Streaming,
            TurnState::Streaming => {}
            state => {
                return Err(ChatError::protocol(format!(
                    "segment received while turn is {state}"
                )));
            }
        }

        if self.turn.finish_reason.is_some() {
            return Err(ChatError::protocol(
                "segment received after the finish reason",
            ));
        }

        self.turn.text.push_str(&segment.text);
        if let Some(reasoning) = &segment.reasoning {
            self.turn.reasoning.push_str(reasoning);
        }

        for fragment in &segment.tool_calls {
            self.tools
                .entry(fragment.index)
                .or_default()
                .merge(fragment.index, fragment)?;
        }

        if let Some(ImageSegment::Generated { payload, .. }) = &segment.image {
            self.turn.images.push(payload.clone());
        }

        // all-zero counts carry no usage
        let usage = segment.usage();
        if usage.input_tokens > 0 || usage.output_tokens > 0 || usage.reasoning_tokens > 0 {
            self.turn.usage = usage;
        }

        if let Some(reason) = &segment.finish_reason {
            self.turn.finish_reason = Some(reason.clone());
        }

        Ok(())
    }

    /// Moves `Streaming → Finalizing`, reconstructing tool calls and pricing the usage.
    pub fn finalize(&mut self, prices: Option<&ModelPrices>) -> Result<(), ChatError> {
        match self.turn.state {
            TurnState::Streaming => {}
            TurnState::Pending => {
                return Err(ChatError::protocol(
                    "stream ended before any segment was received",
                ));
            }
            state => {
                return Err(ChatError::protocol(format!(
                    "cannot finalize a turn that is {state}"
                )));
            }
        }

        self.turn.state = TurnState::Finalizing;
        self.turn.tool_calls = self.build_tool_calls();
        self.turn.cost = prices.map(|prices| compute_cost(&self.turn.usage, prices));
        Ok(())
    }

    /// Moves `Finalizing → Committed` and returns the committed turn.
    pub fn commit(&mut self) -> Result<Turn, ChatError> {
        if self.turn.state != TurnState::Finalizing {
            return Err(ChatError::protocol(format!(
                "cannot commit a turn that is {}",
                self.turn.state
            )));
        }

        self.turn.state = TurnState::Committed;
        Ok(self.turn.clone())
    }

    pub fn finish(&mut self, prices: Option<&ModelPrices>) -> Result<Turn, ChatError> {
        self.finalize(prices)?;
        self.commit()
    }

    /// Moves any non-terminal state to `Failed`, keeping the accumulated content.
    pub fn fail(&mut self, error: &ChatError) -> Turn {
        if !self.turn.state.is_terminal() {
            tracing::debug!(
                turn_id = %self.turn.id,
                from = %self.turn.state,
                error = %error,
                "turn failed"
            );
            self.turn.state = TurnState::Failed;
            self.turn.tool_calls = self.build_tool_calls();
        }

        self.turn.clone()
    }

    fn build_tool_calls(&self) -> Vec<ToolCall> {
        self.tools
            .iter()
            .map(|(index, accumulator)| accumulator.build(*index))
            .collect()
    }
}
