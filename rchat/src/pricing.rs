//! Price lookup collaborator used once per turn at finalize.

use std::collections::HashMap;

use rprovider::ModelPrices;

pub trait PriceTable: Send + Sync {
    /// `None` for models without a price; the turn then carries no cost.
    fn prices(&self, model: &str) -> Option<ModelPrices>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticPriceTable {
    models: HashMap<String, ModelPrices>,
}

impl StaticPriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>, prices: ModelPrices) -> Self {
        self.insert(model, prices);
        self
    }

    pub fn insert(&mut self, model: impl Into<String>, prices: ModelPrices) -> Option<ModelPrices> {
        self.models.insert(model.into(), prices)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl PriceTable for StaticPriceTable {
    fn prices(&self, model: &str) -> Option<ModelPrices> {
        self.models.get(model).copied()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn unknown_models_have_no_prices() {
        let prices = ModelPrices::new(Decimal::from(3), Decimal::from(15));
        let table = StaticPriceTable::new().with_model("claude-sonnet-4", prices);

        assert_eq!(table.prices("claude-sonnet-4"), Some(prices));
        assert_eq!(table.prices("gpt-x"), None);
        assert_eq!(table.len(), 1);
    }
}
