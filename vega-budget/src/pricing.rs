//! Per-model token pricing.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// Price per million input and output tokens for one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// USD per 1,000,000 input tokens.
    pub input_per_million: Decimal,
    /// USD per 1,000,000 output tokens.
    pub output_per_million: Decimal,
}

impl ModelPricing {
    /// The default pricing used for any model this table has no explicit
    /// entry for: $3 per million input tokens, $15 per million output.
    #[must_use]
    pub fn default_pricing() -> Self {
        Self {
            input_per_million: Decimal::from_i32(3).unwrap(),
            output_per_million: Decimal::from_i32(15).unwrap(),
        }
    }

    /// Look up pricing for a model name, falling back to
    /// [`ModelPricing::default_pricing`] for unrecognized names.
    #[must_use]
    pub fn for_model(model: &str) -> Self {
        match model {
            "claude-3-opus" | "claude-3-opus-20240229" => Self {
                input_per_million: Decimal::from_i32(15).unwrap(),
                output_per_million: Decimal::from_i32(75).unwrap(),
            },
            "claude-3-5-sonnet" | "claude-3-5-sonnet-20241022" | "claude-3-sonnet" => {
                Self::default_pricing()
            }
            "claude-3-haiku" | "claude-3-5-haiku" | "claude-3-haiku-20240307" => Self {
                input_per_million: Decimal::new(25, 2),
                output_per_million: Decimal::from_i32(1).unwrap(),
            },
            _ => Self::default_pricing(),
        }
    }

    /// Dollar cost of `input_tokens`/`output_tokens` at this pricing.
    #[must_use]
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> Decimal {
        let million = Decimal::from_i32(1_000_000).unwrap();
        (Decimal::from(input_tokens) / million) * self.input_per_million
            + (Decimal::from(output_tokens) / million) * self.output_per_million
    }
}
