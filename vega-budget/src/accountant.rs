//! The budget accountant: global token/cost tracking and the veto check.

use crate::pricing::ModelPricing;
use rust_decimal::Decimal;
use vega_trace::TokenUsage;

/// Configured ceilings. Zero means unlimited, matching the spec's
/// `{max_input_tokens, max_output_tokens, max_cost_usd}` with
/// all-zero-is-unlimited convention.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BudgetLimits {
    /// Maximum cumulative input tokens, or 0 for unlimited.
    pub max_input_tokens: u64,
    /// Maximum cumulative output tokens, or 0 for unlimited.
    pub max_output_tokens: u64,
    /// Maximum cumulative cost in USD, or 0 for unlimited.
    pub max_cost_usd: Decimal,
}

/// Process-wide token and cost tracking, shared by every agent in the
/// runtime. There is one `BudgetAccountant` per `Vm`, not one per agent —
/// the limits apply across the whole run.
#[derive(Debug, Clone)]
pub struct BudgetAccountant {
    limits: BudgetLimits,
    used_input_tokens: u64,
    used_output_tokens: u64,
    used_cost_usd: Decimal,
    exceeded: bool,
}

impl BudgetAccountant {
    /// Create an accountant with the given limits and zeroed usage.
    #[must_use]
    pub fn new(limits: BudgetLimits) -> Self {
        Self {
            limits,
            used_input_tokens: 0,
            used_output_tokens: 0,
            used_cost_usd: Decimal::ZERO,
            exceeded: false,
        }
    }

    /// Record a completed response's token usage against the given
    /// model's pricing, updating cumulative usage and the exceeded flag.
    pub fn record(&mut self, model: &str, input_tokens: u64, output_tokens: u64) {
        let pricing = ModelPricing::for_model(model);
        self.used_input_tokens += input_tokens;
        self.used_output_tokens += output_tokens;
        self.used_cost_usd += pricing.cost(input_tokens, output_tokens);
        self.recompute_exceeded();
    }

    fn recompute_exceeded(&mut self) {
        let over_input = self.limits.max_input_tokens != 0 && self.used_input_tokens >= self.limits.max_input_tokens;
        let over_output =
            self.limits.max_output_tokens != 0 && self.used_output_tokens >= self.limits.max_output_tokens;
        let over_cost = self.limits.max_cost_usd != Decimal::ZERO && self.used_cost_usd >= self.limits.max_cost_usd;
        // Once tripped, stays tripped until reset() — a later record() that
        // happens to dip back under a ceiling (it can't, usage only grows,
        // but the flag is sticky by construction regardless) never clears it.
        self.exceeded = self.exceeded || over_input || over_output || over_cost;
    }

    /// Whether any configured limit is at or beyond its ceiling.
    #[must_use]
    pub fn budget_exceeded(&self) -> bool {
        self.exceeded
    }

    /// Render the exceeded-budget error message the VM surfaces to a
    /// program as `Error: Budget exceeded (in: …, out: …, cost: …)`.
    #[must_use]
    pub fn exceeded_message(&self) -> String {
        format!(
            "Budget exceeded (in: {}, out: {}, cost: {})",
            self.used_input_tokens, self.used_output_tokens, self.used_cost_usd
        )
    }

    /// Cumulative input tokens recorded so far.
    #[must_use]
    pub fn used_input_tokens(&self) -> u64 {
        self.used_input_tokens
    }

    /// Cumulative output tokens recorded so far.
    #[must_use]
    pub fn used_output_tokens(&self) -> u64 {
        self.used_output_tokens
    }

    /// Cumulative cost in USD recorded so far.
    #[must_use]
    pub fn used_cost_usd(&self) -> Decimal {
        self.used_cost_usd
    }

    /// The configured limits.
    #[must_use]
    pub fn limits(&self) -> BudgetLimits {
        self.limits
    }

    /// Replace the configured limits (the CLI's `--budget-*` flags apply
    /// their overrides this way before the run starts). Does not touch
    /// usage already recorded or the exceeded flag.
    pub fn set_limits(&mut self, limits: BudgetLimits) {
        self.limits = limits;
    }

    /// Build a [`TokenUsage`] snapshot for this accountant's most recent
    /// totals, for attaching to a trace event.
    #[must_use]
    pub fn usage_snapshot(&self) -> TokenUsage {
        TokenUsage {
            input_tokens: self.used_input_tokens,
            output_tokens: self.used_output_tokens,
            cost: self.used_cost_usd,
        }
    }

    /// Zero all usage counters and clear the exceeded flag.
    pub fn reset(&mut self) {
        self.used_input_tokens = 0;
        self.used_output_tokens = 0;
        self.used_cost_usd = Decimal::ZERO;
        self.exceeded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_by_default() {
        let mut acct = BudgetAccountant::new(BudgetLimits::default());
        acct.record("claude-3-5-sonnet", 1_000_000, 1_000_000);
        assert!(!acct.budget_exceeded());
    }

    #[test]
    fn trips_on_input_ceiling() {
        let mut acct = BudgetAccountant::new(BudgetLimits { max_input_tokens: 100, ..Default::default() });
        acct.record("claude-3-5-sonnet", 50, 0);
        assert!(!acct.budget_exceeded());
        acct.record("claude-3-5-sonnet", 50, 0);
        assert!(acct.budget_exceeded());
    }

    #[test]
    fn stays_exceeded_until_reset() {
        let mut acct = BudgetAccountant::new(BudgetLimits { max_cost_usd: Decimal::new(1, 5), ..Default::default() });
        acct.record("claude-3-5-sonnet", 1_000, 0);
        assert!(acct.budget_exceeded());
        acct.record("claude-3-5-sonnet", 0, 0);
        assert!(acct.budget_exceeded());
        acct.reset();
        assert!(!acct.budget_exceeded());
    }

    #[test]
    fn message_reports_all_three_totals() {
        let mut acct = BudgetAccountant::new(BudgetLimits { max_input_tokens: 1, ..Default::default() });
        acct.record("claude-3-5-sonnet", 5, 2);
        let msg = acct.exceeded_message();
        assert!(msg.starts_with("Budget exceeded"));
        assert!(msg.contains("in: 5"));
        assert!(msg.contains("out: 2"));
    }
}
