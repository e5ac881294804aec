use proptest::prelude::*;
use vega_budget::{BudgetAccountant, BudgetLimits};

proptest! {
    #[test]
    fn usage_is_non_decreasing_and_exceeded_is_sticky(
        deltas in proptest::collection::vec((0u64..10_000, 0u64..10_000), 1..50),
    ) {
        let mut acct = BudgetAccountant::new(BudgetLimits { max_input_tokens: 5_000, ..Default::default() });
        let mut prev_in = 0u64;
        let mut prev_out = 0u64;
        let mut was_exceeded = false;

        for (input, output) in deltas {
            acct.record("claude-3-5-sonnet", input, output);

            prop_assert!(acct.used_input_tokens() >= prev_in);
            prop_assert!(acct.used_output_tokens() >= prev_out);
            if was_exceeded {
                prop_assert!(acct.budget_exceeded());
            }

            prev_in = acct.used_input_tokens();
            prev_out = acct.used_output_tokens();
            was_exceeded = acct.budget_exceeded();
        }
    }

    #[test]
    fn reset_clears_usage_and_exceeded(input in 0u64..20_000, output in 0u64..20_000) {
        let mut acct = BudgetAccountant::new(BudgetLimits { max_input_tokens: 10, ..Default::default() });
        acct.record("claude-3-5-sonnet", input, output);
        acct.reset();
        prop_assert_eq!(acct.used_input_tokens(), 0);
        prop_assert_eq!(acct.used_output_tokens(), 0);
        prop_assert!(!acct.budget_exceeded());
    }
}
