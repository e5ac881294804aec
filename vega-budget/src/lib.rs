//! Process-wide token and cost accounting for the Vega runtime.
//!
//! One [`BudgetAccountant`] is owned by the `Vm` and shared by every agent
//! it spawns — there is no per-agent or per-session budget scope. Usage
//! only ever grows and the exceeded flag, once tripped, stays tripped
//! until [`BudgetAccountant::reset`] is called explicitly.

#![deny(missing_docs)]

mod accountant;
mod pricing;

pub use accountant::{BudgetAccountant, BudgetLimits};
pub use pricing::ModelPricing;
