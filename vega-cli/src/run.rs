//! The `vega <file.vgb>` run path: load an image, spawn its entry
//! process, and drive the scheduler to quiescence on a real wall clock
//! (spec §5 — the scheduler itself never reads the clock; only the
//! top-level driver, here, does).

use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use vega_bytecode::Image;
use vega_process::{ExitReason, ProcessTable};
use vega_scheduler::{Scheduler, SchedulerStatus};
use vega_vm::Vm;

use crate::error::CliError;

/// `--budget-*` overrides layered on top of the VM's default (unlimited)
/// budget before the run starts.
#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetOverrides {
    /// `--budget-input`.
    pub max_input_tokens: Option<u64>,
    /// `--budget-output`.
    pub max_output_tokens: Option<u64>,
    /// `--budget-cost`.
    pub max_cost_usd: Option<Decimal>,
}

/// How long the driver sleeps between scheduler passes while every
/// process is `Waiting` on in-flight HTTP (spec §5's helper threads poll
/// a mutex-guarded status word; there is no point spinning on it).
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Run `image` to completion, printing `--debug` section sizes up front
/// and a memory/token summary afterward when `debug` is set.
///
/// # Errors
///
/// [`CliError::Runtime`] if the entry process halted on an unrecoverable
/// interpreter error (spec §7's "VM errors").
pub fn run_image(image: Image, api_key: Option<String>, budget: BudgetOverrides, debug: bool) -> Result<(), CliError> {
    if debug {
        let s = image.debug_summary();
        println!(
            "functions: {}  agents: {}  constants: {} ({} bytes)  code: {} bytes",
            s.function_count, s.agent_count, s.constant_count, s.constant_bytes, s.code_bytes
        );
    }

    let mut vm = Vm::new(image, api_key.unwrap_or_default());

    let mut limits = vm.budget().limits();
    if let Some(v) = budget.max_input_tokens {
        limits.max_input_tokens = v;
    }
    if let Some(v) = budget.max_output_tokens {
        limits.max_output_tokens = v;
    }
    if let Some(v) = budget.max_cost_usd {
        limits.max_cost_usd = v;
    }
    vm.budget_mut().set_limits(limits);

    let mut table = ProcessTable::new();
    let mut scheduler = Scheduler::new();
    let entry = vm.spawn_entry_process(&mut table, &mut scheduler).map_err(|e| CliError::Runtime(e.to_string()))?;

    let start = Instant::now();
    loop {
        let now_ms = start.elapsed().as_millis() as u64;
        match scheduler.run_to_quiescence(&mut table, &mut vm, now_ms) {
            SchedulerStatus::Done => break,
            SchedulerStatus::Idle => std::thread::sleep(IDLE_POLL),
        }
    }

    if debug {
        let mem = vega_value::heap_stats();
        println!(
            "live heap objects: strings {} arrays {} results {}",
            mem.strings_live, mem.arrays_live, mem.results_live
        );
    }

    let used_input = vm.budget().used_input_tokens();
    let used_output = vm.budget().used_output_tokens();
    if used_input > 0 || used_output > 0 {
        println!(
            "tokens used: in {} out {} cost ${}",
            used_input,
            used_output,
            vm.budget().used_cost_usd()
        );
    }

    let exit = table.get(entry).and_then(vega_process::Process::exit_status);
    match exit {
        Some(status) if status.reason == ExitReason::Error => {
            Err(CliError::Runtime(status.message.clone().unwrap_or_else(|| "unknown error".to_string())))
        }
        _ => Ok(()),
    }
}
