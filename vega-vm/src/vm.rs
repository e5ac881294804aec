//! The stack-based interpreter: opcode dispatch, frames, globals, the
//! `ProcessRunner` integration that lets the scheduler drive bytecode
//! execution a step at a time (spec §4.2, §4.5).

use std::collections::HashMap;

use vega_agent::{AgentManager, SendOutcome};
use vega_budget::BudgetAccountant;
use vega_bytecode::{opcode, Image, Op};
use vega_process::{CallFrame, ExitStatus, Pid, ProcessTable};
use vega_scheduler::{ProcessRunner, RunOutcome, Scheduler};
use vega_trace::TraceBus;
use vega_value::{Array, AgentId, FutureId, ResultObj, Value};

use crate::error::VmError;
use crate::native;

/// What a step of the interpreter produced, before it has been folded
/// into a [`vega_scheduler::RunOutcome`].
#[derive(Debug)]
pub enum StepOutcome {
    /// Nothing suspended; keep running this process.
    Continue,
    /// `RETURN` on an empty frame stack, or `EXIT_PROCESS`: the process is
    /// done, value is the process's result/exit payload.
    Halted(Value),
    /// The process is parked; see [`Suspend`] for why.
    Suspended(Suspend),
    /// A halting error. The process is exited with `Error` status.
    Error(VmError),
}

/// Why a process stopped being immediately runnable.
#[derive(Debug, Clone, Copy)]
pub enum Suspend {
    /// `YIELD`: requeue at the back of the ready queue.
    Yield,
    /// `SEND_MSG`: parked waiting on this agent's send to complete.
    SendPending(AgentId),
    /// `AWAIT` on a future that was not yet ready.
    AwaitPending(FutureId),
}

/// The interpreter. Owns the agent manager, budget accountant, and trace
/// bus directly rather than by reference: [`vega_scheduler::Scheduler::run_to_quiescence`]
/// already takes `&mut Scheduler` as a transient parameter to
/// [`ProcessRunner::run_process`], so `Vm` holding a `Scheduler` field of
/// its own would alias that borrow. Everything else it drives
/// (`AgentManager`, `BudgetAccountant`, `TraceBus`) has no such conflict
/// and is owned here outright.
pub struct Vm {
    image: Image,
    agents: AgentManager,
    budget: BudgetAccountant,
    trace: TraceBus,
    globals: HashMap<String, Value>,
    /// Processes parked on `SEND_MSG`, keyed by the agent they're waiting on.
    sends_pending: HashMap<Pid, AgentId>,
    /// Processes parked on `AWAIT`, keyed by the future they're waiting on.
    awaits_pending: HashMap<Pid, FutureId>,
    /// The currently-loaded process's working registers, swapped in/out
    /// of `Process::{value_stack, frames, ip}` around every run.
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    ip: usize,
}

const MAX_GLOBALS: usize = 256;

impl Vm {
    /// A fresh interpreter over `image`, talking to the LLM endpoint with
    /// `api_key`.
    #[must_use]
    pub fn new(image: Image, api_key: impl Into<String>) -> Self {
        Self::with_agent_manager(image, AgentManager::new(api_key))
    }

    /// As [`Vm::new`], but with an already-configured [`AgentManager`]
    /// (tests point this at a local endpoint via
    /// [`AgentManager::with_base_url`]).
    #[must_use]
    pub fn with_agent_manager(image: Image, agents: AgentManager) -> Self {
        Self {
            image,
            agents,
            budget: BudgetAccountant::new(vega_budget::BudgetLimits::default()),
            trace: TraceBus::new(),
            globals: HashMap::new(),
            sends_pending: HashMap::new(),
            awaits_pending: HashMap::new(),
            stack: Vec::new(),
            frames: Vec::new(),
            ip: 0,
        }
    }

    /// The loaded image, for `--debug` summaries.
    #[must_use]
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// The budget accountant, for post-run usage summaries and explicit
    /// `--budget-*` overrides.
    #[must_use]
    pub fn budget(&self) -> &BudgetAccountant {
        &self.budget
    }

    /// Mutable access to the budget accountant (CLI applies `--budget-*`
    /// overrides before the run starts).
    pub fn budget_mut(&mut self) -> &mut BudgetAccountant {
        &mut self.budget
    }

    /// The trace bus, so a caller can subscribe before running.
    #[must_use]
    pub fn trace(&self) -> &TraceBus {
        &self.trace
    }

    /// Spawn the program's entry process into `table` and enqueue it on
    /// `scheduler`: the function named `main`, or function `0` if none is
    /// named that, becomes its first frame.
    ///
    /// # Errors
    ///
    /// Returns [`VmError::InvalidFunctionIndex`] if the image defines no
    /// functions at all.
    pub fn spawn_entry_process(&self, table: &mut ProcessTable, scheduler: &mut Scheduler) -> Result<Pid, VmError> {
        let entry = self
            .image
            .find_function("main")
            .map(|(idx, _)| idx)
            .or(if self.image.functions().is_empty() { None } else { Some(0) })
            .ok_or(VmError::InvalidFunctionIndex(0))?;

        let pid = table.spawn(None, None);
        if let Some(p) = table.get_mut(pid) {
            p.push_frame(CallFrame { function_index: entry, return_ip: 0, base: 0 })?;
            let def = &self.image.functions()[entry as usize];
            p.set_ip(def.offset as usize);
        }
        scheduler.enqueue(table, pid);
        Ok(pid)
    }

    /// Run a native or tool function to completion on a scratch
    /// stack/frame list, returning its result value. Used by the tool-use
    /// sub-loop to execute a tool's bytecode function outside of any
    /// process's own step.
    ///
    /// # Errors
    ///
    /// Propagates whatever [`VmError`] the function's body raised.
    pub fn call_function(&mut self, table: &mut ProcessTable, function_index: u32, args: Vec<Value>) -> Result<Value, VmError> {
        let def = self
            .image
            .functions()
            .get(function_index as usize)
            .ok_or(VmError::InvalidFunctionIndex(function_index))?
            .clone();
        if args.len() as u16 != def.params {
            return Err(VmError::ArityMismatch { expected: def.params, found: args.len() as u16 });
        }

        let saved_stack = std::mem::take(&mut self.stack);
        let saved_frames = std::mem::take(&mut self.frames);
        let saved_ip = self.ip;

        self.stack = args;
        self.stack.resize(def.locals as usize, Value::Null);
        self.frames = vec![CallFrame { function_index, return_ip: 0, base: 0 }];
        self.ip = def.offset as usize;

        let result = loop {
            match self.step_once(table, None, 0) {
                StepOutcome::Continue => continue,
                StepOutcome::Halted(v) => break Ok(v),
                StepOutcome::Error(e) => break Err(e),
                StepOutcome::Suspended(_) => {
                    break Err(VmError::NotCallable("a tool function may not itself SEND_MSG/AWAIT synchronously"))
                }
            }
        };

        self.stack = saved_stack;
        self.frames = saved_frames;
        self.ip = saved_ip;
        result
    }

    fn load_working_registers(&mut self, table: &ProcessTable, pid: Pid) {
        if let Some(p) = table.get(pid) {
            self.stack = p.value_stack().to_vec();
            self.frames = p.frames().to_vec();
            self.ip = p.ip();
        }
    }

    fn store_working_registers(&mut self, table: &mut ProcessTable, pid: Pid) {
        if let Some(p) = table.get_mut(pid) {
            p.set_value_stack(std::mem::take(&mut self.stack));
            p.set_frames(std::mem::take(&mut self.frames));
            p.set_ip(self.ip);
        }
    }

    fn pop(&mut self) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    fn push(&mut self, v: Value) -> Result<(), VmError> {
        if self.stack.len() >= vega_process::MAX_VALUE_STACK {
            return Err(VmError::Process(vega_process::ProcessLimitError::ValueStackOverflow));
        }
        self.stack.push(v);
        Ok(())
    }

    /// Decode and execute exactly one opcode for the currently-loaded
    /// working registers. `pid`/`now_ms` are only needed by opcodes that
    /// touch the process table or the wall clock (spawn/send/yield/exit);
    /// they may be `None`/`0` when running a scratch tool call.
    fn step_once(&mut self, table: &mut ProcessTable, pid: Option<Pid>, now_ms: u64) -> StepOutcome {
        let code = self.image.code();
        let (op, next_ip) = match opcode::decode(code, self.ip) {
            Ok(v) => v,
            Err(e) => return StepOutcome::Error(VmError::Image(e)),
        };
        self.ip = next_ip;

        match self.dispatch(op, table, pid, now_ms) {
            Ok(Some(out)) => out,
            Ok(None) => StepOutcome::Continue,
            Err(e) => StepOutcome::Error(e),
        }
    }

    #[allow(clippy::too_many_lines)]
    fn dispatch(&mut self, op: Op, table: &mut ProcessTable, pid: Option<Pid>, now_ms: u64) -> Result<Option<StepOutcome>, VmError> {
        match op {
            Op::Nop => {}
            Op::PushConst(idx) => self.push(self.image.constants().get(idx)?.to_value())?,
            Op::PushInt(v) => self.push(Value::Int(v.into()))?,
            Op::PushTrue => self.push(Value::Bool(true))?,
            Op::PushFalse => self.push(Value::Bool(false))?,
            Op::PushNull => self.push(Value::Null)?,
            Op::Pop => {
                self.pop()?;
            }
            Op::Dup => {
                let v = self.stack.last().cloned().ok_or(VmError::StackUnderflow)?;
                self.push(v)?;
            }
            Op::LoadLocal(slot) => {
                let base = self.frames.last().map_or(0, |f| f.base);
                let v = self.stack.get(base + slot as usize).cloned().ok_or(VmError::InvalidLocal(slot))?;
                self.push(v)?;
            }
            Op::StoreLocal(slot) => {
                let base = self.frames.last().map_or(0, |f| f.base);
                let v = self.pop()?;
                let dest = self.stack.get_mut(base + slot as usize).ok_or(VmError::InvalidLocal(slot))?;
                *dest = v;
            }
            Op::LoadGlobal(idx) => {
                let name = self.image.constants().get_str(idx)?.to_string();
                let v = match self.globals.get(&name) {
                    Some(v) => v.clone(),
                    None => match self.image.find_function(&name) {
                        Some((fi, _)) => Value::Function(fi),
                        None => return Err(VmError::UnknownGlobal(name)),
                    },
                };
                self.push(v)?;
            }
            Op::StoreGlobal(idx) => {
                let name = self.image.constants().get_str(idx)?.to_string();
                let v = self.pop()?;
                if !self.globals.contains_key(&name) && self.globals.len() >= MAX_GLOBALS {
                    return Err(VmError::TooManyGlobals);
                }
                self.globals.insert(name, v);
            }
            Op::Add => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(add(a, b)?)?;
            }
            Op::Sub => self.numeric_binop(i64::wrapping_sub, |x, y| x - y)?,
            Op::Mul => self.numeric_binop(i64::wrapping_mul, |x, y| x * y)?,
            Op::Div => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(checked_div(a, b)?)?;
            }
            Op::Mod => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(checked_mod(a, b)?)?;
            }
            Op::Neg => {
                let a = self.pop()?;
                let v = match a {
                    Value::Int(x) => Value::Int(x.wrapping_neg()),
                    Value::Float(x) => Value::Float(-x),
                    other => return Err(type_mismatch("int or float", &other)),
                };
                self.push(v)?;
            }
            Op::Eq => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(values_equal(&a, &b)))?;
            }
            Op::Ne => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(!values_equal(&a, &b)))?;
            }
            Op::Lt => self.compare(|o| o == std::cmp::Ordering::Less)?,
            Op::Le => self.compare(|o| o != std::cmp::Ordering::Greater)?,
            Op::Gt => self.compare(|o| o == std::cmp::Ordering::Greater)?,
            Op::Ge => self.compare(|o| o != std::cmp::Ordering::Less)?,
            Op::Not => {
                let a = self.pop()?;
                self.push(Value::Bool(!a.truthy()))?;
            }
            Op::And => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(a.truthy() && b.truthy()))?;
            }
            Op::Or => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(a.truthy() || b.truthy()))?;
            }
            Op::Jump(off) => self.ip = offset_ip(self.ip, off),
            Op::JumpIf(off) => {
                let v = self.pop()?;
                if v.truthy() {
                    self.ip = offset_ip(self.ip, off);
                }
            }
            Op::JumpIfNot(off) => {
                let v = self.pop()?;
                if !v.truthy() {
                    self.ip = offset_ip(self.ip, off);
                }
            }
            Op::Call(argc) => self.call(argc)?,
            Op::Return => {
                let result = self.pop()?;
                match self.frames.pop() {
                    Some(frame) => {
                        self.stack.truncate(frame.base);
                        self.ip = frame.return_ip;
                        self.push(result)?;
                    }
                    None => return Ok(Some(StepOutcome::Halted(result))),
                }
            }
            Op::CallNative(idx) => {
                let name = self.image.constants().get_str(idx)?.to_string();
                let v = native::call(&name, &mut self.stack)?;
                self.push(v)?;
            }
            Op::SpawnAgent(idx) | Op::SpawnAsync(idx) => {
                let name = self.image.constants().get_str(idx)?.to_string();
                let id = self.agents.spawn(&self.image, &name, &self.trace, now_ms)?;
                self.push(Value::Agent(id))?;
            }
            Op::SpawnSupervised { name_idx, strategy, max_restarts, window_ms } => {
                let name = self.image.constants().get_str(name_idx)?.to_string();
                let config = vega_process::SupervisionConfig {
                    strategy: decode_strategy(strategy),
                    max_restarts,
                    window_ms: window_ms.into(),
                    ..vega_process::SupervisionConfig::default()
                };
                let (id, _pid) = self.agents.spawn_supervised(&self.image, &name, table, pid, config, &self.trace, now_ms)?;
                self.push(Value::Agent(id))?;
            }
            Op::SendMsg => {
                let text = self.pop_string()?;
                let agent = self.pop_agent()?;
                self.agents.begin_send(agent, text, &self.trace, now_ms)?;
                let Some(pid) = pid else { return Err(VmError::NotAnAgent("no process to park on SEND_MSG")) };
                self.sends_pending.insert(pid, agent);
                return Ok(Some(StepOutcome::Suspended(Suspend::SendPending(agent))));
            }
            Op::SendAsync => {
                let text = self.pop_string()?;
                let agent = self.pop_agent()?;
                let future = self.agents.begin_send_async(agent, text, &self.trace, now_ms)?;
                self.push(Value::Future(future))?;
            }
            Op::Await => {
                let v = self.pop()?;
                let Value::Future(future) = v else { return Err(type_mismatch_owned("future", &v)) };
                match self.agents.future_state(future) {
                    None => return Err(VmError::UnknownFuture(future.0)),
                    Some(vega_agent::FutureState::Ready(text)) => self.push(Value::string(text.clone()))?,
                    Some(vega_agent::FutureState::Error(msg)) => self.push(Value::string(msg.clone()))?,
                    Some(vega_agent::FutureState::Pending) => {
                        self.push(Value::Future(future))?;
                        self.ip -= Op::Await.encoded_len();
                        let Some(pid) = pid else { return Err(VmError::NotAnAgent("no process to park on AWAIT")) };
                        self.awaits_pending.insert(pid, future);
                        return Ok(Some(StepOutcome::Suspended(Suspend::AwaitPending(future))));
                    }
                }
            }
            Op::GetField | Op::ArrayGet => {
                let index = self.pop_index()?;
                let arr = self.pop_array()?;
                let v = arr.borrow().get(index).ok_or(vega_value::ValueError::IndexOutOfBounds { index, len: arr.borrow().len() })?;
                self.push(v)?;
            }
            Op::SetField | Op::ArraySet => {
                let value = self.pop()?;
                let index = self.pop_index()?;
                let arr = self.pop_array()?;
                arr.borrow_mut().set(index, value)?;
            }
            Op::CallMethod { name_idx, argc } => self.call_method(name_idx, argc)?,
            Op::StrConcat => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::string(format!("{}{}", a.stringify(), b.stringify())))?;
            }
            Op::StrHas => {
                let needle = self.pop_string()?;
                let haystack = self.pop_string()?;
                self.push(Value::Bool(haystack.contains(&needle)))?;
            }
            Op::Yield => return Ok(Some(StepOutcome::Suspended(Suspend::Yield))),
            Op::ExitProcess(reason) => {
                let v = self.pop().unwrap_or(Value::Null);
                let status = match reason {
                    0 => ExitStatus::normal(),
                    1 => ExitStatus::error(v.stringify()),
                    _ => ExitStatus::killed(v.stringify()),
                };
                if let (Some(pid), Some(p)) = (pid, pid.and_then(|pid| table.get_mut(pid))) {
                    p.exit(status);
                    let _ = pid;
                }
                return Ok(Some(StepOutcome::Halted(v)));
            }
            Op::Link | Op::Monitor => {
                // Best-effort bookkeeping only: link the current process to
                // the popped agent's owning process, if it has one.
                let agent = self.pop_agent()?;
                if let (Some(pid), Ok(target)) = (pid, self.agents.get(agent)) {
                    if let Some(target_pid) = target.borrow().process() {
                        if let Some(p) = table.get_mut(pid) {
                            p.wait_on(target_pid);
                        }
                    }
                }
            }
            Op::ResultOk => {
                let v = self.pop()?;
                self.push(Value::Result(ResultObj::ok(v)))?;
            }
            Op::ResultErr => {
                let v = self.pop()?;
                self.push(Value::Result(ResultObj::err(v)))?;
            }
            Op::ResultIsOk => {
                let v = self.pop()?;
                let Value::Result(r) = v else { return Err(type_mismatch_owned("result", &v)) };
                self.push(Value::Bool(r.is_ok()))?;
            }
            Op::ResultUnwrap => {
                let v = self.pop()?;
                let Value::Result(r) = v else { return Err(type_mismatch_owned("result", &v)) };
                self.push(r.unwrap())?;
            }
            Op::ArrayNew(cap) => self.push(Value::Array(Array::new(cap as usize)))?,
            Op::ArrayPush => {
                let v = self.pop()?;
                let arr = self.pop_array()?;
                arr.borrow_mut().push(v);
            }
            Op::ArrayLen => {
                let arr = self.pop_array()?;
                let len = arr.borrow().len();
                self.push(Value::Int(len as i64))?;
            }
            Op::Print => {
                let v = self.pop()?;
                let text = v.stringify();
                if self.trace.has_subscribers() {
                    self.trace.publish(
                        &vega_trace::TraceEvent::new(vega_trace::EventKind::Print, now_ms)
                            .with_data(serde_json::json!({"text": text})),
                    );
                } else {
                    println!("{text}");
                }
            }
            Op::Halt => {
                let v = self.stack.pop().unwrap_or(Value::Null);
                return Ok(Some(StepOutcome::Halted(v)));
            }
        }
        Ok(None)
    }

    fn call(&mut self, argc: u8) -> Result<(), VmError> {
        let callee = self.stack.get(self.stack.len().wrapping_sub(1 + argc as usize)).cloned().ok_or(VmError::StackUnderflow)?;
        let Value::Function(fi) = callee else { return Err(type_mismatch_owned("function", &callee)) };
        let def = self.image.functions().get(fi as usize).ok_or(VmError::InvalidFunctionIndex(fi))?.clone();
        if u16::from(argc) != def.params {
            return Err(VmError::ArityMismatch { expected: def.params, found: argc.into() });
        }
        let base = self.stack.len() - 1 - argc as usize;
        self.stack.remove(base);
        self.stack.resize(base + def.locals as usize, Value::Null);
        self.frames.push(CallFrame { function_index: fi, return_ip: self.ip, base });
        self.ip = def.offset as usize;
        Ok(())
    }

    fn call_method(&mut self, name_idx: u16, argc: u8) -> Result<(), VmError> {
        let name = self.image.constants().get_str(name_idx)?.to_string();
        let mut args = Vec::with_capacity(argc as usize);
        for _ in 0..argc {
            args.push(self.pop()?);
        }
        args.reverse();
        let receiver = self.pop()?;
        let Value::Str(s) = &receiver else { return Err(type_mismatch_owned("str", &receiver)) };
        let result = match name.as_str() {
            "has" => {
                let needle = args.first().map(Value::stringify).unwrap_or_default();
                Value::Bool(s.as_str().contains(&needle))
            }
            "len" => Value::Int(s.as_str().len() as i64),
            other => return Err(VmError::UnknownNative(format!("str.{other}"))),
        };
        self.push(result)?;
        Ok(())
    }

    fn numeric_binop(&mut self, int_op: impl Fn(i64, i64) -> i64, float_op: impl Fn(f64, f64) -> f64) -> Result<(), VmError> {
        let b = self.pop()?;
        let a = self.pop()?;
        if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
            self.push(Value::Int(int_op(*x, *y)))?;
            return Ok(());
        }
        match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => {
                self.push(Value::Float(float_op(x, y)))?;
                Ok(())
            }
            _ => Err(type_mismatch_owned("int or float", if a.as_f64().is_none() { &a } else { &b })),
        }
    }

    fn compare(&mut self, pred: impl Fn(std::cmp::Ordering) -> bool) -> Result<(), VmError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let ordering = match (&a, &b) {
            (Value::Str(x), Value::Str(y)) => x.as_str().cmp(y.as_str()),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal),
                _ => return Err(type_mismatch_owned("comparable values", &a)),
            },
        };
        self.push(Value::Bool(pred(ordering)))?;
        Ok(())
    }

    fn pop_string(&mut self) -> Result<String, VmError> {
        let v = self.pop()?;
        Ok(v.stringify())
    }

    fn pop_agent(&mut self) -> Result<AgentId, VmError> {
        let v = self.pop()?;
        match v {
            Value::Agent(id) => Ok(id),
            other => Err(type_mismatch_owned("agent", &other)),
        }
    }

    fn pop_array(&mut self) -> Result<std::rc::Rc<std::cell::RefCell<Array>>, VmError> {
        let v = self.pop()?;
        match v {
            Value::Array(a) => Ok(a),
            other => Err(type_mismatch_owned("array", &other)),
        }
    }

    fn pop_index(&mut self) -> Result<usize, VmError> {
        let v = self.pop()?;
        match v {
            Value::Int(i) if i >= 0 => Ok(i as usize),
            other => Err(type_mismatch_owned("non-negative int", &other)),
        }
    }

    /// Drive pending agent sends and futures one tick. Returns whether any
    /// of them made progress (completed, advanced a tool round, resolved a
    /// future).
    fn poll_async_once(&mut self, table: &mut ProcessTable, scheduler: &mut Scheduler, now_ms: u64) -> bool {
        let mut progressed = false;

        let send_pids: Vec<Pid> = self.sends_pending.keys().copied().collect();
        for owner_pid in send_pids {
            let Some(&agent_id) = self.sends_pending.get(&owner_pid) else { continue };
            let outcome = match self.agents.poll_send(agent_id, table, &mut self.budget, &self.trace, now_ms) {
                Ok(o) => o,
                Err(e) => {
                    tracing::error!(error = %e, "agent manager reported a structural fault while polling a send");
                    self.sends_pending.remove(&owner_pid);
                    if let Some(p) = table.get_mut(owner_pid) {
                        p.push_value(Value::string(format!("Error: {e}"))).ok();
                    }
                    scheduler.unblock(table, owner_pid);
                    progressed = true;
                    continue;
                }
            };

            match outcome {
                SendOutcome::Pending => {}
                SendOutcome::ToolCall { function_index, args, assistant_content, tool_use_id, iteration } => {
                    progressed = true;
                    let result_text = match self.call_function(table, function_index, args) {
                        Ok(v) => v.stringify(),
                        Err(e) => format!("Error: {e}"),
                    };
                    if let Err(e) =
                        self.agents.continue_after_tool(agent_id, assistant_content, tool_use_id, iteration, &result_text, &self.trace, now_ms)
                    {
                        tracing::error!(error = %e, "failed to continue agent send after tool call");
                    }
                }
                SendOutcome::Done(text) => {
                    progressed = true;
                    self.sends_pending.remove(&owner_pid);
                    if let Some(p) = table.get_mut(owner_pid) {
                        p.push_value(Value::string(text)).ok();
                    }
                    scheduler.unblock(table, owner_pid);
                }
            }
        }

        // `SEND_ASYNC` sends have no process parked on them to drive
        // `poll_send` forward (that's the whole point of "async"), so the
        // scheduler has to poll every agent with a future in flight itself.
        for agent_id in self.agents.pending_async_agents() {
            let outcome = match self.agents.poll_send(agent_id, table, &mut self.budget, &self.trace, now_ms) {
                Ok(o) => o,
                Err(e) => {
                    tracing::error!(error = %e, "agent manager reported a structural fault while polling an async send");
                    continue;
                }
            };

            match outcome {
                SendOutcome::Pending => {}
                SendOutcome::ToolCall { function_index, args, assistant_content, tool_use_id, iteration } => {
                    progressed = true;
                    let result_text = match self.call_function(table, function_index, args) {
                        Ok(v) => v.stringify(),
                        Err(e) => format!("Error: {e}"),
                    };
                    if let Err(e) =
                        self.agents.continue_after_tool(agent_id, assistant_content, tool_use_id, iteration, &result_text, &self.trace, now_ms)
                    {
                        tracing::error!(error = %e, "failed to continue agent send after tool call");
                    }
                }
                SendOutcome::Done(_) => {
                    // The result lives in the future table; AWAIT (or a
                    // future poll of the same agent) reads it from there.
                    progressed = true;
                }
            }
        }

        let await_pids: Vec<Pid> = self.awaits_pending.keys().copied().collect();
        for owner_pid in await_pids {
            let Some(&future_id) = self.awaits_pending.get(&owner_pid) else { continue };
            let ready = matches!(
                self.agents.future_state(future_id),
                Some(vega_agent::FutureState::Ready(_) | vega_agent::FutureState::Error(_))
            );
            if ready {
                progressed = true;
                self.awaits_pending.remove(&owner_pid);
                // Don't touch the parked stack here: AWAIT rewound `ip` to
                // itself and left the `Future` on top of the stack, so the
                // re-executed opcode will pop that same `Future`, see it's
                // no longer `Pending`, and push the result itself.
                scheduler.unblock(table, owner_pid);
            }
        }

        progressed
    }
}

impl ProcessRunner for Vm {
    fn run_process(&mut self, table: &mut ProcessTable, scheduler: &mut Scheduler, pid: Pid, now_ms: u64) -> RunOutcome {
        self.load_working_registers(table, pid);

        let outcome = loop {
            match self.step_once(table, Some(pid), now_ms) {
                StepOutcome::Continue => continue,
                other => break other,
            }
        };

        match outcome {
            StepOutcome::Continue => unreachable!("loop only exits on a non-Continue outcome"),
            StepOutcome::Halted(_) => {
                self.store_working_registers(table, pid);
                if let Some(p) = table.get_mut(pid) {
                    if p.exit_status().is_none() {
                        p.exit(ExitStatus::normal());
                    }
                }
                self.handle_own_exit(table, scheduler, pid, now_ms);
                RunOutcome::Exited
            }
            StepOutcome::Error(e) => {
                self.store_working_registers(table, pid);
                tracing::error!(pid = %pid, error = %e, "process halted on a runtime error");
                if let Some(p) = table.get_mut(pid) {
                    p.exit(ExitStatus::error(e.to_string()));
                }
                self.handle_own_exit(table, scheduler, pid, now_ms);
                RunOutcome::Exited
            }
            StepOutcome::Suspended(Suspend::Yield) => {
                self.store_working_registers(table, pid);
                RunOutcome::Yielded
            }
            StepOutcome::Suspended(Suspend::SendPending(_) | Suspend::AwaitPending(_)) => {
                self.store_working_registers(table, pid);
                RunOutcome::Blocked
            }
        }
    }

    fn poll_async(&mut self, table: &mut ProcessTable, scheduler: &mut Scheduler, now_ms: u64) -> bool {
        self.poll_async_once(table, scheduler, now_ms)
    }
}

impl Vm {
    /// Drive supervisor exit-propagation for a process whose exit
    /// originated from the bytecode interpreter itself (`RETURN` past an
    /// empty frame stack, `EXIT_PROCESS`, or an uncaught [`VmError`]).
    ///
    /// Agent-send retry exhaustion already calls
    /// `vega_process::handle_exit` internally inside `AgentManager`, so it
    /// is deliberately not re-invoked here — doing so twice for the same
    /// exit would double-count restart-window and circuit-breaker state.
    fn handle_own_exit(&mut self, table: &mut ProcessTable, scheduler: &mut Scheduler, pid: Pid, now_ms: u64) {
        self.sends_pending.remove(&pid);
        self.awaits_pending.remove(&pid);
        for action in vega_process::handle_exit(table, pid, now_ms) {
            if let vega_process::SupervisorAction::Restart(revived) = action {
                if let Some(p) = table.get_mut(revived) {
                    p.revive();
                }
                scheduler.enqueue(table, revived);
            }
        }
    }
}

fn offset_ip(ip: usize, off: i16) -> usize {
    (ip as i64 + i64::from(off)) as usize
}

fn decode_strategy(byte: u8) -> vega_process::Strategy {
    match byte {
        1 => vega_process::Strategy::Stop,
        2 => vega_process::Strategy::Escalate,
        3 => vega_process::Strategy::RestartAll,
        _ => vega_process::Strategy::Restart,
    }
}

fn type_mismatch(expected: &'static str, found: &Value) -> VmError {
    VmError::Value(vega_value::ValueError::TypeMismatch { expected, found: found.type_name() })
}

fn type_mismatch_owned(expected: &'static str, found: &Value) -> VmError {
    type_mismatch(expected, found)
}

fn add(a: Value, b: Value) -> Result<Value, VmError> {
    match (&a, &b) {
        (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::string(format!("{}{}", a.stringify(), b.stringify()))),
        (Value::Array(x), Value::Array(y)) => Ok(Value::Array(Array::from_vec(Array::concat(&x.borrow(), &y.borrow())))),
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_add(*y))),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Float(x + y)),
            _ => Err(type_mismatch("number, string, or array", &a)),
        },
    }
}

fn checked_div(a: Value, b: Value) -> Result<Value, VmError> {
    if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
        return Ok(if *y == 0 { Value::Null } else { Value::Int(x.wrapping_div(*y)) });
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok(if y == 0.0 { Value::Null } else { Value::Float(x / y) }),
        _ => Err(type_mismatch("int or float", &a)),
    }
}

fn checked_mod(a: Value, b: Value) -> Result<Value, VmError> {
    if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
        return Ok(if *y == 0 { Value::Null } else { Value::Int(x.wrapping_rem(*y)) });
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok(if y == 0.0 { Value::Null } else { Value::Float(x % y) }),
        _ => Err(type_mismatch("int or float", &a)),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => (*x as f64) == *y,
        (Value::Str(x), Value::Str(y)) => x.as_str() == y.as_str(),
        (Value::Agent(x), Value::Agent(y)) => x == y,
        (Value::Future(x), Value::Future(y)) => x == y,
        (Value::Function(x), Value::Function(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => std::rc::Rc::ptr_eq(x, y),
        (Value::Result(x), Value::Result(y)) => std::rc::Rc::ptr_eq(x, y),
        _ => false,
    }
}
