//! The agent manager: spawn, the synchronous/async send surface, the
//! tool-use sub-loop's request bookkeeping, and retry/backoff/circuit
//! breaker wiring (spec §4.3, §4.4, §4.7).
//!
//! The manager never runs a tool itself — it only decides *that* one
//! must run and hands the interpreter everything it needs
//! ([`SendOutcome::ToolCall`]). Running the tool's function, and feeding
//! the result back through [`AgentManager::continue_after_tool`], is the
//! VM's job; this keeps the bytecode interpreter as the only thing that
//! ever executes a frame.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use vega_bytecode::{AgentDef, Image};
use vega_budget::{BudgetAccountant, ModelPricing};
use vega_http::{
    build_request_body, classify_status, AsyncRequest, ChatMessage, DEFAULT_TIMEOUT_SECS, FailureKind,
    RequestOutcome, ToolSpec,
};
use vega_process::{handle_exit, ExitStatus, Pid, ProcessTable, SupervisionConfig};
use vega_trace::{EventKind, TokenUsage, TraceBus, TraceEvent};
use vega_value::{AgentId, FutureId, Value};

use crate::agent::Agent;
use crate::async_state::{AsyncState, ToolContext};
use crate::error::AgentError;
use crate::futures::{FutureState, FutureTable};
use crate::tool::{decode_tool_args, discover_tools, AgentTool, ParamType};

/// Default endpoint this seam speaks to, absent an override.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// Tool-use rounds allowed within a single send before the loop gives up
/// (spec §4.4: ten rounds, the eleventh is the failure).
const MAX_TOOL_ITERATIONS: u32 = 10;

/// Supervised processes this manager will link an agent to before
/// falling back to spawning it unsupervised and logging a diagnostic.
const MAX_SUPERVISED_PROCESSES: usize = 4096;

/// What advancing a send produced this step.
#[derive(Debug)]
pub enum SendOutcome {
    /// Still waiting on the network or a backoff delay; nothing to do.
    Pending,
    /// The model asked for a tool call the interpreter must run: decode
    /// the arguments, invoke `function_index`, stringify its return
    /// value, and hand the result to
    /// [`AgentManager::continue_after_tool`].
    ToolCall {
        /// Function table index of the tool to invoke.
        function_index: u32,
        /// Decoded arguments, in declared parameter order.
        args: Vec<Value>,
        /// Raw assistant content block to replay on the follow-up request.
        assistant_content: serde_json::Value,
        /// The tool_use id to echo back in the tool-result turn.
        tool_use_id: String,
        /// Which tool-use round this is (1-based).
        iteration: u32,
    },
    /// The send is finished. Carries the assistant's final text on
    /// success, or an `Error: ...`-prefixed message on any failure path
    /// (fatal HTTP status, exhausted retries, exceeded budget, unknown
    /// tool, or too many tool-use iterations).
    Done(String),
}

enum RetryDecision {
    CircuitOpen,
    Retry(u64),
    Exhausted,
}

/// Owns every spawned agent and the pending-future table backing
/// `SEND_ASYNC`/`AWAIT`.
///
/// Agents live in an arena addressed by [`AgentId`]; `Value::Agent`
/// carries the id directly rather than a raw pointer, since Rust's own
/// ownership (an `Rc<RefCell<Agent>>` per slot) already gives the
/// runtime the shared-mutable-handle semantics the spec's GC-oriented
/// framing wanted a manual refcount for.
pub struct AgentManager {
    agents: Vec<Rc<RefCell<Agent>>>,
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    futures: FutureTable,
    pending_futures: HashMap<u32, FutureId>,
}

impl AgentManager {
    /// A manager talking to the default Anthropic endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// A manager talking to an arbitrary endpoint (tests, proxies).
    #[must_use]
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            agents: Vec::new(),
            client: reqwest::blocking::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            futures: FutureTable::new(),
            pending_futures: HashMap::new(),
        }
    }

    /// The pending-future table backing `AWAIT`.
    #[must_use]
    pub fn futures(&self) -> &FutureTable {
        &self.futures
    }

    /// Look up a spawned agent by id.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidAgentId`] if `id` does not index into
    /// this manager's arena.
    pub fn get(&self, id: AgentId) -> Result<&Rc<RefCell<Agent>>, AgentError> {
        self.agents.get(id.0 as usize).ok_or(AgentError::InvalidAgentId(id.0))
    }

    /// Spawn an agent from the image's static definition, with no
    /// supervised process backing it (spec §4.3, unsupervised form).
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnknownAgent`] if no agent in `image` has
    /// this name, or [`AgentError::Image`] if its name/model/system
    /// constants are malformed.
    pub fn spawn(&mut self, image: &Image, agent_name: &str, trace: &TraceBus, now_ms: u64) -> Result<AgentId, AgentError> {
        let def = find_agent_def(image, agent_name)?;
        let model = image.constants().get_str(def.model_idx)?;
        let system = image.constants().get_str(def.system_idx)?;
        let tools = discover_tools(image, agent_name);
        let agent = Agent::new(agent_name.to_string(), model.to_string(), system.to_string(), def.temperature(), tools);

        let id = AgentId(self.agents.len() as u32);
        self.agents.push(Rc::new(RefCell::new(agent)));
        trace.publish(&TraceEvent::new(EventKind::AgentSpawn, now_ms).with_agent(id.0, Some(agent_name.to_string())));
        Ok(id)
    }

    /// Spawn an agent and link it to a freshly allocated supervised
    /// process (spec §4.3, supervised form): the process carries
    /// `config` as its own supervision policy, used both for restart
    /// bookkeeping on exit and directly by this manager's retry logic on
    /// the agent's own send failures (spec §4.7).
    ///
    /// If the process table is already at [`MAX_SUPERVISED_PROCESSES`],
    /// the agent is still spawned but returned unsupervised (`None` pid)
    /// and a diagnostic is logged, rather than failing the spawn outright.
    ///
    /// # Errors
    ///
    /// As [`AgentManager::spawn`], plus [`AgentError::Process`] if
    /// `parent` is already at its child-count limit.
    pub fn spawn_supervised(
        &mut self,
        image: &Image,
        agent_name: &str,
        table: &mut ProcessTable,
        parent: Option<Pid>,
        config: SupervisionConfig,
        trace: &TraceBus,
        now_ms: u64,
    ) -> Result<(AgentId, Option<Pid>), AgentError> {
        let id = self.spawn(image, agent_name, trace, now_ms)?;

        if table.len() >= MAX_SUPERVISED_PROCESSES {
            tracing::warn!(agent = agent_name, "process table full, spawning unsupervised");
            return Ok((id, None));
        }

        let pid = table.spawn(parent, Some(id));
        if let Some(p) = table.get_mut(pid) {
            p.make_supervisor(config);
        }
        if let Some(parent_pid) = parent {
            if let Some(parent_proc) = table.get_mut(parent_pid) {
                parent_proc.add_child(pid)?;
            }
        }
        self.get(id)?.borrow_mut().set_process(pid);
        Ok((id, Some(pid)))
    }

    /// Start a synchronous send (spec §4.4 step 0): append `text` as a
    /// user turn and launch the request. Poll with
    /// [`AgentManager::poll_send`] until it returns
    /// [`SendOutcome::Done`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidAgentId`] if `id` is unknown.
    pub fn begin_send(&mut self, id: AgentId, text: impl Into<String>, trace: &TraceBus, now_ms: u64) -> Result<(), AgentError> {
        let agent_rc = self.get(id)?.clone();
        let text = text.into();
        agent_rc.borrow_mut().push_user(text.clone());

        let request = {
            let agent = agent_rc.borrow();
            self.launch(&agent, None)
        };
        agent_rc.borrow_mut().set_async_state(AsyncState::Awaiting { request, tool_ctx: None });

        let name = agent_rc.borrow().name().to_string();
        trace.publish(
            &TraceEvent::new(EventKind::MessageSent, now_ms)
                .with_agent(id.0, Some(name.clone()))
                .with_data(serde_json::json!({"text": text})),
        );
        trace.publish(&TraceEvent::new(EventKind::HttpStart, now_ms).with_agent(id.0, Some(name)));
        Ok(())
    }

    /// Start an async send (`SEND_ASYNC`): identical to
    /// [`AgentManager::begin_send`], but the result is delivered through
    /// a [`FutureId`] rather than by polling the agent directly.
    ///
    /// # Errors
    ///
    /// As [`AgentManager::begin_send`].
    pub fn begin_send_async(&mut self, id: AgentId, text: impl Into<String>, trace: &TraceBus, now_ms: u64) -> Result<FutureId, AgentError> {
        self.begin_send(id, text, trace, now_ms)?;
        let future_id = self.futures.alloc(id);
        self.pending_futures.insert(id.0, future_id);
        Ok(future_id)
    }

    /// The resolution state of a future allocated by
    /// [`AgentManager::begin_send_async`], for `AWAIT` to inspect.
    #[must_use]
    pub fn future_state(&self, id: FutureId) -> Option<&FutureState> {
        self.futures.get(id).map(|r| &r.state)
    }

    /// Agents with a `SEND_ASYNC` in flight that no process is parked on.
    ///
    /// Unlike a synchronous `SEND_MSG`, nothing else drives these sends
    /// forward step by step, so the scheduler must poll each of them on
    /// every tick until their future resolves.
    #[must_use]
    pub fn pending_async_agents(&self) -> Vec<AgentId> {
        self.pending_futures.keys().map(|&id| AgentId(id)).collect()
    }

    /// Advance a send one step: check whether the in-flight request
    /// finished, relaunch a scheduled retry if its delay has elapsed, or
    /// report the outcome of whatever just completed.
    ///
    /// This never blocks and never runs a tool itself — a tool call is
    /// reported back as [`SendOutcome::ToolCall`] for the interpreter to
    /// execute and feed back through
    /// [`AgentManager::continue_after_tool`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidAgentId`] if `id` is unknown.
    pub fn poll_send(
        &mut self,
        id: AgentId,
        table: &mut ProcessTable,
        budget: &mut BudgetAccountant,
        trace: &TraceBus,
        now_ms: u64,
    ) -> Result<SendOutcome, AgentError> {
        let agent_rc = self.get(id)?.clone();
        let owner_pid = agent_rc.borrow().process();
        let state = agent_rc.borrow_mut().take_async_state();

        match state {
            AsyncState::Idle => {
                agent_rc.borrow_mut().set_async_state(AsyncState::Idle);
                Ok(SendOutcome::Pending)
            }
            AsyncState::RetryScheduled { tool_ctx, not_before } => {
                if now_ms < not_before {
                    agent_rc.borrow_mut().set_async_state(AsyncState::RetryScheduled { tool_ctx, not_before });
                    return Ok(SendOutcome::Pending);
                }
                let request = {
                    let agent = agent_rc.borrow();
                    self.launch(&agent, tool_ctx.as_ref())
                };
                agent_rc.borrow_mut().set_async_state(AsyncState::Awaiting { request, tool_ctx });
                let name = agent_rc.borrow().name().to_string();
                trace.publish(&TraceEvent::new(EventKind::HttpStart, now_ms).with_agent(id.0, Some(name)));
                Ok(SendOutcome::Pending)
            }
            AsyncState::Awaiting { mut request, tool_ctx } => {
                if !request.is_done() {
                    agent_rc.borrow_mut().set_async_state(AsyncState::Awaiting { request, tool_ctx });
                    return Ok(SendOutcome::Pending);
                }
                let outcome = request
                    .get_response()
                    .unwrap_or_else(|| RequestOutcome::Transport("request thread lost its result".to_string()));
                self.handle_completed(id, &agent_rc, outcome, tool_ctx, owner_pid, table, budget, trace, now_ms)
            }
        }
    }

    /// Feed a tool's stringified result back in after
    /// [`SendOutcome::ToolCall`]: rebuilds the assistant turn plus a
    /// tool-result turn and launches the follow-up request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidAgentId`] if `id` is unknown.
    pub fn continue_after_tool(
        &mut self,
        id: AgentId,
        assistant_content: serde_json::Value,
        tool_use_id: String,
        iteration: u32,
        result_text: &str,
        trace: &TraceBus,
        now_ms: u64,
    ) -> Result<(), AgentError> {
        let agent_rc = self.get(id)?.clone();
        let ctx = ToolContext { assistant_content, tool_use_id, iteration, result_text: result_text.to_string() };

        let request = {
            let agent = agent_rc.borrow();
            self.launch(&agent, Some(&ctx))
        };
        agent_rc.borrow_mut().set_async_state(AsyncState::Awaiting { request, tool_ctx: Some(ctx) });

        let name = agent_rc.borrow().name().to_string();
        trace.publish(
            &TraceEvent::new(EventKind::ToolResult, now_ms)
                .with_agent(id.0, Some(name.clone()))
                .with_data(serde_json::json!({"result": result_text})),
        );
        trace.publish(&TraceEvent::new(EventKind::HttpStart, now_ms).with_agent(id.0, Some(name)));
        Ok(())
    }

    fn launch(&self, agent: &Agent, tool_round: Option<&ToolContext>) -> AsyncRequest {
        let mut messages: Vec<ChatMessage> = agent.to_chat_messages();
        if let Some(ctx) = tool_round {
            messages.push(ChatMessage::assistant_raw(ctx.assistant_content.clone()));
            messages.push(ChatMessage::tool_result(&ctx.tool_use_id, &ctx.result_text));
        }
        let tools = tool_specs(agent.tools());
        let body = build_request_body(agent.model(), agent.system(), agent.temperature(), &messages, &tools);
        AsyncRequest::spawn(
            self.client.clone(),
            self.base_url.clone(),
            self.api_key.clone(),
            body,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_completed(
        &mut self,
        id: AgentId,
        agent_rc: &Rc<RefCell<Agent>>,
        outcome: RequestOutcome,
        tool_ctx: Option<ToolContext>,
        owner_pid: Option<Pid>,
        table: &mut ProcessTable,
        budget: &mut BudgetAccountant,
        trace: &TraceBus,
        now_ms: u64,
    ) -> Result<SendOutcome, AgentError> {
        let name = agent_rc.borrow().name().to_string();

        match outcome {
            RequestOutcome::Success(resp) => {
                if let Some(pid) = owner_pid {
                    if let Some(cfg) = table.get_mut(pid).and_then(|p| p.supervision_mut()) {
                        cfg.circuit.record_success();
                    }
                }

                let model = agent_rc.borrow().model().to_string();
                budget.record(&model, resp.usage.input_tokens, resp.usage.output_tokens);
                let usage = TokenUsage {
                    input_tokens: resp.usage.input_tokens,
                    output_tokens: resp.usage.output_tokens,
                    cost: ModelPricing::for_model(&model).cost(resp.usage.input_tokens, resp.usage.output_tokens),
                };
                trace.publish(&TraceEvent::new(EventKind::HttpDone, now_ms).with_agent(id.0, Some(name.clone())).with_usage(usage));

                if budget.budget_exceeded() {
                    agent_rc.borrow_mut().set_async_state(AsyncState::Idle);
                    let msg = format!("Error: {}", budget.exceeded_message());
                    self.resolve_future(id, Err(msg.clone()));
                    trace.publish(
                        &TraceEvent::new(EventKind::Error, now_ms)
                            .with_agent(id.0, Some(name))
                            .with_data(serde_json::json!({"message": msg})),
                    );
                    return Ok(SendOutcome::Done(msg));
                }

                if let Some((tool_use_id, tool_name, input)) = resp.tool_use() {
                    let iteration = tool_ctx.as_ref().map_or(1, |c| c.iteration + 1);
                    if iteration > MAX_TOOL_ITERATIONS {
                        agent_rc.borrow_mut().set_async_state(AsyncState::Idle);
                        let msg = "Error: Max tool iterations exceeded".to_string();
                        self.resolve_future(id, Err(msg.clone()));
                        return Ok(SendOutcome::Done(msg));
                    }

                    trace.publish(
                        &TraceEvent::new(EventKind::ToolCall, now_ms)
                            .with_agent(id.0, Some(name.clone()))
                            .with_data(serde_json::json!({"tool": tool_name, "input": input})),
                    );

                    let found_tool = agent_rc.borrow().find_tool(tool_name).cloned();
                    match found_tool {
                        Some(tool) => {
                            let args = decode_tool_args(&tool, input);
                            agent_rc.borrow_mut().set_async_state(AsyncState::Idle);
                            Ok(SendOutcome::ToolCall {
                                function_index: tool.function_index,
                                args,
                                assistant_content: resp.raw_content.clone(),
                                tool_use_id: tool_use_id.to_string(),
                                iteration,
                            })
                        }
                        None => {
                            let result_text = format!("Unknown tool '{tool_name}'");
                            trace.publish(
                                &TraceEvent::new(EventKind::ToolResult, now_ms)
                                    .with_agent(id.0, Some(name))
                                    .with_data(serde_json::json!({"result": result_text})),
                            );
                            self.continue_after_tool(
                                id,
                                resp.raw_content.clone(),
                                tool_use_id.to_string(),
                                iteration,
                                &result_text,
                                trace,
                                now_ms,
                            )?;
                            Ok(SendOutcome::Pending)
                        }
                    }
                } else {
                    let text = resp.text();
                    agent_rc.borrow_mut().push_assistant(text.clone());
                    agent_rc.borrow_mut().set_async_state(AsyncState::Idle);
                    trace.publish(
                        &TraceEvent::new(EventKind::MessageReceived, now_ms)
                            .with_agent(id.0, Some(name))
                            .with_data(serde_json::json!({"text": text})),
                    );
                    self.resolve_future(id, Ok(text.clone()));
                    Ok(SendOutcome::Done(text))
                }
            }
            RequestOutcome::HttpStatus { status, body } => {
                let kind = classify_status(status, &body);
                let detail = format!("HTTP {status}: {body}");
                self.handle_failure(id, agent_rc, kind, detail, tool_ctx, owner_pid, table, trace, now_ms)
            }
            RequestOutcome::Transport(message) => {
                let kind = classify_status(0, &message);
                self.handle_failure(id, agent_rc, kind, message, tool_ctx, owner_pid, table, trace, now_ms)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_failure(
        &mut self,
        id: AgentId,
        agent_rc: &Rc<RefCell<Agent>>,
        kind: FailureKind,
        detail: String,
        tool_ctx: Option<ToolContext>,
        owner_pid: Option<Pid>,
        table: &mut ProcessTable,
        trace: &TraceBus,
        now_ms: u64,
    ) -> Result<SendOutcome, AgentError> {
        let name = agent_rc.borrow().name().to_string();
        trace.publish(
            &TraceEvent::new(EventKind::HttpDone, now_ms)
                .with_agent(id.0, Some(name.clone()))
                .with_data(serde_json::json!({"error": detail})),
        );

        match kind {
            FailureKind::None => unreachable!("classify_status never reports success on a failed attempt"),
            FailureKind::Fatal => {
                agent_rc.borrow_mut().set_async_state(AsyncState::Idle);
                let msg = format!("Error: {detail}");
                self.resolve_future(id, Err(msg.clone()));
                trace.publish(
                    &TraceEvent::new(EventKind::Error, now_ms)
                        .with_agent(id.0, Some(name))
                        .with_data(serde_json::json!({"message": msg})),
                );
                Ok(SendOutcome::Done(msg))
            }
            FailureKind::Retriable => {
                let Some(pid) = owner_pid else {
                    agent_rc.borrow_mut().set_async_state(AsyncState::Idle);
                    let msg = format!("Error: {detail}");
                    self.resolve_future(id, Err(msg.clone()));
                    return Ok(SendOutcome::Done(msg));
                };

                let decision = {
                    let Some(cfg) = table.get_mut(pid).and_then(|p| p.supervision_mut()) else {
                        agent_rc.borrow_mut().set_async_state(AsyncState::Idle);
                        let msg = format!("Error: {detail}");
                        self.resolve_future(id, Err(msg.clone()));
                        return Ok(SendOutcome::Done(msg));
                    };
                    if !cfg.circuit.allow(now_ms) {
                        RetryDecision::CircuitOpen
                    } else {
                        cfg.circuit.record_failure(now_ms);
                        if cfg.record_restart_attempt(now_ms) {
                            RetryDecision::Retry(cfg.next_retry_at)
                        } else {
                            RetryDecision::Exhausted
                        }
                    }
                };

                match decision {
                    RetryDecision::CircuitOpen => {
                        agent_rc.borrow_mut().set_async_state(AsyncState::Idle);
                        let msg = "Error: Circuit breaker open".to_string();
                        self.resolve_future(id, Err(msg.clone()));
                        Ok(SendOutcome::Done(msg))
                    }
                    RetryDecision::Retry(not_before) => {
                        agent_rc.borrow_mut().set_async_state(AsyncState::RetryScheduled { tool_ctx, not_before });
                        Ok(SendOutcome::Pending)
                    }
                    RetryDecision::Exhausted => {
                        agent_rc.borrow_mut().set_async_state(AsyncState::Idle);
                        if let Some(p) = table.get_mut(pid) {
                            p.exit(ExitStatus::error(detail.clone()));
                        }
                        handle_exit(table, pid, now_ms);
                        let msg = format!("Error: {detail}");
                        self.resolve_future(id, Err(msg.clone()));
                        Ok(SendOutcome::Done(msg))
                    }
                }
            }
        }
    }

    fn resolve_future(&mut self, id: AgentId, outcome: Result<String, String>) {
        if let Some(future_id) = self.pending_futures.remove(&id.0) {
            self.futures.resolve(future_id, outcome);
        }
    }
}

fn find_agent_def<'a>(image: &'a Image, name: &str) -> Result<&'a AgentDef, AgentError> {
    image
        .agents()
        .iter()
        .find(|d| image.constants().get_str(d.name_idx).map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| AgentError::UnknownAgent(name.to_string()))
}

fn tool_specs(tools: &[AgentTool]) -> Vec<ToolSpec> {
    tools
        .iter()
        .map(|tool| {
            let mut properties = serde_json::Map::new();
            for (name, ty) in &tool.params {
                properties.insert(name.clone(), serde_json::json!({"type": json_type(*ty)}));
            }
            let required: Vec<&str> = tool.params.iter().map(|(name, _)| name.as_str()).collect();
            ToolSpec {
                name: tool.name.clone(),
                description: None,
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": properties,
                    "required": required,
                }),
            }
        })
        .collect()
}

fn json_type(ty: ParamType) -> &'static str {
    match ty {
        ParamType::Str => "string",
        ParamType::Bool => "boolean",
        ParamType::Int => "integer",
        ParamType::Float => "number",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vega_bytecode::{FunctionBuilder, ImageBuilder, Op};

    fn image_with_one_agent() -> Image {
        let mut b = ImageBuilder::new();
        b.agent("Researcher", "claude-3-5-sonnet", "you are a researcher", 0, 0.5);
        b.function(FunctionBuilder::new("main", 0, 0).op(Op::Halt));
        b.build()
    }

    #[test]
    fn spawn_resolves_name_model_system_and_temperature() {
        let image = image_with_one_agent();
        let mut mgr = AgentManager::new("test-key");
        let trace = TraceBus::new();
        let id = mgr.spawn(&image, "Researcher", &trace, 0).unwrap();
        let agent = mgr.get(id).unwrap().borrow();
        assert_eq!(agent.name(), "Researcher");
        assert_eq!(agent.model(), "claude-3-5-sonnet");
        assert_eq!(agent.system(), "you are a researcher");
        assert!((agent.temperature() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn spawning_an_unknown_agent_name_is_an_error() {
        let image = image_with_one_agent();
        let mut mgr = AgentManager::new("test-key");
        let trace = TraceBus::new();
        assert!(matches!(mgr.spawn(&image, "Ghost", &trace, 0), Err(AgentError::UnknownAgent(_))));
    }

    #[test]
    fn spawn_supervised_links_agent_and_process_both_ways() {
        let image = image_with_one_agent();
        let mut mgr = AgentManager::new("test-key");
        let mut table = ProcessTable::new();
        let trace = TraceBus::new();
        let (id, pid) = mgr
            .spawn_supervised(&image, "Researcher", &mut table, None, SupervisionConfig::default(), &trace, 0)
            .unwrap();
        let pid = pid.expect("process table was nowhere near full");
        assert_eq!(mgr.get(id).unwrap().borrow().process(), Some(pid));
        assert_eq!(table.get(pid).unwrap().agent(), Some(id));
        assert!(table.get(pid).unwrap().is_supervisor());
    }

    #[test]
    fn invalid_agent_id_is_reported_not_panicked() {
        let mgr = AgentManager::new("test-key");
        assert!(matches!(mgr.get(AgentId(7)), Err(AgentError::InvalidAgentId(7))));
    }

    #[test]
    fn begin_send_moves_agent_into_awaiting_with_no_tool_context() {
        let image = image_with_one_agent();
        let mut mgr = AgentManager::with_base_url("test-key", "http://127.0.0.1:0/v1/messages");
        let trace = TraceBus::new();
        let id = mgr.spawn(&image, "Researcher", &trace, 0).unwrap();
        mgr.begin_send(id, "hello", &trace, 0).unwrap();
        let agent = mgr.get(id).unwrap().borrow();
        assert!(matches!(agent.async_state(), AsyncState::Awaiting { tool_ctx: None, .. }));
        assert_eq!(agent.history().len(), 1);
    }

    #[test]
    fn poll_send_on_an_idle_agent_reports_pending() {
        let image = image_with_one_agent();
        let mut mgr = AgentManager::new("test-key");
        let mut table = ProcessTable::new();
        let mut budget = BudgetAccountant::new(Default::default());
        let trace = TraceBus::new();
        let id = mgr.spawn(&image, "Researcher", &trace, 0).unwrap();
        let outcome = mgr.poll_send(id, &mut table, &mut budget, &trace, 0).unwrap();
        assert!(matches!(outcome, SendOutcome::Pending));
    }
}
