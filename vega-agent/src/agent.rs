//! The agent instance: resolved configuration, tool set, and history.

use vega_http::ChatMessage;
use vega_process::Pid;

use crate::async_state::AsyncState;
use crate::tool::AgentTool;

/// Who spoke a turn in an agent's conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The caller/user side of the conversation.
    User,
    /// The model's own replies.
    Assistant,
}

/// One turn of an agent's conversation history.
#[derive(Debug, Clone)]
pub struct Turn {
    /// Who spoke.
    pub role: Role,
    /// The turn's text.
    pub text: String,
}

/// A spawned agent instance: resolved name/model/system/temperature, its
/// discovered tool set, conversation history, and async state.
#[derive(Debug)]
pub struct Agent {
    name: String,
    model: String,
    system: String,
    temperature: f64,
    tools: Vec<AgentTool>,
    history: Vec<Turn>,
    process: Option<Pid>,
    async_state: AsyncState,
}

impl Agent {
    #[must_use]
    pub(crate) fn new(name: String, model: String, system: String, temperature: f64, tools: Vec<AgentTool>) -> Self {
        Self {
            name,
            model,
            system,
            temperature,
            tools,
            history: Vec::new(),
            process: None,
            async_state: AsyncState::Idle,
        }
    }

    /// The agent's resolved name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The model identifier this agent talks to.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The tools this agent was given at spawn time.
    #[must_use]
    pub fn tools(&self) -> &[AgentTool] {
        &self.tools
    }

    /// The tool named `name`, if this agent has one.
    #[must_use]
    pub fn find_tool(&self, name: &str) -> Option<&AgentTool> {
        self.tools.iter().find(|t| t.name == name)
    }

    /// The owning supervised process, if this agent was spawned supervised.
    #[must_use]
    pub fn process(&self) -> Option<Pid> {
        self.process
    }

    pub(crate) fn set_process(&mut self, pid: Pid) {
        self.process = Some(pid);
    }

    /// The agent's async state.
    #[must_use]
    pub fn async_state(&self) -> &AsyncState {
        &self.async_state
    }

    pub(crate) fn set_async_state(&mut self, state: AsyncState) {
        self.async_state = state;
    }

    pub(crate) fn take_async_state(&mut self) -> AsyncState {
        std::mem::replace(&mut self.async_state, AsyncState::Idle)
    }

    pub(crate) fn push_user(&mut self, text: impl Into<String>) {
        self.history.push(Turn { role: Role::User, text: text.into() });
    }

    pub(crate) fn push_assistant(&mut self, text: impl Into<String>) {
        self.history.push(Turn { role: Role::Assistant, text: text.into() });
    }

    /// The conversation history so far.
    #[must_use]
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Render the history, system prompt, and temperature into the shape
    /// the HTTP seam needs to build a request body.
    #[must_use]
    pub(crate) fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.history
            .iter()
            .map(|t| match t.role {
                Role::User => ChatMessage::user_text(t.text.as_str()),
                Role::Assistant => ChatMessage::assistant_text(t.text.as_str()),
            })
            .collect()
    }

    /// The system prompt.
    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    /// The sampling temperature.
    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}
