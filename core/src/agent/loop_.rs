use crate::agent::{DEFAULT_CODE_EXECUTION_TYPE, SessionHandle, ToolRegistry};
use crate::traits::{
    CallerKind, ExchangeRequest, ModelResponse, Provider, StopReason, ToolInvocation,
    ToolResultEntry, Turn,
};
use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 30;
const RESULT_PREVIEW_CHARS: usize = 80;

/// Optional caps on a run. Unbounded by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunBudget {
    pub max_turns: Option<usize>,
    pub max_tool_calls: Option<usize>,
}

impl RunBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = Some(max);
        self
    }

    pub fn with_max_tool_calls(mut self, max: usize) -> Self {
        self.max_tool_calls = Some(max);
        self
    }

    fn turns_exhausted(&self, exchanges: usize) -> Option<BudgetKind> {
        self.max_turns
            .filter(|max| exchanges >= *max)
            .map(BudgetKind::Turns)
    }

    fn tool_calls_exhausted(&self, made: usize, pending: usize) -> Option<BudgetKind> {
        self.max_tool_calls
            .filter(|max| made + pending > *max)
            .map(BudgetKind::ToolCalls)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    Turns(usize),
    ToolCalls(usize),
}

impl std::fmt::Display for BudgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Turns(max) => write!(f, "turn limit of {} reached", max),
            Self::ToolCalls(max) => write!(f, "tool call limit of {} reached", max),
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStop {
    EndTurn,
    Unexpected(String),
    BudgetExceeded(BudgetKind),
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub text: String,
    pub tool_calls_made: usize,
    pub session_handle: Option<String>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub raw_turns: Vec<ModelResponse>,
    pub stop: RunStop,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("model exchange failed: {0:#}")]
    Transport(anyhow::Error),

    #[error("run cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub system: Option<String>,
    pub session: Option<String>,
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_session(mut self, session: impl Into<String>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

#[derive(Default)]
struct RunTally {
    exchanges: usize,
    tool_calls_made: usize,
    input_tokens: u64,
    output_tokens: u64,
    raw_turns: Vec<ModelResponse>,
}

impl RunTally {
    fn finish(self, text: String, stop: RunStop, session: Option<SessionHandle>) -> RunResult {
        RunResult {
            text,
            tool_calls_made: self.tool_calls_made,
            session_handle: session.map(|s| s.id),
            total_input_tokens: self.input_tokens,
            total_output_tokens: self.output_tokens,
            raw_turns: self.raw_turns,
            stop,
        }
    }
}

pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    tool_registry: Arc<ToolRegistry>,
    code_execution_type: String,
    expiry_buffer: chrono::Duration,
    budget: RunBudget,
    concurrent_dispatch: bool,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            tool_registry,
            code_execution_type: DEFAULT_CODE_EXECUTION_TYPE.to_string(),
            expiry_buffer: chrono::Duration::seconds(DEFAULT_EXPIRY_BUFFER_SECS),
            budget: RunBudget::default(),
            concurrent_dispatch: true,
        }
    }

    pub fn with_code_execution_type(mut self, kind: impl Into<String>) -> Self {
        self.code_execution_type = kind.into();
        self
    }

    pub fn with_expiry_buffer(mut self, buffer: std::time::Duration) -> Self {
        self.expiry_buffer =
            chrono::Duration::from_std(buffer).unwrap_or(chrono::Duration::MAX);
        self
    }

    pub fn with_budget(mut self, budget: RunBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_concurrent_dispatch(mut self, concurrent: bool) -> Self {
        self.concurrent_dispatch = concurrent;
        self
    }

    /// Drives one user request until the model ends its turn.
    ///
    /// Tool failures are fed back to the model as results; only transport
    /// failures and cancellation surface as errors.
    pub async fn run(&self, user_message: &str, options: RunOptions) -> Result<RunResult, RunError> {
        let RunOptions {
            system,
            session,
            cancel,
        } = options;
        let cancel = cancel.unwrap_or_default();
        let catalog = self.tool_registry.build_catalog(&self.code_execution_type);

        let mut turns = vec![Turn::user(user_message)];
        let mut session = session.map(SessionHandle::new);
        let mut tally = RunTally::default();

        loop {
            if let Some(kind) = self.budget.turns_exhausted(tally.exchanges) {
                warn!("Stopping run: {}", kind);
                return Ok(tally.finish(
                    format!("Budget exceeded: {}", kind),
                    RunStop::BudgetExceeded(kind),
                    session,
                ));
            }

            let request = ExchangeRequest {
                turns: &turns,
                catalog: &catalog,
                system: system.as_deref(),
                session: session.as_ref().map(|s| s.id.as_str()),
            };
            debug!(
                "Exchange {} with {} turns (session: {:?})",
                tally.exchanges + 1,
                turns.len(),
                request.session
            );

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RunError::Cancelled),
                response = self.provider.exchange(request) => response.map_err(RunError::Transport)?,
            };

            tally.exchanges += 1;
            tally.input_tokens += response.usage.input_tokens;
            tally.output_tokens += response.usage.output_tokens;

            if let Some(container) = &response.container {
                let handle = SessionHandle::from_descriptor(container);
                self.check_expiry(&handle);
                session = Some(handle);
            }

            match response.stop_reason.clone() {
                StopReason::EndTurn => {
                    let text = response.joined_text();
                    tally.raw_turns.push(response);
                    info!(
                        "Run finished after {} exchanges and {} tool calls",
                        tally.exchanges, tally.tool_calls_made
                    );
                    return Ok(tally.finish(text, RunStop::EndTurn, session));
                }
                // Terminal rather than looping: there is nothing to feed back but an empty turn.
                StopReason::ToolUse if response.tool_invocations().is_empty() => {
                    warn!("Model stopped for tool use without any tool invocations");
                    return Ok(self.unexpected(tally, response, session));
                }
                StopReason::ToolUse => {
                    let calls = response.tool_invocations();
                    if let Some(kind) =
                        self.budget.tool_calls_exhausted(tally.tool_calls_made, calls.len())
                    {
                        warn!("Stopping run: {}", kind);
                        tally.raw_turns.push(response);
                        return Ok(tally.finish(
                            format!("Budget exceeded: {}", kind),
                            RunStop::BudgetExceeded(kind),
                            session,
                        ));
                    }

                    let results = self.dispatch_all(&calls, &cancel).await?;
                    tally.tool_calls_made += results.len();

                    turns.push(Turn::assistant(response.content.clone()));
                    turns.push(Turn::tool_results(results));
                    tally.raw_turns.push(response);
                }
                other => {
                    warn!("Unexpected stop reason: {:?}", other.as_str());
                    return Ok(self.unexpected(tally, response, session));
                }
            }
        }
    }

    fn unexpected(
        &self,
        mut tally: RunTally,
        response: ModelResponse,
        session: Option<SessionHandle>,
    ) -> RunResult {
        let reason = response.stop_reason.to_string();
        let mut text = response.joined_text();
        if text.is_empty() {
            text = format!("Unexpected stop: {}", reason);
        }
        tally.raw_turns.push(response);
        tally.finish(text, RunStop::Unexpected(reason), session)
    }

    fn check_expiry(&self, session: &SessionHandle) {
        if let Some(remaining) = session.expiry_warning(self.expiry_buffer, Utc::now()) {
            warn!(
                "Container {} expires in {}s, respond quickly to avoid a timeout",
                session.id,
                remaining.num_seconds()
            );
        }
    }

    /// Results come back in invocation order whether or not dispatch runs concurrently.
    async fn dispatch_all(
        &self,
        calls: &[ToolInvocation<'_>],
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolResultEntry>, RunError> {
        let batch = async {
            if self.concurrent_dispatch {
                join_all(calls.iter().map(|call| self.dispatch_one(call))).await
            } else {
                let mut results = Vec::with_capacity(calls.len());
                for call in calls {
                    results.push(self.dispatch_one(call).await);
                }
                results
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunError::Cancelled),
            results = batch => Ok(results),
        }
    }

    async fn dispatch_one(&self, call: &ToolInvocation<'_>) -> ToolResultEntry {
        let (source, caller) = if call.is_programmatic() {
            ("programmatic", CallerKind::CodeExecution)
        } else {
            ("direct", CallerKind::Direct)
        };

        let content = self
            .tool_registry
            .dispatch_from(call.name, call.input, Some(caller))
            .await;
        info!("[{}] {}() -> {}", source, call.name, preview(&content));

        ToolResultEntry {
            tool_use_id: call.id.to_string(),
            content,
        }
    }
}

fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(RESULT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
