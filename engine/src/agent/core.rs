//! Agent Core
//!
//! This module implements the core agent loop that orchestrates task execution.
//! Each run is an explicit state machine:
//!
//! 1. `Planning`: call the LLM with the full history (bounded by a timeout)
//!    and append its raw turn
//! 2. `Executing`: run every proposed function call in order through the
//!    dispatcher and append all results as one tool turn
//! 3. `Stalled`: the model produced neither calls nor text; nudge it once on
//!    the first iteration, otherwise give up
//! 4. `Done` / `Exhausted`: terminal, reported in [`TaskResult::outcome`]
//!
//! # Limits
//!
//! - Every LLM call spends one unit of the step budget (default 20)
//! - Each LLM call is bounded by a timeout (default 120s)
//!
//! Tool failures never stop a run; they are fed back to the model. Only LLM
//! failures and timeouts abort it.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::llm::{
    Content, FunctionCall, FunctionResponse, LLMProvider, LLMRequest, LLMResponse, Usage,
};
use crate::sandbox::SandboxRoot;
use crate::tools::{Dispatcher, FunctionDeclaration, ToolRegistry};
use sdk::errors::EngineError;
use sdk::types::ToolResult;

use super::Conversation;

/// Default maximum number of LLM calls per run
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Default timeout for each LLM call in seconds
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Sent once when the first model turn is empty
pub const NUDGE_PROMPT: &str = "Plan at least one function call now. Start with get_files_info('.') and then read the relevant files with get_file_content.";

/// Bounds the number of LLM calls in one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudget {
    max: usize,
    used: usize,
}

impl StepBudget {
    pub fn new(max: usize) -> Self {
        Self { max, used: 0 }
    }

    /// Spend one step. Returns false, spending nothing, once exhausted.
    pub fn try_consume(&mut self) -> bool {
        if self.used < self.max {
            self.used += 1;
            true
        } else {
            false
        }
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.max - self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }
}

/// Why a run ended without an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustReason {
    /// The step budget ran out while the model kept calling tools
    MaxIterations,

    /// The model returned nothing usable after the first iteration
    NoOutput,
}

impl ExhaustReason {
    /// Text shown to the user in place of an answer
    pub fn message(&self) -> &'static str {
        match self {
            ExhaustReason::MaxIterations => {
                "(Stopped after max iterations without a final answer.)"
            }
            ExhaustReason::NoOutput => "(No additional output from model.)",
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    Done { answer: String },
    Exhausted { reason: ExhaustReason },
}

impl Outcome {
    /// The answer, or the exhaustion message
    pub fn final_text(&self) -> &str {
        match self {
            Outcome::Done { answer } => answer,
            Outcome::Exhausted { reason } => reason.message(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done { .. })
    }
}

/// Task result after processing
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    /// Run ID, also recorded on the `agent_run` tracing span
    pub run_id: String,

    /// How the run ended
    pub outcome: Outcome,

    /// Number of LLM calls made
    pub iterations: usize,

    /// Token usage summed over all LLM calls
    pub usage: Usage,

    /// Token usage of the final LLM call
    pub last_usage: Option<Usage>,

    /// Duration in milliseconds
    pub duration_ms: u64,

    /// Full history of the run
    #[serde(skip)]
    pub conversation: Conversation,
}

/// Hooks for watching a run as it happens. All methods default to no-ops.
pub trait AgentObserver: Send + Sync {
    fn on_model_turn(&self, _iteration: usize, _response: &LLMResponse) {}

    fn on_tool_call(&self, _call: &FunctionCall) {}

    fn on_tool_result(&self, _call: &FunctionCall, _result: &ToolResult) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl AgentObserver for NoopObserver {}

enum LoopState {
    Planning,
    Executing(Vec<FunctionCall>),
    Stalled,
    Done(String),
    Exhausted(ExhaustReason),
}

/// Agent Core that orchestrates the agent loop
///
/// Holds no per-run state: every call to [`AgentCore::run`] starts a fresh
/// conversation and budget, so one instance can serve concurrent runs.
pub struct AgentCore {
    /// LLM provider used for planning
    provider: Arc<dyn LLMProvider>,

    /// Routes function calls to tools inside the sandbox
    dispatcher: Dispatcher,

    /// Declarations sent with every LLM call
    declarations: Vec<FunctionDeclaration>,

    system_prompt: String,

    max_iterations: usize,

    llm_timeout: Duration,
}

impl AgentCore {
    /// Create a new agent core with default limits
    pub fn new(provider: Arc<dyn LLMProvider>, tools: Arc<ToolRegistry>, root: SandboxRoot) -> Self {
        let declarations = tools.declarations();
        let system_prompt = tools.system_prompt();
        Self {
            provider,
            dispatcher: Dispatcher::new(tools, root),
            declarations,
            system_prompt,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        }
    }

    /// Set the step budget. Values below 1 are raised to 1.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn with_llm_timeout(mut self, llm_timeout: Duration) -> Self {
        self.llm_timeout = llm_timeout;
        self
    }

    /// Process a prompt through the agent loop
    pub async fn run(&self, prompt: &str) -> Result<TaskResult> {
        self.run_with_observer(prompt, &NoopObserver).await
    }

    /// Process a prompt, reporting progress to `observer`
    pub async fn run_with_observer(
        &self,
        prompt: &str,
        observer: &dyn AgentObserver,
    ) -> Result<TaskResult> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("agent_run", run_id = %run_id, provider = self.provider.name());

        async {
            info!("Starting run: {}", prompt);
            let result = self.execute_loop(run_id, prompt, observer).await;
            match &result {
                Ok(task) => info!(
                    "Run finished in {}ms after {} iterations ({:?})",
                    task.duration_ms, task.iterations, task.outcome
                ),
                Err(e) => error!("Run failed: {:#}", e),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn execute_loop(
        &self,
        run_id: String,
        prompt: &str,
        observer: &dyn AgentObserver,
    ) -> Result<TaskResult> {
        let start_time = Instant::now();
        let mut conversation = Conversation::new(prompt);
        let mut budget = StepBudget::new(self.max_iterations);
        let mut usage = Usage::default();
        let mut last_usage = None;
        let mut state = LoopState::Planning;

        let outcome = loop {
            state = match state {
                LoopState::Planning => {
                    if !budget.try_consume() {
                        LoopState::Exhausted(ExhaustReason::MaxIterations)
                    } else {
                        let iteration = budget.used();
                        debug!(
                            "Iteration {}/{} (~{} tokens of history)",
                            iteration,
                            self.max_iterations,
                            conversation.estimated_tokens()
                        );

                        let response = self
                            .plan(&conversation)
                            .await
                            .with_context(|| format!("LLM call failed on iteration {}", iteration))?;
                        observer.on_model_turn(iteration, &response);

                        if let Some(turn_usage) = response.usage {
                            usage += turn_usage;
                            last_usage = Some(turn_usage);
                        }

                        let calls = response.function_calls();
                        let answer = response.final_text();
                        if let Some(content) = response.content {
                            conversation.push(content);
                        }

                        if !calls.is_empty() {
                            LoopState::Executing(calls)
                        } else if let Some(answer) = answer {
                            LoopState::Done(answer)
                        } else {
                            LoopState::Stalled
                        }
                    }
                }
                LoopState::Executing(calls) => {
                    let mut responses = Vec::with_capacity(calls.len());
                    for call in &calls {
                        observer.on_tool_call(call);
                        let result = self.dispatcher.dispatch(call).await;
                        observer.on_tool_result(call, &result);
                        responses.push(FunctionResponse::from_result(&call.name, &result));
                    }
                    conversation.push(Content::tool_results(responses));
                    LoopState::Planning
                }
                LoopState::Stalled => {
                    if budget.used() == 1 {
                        warn!("Empty response on the first iteration, nudging the model");
                        conversation.push(Content::user(NUDGE_PROMPT));
                        LoopState::Planning
                    } else {
                        warn!("Empty response, stopping");
                        LoopState::Exhausted(ExhaustReason::NoOutput)
                    }
                }
                LoopState::Done(answer) => break Outcome::Done { answer },
                LoopState::Exhausted(reason) => {
                    warn!("Run exhausted: {:?}", reason);
                    break Outcome::Exhausted { reason };
                }
            };
        };

        Ok(TaskResult {
            run_id,
            outcome,
            iterations: budget.used(),
            usage,
            last_usage,
            duration_ms: start_time.elapsed().as_millis() as u64,
            conversation,
        })
    }

    /// One LLM call, bounded by the configured timeout
    async fn plan(&self, conversation: &Conversation) -> Result<LLMResponse> {
        let request = LLMRequest {
            system_prompt: &self.system_prompt,
            contents: conversation.turns(),
            tools: &self.declarations,
        };

        match timeout(self.llm_timeout, self.provider.generate(&request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(anyhow::Error::new(e)
                .context(EngineError::LLMProvider(self.provider.name().to_string()))),
            Err(_) => Err(EngineError::LLMTimeout(self.llm_timeout.as_secs()).into()),
        }
    }
}
