//! Command handlers
//!
//! Wires configuration, credentials, the Gemini provider, the sandbox and the
//! tool registry into an [`AgentCore`], runs it once and prints the result.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{AgentCore, AgentObserver, TaskResult};
use crate::config::Config;
use crate::llm::gemini::GeminiProvider;
use crate::llm::FunctionCall;
use crate::sandbox::SandboxRoot;
use crate::secrets;
use crate::tools::ToolRegistry;
use sdk::errors::{EngineError, ScoutErrorExt};
use sdk::types::ToolResult;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Prints tool activity as it happens (text output only)
pub struct ConsoleObserver {
    verbose: bool,
}

impl ConsoleObserver {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl AgentObserver for ConsoleObserver {
    fn on_tool_call(&self, call: &FunctionCall) {
        println!("{}", describe_call(call, self.verbose));
    }

    fn on_tool_result(&self, _call: &FunctionCall, result: &ToolResult) {
        if self.verbose {
            println!("-> {}", result_json(result));
        }
    }
}

fn describe_call(call: &FunctionCall, verbose: bool) -> String {
    if verbose {
        format!(
            "Calling function: {}({})",
            call.name,
            Value::Object(call.args.clone())
        )
    } else {
        format!(" - Calling function: {}", call.name)
    }
}

fn result_json(result: &ToolResult) -> Value {
    match result {
        Ok(text) => json!({ "result": text }),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

/// Build an agent from configuration
///
/// Reads the API key from the configured environment variable and roots the
/// sandbox at `config.core.workspace`.
pub fn build_agent(config: &Config) -> Result<AgentCore> {
    let api_key = secrets::load_from_env(&config.llm.gemini.api_key_env)?;
    let provider = Arc::new(GeminiProvider::new(config.llm.gemini.clone(), api_key));

    let root = SandboxRoot::new(&config.core.workspace).context("Invalid workspace")?;
    let tools = Arc::new(ToolRegistry::builtin(&config.tools));

    tracing::debug!(
        "Agent rooted at {:?} with tools: {}",
        root.path(),
        tools.names().join(", ")
    );

    Ok(AgentCore::new(provider, tools, root)
        .with_max_iterations(config.agent.max_iterations)
        .with_llm_timeout(Duration::from_secs(config.agent.llm_timeout_secs)))
}

/// Run the agent once on `prompt` and print the result
pub async fn handle_run(
    prompt: String,
    config: &Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let agent = build_agent(config)?;

    let result = match format {
        OutputFormat::Text => {
            agent
                .run_with_observer(&prompt, &ConsoleObserver::new(verbose))
                .await
        }
        OutputFormat::Json => agent.run(&prompt).await,
    };

    match result {
        Ok(task_result) => {
            match format {
                OutputFormat::Text => print_text(&prompt, &task_result, verbose),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&json_summary(&task_result))?);
                }
            }
            Ok(())
        }
        Err(e) => {
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&failure_json(&e))?);
            }
            Err(e)
        }
    }
}

fn print_text(prompt: &str, task_result: &TaskResult, verbose: bool) {
    println!("Final response:");
    println!("{}", task_result.outcome.final_text());

    if verbose {
        println!();
        println!("User prompt: {}", prompt);
        println!("Prompt tokens: {}", task_result.usage.prompt_tokens);
        println!("Response tokens: {}", task_result.usage.response_tokens);
        println!("Iterations: {}", task_result.iterations);
        println!("Duration: {}ms", task_result.duration_ms);
    }
}

fn json_summary(task_result: &TaskResult) -> Value {
    json!({
        "status": if task_result.outcome.is_done() { "completed" } else { "exhausted" },
        "run_id": task_result.run_id,
        "outcome": task_result.outcome,
        "answer": task_result.outcome.final_text(),
        "iterations": task_result.iterations,
        "usage": task_result.usage,
        "duration_ms": task_result.duration_ms,
    })
}

/// Failure report, with a hint when the cause is an engine error
fn failure_json(error: &anyhow::Error) -> Value {
    let mut output = json!({
        "status": "failed",
        "error": format!("{:#}", error)
    });
    if let Some(engine_error) = error.downcast_ref::<EngineError>() {
        output["hint"] = json!(engine_error.user_hint());
        output["recoverable"] = json!(engine_error.is_recoverable());
    }
    output
}
