//! Example demonstrating simple task execution with the Agent Core
//!
//! This example shows how to:
//! - Create an agent with the Gemini provider
//! - Confine its tools to a throwaway workspace
//! - Execute a simple task and inspect the result
//!
//! Prerequisites:
//! - GEMINI_API_KEY must be set
//! - python3 must be on PATH for `run_python_file`

use scout_engine::{
    agent::AgentCore,
    config::{GeminiConfig, ToolsConfig},
    llm::{gemini::GeminiProvider, LLMProvider, Role},
    sandbox::SandboxRoot,
    secrets,
    tools::ToolRegistry,
};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Simple Task Execution Example ===\n");

    // A tiny project for the agent to explore
    let temp_dir = TempDir::new()?;
    std::fs::write(
        temp_dir.path().join("main.py"),
        "def add(a, b):\n    return a - b\n\nprint(add(3, 5))\n",
    )?;

    let api_key = secrets::load_from_env("GEMINI_API_KEY")?;
    let provider = GeminiProvider::new(GeminiConfig::default(), api_key);
    println!("Provider: {} ({})", provider.name(), provider.model());

    let root = SandboxRoot::new(temp_dir.path())?;
    let tools = Arc::new(ToolRegistry::builtin(&ToolsConfig::default()));
    println!("Tools: {}\n", tools.names().join(", "));

    let agent = AgentCore::new(Arc::new(provider), tools, root).with_max_iterations(10);

    let result = agent
        .run("main.py should print 8. Find the bug and fix it.")
        .await?;

    println!("Final response:\n{}\n", result.outcome.final_text());
    println!(
        "{} iterations, {} tool turns, {} prompt tokens",
        result.iterations,
        result.conversation.count_role(Role::Tool),
        result.usage.prompt_tokens
    );
    println!(
        "\nmain.py is now:\n{}",
        std::fs::read_to_string(temp_dir.path().join("main.py"))?
    );

    Ok(())
}
