//! Agent Loop
//!
//! This module implements the loop that turns a single instruction into a
//! sequence of LLM planning calls and sandboxed tool executions. The agent
//! keeps an append-only conversation per run and stops on a final answer or
//! when its step budget is spent.

pub mod conversation;
pub mod core;

pub use self::core::{
    AgentCore, AgentObserver, ExhaustReason, NoopObserver, Outcome, StepBudget, TaskResult,
};
pub use conversation::Conversation;
