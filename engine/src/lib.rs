//! Scout Engine Library
//!
//! This library provides the core functionality of the Scout agent.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Sandbox path resolution module
pub mod sandbox;

/// Credential loading module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// Built-in tools, registry and dispatcher
pub mod tools;

/// Agent loop core module
pub mod agent;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
