//! Error types and handling
//!
//! This module provides the error types used for engine-level failures:
//! everything that can stop a run (bad configuration, an unusable sandbox
//! root, a failing LLM provider). Failures of individual tool calls are not
//! engine errors; they are `ToolError` values fed back to the model.
//!
//! All errors implement the `ScoutErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Error messages never include credentials. API keys are carried in
//! redacting wrappers and are only ever sent in request headers.

use thiserror::Error;

/// Trait for Scout error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait ScoutErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors typically require fixing configuration or the environment.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Sandbox**: The sandbox root cannot be used
/// - **Credentials**: Missing API keys
/// - **LLM Provider**: API failures, timeouts
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ScoutErrorExt};
///
/// let error = EngineError::LLMTimeout(120);
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::MissingCredential("GEMINI_API_KEY".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Sandbox errors
    #[error("Invalid sandbox root {0:?}: {1}")]
    InvalidSandboxRoot(std::path::PathBuf, String),

    #[error("Path canonicalization failed for {0:?}: {1}")]
    PathCanonicalization(std::path::PathBuf, String),

    // Credential errors
    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("LLM call timed out after {0} seconds")]
    LLMTimeout(u64),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScoutErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::InvalidSandboxRoot(_, _) => "The workspace must be an existing directory",
            Self::PathCanonicalization(_, _) => "Invalid path specified",
            Self::MissingCredential(_) => "Export your API key before running scout",
            Self::LLMProvider(_) => "LLM provider unavailable. Check your API key and network",
            Self::LLMTimeout(_) => "LLM provider took too long to respond. Try again",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::InvalidSandboxRoot(_, _)
            | Self::PathCanonicalization(_, _)
            | Self::MissingCredential(_) => false,

            Self::LLMProvider(_) | Self::LLMTimeout(_) | Self::Io(_) => true,
        }
    }
}
