//! Tool result types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single tool invocation.
///
/// `Ok` carries the text handed back to the model. `Err` carries a typed
/// failure; it is still data for the model, never a reason to stop a run.
pub type ToolResult = Result<String, ToolError>;

/// Category of a tool failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Path resolved outside the sandbox root
    Containment,

    /// Target missing or not the expected kind of entry
    NotFound,

    /// Arguments did not match the declared parameters
    InvalidArguments,

    /// Subprocess exceeded its wall-clock limit and was killed
    Timeout,

    /// No tool with the requested name is registered
    UnknownOperation,

    /// Subprocess could not be started or awaited
    ExecutionFailed,

    /// Underlying filesystem failure
    Io,

    /// A tool panicked or broke an internal invariant
    Internal,
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ToolErrorKind::Containment => "containment",
            ToolErrorKind::NotFound => "not_found",
            ToolErrorKind::InvalidArguments => "invalid_arguments",
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::UnknownOperation => "unknown_operation",
            ToolErrorKind::ExecutionFailed => "execution_failed",
            ToolErrorKind::Io => "io",
            ToolErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Typed tool failure.
///
/// The `Display` rendering is the text the model sees: the message with an
/// `Error: ` prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("Error: {message}")]
pub struct ToolError {
    kind: ToolErrorKind,
    message: String,
}

impl ToolError {
    /// Create an error of the given kind
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// The path escaped the sandbox root.
    ///
    /// `verb` names the attempted action ("list", "read", "write to", "execute").
    pub fn containment(verb: &str, path: &str) -> Self {
        Self::new(
            ToolErrorKind::Containment,
            format!(
                "Cannot {} \"{}\" as it is outside the permitted working directory",
                verb, path
            ),
        )
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, message)
    }

    pub fn invalid_arguments(tool: &str, detail: impl fmt::Display) -> Self {
        Self::new(
            ToolErrorKind::InvalidArguments,
            format!("Invalid arguments for {}: {}", tool, detail),
        )
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, message)
    }

    /// No registered tool has this name. `available` is listed back so the
    /// model can correct itself.
    pub fn unknown_operation(name: &str, available: &[&str]) -> Self {
        let message = if available.is_empty() {
            format!("Unknown function: {}", name)
        } else {
            format!(
                "Unknown function: {}. Available functions: {}",
                name,
                available.join(", ")
            )
        };
        Self::new(ToolErrorKind::UnknownOperation, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ExecutionFailed, message)
    }

    pub fn io(context: impl fmt::Display, err: &std::io::Error) -> Self {
        Self::new(ToolErrorKind::Io, format!("{}: {}", context, err))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, message)
    }

    /// Failure category
    pub fn kind(&self) -> ToolErrorKind {
        self.kind
    }

    /// Human-readable detail without the `Error: ` prefix
    pub fn message(&self) -> &str {
        &self.message
    }
}
