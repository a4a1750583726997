//! Scout SDK
//!
//! Shared types for Scout components: the engine-level error type and the
//! tagged result type every sandboxed tool returns.

/// Error types and handling
pub mod errors;

/// Tool result types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, ScoutErrorExt};
pub use types::{ToolError, ToolErrorKind, ToolResult};
