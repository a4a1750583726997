pub mod dispatcher;
pub mod filesystem;
pub mod schema;
pub mod script;

pub use dispatcher::Dispatcher;
pub use filesystem::{ListDirTool, ReadFileTool, WriteFileTool};
pub use schema::{FunctionDeclaration, ParamSpec, ParamType};
pub use script::{RunScriptTool, ScriptSettings};

use async_trait::async_trait;
use sdk::types::{ToolError, ToolResult};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ToolsConfig;
use crate::sandbox::{SandboxError, SandboxRoot};

/// The error a tool reports when the sandbox refuses a path.
///
/// `verb` names the attempted action ("list", "read", "write to", "execute").
/// Only an escape is a containment error. An entry that cannot be resolved
/// is reported as not found, with the reason.
pub(crate) fn refusal(err: SandboxError, verb: &str) -> ToolError {
    match err {
        SandboxError::OutsideRoot { path } => ToolError::containment(verb, &path),
        SandboxError::Unresolvable { path, reason } => ToolError::not_found(format!(
            "Cannot {} \"{}\": path cannot be resolved ({})",
            verb, path, reason
        )),
    }
}

/// A callable tool.
///
/// Implementations receive arguments that already passed
/// [`FunctionDeclaration::validate`] and the sandbox root they must confine
/// themselves to. The model never supplies the root.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declaration advertised to the model
    fn declaration(&self) -> &FunctionDeclaration;

    /// Run the tool. Failures are returned as `Err(ToolError)`, never raised.
    async fn call(&self, root: &SandboxRoot, args: Map<String, Value>) -> ToolResult;

    fn name(&self) -> &str {
        &self.declaration().name
    }
}

/// Registry of available tools that can be dispatched by the agent.
///
/// Tools keep their registration order, which is also the order they are
/// declared to the model. Only registered tools are advertised in the system
/// prompt and available for dispatch.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry with no tools enabled.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The four built-in tools, configured from `config`
    pub fn builtin(config: &ToolsConfig) -> Self {
        Self::empty()
            .with_tool(ListDirTool::new())
            .with_tool(ReadFileTool::new(config.max_read_chars))
            .with_tool(RunScriptTool::new(ScriptSettings::from(&config.script)))
            .with_tool(WriteFileTool::new())
    }

    /// Register a tool, replacing any tool with the same name
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Box::new(tool));
        self
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        debug!("Registering tool '{}'", tool.name());
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Declarations of all registered tools, in registration order
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.tools.iter().map(|t| t.declaration().clone()).collect()
    }

    /// Return the names of all currently enabled tools.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Generate a system prompt describing the available tools.
    ///
    /// Only registered tools are included.
    pub fn system_prompt(&self) -> String {
        let mut parts = vec![
            "You are a helpful AI coding agent.".to_string(),
            String::new(),
            "When a user asks a question or makes a request, make a function call plan. You can perform the following operations:".to_string(),
            String::new(),
        ];

        for tool in &self.tools {
            let decl = tool.declaration();
            parts.push(format!("- {}: {}", decl.name, decl.description));
        }

        parts.extend([
            String::new(),
            "IMPORTANT RULES:".to_string(),
            "1. All paths you provide should be relative to the working directory. You do not need to specify the working directory in your function calls; it is injected automatically.".to_string(),
            "2. Start by exploring: list the files, then read the ones relevant to the request before changing anything.".to_string(),
            "3. Never guess or hallucinate tool output. Always call the function and wait for the real result.".to_string(),
            "4. When you have the final answer, respond with plain text and no function calls.".to_string(),
        ]);

        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use sdk::types::ToolErrorKind;

    #[test]
    fn test_refusal_kinds() {
        let outside = refusal(
            SandboxError::OutsideRoot {
                path: "../x".to_string(),
            },
            "read",
        );
        assert_eq!(outside.kind(), ToolErrorKind::Containment);

        let unresolvable = refusal(
            SandboxError::Unresolvable {
                path: "link".to_string(),
                reason: "No such file or directory".to_string(),
            },
            "read",
        );
        assert_eq!(unresolvable.kind(), ToolErrorKind::NotFound);
        assert_eq!(
            unresolvable.to_string(),
            "Error: Cannot read \"link\": path cannot be resolved (No such file or directory)"
        );
    }

    #[test]
    fn test_builtin_registry() {
        let registry = ToolRegistry::builtin(&Config::default().tools);
        assert_eq!(
            registry.names(),
            vec![
                "get_files_info",
                "get_file_content",
                "run_python_file",
                "write_file"
            ]
        );
        assert!(registry.get("write_file").is_some());
        assert!(registry.get("delete_file").is_none());
    }

    #[test]
    fn test_register_replaces_same_name() {
        let registry = ToolRegistry::empty()
            .with_tool(ReadFileTool::new(10))
            .with_tool(ReadFileTool::new(20));
        assert_eq!(registry.len(), 1);
        assert!(registry.declarations()[0].description.contains("20 characters"));
    }

    #[test]
    fn test_system_prompt_lists_only_registered_tools() {
        let registry = ToolRegistry::empty().with_tool(WriteFileTool::new());
        let prompt = registry.system_prompt();
        assert!(prompt.contains("- write_file:"));
        assert!(!prompt.contains("get_file_content"));
        assert!(prompt.contains("relative to the working directory"));
    }
}
