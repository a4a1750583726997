//! Routes a model-proposed function call to its tool.
//!
//! The dispatcher is the only place that turns untrusted [`FunctionCall`]s
//! into tool invocations: it looks the name up, validates the arguments
//! against the declaration, supplies the sandbox root and turns a panicking
//! tool into an ordinary error result.

use futures::FutureExt;
use sdk::types::{ToolError, ToolResult};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::ToolRegistry;
use crate::llm::FunctionCall;
use crate::sandbox::SandboxRoot;

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    root: SandboxRoot,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, root: SandboxRoot) -> Self {
        Self { registry, root }
    }

    /// Execute one function call.
    ///
    /// Never fails and never panics: every problem is a `ToolError` the
    /// model can read and react to.
    pub async fn dispatch(&self, call: &FunctionCall) -> ToolResult {
        info!("Calling function: {}", call.name);
        let args = Value::Object(call.args.clone());
        debug!("Arguments for {}: {}", call.name, args);

        let Some(tool) = self.registry.get(&call.name) else {
            warn!("Unknown tool requested: {}", call.name);
            return Err(ToolError::unknown_operation(
                &call.name,
                &self.registry.names(),
            ));
        };

        if let Err(e) = tool.declaration().validate(&call.args) {
            warn!("Rejected arguments for {}: {}", call.name, e.message());
            return Err(e);
        }

        let result = AssertUnwindSafe(tool.call(&self.root, call.args.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ToolError::internal(format!(
                    "{} failed unexpectedly: {}",
                    call.name,
                    panic_message(panic.as_ref())
                )))
            });

        match &result {
            Ok(output) => debug!("{} returned {} bytes", call.name, output.len()),
            Err(e) => warn!("{} failed ({}): {}", call.name, e.kind(), e.message()),
        }

        result
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FunctionDeclaration, ParamType, Tool, WriteFileTool};
    use async_trait::async_trait;
    use sdk::types::ToolErrorKind;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    struct PanickingTool {
        declaration: FunctionDeclaration,
    }

    #[async_trait]
    impl Tool for PanickingTool {
        fn declaration(&self) -> &FunctionDeclaration {
            &self.declaration
        }

        async fn call(&self, _root: &SandboxRoot, _args: Map<String, Value>) -> ToolResult {
            panic!("tool exploded");
        }
    }

    fn dispatcher(temp: &TempDir) -> Dispatcher {
        let registry = ToolRegistry::empty()
            .with_tool(WriteFileTool::new())
            .with_tool(PanickingTool {
                declaration: FunctionDeclaration::new("explode", "Always panics")
                    .optional("why", ParamType::String, "Reason"),
            });
        Dispatcher::new(Arc::new(registry), SandboxRoot::new(temp.path()).unwrap())
    }

    #[tokio::test]
    async fn test_unknown_function() {
        let temp = TempDir::new().unwrap();
        let err = dispatcher(&temp)
            .dispatch(&FunctionCall::new("rm_rf", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::UnknownOperation);
        assert!(err
            .to_string()
            .starts_with("Error: Unknown function: rm_rf"));
    }

    #[tokio::test]
    async fn test_working_directory_cannot_be_supplied() {
        let temp = TempDir::new().unwrap();
        let call = FunctionCall::new(
            "write_file",
            json!({"file_path": "a.txt", "content": "x", "working_directory": "/"}),
        );
        let err = dispatcher(&temp).dispatch(&call).await.unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::InvalidArguments);
        assert!(!temp.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_root_is_injected() {
        let temp = TempDir::new().unwrap();
        let call = FunctionCall::new("write_file", json!({"file_path": "a.txt", "content": "x"}));
        dispatcher(&temp).dispatch(&call).await.unwrap();
        assert_eq!(std::fs::read_to_string(temp.path().join("a.txt")).unwrap(), "x");
    }

    #[tokio::test]
    async fn test_panic_becomes_internal_error() {
        let temp = TempDir::new().unwrap();
        let err = dispatcher(&temp)
            .dispatch(&FunctionCall::new("explode", json!({})))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::Internal);
        assert!(err.message().contains("tool exploded"));
    }
}
