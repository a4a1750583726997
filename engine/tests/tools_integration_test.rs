//! Integration tests for tool dispatch
//!
//! Drives the built-in tools the way the agent does: through a
//! [`Dispatcher`] fed with model-shaped function calls.

use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use scout_engine::config::ToolsConfig;
use scout_engine::llm::FunctionCall;
use scout_engine::sandbox::SandboxRoot;
use scout_engine::tools::{Dispatcher, ToolRegistry};
use sdk::types::ToolErrorKind;

fn setup() -> (TempDir, Dispatcher) {
    setup_with(ToolsConfig::default())
}

fn setup_with(config: ToolsConfig) -> (TempDir, Dispatcher) {
    let temp_dir = TempDir::new().unwrap();
    let root = SandboxRoot::new(temp_dir.path()).unwrap();
    let registry = Arc::new(ToolRegistry::builtin(&config));
    (temp_dir, Dispatcher::new(registry, root))
}

fn call(name: &str, args: serde_json::Value) -> FunctionCall {
    FunctionCall::new(name, args)
}

#[tokio::test]
async fn test_write_then_read_round_trip() {
    let (temp, dispatcher) = setup();

    let written = dispatcher
        .dispatch(&call(
            "write_file",
            json!({"file_path": "pkg/calc.py", "content": "def add(a, b):\n    return a + b\n"}),
        ))
        .await
        .unwrap();
    assert_eq!(
        written,
        "Successfully wrote to \"pkg/calc.py\" (32 characters written)"
    );
    assert!(temp.path().join("pkg").is_dir());

    let content = dispatcher
        .dispatch(&call("get_file_content", json!({"file_path": "pkg/calc.py"})))
        .await
        .unwrap();
    assert_eq!(content, "def add(a, b):\n    return a + b\n");
}

#[tokio::test]
async fn test_read_is_truncated_at_configured_limit() {
    let config = ToolsConfig {
        max_read_chars: 5,
        ..ToolsConfig::default()
    };
    let (temp, dispatcher) = setup_with(config);
    std::fs::write(temp.path().join("long.txt"), "abcdefghij").unwrap();

    let content = dispatcher
        .dispatch(&call("get_file_content", json!({"file_path": "long.txt"})))
        .await
        .unwrap();
    assert_eq!(
        content,
        "abcde[...File \"long.txt\" truncated at 5 characters]"
    );
}

#[tokio::test]
async fn test_listing_defaults_to_root() {
    let (temp, dispatcher) = setup();
    std::fs::write(temp.path().join("a"), "0123456789").unwrap();
    std::fs::create_dir(temp.path().join("b")).unwrap();

    let listing = dispatcher
        .dispatch(&call("get_files_info", json!({})))
        .await
        .unwrap();

    let mut lines: Vec<&str> = listing.lines().collect();
    lines.sort();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "- a: file_size=10 bytes, is_dir=false");
    assert!(lines[1].starts_with("- b: "));
    assert!(lines[1].ends_with("is_dir=true"));
}

#[tokio::test]
async fn test_empty_directory_lists_nothing() {
    let (_temp, dispatcher) = setup();
    let listing = dispatcher
        .dispatch(&call("get_files_info", json!({"directory": "."})))
        .await
        .unwrap();
    assert_eq!(listing, "");
}

#[tokio::test]
async fn test_containment_for_every_tool() {
    let (_temp, dispatcher) = setup();

    let cases = [
        (
            call("get_files_info", json!({"directory": "../"})),
            "Error: Cannot list \"../\" as it is outside the permitted working directory",
        ),
        (
            call("get_file_content", json!({"file_path": "/etc/passwd"})),
            "Error: Cannot read \"/etc/passwd\" as it is outside the permitted working directory",
        ),
        (
            call("write_file", json!({"file_path": "a/../../x.txt", "content": "x"})),
            "Error: Cannot write to \"a/../../x.txt\" as it is outside the permitted working directory",
        ),
        (
            call("run_python_file", json!({"file_path": "../main.py"})),
            "Error: Cannot execute \"../main.py\" as it is outside the permitted working directory",
        ),
    ];

    for (function_call, expected) in cases {
        let err = dispatcher.dispatch(&function_call).await.unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::Containment);
        assert_eq!(err.to_string(), expected);
    }
}

#[tokio::test]
async fn test_model_cannot_choose_working_directory() {
    let (_temp, dispatcher) = setup();

    let err = dispatcher
        .dispatch(&call(
            "get_files_info",
            json!({"directory": ".", "working_directory": "/"}),
        ))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ToolErrorKind::InvalidArguments);
    assert!(err.message().contains("unexpected parameter `working_directory`"));
}

#[tokio::test]
async fn test_wrong_argument_types_are_rejected() {
    let (_temp, dispatcher) = setup();

    let err = dispatcher
        .dispatch(&call("get_file_content", json!({"file_path": 7})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ToolErrorKind::InvalidArguments);
    assert!(err.message().contains("parameter `file_path` must be string"));

    let err = dispatcher
        .dispatch(&call(
            "run_python_file",
            json!({"file_path": "main.py", "args": "not-a-list"}),
        ))
        .await
        .unwrap_err();
    assert!(err.message().contains("parameter `args` must be array of string"));
}

#[tokio::test]
async fn test_unknown_function_lists_available_tools() {
    let (_temp, dispatcher) = setup();

    let err = dispatcher
        .dispatch(&call("rm_rf", json!({})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ToolErrorKind::UnknownOperation);
    assert_eq!(
        err.to_string(),
        "Error: Unknown function: rm_rf. Available functions: get_files_info, get_file_content, run_python_file, write_file"
    );
}

#[tokio::test]
async fn test_script_precondition_messages() {
    let (temp, dispatcher) = setup();
    std::fs::write(temp.path().join("notes.txt"), "hi").unwrap();

    let err = dispatcher
        .dispatch(&call("run_python_file", json!({"file_path": "missing.py"})))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Error: File \"missing.py\" not found.");

    let err = dispatcher
        .dispatch(&call("run_python_file", json!({"file_path": "notes.txt"})))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Error: \"notes.txt\" is not a Python file.");
}

#[cfg(unix)]
#[tokio::test]
async fn test_script_runs_inside_root() {
    use scout_engine::config::ScriptConfig;

    let config = ToolsConfig {
        script: ScriptConfig {
            interpreter: "sh".to_string(),
            extension: "sh".to_string(),
            timeout_secs: 10,
        },
        ..ToolsConfig::default()
    };
    let (temp, dispatcher) = setup_with(config);
    std::fs::write(temp.path().join("greet.sh"), "echo \"hello $1\"\n").unwrap();

    let output = dispatcher
        .dispatch(&call(
            "run_python_file",
            json!({"file_path": "greet.sh", "args": ["scout"]}),
        ))
        .await
        .unwrap();
    assert_eq!(output, "STDOUT:\nhello scout\nSTDERR:\n");
}

#[tokio::test]
async fn test_dispatcher_serves_concurrent_calls() {
    let (temp, dispatcher) = setup();
    for i in 0..8 {
        std::fs::write(temp.path().join(format!("f{}.txt", i)), format!("file {}", i)).unwrap();
    }

    let calls: Vec<FunctionCall> = (0..8)
        .map(|i| call("get_file_content", json!({"file_path": format!("f{}.txt", i)})))
        .collect();
    let results = futures::future::join_all(calls.iter().map(|c| dispatcher.dispatch(c))).await;

    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result.unwrap(), format!("file {}", i));
    }
}
