//! Tool declarations and argument validation
//!
//! A [`FunctionDeclaration`] is advertised to the model and is also the
//! contract the dispatcher checks incoming arguments against before any tool
//! code runs.

use sdk::types::ToolError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;

/// JSON type of a declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Boolean,
    Array(Box<ParamType>),
}

impl ParamType {
    pub fn array_of(item: ParamType) -> Self {
        ParamType::Array(Box::new(item))
    }

    /// Whether `value` is an instance of this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array(item) => value
                .as_array()
                .is_some_and(|values| values.iter().all(|v| item.matches(v))),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => write!(f, "string"),
            ParamType::Integer => write!(f, "integer"),
            ParamType::Boolean => write!(f, "boolean"),
            ParamType::Array(item) => write!(f, "array of {}", item),
        }
    }
}

/// A single declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

/// Name, description and parameters of a callable tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl FunctionDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Add a required parameter
    pub fn required(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            param_type,
            required: true,
            description: description.into(),
        });
        self
    }

    /// Add an optional parameter
    pub fn optional(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            param_type,
            required: false,
            description: description.into(),
        });
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Check `args` against the declared parameters.
    ///
    /// Rejects missing required parameters, values of the wrong JSON type and
    /// any parameter that is not declared. A `null` value counts as absent.
    /// All problems are reported together.
    pub fn validate(&self, args: &Map<String, Value>) -> Result<(), ToolError> {
        let mut problems = Vec::new();

        for spec in &self.params {
            match args.get(&spec.name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        problems.push(format!("missing required parameter `{}`", spec.name));
                    }
                }
                Some(value) if !spec.param_type.matches(value) => {
                    problems.push(format!(
                        "parameter `{}` must be {}",
                        spec.name, spec.param_type
                    ));
                }
                Some(_) => {}
            }
        }

        let mut unexpected: Vec<&str> = args
            .keys()
            .filter(|key| self.param(key).is_none())
            .map(String::as_str)
            .collect();
        unexpected.sort_unstable();
        for key in unexpected {
            problems.push(format!("unexpected parameter `{}`", key));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ToolError::invalid_arguments(&self.name, problems.join("; ")))
        }
    }
}

/// Deserialize validated arguments into a tool's typed parameter struct.
///
/// `null` values are dropped first so `#[serde(default)]` fields apply.
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Map<String, Value>) -> Result<T, ToolError> {
    let args: Map<String, Value> = args.into_iter().filter(|(_, v)| !v.is_null()).collect();
    serde_json::from_value(Value::Object(args)).map_err(|e| ToolError::invalid_arguments(tool, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::ToolErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    fn run_decl() -> FunctionDeclaration {
        FunctionDeclaration::new("run_python_file", "Run a script")
            .required("file_path", ParamType::String, "Script path")
            .optional(
                "args",
                ParamType::array_of(ParamType::String),
                "Command-line arguments",
            )
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_valid_arguments() {
        let decl = run_decl();
        assert!(decl.validate(&args(json!({"file_path": "main.py"}))).is_ok());
        assert!(decl
            .validate(&args(json!({"file_path": "main.py", "args": ["3", "5"]})))
            .is_ok());
        assert!(decl
            .validate(&args(json!({"file_path": "main.py", "args": null})))
            .is_ok());
    }

    #[test]
    fn test_missing_required_parameter() {
        let err = run_decl().validate(&Map::new()).unwrap_err();
        assert_eq!(err.kind(), ToolErrorKind::InvalidArguments);
        assert_eq!(
            err.message(),
            "Invalid arguments for run_python_file: missing required parameter `file_path`"
        );
    }

    #[test]
    fn test_wrong_type() {
        let err = run_decl()
            .validate(&args(json!({"file_path": 7, "args": ["a", 1]})))
            .unwrap_err();
        assert!(err.message().contains("parameter `file_path` must be string"));
        assert!(err
            .message()
            .contains("parameter `args` must be array of string"));
    }

    #[test]
    fn test_undeclared_parameter_is_rejected() {
        let err = run_decl()
            .validate(&args(
                json!({"file_path": "main.py", "working_directory": "/"}),
            ))
            .unwrap_err();
        assert!(err
            .message()
            .contains("unexpected parameter `working_directory`"));
    }

    #[test]
    fn test_integer_and_boolean_matching() {
        assert!(ParamType::Integer.matches(&json!(3)));
        assert!(!ParamType::Integer.matches(&json!(3.5)));
        assert!(ParamType::Boolean.matches(&json!(false)));
        assert!(!ParamType::Boolean.matches(&json!("false")));
    }

    #[test]
    fn test_parse_args_applies_defaults() {
        #[derive(Deserialize)]
        struct Params {
            file_path: String,
            #[serde(default)]
            args: Vec<String>,
        }

        let params: Params =
            parse_args("run_python_file", args(json!({"file_path": "a.py", "args": null})))
                .unwrap();
        assert_eq!(params.file_path, "a.py");
        assert!(params.args.is_empty());
    }
}
