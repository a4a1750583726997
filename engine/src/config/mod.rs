//! Configuration management
//!
//! This module handles loading, validation, and management of the Scout configuration.
//! Configuration is stored in TOML format at ~/.scout/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Workspace (sandbox root) path and log level
//! - **agent**: Iteration budget and LLM call timeout
//! - **tools**: Read cap and script execution settings
//! - **llm**: Gemini provider settings
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration.
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Creates the workspace directory if it doesn't exist
//! - Canonicalizes the workspace to resolve symlinks and .. patterns
//!
//! # Examples
//!
//! ```no_run
//! use scout_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from the default location, or built-in defaults
//! let config = Config::load(None)?;
//!
//! println!("Workspace: {:?}", config.core.workspace);
//! println!("Model: {}", config.llm.gemini.model);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Agent loop limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub llm: LLMConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Sandbox root for every tool (supports ~ expansion)
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Agent loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of LLM calls per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Timeout for each LLM call in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Characters returned by get_file_content before truncation
    #[serde(default = "default_max_read_chars")]
    pub max_read_chars: usize,

    /// Script execution
    #[serde(default)]
    pub script: ScriptConfig,
}

/// Script execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    /// Interpreter the script path is passed to
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Required script extension, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Wall-clock limit in seconds
    #[serde(default = "default_script_timeout_secs")]
    pub timeout_secs: u64,
}

/// LLM provider configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Gemini provider settings
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Gemini provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Base URL for Gemini API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// Environment variable holding the API key (the key itself never
    /// lives in the config file)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_max_iterations() -> usize {
    20
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_max_read_chars() -> usize {
    10_000
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_extension() -> String {
    "py".to_string()
}

fn default_script_timeout_secs() -> u64 {
    30
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash-001".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            log_level: default_log_level(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            llm_timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_read_chars: default_max_read_chars(),
            script: ScriptConfig::default(),
        }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            extension: default_extension(),
            timeout_secs: default_script_timeout_secs(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            api_key_env: default_api_key_env(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the default location
    /// (~/.scout/config.toml) when `path` is `None`.
    ///
    /// A missing default file is not an error: built-in defaults are used and
    /// nothing is written to disk. An explicitly requested file must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails (invalid values, unusable workspace)
    pub fn load(path: Option<&Path>) -> Result<Self, EngineError> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        match Self::default_config_path() {
            Some(config_path) if config_path.exists() => Self::load_from_path(&config_path),
            _ => {
                debug!("No config file found, using defaults");
                let mut config = Self::default();
                config.validate_and_process()?;
                Ok(config)
            }
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let mut config = Self::parse(&contents)?;
        config.validate_and_process()?;

        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse TOML without validating it
    pub fn parse(contents: &str) -> Result<Self, EngineError> {
        toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Replace the workspace and re-validate
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Result<Self, EngineError> {
        self.core.workspace = workspace.into();
        self.validate_and_process()?;
        Ok(self)
    }

    /// Get the default configuration file path (~/.scout/config.toml)
    fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".scout").join("config.toml"))
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates value ranges
    /// - Expands ~ in the workspace path
    /// - Creates the workspace if it doesn't exist
    /// - Canonicalizes it and verifies it is a directory
    ///
    /// Running it twice is harmless.
    pub fn validate_and_process(&mut self) -> Result<(), EngineError> {
        // Validate log level
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.agent.max_iterations == 0 {
            return Err(EngineError::Config(
                "agent.max_iterations must be at least 1".to_string(),
            ));
        }
        if self.agent.llm_timeout_secs == 0 {
            return Err(EngineError::Config(
                "agent.llm_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.tools.max_read_chars == 0 {
            return Err(EngineError::Config(
                "tools.max_read_chars must be at least 1".to_string(),
            ));
        }

        let script = &self.tools.script;
        if script.timeout_secs == 0 {
            return Err(EngineError::Config(
                "tools.script.timeout_secs must be at least 1".to_string(),
            ));
        }
        if script.interpreter.trim().is_empty() {
            return Err(EngineError::Config(
                "tools.script.interpreter must not be empty".to_string(),
            ));
        }
        if script.extension.trim().is_empty() || script.extension.starts_with('.') {
            return Err(EngineError::Config(
                "tools.script.extension must be a bare extension such as \"py\"".to_string(),
            ));
        }

        if self.llm.gemini.api_key_env.trim().is_empty() {
            return Err(EngineError::Config(
                "llm.gemini.api_key_env must not be empty".to_string(),
            ));
        }

        // Expand and validate workspace path
        self.core.workspace = expand_path(&self.core.workspace)?;
        self.core.workspace = canonicalize_or_create(&self.core.workspace)?;

        // Verify workspace is a directory
        if !self.core.workspace.is_dir() {
            return Err(EngineError::Config(format!(
                "Workspace path is not a directory: {:?}",
                self.core.workspace
            )));
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
///
/// # Examples
///
/// ```ignore
/// let path = PathBuf::from("~/projects");
/// let expanded = expand_path(&path)?;
/// // expanded is now /home/user/projects (on Unix)
/// ```
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Canonicalize path, creating it as a directory if it doesn't exist
fn canonicalize_or_create(path: &Path) -> Result<PathBuf, EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;
    }

    path.canonicalize()
        .map_err(|e| EngineError::PathCanonicalization(path.to_path_buf(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.core.workspace, PathBuf::from("."));
        assert_eq!(config.core.log_level, "warn");
        assert_eq!(config.agent.max_iterations, 20);
        assert_eq!(config.tools.max_read_chars, 10_000);
        assert_eq!(config.tools.script.interpreter, "python3");
        assert_eq!(config.tools.script.timeout_secs, 30);
        assert_eq!(config.llm.gemini.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [agent]
            max_iterations = 5

            [tools.script]
            interpreter = "python3.12"
            "#,
        )
        .unwrap();

        assert_eq!(config.agent.max_iterations, 5);
        assert_eq!(config.agent.llm_timeout_secs, 120);
        assert_eq!(config.tools.script.interpreter, "python3.12");
        assert_eq!(config.tools.script.extension, "py");
        assert_eq!(config.llm.gemini.model, "gemini-2.0-flash-001");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp = TempDir::new().unwrap();

        let mut config = Config::parse("[core]\nlog_level = \"loud\"").unwrap();
        config.core.workspace = temp.path().to_path_buf();
        assert!(matches!(
            config.validate_and_process(),
            Err(EngineError::Config(_))
        ));

        let mut config = Config::parse("[agent]\nmax_iterations = 0").unwrap();
        config.core.workspace = temp.path().to_path_buf();
        assert!(config.validate_and_process().is_err());

        let mut config = Config::parse("[tools.script]\nextension = \".py\"").unwrap();
        config.core.workspace = temp.path().to_path_buf();
        assert!(config.validate_and_process().is_err());
    }

    #[test]
    fn test_workspace_is_created_and_canonicalized() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("nested/ws");

        let config = Config::default().with_workspace(&target).unwrap();
        assert_eq!(
            config.core.workspace,
            temp.path().canonicalize().unwrap().join("nested/ws")
        );
        assert!(config.core.workspace.is_dir());
    }

    #[test]
    fn test_workspace_file_is_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        fs::write(&file, "x").unwrap();

        assert!(Config::default().with_workspace(&file).is_err());
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.llm.gemini.base_url, deserialized.llm.gemini.base_url);
    }
}
