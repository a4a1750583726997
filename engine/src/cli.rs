//! CLI interface for Scout
//!
//! This module provides the command-line interface using clap's derive API.
//! Scout has a single action: run the agent on the instruction given as
//! positional words.

use clap::builder::RangedU64ValueParser;
use clap::Parser;
use std::path::PathBuf;

/// Scout AI coding agent
///
/// Plans with Gemini and acts through a small set of tools confined to a
/// single working directory.
#[derive(Parser, Debug)]
#[command(name = "scout")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Echo function arguments and results, then the prompt and token usage
    #[arg(short, long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        value_name = "LEVEL",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Working directory the tools are confined to (overrides core.workspace)
    #[arg(long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Maximum number of LLM calls (overrides agent.max_iterations)
    #[arg(
        long,
        value_name = "N",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_iterations: Option<usize>,

    /// The instruction for the agent
    #[arg(required = true, num_args = 1.., value_name = "PROMPT")]
    pub prompt: Vec<String>,
}

impl Cli {
    /// Prompt words joined with single spaces
    pub fn prompt_text(&self) -> String {
        self.prompt.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_prompt_words_are_joined() {
        let cli = Cli::parse_from(["scout", "fix", "the", "calculator", "bug"]);
        assert_eq!(cli.prompt_text(), "fix the calculator bug");
        assert!(!cli.verbose);
        assert!(!cli.json);
    }

    #[test]
    fn test_flags_anywhere() {
        let cli = Cli::parse_from([
            "scout",
            "--workspace",
            "calculator",
            "list",
            "files",
            "--verbose",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.workspace, Some(PathBuf::from("calculator")));
        assert_eq!(cli.prompt_text(), "list files");
    }

    #[test]
    fn test_missing_prompt_is_an_error() {
        assert!(Cli::try_parse_from(["scout"]).is_err());
        assert!(Cli::try_parse_from(["scout", "--verbose"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "scout",
            "--json",
            "--log",
            "debug",
            "--config",
            "/tmp/scout.toml",
            "--max-iterations",
            "5",
            "hi",
        ]);
        assert!(cli.json);
        assert_eq!(cli.log, Some("debug".to_string()));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/scout.toml")));
        assert_eq!(cli.max_iterations, Some(5));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(Cli::try_parse_from(["scout", "--log", "loud", "hi"]).is_err());
        assert!(Cli::try_parse_from(["scout", "--max-iterations", "0", "hi"]).is_err());
    }
}
