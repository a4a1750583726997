//! Credential loading
//!
//! The Gemini API key is read from the environment into a [`SecretString`]
//! so it cannot end up in logs or error messages by accident. A `.env` file
//! in the current directory (or a parent) is merged into the environment
//! first; variables already set win.

pub mod string;

pub use string::SecretString;

use sdk::errors::EngineError;
use std::path::Path;
use tracing::{debug, warn};

/// Merge the nearest `.env` file into the process environment.
///
/// Returns whether a file was loaded. A missing file is not an error; a
/// malformed one is logged and skipped.
pub fn load_dotenv() -> bool {
    report_dotenv(dotenvy::dotenv().map(|path| path.display().to_string()))
}

/// Merge a specific env file into the process environment.
pub fn load_dotenv_from(path: &Path) -> bool {
    report_dotenv(dotenvy::from_path(path).map(|_| path.display().to_string()))
}

fn report_dotenv(outcome: dotenvy::Result<String>) -> bool {
    match outcome {
        Ok(path) => {
            debug!("Loaded environment from {}", path);
            true
        }
        Err(e) if e.not_found() => false,
        Err(e) => {
            warn!("Ignoring unreadable .env file: {}", e);
            false
        }
    }
}

/// Read the secret stored in environment variable `var`.
///
/// An unset, non-unicode or blank variable is reported as
/// `EngineError::MissingCredential`.
pub fn load_from_env(var: &str) -> Result<SecretString, EngineError> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => {
            debug!("Loaded credential from ${}", var);
            Ok(SecretString::new(value.trim()))
        }
        _ => Err(EngineError::MissingCredential(var.to_string())),
    }
}

/// Replace every occurrence of `secret` in `text` with `[REDACTED]`.
///
/// Used on provider error bodies before they are surfaced.
pub fn scrub(text: &str, secret: &SecretString) -> String {
    if secret.is_blank() {
        return text.to_string();
    }
    text.replace(secret.expose(), "[REDACTED]")
}
