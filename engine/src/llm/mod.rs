//! LLM Provider Abstraction Layer
//!
//! The agent loop talks to its planning model through the [`LLMProvider`]
//! trait. Conversation turns are modelled as role-tagged [`Content`] made of
//! [`Part`]s, so a single model turn can carry text and any number of
//! function calls, and a single tool turn can carry several results.

use async_trait::async_trait;
use sdk::types::ToolResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::ops::AddAssign;

use crate::tools::schema::FunctionDeclaration;

pub mod gemini;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human instruction, and nudges from the loop itself
    User,

    /// Output of the planning model
    Model,

    /// Results of executed function calls
    Tool,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A function call proposed by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    /// Name of the tool to call
    pub name: String,

    /// Untrusted argument mapping, validated by the dispatcher
    #[serde(default)]
    pub args: Map<String, Value>,

    /// Opaque token some models attach to a call; it must be echoed back
    /// verbatim in the next request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            args,
            thought_signature: None,
        }
    }
}

/// The outcome of one function call as sent back to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionResponse {
    /// Name of the tool that produced this result
    pub name: String,

    /// `{"result": "..."}` on success, `{"error": "Error: ..."}` on failure
    pub response: Value,
}

impl FunctionResponse {
    pub fn from_result(name: impl Into<String>, result: &ToolResult) -> Self {
        let response = match result {
            Ok(text) => json!({ "result": text }),
            Err(e) => json!({ "error": e.to_string() }),
        };
        Self {
            name: name.into(),
            response,
        }
    }

    /// The text carried by this response, whichever key holds it
    pub fn text(&self) -> Option<&str> {
        self.response
            .get("result")
            .or_else(|| self.response.get("error"))
            .and_then(Value::as_str)
    }

    pub fn is_error(&self) -> bool {
        self.response.get("error").is_some()
    }
}

/// One piece of a conversation turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

/// A role-tagged conversation turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user turn holding a single text part
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    /// Create a model turn
    pub fn model(parts: Vec<Part>) -> Self {
        Self {
            role: Role::Model,
            parts,
        }
    }

    /// Create a tool turn from the results of one iteration
    pub fn tool_results(responses: Vec<FunctionResponse>) -> Self {
        Self {
            role: Role::Tool,
            parts: responses.into_iter().map(Part::FunctionResponse).collect(),
        }
    }

    /// Function calls in the order the model proposed them
    pub fn function_calls(&self) -> Vec<&FunctionCall> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text parts, `None` when there are none
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }
}

/// Token counters reported by the provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub response_tokens: u64,
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.response_tokens += other.response_tokens;
    }
}

/// Response from an LLM provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LLMResponse {
    /// The raw model turn. `None` when the provider returned no content at all.
    pub content: Option<Content>,

    /// Token counters for this call, when reported
    pub usage: Option<Usage>,
}

impl LLMResponse {
    /// A response holding only text
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: Some(Content::model(vec![Part::Text(text.into())])),
            usage: None,
        }
    }

    /// A response holding only function calls
    pub fn calls(calls: Vec<FunctionCall>) -> Self {
        Self {
            content: Some(Content::model(
                calls.into_iter().map(Part::FunctionCall).collect(),
            )),
            usage: None,
        }
    }

    /// A response with no content
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Proposed function calls, cloned out of the content
    pub fn function_calls(&self) -> Vec<FunctionCall> {
        self.content
            .as_ref()
            .map(|c| c.function_calls().into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Final-answer text, ignoring whitespace-only output
    pub fn final_text(&self) -> Option<String> {
        self.content
            .as_ref()
            .and_then(Content::text)
            .filter(|text| !text.trim().is_empty())
    }
}

/// Everything a provider needs for one planning call
#[derive(Debug, Clone, Copy)]
pub struct LLMRequest<'a> {
    pub system_prompt: &'a str,
    pub contents: &'a [Content],
    pub tools: &'a [FunctionDeclaration],
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "gemini")
    fn name(&self) -> &str;

    /// Generate the next model turn
    ///
    /// # Arguments
    /// * `request` - System prompt, full conversation history and the
    ///   declarations of the callable tools
    ///
    /// # Returns
    /// * `Ok(LLMResponse)` - The raw model turn plus usage counters
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, request: &LLMRequest<'_>) -> Result<LLMResponse>;
}
