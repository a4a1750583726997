//! Conversation history for one agent run
//!
//! Turns are only ever appended. Nothing is trimmed or rewritten: the model
//! sees exactly what it said, including parts the loop did not act on.

use serde::Serialize;

use crate::llm::{Content, Part, Role};

/// Average characters per token (rough estimate: 1 token ≈ 4 characters)
const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Conversation {
    turns: Vec<Content>,
}

impl Conversation {
    /// Start a conversation with the user's instruction
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![Content::user(prompt)],
        }
    }

    pub fn push(&mut self, turn: Content) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Content] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Content> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Number of turns with the given role
    pub fn count_role(&self, role: Role) -> usize {
        self.turns.iter().filter(|t| t.role == role).count()
    }

    /// Rough size of the history in tokens, for logging only
    pub fn estimated_tokens(&self) -> usize {
        let chars: usize = self
            .turns
            .iter()
            .flat_map(|turn| turn.parts.iter())
            .map(|part| match part {
                Part::Text(text) => text.len(),
                Part::FunctionCall(call) => {
                    call.name.len() + serde_json::Value::Object(call.args.clone()).to_string().len()
                }
                Part::FunctionResponse(response) => {
                    response.name.len() + response.response.to_string().len()
                }
            })
            .sum();
        chars.div_ceil(CHARS_PER_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FunctionCall, FunctionResponse};
    use serde_json::json;

    #[test]
    fn test_conversation_starts_with_prompt() {
        let conversation = Conversation::new("fix the bug");
        assert_eq!(conversation.len(), 1);
        assert_eq!(conversation.turns()[0].role, Role::User);
        assert_eq!(
            conversation.turns()[0].text(),
            Some("fix the bug".to_string())
        );
    }

    #[test]
    fn test_append_only_ordering() {
        let mut conversation = Conversation::new("go");
        conversation.push(Content::model(vec![Part::FunctionCall(FunctionCall::new(
            "get_files_info",
            json!({}),
        ))]));
        conversation.push(Content::tool_results(vec![FunctionResponse::from_result(
            "get_files_info",
            &Ok(String::new()),
        )]));

        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation.count_role(Role::Model), 1);
        assert_eq!(conversation.count_role(Role::Tool), 1);
        assert_eq!(conversation.last().map(|t| t.role), Some(Role::Tool));
    }

    #[test]
    fn test_token_estimate() {
        let conversation = Conversation::new("12345678");
        assert_eq!(conversation.estimated_tokens(), 2);
        assert_eq!(Conversation::default().estimated_tokens(), 0);
    }
}
