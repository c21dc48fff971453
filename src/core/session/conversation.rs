//! Conversation history for a call.

use serde::Serialize;

use crate::utils::now_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single turn. Embeddings ride along on user turns when the embedder
/// produced one.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

/// Append-only turn log.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn push(&mut self, role: Role, content: impl Into<String>, embedding: Option<Vec<f32>>) {
        self.turns.push(ConversationTurn {
            role,
            content: content.into(),
            timestamp_ms: now_ms(),
            embedding,
        });
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Renders the spoken exchange as alternating `Customer:` / `AI:`
    /// lines for prompt context. System turns are context for the
    /// process, not the conversation, and are skipped.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .filter_map(|turn| match turn.role {
                Role::User => Some(format!("Customer: {}", turn.content)),
                Role::Assistant => Some(format!("AI: {}", turn.content)),
                Role::System => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_alternating_labeled_lines() {
        let mut history = ConversationHistory::default();
        history.push(Role::Assistant, "Hi, this is Alex from Reacho.", None);
        history.push(Role::User, "who is this?", None);
        history.push(Role::Assistant, "Alex, from Reacho.", None);
        assert_eq!(
            history.render(),
            "AI: Hi, this is Alex from Reacho.\nCustomer: who is this?\nAI: Alex, from Reacho."
        );
    }

    #[test]
    fn system_turns_are_excluded_from_rendering() {
        let mut history = ConversationHistory::default();
        history.push(Role::System, "persona preamble", None);
        history.push(Role::User, "hello", None);
        assert_eq!(history.render(), "Customer: hello");
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn empty_history_renders_empty() {
        assert_eq!(ConversationHistory::default().render(), "");
    }
}
