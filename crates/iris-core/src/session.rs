//! Session domain model.
//!
//! A session is a logical, long-lived conversation scoped to one pinned
//! image and its dialogue history. Sessions are created implicitly on first
//! reference and live for the process lifetime unless archived.

use crate::vision::VisionContext;
use serde::{Deserialize, Serialize};

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single entry in the dialogue history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: MessageRole,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Represents the session concept in the application's core logic.
///
/// This is the "pure" model that the business logic layer operates on.
/// It is independent of any specific storage format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Insertion-ordered dialogue, strictly alternating user/assistant.
    pub history: Vec<ConversationTurn>,
    /// The most recently pinned vision analysis, overwritten wholesale on
    /// each new image upload. Empty until the first upload.
    pub vision_context: VisionContext,
    pub created_at: String,
    pub updated_at: String,
}

impl Session {
    /// Creates an empty session with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            history: Vec::new(),
            vision_context: VisionContext::default(),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Number of completed (user, assistant) exchanges.
    pub fn exchange_count(&self) -> usize {
        self.history.len() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new("s-1");
        assert_eq!(session.id, "s-1");
        assert!(session.history.is_empty());
        assert!(session.vision_context.is_empty());
        assert_eq!(session.exchange_count(), 0);
    }

    #[test]
    fn test_role_serialization_is_lowercase() {
        let turn = ConversationTurn::user("hello");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"user\""));

        let turn = ConversationTurn::assistant("hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"assistant\""));
    }
}
