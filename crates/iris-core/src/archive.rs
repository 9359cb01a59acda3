//! Durable chat archive seam.
//!
//! Authenticated callers get their transcripts snapshotted to durable
//! storage keyed by session and user. The store itself is a collaborator;
//! only its interface lives in the core.

use crate::error::Result;
use crate::session::ConversationTurn;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One persisted chat session as seen by an authenticated user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedSession {
    pub session_id: String,
    pub image_preview: Option<String>,
    pub history: Vec<ConversationTurn>,
    /// RFC3339 timestamp of the last snapshot.
    pub last_updated: String,
}

/// Durable key-value store for named chat transcripts.
#[async_trait]
pub trait ChatArchive: Send + Sync {
    /// Snapshots the transcript plus the image preview string. Replaces
    /// any previous snapshot for the same `(user_id, session_id)` pair.
    async fn save(
        &self,
        session_id: &str,
        user_id: &str,
        history: &[ConversationTurn],
        image_preview: Option<&str>,
    ) -> Result<()>;

    /// Lists a user's archived sessions, most recently updated first.
    async fn load_all(&self, user_id: &str) -> Result<Vec<ArchivedSession>>;
}
