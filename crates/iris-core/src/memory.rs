//! In-process session memory store.
//!
//! Maps session ids to conversation history and the pinned vision context.
//! Mutations are serialized per session id: each session lives behind its
//! own async mutex, so a `(user, assistant)` exchange is always appended
//! contiguously and concurrent writers on the same id cannot interleave
//! pairs. Vision context updates are last-writer-wins.

use crate::session::{ConversationTurn, Session};
use crate::vision::VisionContext;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Upper bound on retained history entries per session.
///
/// Beyond this the oldest exchange is evicted as a pair, so alternation is
/// preserved. 200 entries = 100 exchanges.
pub const MAX_HISTORY_ENTRIES: usize = 200;

/// Read-only snapshot of one session's context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    pub history: Vec<ConversationTurn>,
    pub vision_context: VisionContext,
}

/// Thread-safe store of all live sessions.
///
/// Cheap to clone; clones share the same underlying map.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Arc<Mutex<Session>>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the per-session handle, creating an empty session if the id
    /// is unknown. Idempotent, never fails.
    pub async fn get_or_create(&self, session_id: &str) -> Arc<Mutex<Session>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(session_id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new(session_id))))
            .clone()
    }

    /// Replaces the session's pinned vision context atomically, creating
    /// the session if absent.
    pub async fn set_vision_context(&self, session_id: &str, context: VisionContext) {
        let handle = self.get_or_create(session_id).await;
        let mut session = handle.lock().await;
        session.vision_context = context;
        session.updated_at = chrono::Utc::now().to_rfc3339();
    }

    /// Appends one logical turn (the user query and the final response) as
    /// a contiguous pair under a single lock acquisition.
    pub async fn append_exchange(&self, session_id: &str, query: &str, response: &str) {
        let handle = self.get_or_create(session_id).await;
        let mut session = handle.lock().await;
        session.history.push(ConversationTurn::user(query));
        session.history.push(ConversationTurn::assistant(response));
        // Evict oldest exchanges pairwise to keep memory boundable.
        while session.history.len() > MAX_HISTORY_ENTRIES {
            session.history.drain(..2);
        }
        session.updated_at = chrono::Utc::now().to_rfc3339();
    }

    /// Read-only snapshot of history plus vision context for prompt
    /// construction.
    pub async fn snapshot(&self, session_id: &str) -> ContextSnapshot {
        let handle = self.get_or_create(session_id).await;
        let session = handle.lock().await;
        ContextSnapshot {
            history: session.history.clone(),
            vision_context: session.vision_context.clone(),
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MessageRole;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = SessionStore::new();
        let first = store.get_or_create("s-1").await;
        let second = store.get_or_create("s-1").await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_exchange_appends_contiguous_pair() {
        let store = SessionStore::new();
        store.append_exchange("s-1", "question", "answer").await;
        store.append_exchange("s-1", "question 2", "answer 2").await;

        let snapshot = store.snapshot("s-1").await;
        assert_eq!(snapshot.history.len(), 4);
        assert_eq!(snapshot.history[0].role, MessageRole::User);
        assert_eq!(snapshot.history[1].role, MessageRole::Assistant);
        assert_eq!(snapshot.history[2].content, "question 2");
        assert_eq!(snapshot.history[3].content, "answer 2");
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_without_mutation() {
        let store = SessionStore::new();
        store.append_exchange("s-1", "q", "a").await;
        let first = store.snapshot("s-1").await;
        let second = store.snapshot("s-1").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_vision_context_overwritten_wholesale() {
        let store = SessionStore::new();
        let mut first = VisionContext::default();
        first.scene_description = "a dog".to_string();
        first
            .detected_objects
            .insert("dog".to_string(), 1);
        store.set_vision_context("s-1", first).await;

        let mut second = VisionContext::default();
        second.scene_description = "a cat".to_string();
        second.detected_objects.insert("cat".to_string(), 2);
        store.set_vision_context("s-1", second.clone()).await;

        let snapshot = store.snapshot("s-1").await;
        // No merging with prior context.
        assert_eq!(snapshot.vision_context, second);
        assert!(!snapshot.vision_context.detected_objects.contains_key("dog"));
    }

    #[tokio::test]
    async fn test_concurrent_exchanges_never_interleave_pairs() {
        let store = SessionStore::new();
        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store
                    .append_exchange("shared", &format!("q{}", i), &format!("a{}", i))
                    .await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = store.snapshot("shared").await;
        assert_eq!(snapshot.history.len(), 32);
        for pair in snapshot.history.chunks(2) {
            assert_eq!(pair[0].role, MessageRole::User);
            assert_eq!(pair[1].role, MessageRole::Assistant);
            // The answer belongs to the same request as the question.
            let q = pair[0].content.trim_start_matches('q');
            let a = pair[1].content.trim_start_matches('a');
            assert_eq!(q, a);
        }
    }

    #[tokio::test]
    async fn test_concurrent_vision_writes_end_in_one_state() {
        let store = SessionStore::new();
        let mut contexts = Vec::new();
        for i in 0..2 {
            let mut ctx = VisionContext::default();
            ctx.scene_description = format!("scene {}", i);
            ctx.detected_objects.insert(format!("object{}", i), 1);
            contexts.push(ctx);
        }

        let mut tasks = Vec::new();
        for ctx in contexts.clone() {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.set_vision_context("shared", ctx).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = store.snapshot("shared").await;
        // Exactly one of the two writes, never a mixture.
        assert!(contexts.contains(&snapshot.vision_context));
    }

    #[tokio::test]
    async fn test_history_eviction_keeps_pairs() {
        let store = SessionStore::new();
        for i in 0..(MAX_HISTORY_ENTRIES / 2 + 10) {
            store
                .append_exchange("s-1", &format!("q{}", i), &format!("a{}", i))
                .await;
        }
        let snapshot = store.snapshot("s-1").await;
        assert_eq!(snapshot.history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(snapshot.history[0].role, MessageRole::User);
        // Oldest exchanges evicted; the first retained pair is exchange 10.
        assert_eq!(snapshot.history[0].content, "q10");
        assert_eq!(snapshot.history[1].content, "a10");
    }
}
