//! Directory-backed chat archive.
//!
//! One TOML file per archived session under
//! `<base>/<user_id>/<session_id>.toml`. Writes go through the atomic
//! storage layer so a crash mid-snapshot never leaves a torn file, and
//! concurrent snapshots of the same session serialize on the file lock.

use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use iris_core::archive::{ArchivedSession, ChatArchive};
use iris_core::error::{IrisError, Result};
use iris_core::session::ConversationTurn;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// On-disk document for one archived session.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArchiveDoc {
    session_id: String,
    user_id: String,
    image_preview: Option<String>,
    history: Vec<ConversationTurn>,
    last_updated: String,
}

/// `ChatArchive` implementation over a plain directory tree.
#[derive(Debug, Clone)]
pub struct DirChatArchive {
    base_dir: PathBuf,
}

impl DirChatArchive {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn session_path(&self, user_id: &str, session_id: &str) -> PathBuf {
        self.base_dir
            .join(user_id)
            .join(format!("{}.toml", session_id))
    }
}

#[async_trait]
impl ChatArchive for DirChatArchive {
    async fn save(
        &self,
        session_id: &str,
        user_id: &str,
        history: &[ConversationTurn],
        image_preview: Option<&str>,
    ) -> Result<()> {
        let doc = ArchiveDoc {
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            image_preview: image_preview.map(str::to_string),
            history: history.to_vec(),
            last_updated: chrono::Utc::now().to_rfc3339(),
        };
        let path = self.session_path(user_id, session_id);

        // Blocking file lock + fsync live off the async runtime.
        tokio::task::spawn_blocking(move || {
            let file = AtomicTomlFile::new(path);
            file.save(&doc)
        })
        .await
        .map_err(|e| IrisError::internal(format!("Archive task panicked: {}", e)))?
    }

    async fn load_all(&self, user_id: &str) -> Result<Vec<ArchivedSession>> {
        let user_dir = self.base_dir.join(user_id);
        if !user_dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        let mut entries = tokio::fs::read_dir(&user_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }

            let doc = tokio::task::spawn_blocking(move || {
                let file: AtomicTomlFile<ArchiveDoc> = AtomicTomlFile::new(path);
                file.load()
            })
            .await
            .map_err(|e| IrisError::internal(format!("Archive task panicked: {}", e)))?;

            match doc {
                Ok(Some(doc)) => sessions.push(ArchivedSession {
                    session_id: doc.session_id,
                    image_preview: doc.image_preview,
                    history: doc.history,
                    last_updated: doc.last_updated,
                }),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(target: "archive", "Skipping unreadable snapshot: {}", e);
                }
            }
        }

        sessions.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn turns(pairs: &[(&str, &str)]) -> Vec<ConversationTurn> {
        pairs
            .iter()
            .flat_map(|(q, a)| {
                vec![ConversationTurn::user(*q), ConversationTurn::assistant(*a)]
            })
            .collect()
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let archive = DirChatArchive::new(dir.path().to_path_buf());

        let history = turns(&[("what is this?", "a red car")]);
        archive
            .save("s-1", "user-a", &history, Some("data:image/png;base64,AA=="))
            .await
            .unwrap();

        let sessions = archive.load_all("user-a").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "s-1");
        assert_eq!(sessions[0].history, history);
        assert_eq!(
            sessions[0].image_preview.as_deref(),
            Some("data:image/png;base64,AA==")
        );
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let archive = DirChatArchive::new(dir.path().to_path_buf());

        archive
            .save("s-1", "user-a", &turns(&[("q1", "a1")]), None)
            .await
            .unwrap();
        let longer = turns(&[("q1", "a1"), ("q2", "a2")]);
        archive.save("s-1", "user-a", &longer, None).await.unwrap();

        let sessions = archive.load_all("user-a").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].history, longer);
    }

    #[tokio::test]
    async fn test_load_all_is_scoped_to_user() {
        let dir = TempDir::new().unwrap();
        let archive = DirChatArchive::new(dir.path().to_path_buf());

        archive
            .save("s-1", "user-a", &turns(&[("q", "a")]), None)
            .await
            .unwrap();
        archive
            .save("s-2", "user-b", &turns(&[("q", "a")]), None)
            .await
            .unwrap();

        let sessions = archive.load_all("user-a").await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "s-1");
    }

    #[tokio::test]
    async fn test_load_all_unknown_user_is_empty() {
        let dir = TempDir::new().unwrap();
        let archive = DirChatArchive::new(dir.path().to_path_buf());
        assert!(archive.load_all("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_all_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let archive = DirChatArchive::new(dir.path().to_path_buf());

        archive
            .save("older", "user-a", &turns(&[("q", "a")]), None)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        archive
            .save("newer", "user-a", &turns(&[("q", "a")]), None)
            .await
            .unwrap();

        let sessions = archive.load_all("user-a").await.unwrap();
        assert_eq!(sessions[0].session_id, "newer");
        assert_eq!(sessions[1].session_id, "older");
    }
}
