use anyhow::Result;
use iris_core::archive::ChatArchive;
use iris_infrastructure::{DirChatArchive, IrisPaths};

/// Lists a user's archived sessions, most recently updated first.
pub async fn run(user: &str) -> Result<()> {
    let archive = DirChatArchive::new(IrisPaths::archive_dir()?);
    let sessions = archive.load_all(user).await?;

    if sessions.is_empty() {
        println!("No archived sessions for {}", user);
        return Ok(());
    }

    for session in sessions {
        println!(
            "{}  ({} turns, updated {})",
            session.session_id,
            session.history.len(),
            session.last_updated
        );
    }
    Ok(())
}
