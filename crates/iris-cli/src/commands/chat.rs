use anyhow::{Context, Result};
use iris_application::{ChatGateway, ChatRequest, ImageUpload};
use iris_core::memory::SessionStore;
use iris_infrastructure::{DirChatArchive, IrisPaths};
use iris_interaction::{GeminiReasoner, PixelStatsBackend, VisionEngine};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One-shot chat turn: wire the gateway, run the request, print the
/// envelope as pretty JSON.
pub async fn run(
    query: String,
    image: Option<PathBuf>,
    mode: Option<String>,
    session: Option<String>,
    user: Option<String>,
) -> Result<()> {
    let gateway = build_gateway()?;

    let image = match image {
        Some(path) => Some(load_image(&path)?),
        None => None,
    };

    let request = ChatRequest {
        query,
        image,
        mode,
        session_id: session,
        user_id: user,
        ..ChatRequest::default()
    };

    let envelope = gateway.handle(request).await?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Composition root: the vision engine is constructed once here and
/// injected, never resolved lazily inside the gateway.
fn build_gateway() -> Result<ChatGateway> {
    let engine = VisionEngine::new(Arc::new(PixelStatsBackend));
    let reasoner = Arc::new(GeminiReasoner::from_env());
    let archive = Arc::new(DirChatArchive::new(IrisPaths::archive_dir()?));

    Ok(ChatGateway::new(SessionStore::new(), engine, reasoner).with_archive(archive))
}

fn load_image(path: &Path) -> Result<ImageUpload> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    let media_type = match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => anyhow::bail!(
            "Unsupported image extension for {} (expected jpg, jpeg, png, or webp)",
            path.display()
        ),
    };

    Ok(ImageUpload {
        bytes,
        media_type: media_type.to_string(),
    })
}
