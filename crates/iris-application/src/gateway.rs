//! Hybrid response gateway.
//!
//! One request flows through validation, optional image refresh, context
//! load, prompt composition, then either the remote reasoner or the local
//! fallback, a single memory update, an optional archive snapshot, and
//! envelope assembly. Only `RemoteUnavailable` diverts to the fallback;
//! every other error propagates to the caller.

use crate::monitoring::ServiceMetrics;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use iris_core::archive::ChatArchive;
use iris_core::error::{IrisError, Result};
use iris_core::fallback;
use iris_core::memory::{ContextSnapshot, SessionStore};
use iris_core::mode::AnalysisMode;
use iris_core::prompt::{self, PromptPayload};
use iris_core::reasoner::{Reasoner, RemoteOutcome};
use iris_core::response::{ResponseEnvelope, ResponsePath, VisionSummary};
use iris_interaction::engine::{preprocess, VisionEngine};
use std::sync::Arc;
use std::time::Instant;

/// Accepted media types for binary image uploads.
const ALLOWED_MEDIA_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Upper bound on binary upload size.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Upper bound on sanitized query length, in characters.
const MAX_QUERY_CHARS: usize = 2000;

/// Canned reply when no analysis mode has been selected.
pub const SELECT_MODE_TEXT: &str =
    "Please select an analysis mode first. Each mode shapes how I read the image, \
     from storytelling to chart interpretation to general analysis.";

/// Canned reply when no image has been pinned to the session yet.
pub const UPLOAD_IMAGE_TEXT: &str =
    "I'm ready to help! Please upload an image, and we can explore it together.";

/// Prefix added the first time a turn is served by the local fallback.
pub const DEGRADATION_NOTICE: &str =
    "*(Notice: Advanced reasoning is temporarily unavailable. Using local context.)* ";

/// Substring used to detect whether the notice was recently shown.
const NOTICE_MARKER: &str = "Advanced reasoning is temporarily unavailable";

/// Base follow-up suggestions echoed with every envelope.
const BASE_SUGGESTIONS: [&str; 3] = [
    "Ask about a specific object in the scene.",
    "Request a more detailed description.",
    "Upload a different image to switch context.",
];

/// Extra suggestion appended when the risk assessment is non-default.
const RISK_SUGGESTION: &str = "Ask for safety guidance on the flagged hazard.";

/// A binary image upload with its declared media type.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// One incoming chat turn.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub query: String,
    /// Binary upload; preferred over the preview when both are present.
    pub image: Option<ImageUpload>,
    /// Base64 data-URL preview of the pinned image, also passed to the
    /// archive as-is.
    pub image_preview: Option<String>,
    pub session_id: Option<String>,
    /// Present for authenticated callers; enables archive snapshots.
    pub user_id: Option<String>,
    pub mode: Option<String>,
}

/// The hybrid response gateway.
#[derive(Clone)]
pub struct ChatGateway {
    store: SessionStore,
    engine: VisionEngine,
    reasoner: Arc<dyn Reasoner>,
    archive: Option<Arc<dyn ChatArchive>>,
    metrics: ServiceMetrics,
}

impl ChatGateway {
    pub fn new(store: SessionStore, engine: VisionEngine, reasoner: Arc<dyn Reasoner>) -> Self {
        Self {
            store,
            engine,
            reasoner,
            archive: None,
            metrics: ServiceMetrics::new(),
        }
    }

    /// Enables best-effort archive snapshots for authenticated requests.
    pub fn with_archive(mut self, archive: Arc<dyn ChatArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    /// Handles one chat turn end to end.
    ///
    /// # Errors
    ///
    /// Returns `IrisError::Validation` for client mistakes (bad upload,
    /// undecodable binary image). Remote reasoner outages never surface
    /// here; they are absorbed by the local fallback.
    pub async fn handle(&self, request: ChatRequest) -> Result<ResponseEnvelope> {
        let start = Instant::now();
        let session_id = resolve_session_id(request.session_id.as_deref());
        tracing::info!(target: "gateway", session_id = %session_id, "Handling chat turn");

        match self.process(&session_id, &request, start).await {
            Ok(envelope) => {
                self.metrics.record_success(envelope.latency_ms);
                Ok(envelope)
            }
            Err(e) => {
                self.metrics
                    .record_failure(start.elapsed().as_millis() as u64);
                tracing::error!(
                    target: "gateway",
                    session_id = %session_id,
                    "Chat turn failed: {}",
                    e
                );
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        session_id: &str,
        request: &ChatRequest,
        start: Instant,
    ) -> Result<ResponseEnvelope> {
        let query = sanitize_query(&request.query);

        self.refresh_vision(session_id, request).await?;
        let snapshot = self.store.snapshot(session_id).await;
        let mode = AnalysisMode::resolve(request.mode.as_deref());

        let (text, path, degraded) =
            match prompt::compose(&snapshot.vision_context, &snapshot.history, &query, mode) {
                PromptPayload::NeedMode => {
                    (SELECT_MODE_TEXT.to_string(), ResponsePath::Hybrid, false)
                }
                PromptPayload::NeedImage => {
                    (UPLOAD_IMAGE_TEXT.to_string(), ResponsePath::Hybrid, false)
                }
                PromptPayload::Ready(prompt) => match self.reasoner.generate(&prompt).await {
                    Ok(RemoteOutcome::Answer(answer)) => (answer, ResponsePath::Hybrid, false),
                    Ok(RemoteOutcome::FirstContact) => {
                        (UPLOAD_IMAGE_TEXT.to_string(), ResponsePath::Hybrid, false)
                    }
                    Err(e) if e.is_remote_unavailable() => {
                        tracing::warn!(
                            target: "gateway",
                            session_id = %session_id,
                            "Remote reasoning unavailable, serving local reply: {}",
                            e
                        );
                        // compose only yields Ready when a mode is set.
                        let mode = mode.unwrap_or(AnalysisMode::GeneralAnalysis);
                        let text = degraded_reply(&query, &snapshot, mode);
                        (text, ResponsePath::Local, true)
                    }
                    Err(e) => return Err(e),
                },
            };

        self.store.append_exchange(session_id, &query, &text).await;
        self.persist(session_id, request).await;

        let vision = &snapshot.vision_context;
        let mut suggestions: Vec<String> =
            BASE_SUGGESTIONS.iter().map(|s| s.to_string()).collect();
        if vision.has_elevated_risk() {
            suggestions.push(RISK_SUGGESTION.to_string());
        }

        Ok(ResponseEnvelope {
            session_id: session_id.to_string(),
            has_list: ResponseEnvelope::detect_list(&text),
            text,
            mode: path,
            degraded,
            vision: VisionSummary::from_context(vision),
            risk_excerpt: vision.risk_assessment.clone(),
            suggestions,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Analyzes a freshly supplied image, if any, and pins the result.
    ///
    /// The binary upload is authoritative; a malformed base64 preview is
    /// logged and skipped rather than failing the turn.
    async fn refresh_vision(&self, session_id: &str, request: &ChatRequest) -> Result<()> {
        let (bytes, binary) = if let Some(upload) = &request.image {
            validate_upload(upload)?;
            (Some(upload.bytes.clone()), true)
        } else if let Some(preview) = &request.image_preview {
            match decode_preview(preview) {
                Some(bytes) => (Some(bytes), false),
                None => {
                    tracing::warn!(
                        target: "gateway",
                        session_id = %session_id,
                        "Malformed image preview, keeping existing context"
                    );
                    (None, false)
                }
            }
        } else {
            (None, false)
        };

        let Some(bytes) = bytes else {
            return Ok(());
        };

        let engine = self.engine.clone();
        let analysis = tokio::task::spawn_blocking(move || {
            let image = preprocess(&bytes)?;
            Ok::<_, IrisError>(engine.analyze(&image))
        })
        .await
        .map_err(|e| IrisError::internal(format!("Vision task panicked: {}", e)))?;

        match analysis {
            Ok(context) => {
                self.store.set_vision_context(session_id, context).await;
                Ok(())
            }
            Err(e) if !binary => {
                tracing::warn!(
                    target: "gateway",
                    session_id = %session_id,
                    "Preview image undecodable, keeping existing context: {}",
                    e
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort archive snapshot for authenticated callers.
    async fn persist(&self, session_id: &str, request: &ChatRequest) {
        let (Some(archive), Some(user_id)) = (&self.archive, &request.user_id) else {
            return;
        };

        let snapshot = self.store.snapshot(session_id).await;
        if let Err(e) = archive
            .save(
                session_id,
                user_id,
                &snapshot.history,
                request.image_preview.as_deref(),
            )
            .await
        {
            tracing::warn!(
                target: "gateway",
                session_id = %session_id,
                "Archive snapshot failed: {}",
                e
            );
        }
    }
}

/// Builds the local reply for a turn the remote path could not serve.
///
/// On the very first turn of a session with no pinned vision the canned
/// upload guidance wins; otherwise the fallback answer is prefixed with the
/// degradation notice unless it already appears in either of the last two
/// history turns.
fn degraded_reply(query: &str, snapshot: &ContextSnapshot, mode: AnalysisMode) -> String {
    if snapshot.history.is_empty() && snapshot.vision_context.is_empty() {
        return UPLOAD_IMAGE_TEXT.to_string();
    }

    let reply = fallback::reply(query, &snapshot.vision_context, mode);
    let recently_notified = snapshot
        .history
        .iter()
        .rev()
        .take(2)
        .any(|turn| turn.content.contains(NOTICE_MARKER));

    if recently_notified {
        reply
    } else {
        format!("{}{}", DEGRADATION_NOTICE, reply)
    }
}

/// Returns the caller's session id, or mints a fresh uuid v4.
fn resolve_session_id(session_id: Option<&str>) -> String {
    match session_id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

/// Trims, strips control characters, and caps the query length.
fn sanitize_query(query: &str) -> String {
    query
        .trim()
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .take(MAX_QUERY_CHARS)
        .collect()
}

fn validate_upload(upload: &ImageUpload) -> Result<()> {
    let media_type = upload.media_type.to_lowercase();
    if !ALLOWED_MEDIA_TYPES.contains(&media_type.as_str()) {
        return Err(IrisError::validation(format!(
            "Unsupported image type: {}",
            upload.media_type
        )));
    }
    if upload.bytes.is_empty() {
        return Err(IrisError::validation("Uploaded image is empty"));
    }
    if upload.bytes.len() > MAX_IMAGE_BYTES {
        return Err(IrisError::validation(
            "Image exceeds the 10 MiB upload limit",
        ));
    }
    Ok(())
}

/// Decodes a `data:<type>;base64,<payload>` preview. Returns `None` for
/// anything that does not parse.
fn decode_preview(preview: &str) -> Option<Vec<u8>> {
    let payload = match preview.split_once("base64,") {
        Some((_, payload)) => payload,
        None => preview,
    };
    BASE64_STANDARD.decode(payload.trim()).ok()
}
