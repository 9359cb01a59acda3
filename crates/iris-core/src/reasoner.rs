//! Remote reasoner seam.
//!
//! The gateway only depends on this trait; the concrete HTTP client lives
//! in `iris-interaction`.

use crate::error::Result;
use crate::prompt::ComposedPrompt;
use async_trait::async_trait;

/// Outcome of a successful remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Trimmed text of the first candidate answer.
    Answer(String),
    /// Reserved sentinel: the prompt carried an empty-context marker with
    /// no prior turns, so no real answer was produced. The gateway must
    /// translate this into a canned greeting, never expose it verbatim.
    FirstContact,
}

/// Sends a composed prompt to an external text-generation service.
///
/// Failure contract: returns `IrisError::RemoteUnavailable` when no
/// credential is configured or when every candidate endpoint has been
/// exhausted. Any other error kind means a programming fault and must not
/// be swallowed by callers.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn generate(&self, prompt: &ComposedPrompt) -> Result<RemoteOutcome>;
}
