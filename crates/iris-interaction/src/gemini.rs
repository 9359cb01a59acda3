//! GeminiReasoner - REST client for the Gemini `generateContent` API.
//!
//! Tries a fixed-priority list of candidate models and only reports the
//! remote path as unavailable after every candidate has been exhausted.
//! There is no retry with backoff beyond the candidate iteration; each
//! attempt is bounded by the configured timeout.

use async_trait::async_trait;
use iris_core::config::ReasonerConfig;
use iris_core::error::{IrisError, Result};
use iris_core::prompt::ComposedPrompt;
use iris_core::reasoner::{Reasoner, RemoteOutcome};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Marker identifying a system instruction whose embedded vision context
/// serialized to a fully empty object. Anchored to the data header so an
/// empty sub-collection inside a real context (`"detected_objects": {}`)
/// never matches. Together with an empty history it signals first contact.
const EMPTY_CONTEXT_MARKER: &str = "INTERNAL IMAGE DATA (YOUR EYES):\n{}";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    system_instruction: SystemInstruction,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

/// Remote reasoner backed by the Gemini REST API.
#[derive(Clone)]
pub struct GeminiReasoner {
    client: Client,
    config: ReasonerConfig,
}

impl GeminiReasoner {
    /// Creates a new reasoner with the provided configuration.
    pub fn new(config: ReasonerConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Creates a reasoner configured from environment variables.
    pub fn from_env() -> Self {
        Self::new(ReasonerConfig::from_env())
    }

    fn build_request(prompt: &ComposedPrompt) -> GenerateRequest {
        GenerateRequest {
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: prompt.system_instruction.clone(),
                }],
            },
            contents: prompt
                .messages
                .iter()
                .map(|message| Content {
                    role: message.role.clone(),
                    parts: vec![Part {
                        text: message.text.clone(),
                    }],
                })
                .collect(),
        }
    }

    /// Diagnostic check: a prompt whose embedded vision context is a fully
    /// empty object and which has no prior turns produces no real answer.
    fn is_first_contact(prompt: &ComposedPrompt) -> bool {
        prompt.system_instruction.contains(EMPTY_CONTEXT_MARKER) && prompt.messages.len() <= 1
    }

    async fn try_model(&self, model: &str, api_key: &str, body: &GenerateRequest) -> Result<String> {
        let url = format!("{}/{}:generateContent", self.config.base_url, model);

        // Credential goes in a header, never in the URL: transport errors
        // echo the request URL into logs and error strings.
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(body)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| IrisError::remote_unavailable(format!("transport error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IrisError::remote_unavailable(format!("status {}", status)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| IrisError::remote_unavailable(format!("malformed response: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| IrisError::remote_unavailable("empty candidate list"))
    }
}

#[async_trait]
impl Reasoner for GeminiReasoner {
    async fn generate(&self, prompt: &ComposedPrompt) -> Result<RemoteOutcome> {
        let Some(api_key) = self.config.api_key.clone() else {
            return Err(IrisError::remote_unavailable("GEMINI_API_KEY is missing"));
        };

        if Self::is_first_contact(prompt) {
            return Ok(RemoteOutcome::FirstContact);
        }

        let body = Self::build_request(prompt);
        let mut last_error = String::new();

        for model in &self.config.models {
            match self.try_model(model, &api_key, &body).await {
                Ok(text) => return Ok(RemoteOutcome::Answer(text)),
                Err(e) => {
                    tracing::warn!(target: "reasoner", "Candidate {} failed: {}", model, e);
                    last_error = e.to_string();
                }
            }
        }

        Err(IrisError::remote_unavailable(format!(
            "All models failed: {}",
            last_error
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iris_core::prompt::PromptMessage;

    fn prompt_with(system: &str, messages: usize) -> ComposedPrompt {
        ComposedPrompt {
            system_instruction: system.to_string(),
            messages: (0..messages)
                .map(|i| PromptMessage {
                    role: "user".to_string(),
                    text: format!("message {}", i),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_missing_credential_is_remote_unavailable() {
        let reasoner = GeminiReasoner::new(ReasonerConfig::default());
        let prompt = prompt_with("instruction with real data", 1);
        let err = reasoner.generate(&prompt).await.unwrap_err();
        assert!(err.is_remote_unavailable());
    }

    #[tokio::test]
    async fn test_first_contact_sentinel() {
        let config = ReasonerConfig::default().with_api_key("test-key");
        let reasoner = GeminiReasoner::new(config);
        let prompt = prompt_with("INTERNAL IMAGE DATA (YOUR EYES):\n{}", 1);
        let outcome = reasoner.generate(&prompt).await.unwrap();
        assert_eq!(outcome, RemoteOutcome::FirstContact);
    }

    #[test]
    fn test_first_contact_requires_empty_history() {
        let prompt = prompt_with("INTERNAL IMAGE DATA (YOUR EYES):\n{}", 2);
        assert!(!GeminiReasoner::is_first_contact(&prompt));
        let prompt = prompt_with("INTERNAL IMAGE DATA (YOUR EYES):\n{}", 1);
        assert!(GeminiReasoner::is_first_contact(&prompt));
    }

    #[test]
    fn test_empty_sub_collections_are_not_first_contact() {
        // A real context with no detections still serializes `{}` for its
        // sub-collections; only a fully empty context object counts.
        let system = "INTERNAL IMAGE DATA (YOUR EYES):\n{\n  \
                      \"scene_description\": \"a bright image\",\n  \
                      \"detected_objects\": {},\n  \
                      \"bounding_boxes\": []\n}";
        let prompt = prompt_with(system, 1);
        assert!(!GeminiReasoner::is_first_contact(&prompt));
    }

    #[test]
    fn test_request_wire_shape() {
        let mut prompt = prompt_with("system text", 0);
        prompt.messages.push(PromptMessage {
            role: "user".to_string(),
            text: "hello".to_string(),
        });
        prompt.messages.push(PromptMessage {
            role: "model".to_string(),
            text: "hi".to_string(),
        });

        let body = GeminiReasoner::build_request(&prompt);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["system_instruction"]["parts"][0]["text"], "system text");
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "hi");
    }

    #[tokio::test]
    async fn test_all_candidates_exhausted_reports_unavailable() {
        // Unroutable base URL: every candidate fails with a transport error.
        let config = ReasonerConfig::default()
            .with_api_key("test-key")
            .with_base_url("http://127.0.0.1:1/models")
            .with_timeout(std::time::Duration::from_millis(200));
        let reasoner = GeminiReasoner::new(config);
        let prompt = prompt_with("instruction with real data", 1);
        let err = reasoner.generate(&prompt).await.unwrap_err();
        assert!(err.is_remote_unavailable());
        assert!(err.to_string().contains("All models failed"));
        // Transport errors echo the request URL; the credential must not
        // appear in it.
        assert!(!err.to_string().contains("test-key"));
    }
}
