//! Prompt composition.
//!
//! Turns the pinned vision context, the dialogue history, and the incoming
//! query into the structured payload the remote reasoner consumes, or into a
//! precondition sentinel when the session is not ready for reasoning yet.
//!
//! The decision order is deliberate: sentinels are checked before any
//! serialization work, and mode resolution never fails for unrecognized
//! input.

use crate::mode::AnalysisMode;
use crate::session::{ConversationTurn, MessageRole};
use crate::vision::VisionContext;
use serde::{Deserialize, Serialize};

/// Wire role for assistant turns in the remote API (Gemini convention).
pub const MODEL_ROLE: &str = "model";
/// Wire role for user turns.
pub const USER_ROLE: &str = "user";

/// One role-tagged message of a composed prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub text: String,
}

/// A fully composed prompt ready for the remote reasoner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedPrompt {
    pub system_instruction: String,
    /// Ordered history turns followed by the current user query.
    pub messages: Vec<PromptMessage>,
}

/// Output of the composer: either a precondition sentinel or a real prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptPayload {
    /// No analysis mode was selected.
    NeedMode,
    /// No usable vision context exists for the session yet.
    NeedImage,
    Ready(ComposedPrompt),
}

/// Composes the prompt payload for one turn.
///
/// Short-circuit order, evaluated top to bottom:
/// 1. absent mode -> `NeedMode`
/// 2. empty vision context (blank scene description) -> `NeedImage`
/// 3. otherwise a full prompt with the vision context serialized verbatim
pub fn compose(
    vision: &VisionContext,
    history: &[ConversationTurn],
    query: &str,
    mode: Option<AnalysisMode>,
) -> PromptPayload {
    let Some(mode) = mode else {
        return PromptPayload::NeedMode;
    };

    if vision.is_empty() {
        return PromptPayload::NeedImage;
    }

    let vision_json =
        serde_json::to_string_pretty(vision).unwrap_or_else(|_| "{}".to_string());
    let profile = mode.profile();

    let rules = profile
        .rules
        .iter()
        .map(|r| format!("- {}", r))
        .collect::<Vec<_>>()
        .join("\n");
    let structure = profile.structure.join("\n");

    let system_instruction = format!(
        "You are a Visual Intelligence Assistant operating in a STRICT MODE-LOCKED SYSTEM.\n\
         \n\
         --------------------------------------------------\n\
         ACTIVE MODE: {mode}\n\
         --------------------------------------------------\n\
         Intent: {intent}\n\
         Tone: {tone}\n\
         \n\
         Behavior Rules:\n\
         {rules}\n\
         \n\
         Output Structure (MANDATORY):\n\
         {structure}\n\
         \n\
         STRICT SESSION FLOW RULES:\n\
         - Operate ONLY in the active mode for EVERY response in this session.\n\
         - This is a continuous reasoning session. Maintain context from previous turns but always prioritize answering the latest query.\n\
         - Ground every answer in the INTERNAL IMAGE DATA provided below.\n\
         - Never switch modes or reuse formats from other modes.\n\
         - Do not hallucinate unseen information.\n\
         - State uncertainty when image quality is low.\n\
         - If the image does not match the mode, clearly state that the image is incompatible.\n\
         \n\
         INTERNAL IMAGE DATA (YOUR EYES):\n\
         {vision_json}\n",
        mode = mode,
        intent = profile.intent,
        tone = profile.tone,
        rules = rules,
        structure = structure,
        vision_json = vision_json,
    );

    let mut messages: Vec<PromptMessage> = history
        .iter()
        .map(|turn| PromptMessage {
            role: match turn.role {
                MessageRole::User => USER_ROLE.to_string(),
                MessageRole::Assistant => MODEL_ROLE.to_string(),
            },
            text: turn.content.clone(),
        })
        .collect();

    messages.push(PromptMessage {
        role: USER_ROLE.to_string(),
        text: query.to_string(),
    });

    PromptPayload::Ready(ComposedPrompt {
        system_instruction,
        messages,
    })
}
