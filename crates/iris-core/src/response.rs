//! Per-turn response envelope.

use crate::vision::VisionContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which path produced the response text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePath {
    /// The remote reasoning call succeeded (or a sentinel short-circuited
    /// before any reasoning was needed).
    Hybrid,
    /// The local fallback responder produced the answer.
    Local,
}

/// Compact vision metadata echoed with every turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionSummary {
    pub scene_description: String,
    pub detected_objects: BTreeMap<String, u32>,
    pub object_count: u32,
}

impl VisionSummary {
    pub fn from_context(context: &VisionContext) -> Self {
        Self {
            scene_description: context.scene_description.clone(),
            detected_objects: context.detected_objects.clone(),
            object_count: context.detected_objects.values().sum(),
        }
    }
}

/// The structured output of one gateway turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub session_id: String,
    pub text: String,
    pub mode: ResponsePath,
    /// True when the remote reasoner failed and the fallback fired.
    pub degraded: bool,
    /// Whether the response text contains list formatting.
    pub has_list: bool,
    pub vision: VisionSummary,
    /// Narrative/risk excerpt derived from the pinned context.
    pub risk_excerpt: String,
    pub suggestions: Vec<String>,
    pub latency_ms: u64,
}

impl ResponseEnvelope {
    /// Detects list formatting the same way the response renderer does.
    pub fn detect_list(text: &str) -> bool {
        ["\u{2022}", "- ", "1."].iter().any(|marker| text.contains(marker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_tag_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ResponsePath::Hybrid).unwrap(), "\"hybrid\"");
        assert_eq!(serde_json::to_string(&ResponsePath::Local).unwrap(), "\"local\"");
    }

    #[test]
    fn test_list_detection() {
        assert!(ResponseEnvelope::detect_list("1. first step"));
        assert!(ResponseEnvelope::detect_list("\u{2022} bullet"));
        assert!(!ResponseEnvelope::detect_list("plain prose"));
    }

    #[test]
    fn test_vision_summary_counts() {
        let mut context = VisionContext::default();
        context.scene_description = "a park".to_string();
        context.detected_objects.insert("tree".to_string(), 3);
        context.detected_objects.insert("bench".to_string(), 1);
        let summary = VisionSummary::from_context(&context);
        assert_eq!(summary.object_count, 4);
        assert_eq!(summary.scene_description, "a park");
    }
}
