//! Vision context domain model.
//!
//! A `VisionContext` is the structured output of one local image analysis.
//! It is pinned per session until replaced by a new image, and it is the
//! single source of truth for every locally produced answer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel entry used when OCR finds nothing readable.
pub const NO_TEXT_SENTINEL: &str = "No readable text detected";

/// Risk string used when no hazard heuristic fires.
pub const DEFAULT_RISK: &str = "Standard environment. No high-risk anomalies detected.";

/// Placeholder scene used by the degraded (failsafe) context.
const DEGRADED_SCENE: &str = "Scene analysis unavailable.";

/// Normalized bounding-box coordinates, expressed as percent strings
/// relative to the image dimensions (wire format of the analysis output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub top: String,
    pub left: String,
    pub width: String,
    pub height: String,
}

/// One detected object instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub label: String,
    pub confidence: f32,
    #[serde(rename = "box")]
    pub region: Region,
}

/// Derived spatial statistics over one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpatialMetrics {
    pub object_count: u32,
    pub unique_labels: u32,
    pub text_elements: u32,
    pub complexity_score: f32,
}

impl SpatialMetrics {
    /// Derives metrics from object counts and detected text.
    ///
    /// The sentinel "no text" entry does not count as a text element.
    pub fn derive(objects: &BTreeMap<String, u32>, text_detected: &[String]) -> Self {
        let object_count: u32 = objects.values().sum();
        let text_elements = if text_detected.len() == 1 && text_detected[0] == NO_TEXT_SENTINEL {
            0
        } else {
            text_detected.len() as u32
        };
        Self {
            object_count,
            unique_labels: objects.len() as u32,
            complexity_score: object_count as f32 * 0.5 + text_detected.len() as f32 * 0.2,
            text_elements,
        }
    }
}

/// The structured result of analyzing one image.
///
/// Invariant: a context is usable for prompt composition only when
/// `scene_description` is non-blank; an empty or malformed context is
/// treated as "no image yet".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionContext {
    pub scene_description: String,
    pub detected_objects: BTreeMap<String, u32>,
    pub bounding_boxes: Vec<BoundingBox>,
    pub text_detected: Vec<String>,
    pub risk_assessment: String,
    pub spatial_metrics: SpatialMetrics,
    pub confidence_note: String,
}

impl VisionContext {
    /// True when no image has been analyzed yet (or the analysis was
    /// malformed enough to be unusable).
    pub fn is_empty(&self) -> bool {
        self.scene_description.trim().is_empty()
    }

    /// Degraded-but-valid context returned when the underlying pipeline
    /// fails. The conversation continues; nothing here raises.
    pub fn degraded(reason: &str) -> Self {
        Self {
            scene_description: DEGRADED_SCENE.to_string(),
            detected_objects: BTreeMap::new(),
            bounding_boxes: Vec::new(),
            text_detected: vec![NO_TEXT_SENTINEL.to_string()],
            risk_assessment: DEFAULT_RISK.to_string(),
            spatial_metrics: SpatialMetrics::default(),
            confidence_note: format!("Failsafe mode triggered: {}", reason),
        }
    }

    /// True when the extracted text holds real content, not the sentinel.
    pub fn has_readable_text(&self) -> bool {
        !self.text_detected.is_empty() && self.text_detected[0] != NO_TEXT_SENTINEL
    }

    /// True when the risk assessment deviates from the default string.
    pub fn has_elevated_risk(&self) -> bool {
        !self.risk_assessment.is_empty() && self.risk_assessment != DEFAULT_RISK
    }

    /// Heuristic hazard scan over detected object labels.
    pub fn assess_risk(objects: &BTreeMap<String, u32>) -> String {
        let mut risks = Vec::new();
        if ["fire", "smoke", "knife"].iter().any(|l| objects.contains_key(*l)) {
            risks.push("Immediate physical hazard detected.");
        }
        if ["gas", "leak", "danger"].iter().any(|l| objects.contains_key(*l)) {
            risks.push("Structural hazard or chemical indicator detected.");
        }
        if risks.is_empty() {
            DEFAULT_RISK.to_string()
        } else {
            risks.join(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objects(pairs: &[(&str, u32)]) -> BTreeMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_default_context_is_empty() {
        assert!(VisionContext::default().is_empty());
    }

    #[test]
    fn test_degraded_context_is_well_typed_but_usable() {
        let ctx = VisionContext::degraded("model crashed");
        // Degraded still carries a scene placeholder so the conversation
        // does not get stuck in "upload an image" limbo.
        assert!(!ctx.is_empty());
        assert!(ctx.detected_objects.is_empty());
        assert!(!ctx.has_readable_text());
        assert!(ctx.confidence_note.contains("model crashed"));
    }

    #[test]
    fn test_risk_heuristics() {
        assert_eq!(
            VisionContext::assess_risk(&objects(&[("car", 2), ("person", 1)])),
            DEFAULT_RISK
        );
        let risk = VisionContext::assess_risk(&objects(&[("fire", 1)]));
        assert!(risk.contains("physical hazard"));
        let risk = VisionContext::assess_risk(&objects(&[("fire", 1), ("gas", 1)]));
        assert!(risk.contains("physical hazard"));
        assert!(risk.contains("chemical indicator"));
    }

    #[test]
    fn test_spatial_metrics_ignore_text_sentinel() {
        let objs = objects(&[("car", 2), ("tree", 3)]);
        let metrics = SpatialMetrics::derive(&objs, &[NO_TEXT_SENTINEL.to_string()]);
        assert_eq!(metrics.object_count, 5);
        assert_eq!(metrics.unique_labels, 2);
        assert_eq!(metrics.text_elements, 0);

        let metrics = SpatialMetrics::derive(&objs, &["STOP".to_string(), "EXIT".to_string()]);
        assert_eq!(metrics.text_elements, 2);
        assert!((metrics.complexity_score - (5.0 * 0.5 + 2.0 * 0.2)).abs() < f32::EPSILON);
    }

    #[test]
    fn test_elevated_risk_flag() {
        let mut ctx = VisionContext::degraded("x");
        assert!(!ctx.has_elevated_risk());
        ctx.risk_assessment = "Immediate physical hazard detected.".to_string();
        assert!(ctx.has_elevated_risk());
    }
}
