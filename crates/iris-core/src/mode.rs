//! Analysis mode registry.
//!
//! Modes and their prompt rules are data, not code: a static registry maps
//! each mode tag to an immutable rules record (intent, tone, rule list,
//! output section order). Unknown tags resolve to the general-analysis
//! default instead of failing so an odd client value can never block the
//! conversation.
//!
//! A mode is a per-turn parameter. The caller is trusted to resend the same
//! value each turn; no session-level lock is enforced here.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// The named analysis styles a request can select.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisMode {
    #[strum(serialize = "storytelling", serialize = "story")]
    Storytelling,
    #[strum(serialize = "chart-interpretation", serialize = "chart")]
    ChartInterpretation,
    #[strum(serialize = "general-analysis", serialize = "general", serialize = "general analysis")]
    GeneralAnalysis,
    #[strum(serialize = "diagram-explanation", serialize = "diagram")]
    DiagramExplanation,
    #[strum(serialize = "security-audit", serialize = "security")]
    SecurityAudit,
    #[strum(serialize = "design-critique", serialize = "design")]
    DesignCritique,
    #[strum(serialize = "anatomical", serialize = "medical")]
    Anatomical,
}

impl AnalysisMode {
    /// Resolves an optional client-supplied mode tag.
    ///
    /// `None` (or blank) means no mode was selected at all and stays `None`
    /// so the composer can emit its precondition sentinel. A present but
    /// unrecognized tag degrades to `GeneralAnalysis`.
    pub fn resolve(tag: Option<&str>) -> Option<Self> {
        let tag = tag.map(str::trim).filter(|t| !t.is_empty())?;
        Some(tag.parse().unwrap_or(AnalysisMode::GeneralAnalysis))
    }

    /// Looks up the immutable rules record for this mode.
    pub fn profile(&self) -> &'static ModeProfile {
        REGISTRY
            .get(self)
            .unwrap_or_else(|| &REGISTRY[&AnalysisMode::GeneralAnalysis])
    }
}

/// Immutable prompt rules for one analysis mode.
#[derive(Debug, Clone)]
pub struct ModeProfile {
    pub intent: &'static str,
    pub tone: &'static str,
    pub rules: &'static [&'static str],
    /// Mandatory output section ordering.
    pub structure: &'static [&'static str],
}

static REGISTRY: Lazy<BTreeMap<AnalysisMode, ModeProfile>> = Lazy::new(|| {
    let mut table = BTreeMap::new();

    table.insert(
        AnalysisMode::Storytelling,
        ModeProfile {
            intent: "Weave a compelling, character-driven narrative where the connections and relationships between visual elements form the heart of the journey.",
            tone: "Evocative, literary, and immersive.",
            rules: &[
                "ABSOLUTE RULE: No technical jargon or analysis (do not say 'I detect' or 'detected objects')",
                "Transform the detected objects into a connected cast; every character must relate to another object or character in the scene",
                "Use spatial cues (which objects are near each other) to determine allies, enemies, or shared fates",
                "Use the scene description to establish atmospheric sensory details (lighting, weather, mood)",
                "MANDATORY: The 'Key Metrics' section must evaluate 'Narrative Potential' and 'Character Diversity'",
                "MANDATORY: The 'Key Points' section must highlight the 'Climax Element' and 'Emotional Anchor' of the image",
                "The 'Moral' must reflect the balance or tension between the visual elements",
            ],
            structure: &[
                "Title",
                "Setting (The World)",
                "Characters (The Souls of the Scene)",
                "The Narrative (Interconnected Journey)",
                "Key Metrics (Creative Output)",
                "Key Points (Focal Hubs)",
                "Core Theme",
                "Moral of the Story",
            ],
        },
    );

    table.insert(
        AnalysisMode::ChartInterpretation,
        ModeProfile {
            intent: "Objectively interpret charts or graphs using detected OCR values and spatial relationships.",
            tone: "Neutral, analytical.",
            rules: &[
                "No storytelling",
                "No assumptions outside the provided OCR text and labels",
                "Explicitly reference detected values and axis labels in the findings",
                "State uncertainty if labels or values are unclear",
                "MANDATORY: The 'Key Metrics' section must include 'Data Density Score' and 'Volatility Index'",
                "MANDATORY: The 'Key Points' section must list the 'Maximum Data Peak' and 'Inflection Points'",
            ],
            structure: &[
                "Chart Type",
                "Variables Identified",
                "Key Metrics (Statistical Overview)",
                "Key Points (Data Anomalies)",
                "Key Observations",
                "Trends and Patterns",
                "Notable Comparisons",
                "Data-Supported Insight",
            ],
        },
    );

    table.insert(
        AnalysisMode::GeneralAnalysis,
        ModeProfile {
            intent: "Explain what the image represents, its purpose, and its primary semantic elements.",
            tone: "Descriptive, objective.",
            rules: &[
                "No storytelling",
                "No emotional language",
                "Summarize all key detected entities and their spatial context",
                "Explain the likely real-world purpose based on visible clues",
                "MANDATORY: The 'Key Metrics' section must include 'Spatial Balance' and 'Object Density'",
                "MANDATORY: The 'Key Points' section must identify the 'Primary Subject' and 'Background Context' nodes",
            ],
            structure: &[
                "Image Overview",
                "Primary Elements",
                "Key Metrics (Visual Statistics)",
                "Key Points (Visual Anchors)",
                "Context or Purpose",
                "Important Details",
                "Concise Summary",
            ],
        },
    );

    table.insert(
        AnalysisMode::DiagramExplanation,
        ModeProfile {
            intent: "Explain diagrams, workflows, or systems using detected labels and logical connections.",
            tone: "Instructional, structured, technical.",
            rules: &[
                "Numbered steps only",
                "No narrative or morals",
                "Trace the flow using detected arrows or spatial sequence",
                "Define each technical label found in the OCR data",
                "MANDATORY: The 'Key Metrics' section must evaluate 'Logic Path Complexity' and 'Node Density'",
                "MANDATORY: The 'Key Points' section must define 'Entry Points' and 'Critical Decision Hubs'",
            ],
            structure: &[
                "Diagram Type",
                "Components Identified",
                "Key Metrics (System Complexity)",
                "Key Points (Logical Nodes)",
                "Step-by-Step Explanation",
                "Process or Data Flow",
                "Simple Use Case",
            ],
        },
    );

    table.insert(
        AnalysisMode::SecurityAudit,
        ModeProfile {
            intent: "Audit the scene for physical security exposures, hazards, and anomalous elements.",
            tone: "Cautious, factual, checklist-driven.",
            rules: &[
                "Ground every finding in a detected object or extracted text",
                "Rank findings by severity; state when no finding reaches a severity threshold",
                "Never speculate about intent, only about exposure",
                "MANDATORY: The 'Key Metrics' section must include 'Exposure Count' and 'Coverage Confidence'",
                "MANDATORY: The 'Key Points' section must identify 'Primary Exposure' and 'Mitigation Priority'",
            ],
            structure: &[
                "Audit Scope",
                "Observed Elements",
                "Key Metrics (Exposure Statistics)",
                "Key Points (Findings)",
                "Risk Ranking",
                "Recommended Mitigations",
            ],
        },
    );

    table.insert(
        AnalysisMode::DesignCritique,
        ModeProfile {
            intent: "Critique the composition, balance, and visual hierarchy of the image as a designed artifact.",
            tone: "Constructive, specific, craft-oriented.",
            rules: &[
                "Critique only what is visible; no assumptions about authorial intent",
                "Reference spatial placement of detected elements when judging balance",
                "Pair every criticism with a concrete suggestion",
                "MANDATORY: The 'Key Metrics' section must include 'Visual Hierarchy Score' and 'Whitespace Balance'",
                "MANDATORY: The 'Key Points' section must identify 'Focal Strength' and 'Weakest Region'",
            ],
            structure: &[
                "First Impression",
                "Composition Breakdown",
                "Key Metrics (Design Statistics)",
                "Key Points (Strengths and Weaknesses)",
                "Hierarchy and Flow",
                "Actionable Suggestions",
            ],
        },
    );

    table.insert(
        AnalysisMode::Anatomical,
        ModeProfile {
            intent: "Describe anatomical or biological structures visible in the image in precise, neutral terms.",
            tone: "Clinical, precise, non-diagnostic.",
            rules: &[
                "Never offer a diagnosis or medical advice",
                "Name structures only when clearly supported by the detections",
                "State uncertainty explicitly for ambiguous structures",
                "MANDATORY: The 'Key Metrics' section must include 'Structure Count' and 'Identification Confidence'",
                "MANDATORY: The 'Key Points' section must identify 'Primary Structure' and 'Notable Variation'",
            ],
            structure: &[
                "Specimen Overview",
                "Structures Identified",
                "Key Metrics (Identification Statistics)",
                "Key Points (Anatomical Anchors)",
                "Spatial Relationships",
                "Neutral Summary",
            ],
        },
    );

    table
});

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_resolve_absent_mode() {
        assert_eq!(AnalysisMode::resolve(None), None);
        assert_eq!(AnalysisMode::resolve(Some("")), None);
        assert_eq!(AnalysisMode::resolve(Some("   ")), None);
    }

    #[test]
    fn test_resolve_known_tags() {
        assert_eq!(
            AnalysisMode::resolve(Some("storytelling")),
            Some(AnalysisMode::Storytelling)
        );
        assert_eq!(
            AnalysisMode::resolve(Some("chart")),
            Some(AnalysisMode::ChartInterpretation)
        );
        assert_eq!(
            AnalysisMode::resolve(Some("GENERAL-ANALYSIS")),
            Some(AnalysisMode::GeneralAnalysis)
        );
    }

    #[test]
    fn test_unknown_tag_degrades_to_general() {
        assert_eq!(
            AnalysisMode::resolve(Some("quantum-vibes")),
            Some(AnalysisMode::GeneralAnalysis)
        );
    }

    #[test]
    fn test_every_mode_has_a_profile() {
        for mode in AnalysisMode::iter() {
            let profile = mode.profile();
            assert!(!profile.intent.is_empty());
            assert!(!profile.tone.is_empty());
            assert!(!profile.rules.is_empty());
            assert!(!profile.structure.is_empty());
        }
    }
}
