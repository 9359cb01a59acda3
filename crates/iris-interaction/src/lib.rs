//! Outward-facing integrations: the remote reasoning client and the local
//! vision engine wrapper.

pub mod engine;
pub mod gemini;

pub use engine::{
    Detection, PixelStatsBackend, ProcessedImage, RawObservations, StubBackend, VisionBackend,
    VisionEngine,
};
pub use gemini::GeminiReasoner;
