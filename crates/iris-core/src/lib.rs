//! Domain layer of the Iris backend.
//!
//! Holds the session model, the vision context, the analysis-mode registry,
//! the prompt composer, the local fallback responder, the in-process
//! session memory store, and the seam traits (`Reasoner`, `ChatArchive`)
//! implemented by the outer crates.

pub mod archive;
pub mod config;
pub mod error;
pub mod fallback;
pub mod memory;
pub mod mode;
pub mod prompt;
pub mod reasoner;
pub mod response;
pub mod session;
pub mod vision;

// Re-export common error type
pub use error::{IrisError, Result};
