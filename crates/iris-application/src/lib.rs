//! Application layer: the hybrid response gateway and its request metrics.

pub mod gateway;
pub mod monitoring;

pub use gateway::{ChatGateway, ChatRequest, ImageUpload};
pub use monitoring::{MetricsSnapshot, ServiceMetrics};
