//! Local vision engine wrapper.
//!
//! The detector/captioner/OCR stack is a black box behind the
//! `VisionBackend` trait. The engine owns the never-fail analysis
//! contract: a backend fault produces a degraded-but-valid context, never
//! an error. Preprocessing is the caller-visible part - undecodable bytes
//! are a validation error, not a degraded result.
//!
//! The engine is constructed once at the composition root and injected;
//! model loading cost is paid at construction time, not lazily on first
//! request.

use anyhow::Result as AnyResult;
use image::imageops::FilterType;
use image::RgbImage;
use iris_core::error::{IrisError, Result};
use iris_core::vision::{
    BoundingBox, Region, SpatialMetrics, VisionContext, NO_TEXT_SENTINEL,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Longest allowed image side after preprocessing.
pub const MAX_DIMENSION: u32 = 1200;

/// Cap on bounding boxes carried into the context.
const MAX_BOUNDING_BOXES: usize = 10;

/// A decoded, color-normalized, size-capped image ready for analysis.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pixels: RgbImage,
}

impl ProcessedImage {
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Decodes and normalizes raw upload bytes.
///
/// Converts to RGB and caps the longest side at [`MAX_DIMENSION`] with a
/// quality-preserving Lanczos3 filter. A decode failure here is a
/// client-visible validation error.
pub fn preprocess(image_data: &[u8]) -> Result<ProcessedImage> {
    let decoded = image::load_from_memory(image_data)
        .map_err(|e| IrisError::validation(format!("Image processing failed: {}", e)))?;

    let decoded = if decoded.width().max(decoded.height()) > MAX_DIMENSION {
        decoded.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Lanczos3)
    } else {
        decoded
    };

    Ok(ProcessedImage {
        pixels: decoded.to_rgb8(),
    })
}

/// One raw object detection in pixel coordinates (x1, y1, x2, y2).
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: [f32; 4],
}

/// Raw output of the underlying vision pipeline for one image.
#[derive(Debug, Clone, Default)]
pub struct RawObservations {
    pub caption: String,
    pub detections: Vec<Detection>,
    pub text_lines: Vec<String>,
}

/// The black-box vision pipeline: object detection, captioning, OCR.
pub trait VisionBackend: Send + Sync {
    /// Short backend identifier for the confidence note.
    fn name(&self) -> &str;

    /// Runs the pipeline. Stateless per call; may be long-running and
    /// CPU/accelerator-bound.
    fn observe(&self, image: &ProcessedImage) -> AnyResult<RawObservations>;
}

/// Wraps a backend with the never-fail analysis contract and the derived
/// risk/metrics fields.
#[derive(Clone)]
pub struct VisionEngine {
    backend: Arc<dyn VisionBackend>,
}

impl VisionEngine {
    pub fn new(backend: Arc<dyn VisionBackend>) -> Self {
        Self { backend }
    }

    /// Analyzes one image. Never fails: backend faults are logged and
    /// collapsed into a degraded context so the conversation continues.
    pub fn analyze(&self, image: &ProcessedImage) -> VisionContext {
        let raw = match self.backend.observe(image) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(target: "vision", "Local analysis failed: {}", e);
                return VisionContext::degraded(&e.to_string());
            }
        };
        self.assemble(image, raw)
    }

    fn assemble(&self, image: &ProcessedImage, raw: RawObservations) -> VisionContext {
        let width = image.width() as f32;
        let height = image.height() as f32;

        let mut detected_objects: BTreeMap<String, u32> = BTreeMap::new();
        let mut bounding_boxes = Vec::new();

        for detection in &raw.detections {
            *detected_objects.entry(detection.label.clone()).or_insert(0) += 1;

            if bounding_boxes.len() < MAX_BOUNDING_BOXES {
                let [x1, y1, x2, y2] = detection.bbox;
                bounding_boxes.push(BoundingBox {
                    label: detection.label.clone(),
                    confidence: detection.confidence,
                    region: Region {
                        top: format!("{:.2}%", y1 / height * 100.0),
                        left: format!("{:.2}%", x1 / width * 100.0),
                        width: format!("{:.2}%", (x2 - x1) / width * 100.0),
                        height: format!("{:.2}%", (y2 - y1) / height * 100.0),
                    },
                });
            }
        }

        let text_detected = if raw.text_lines.is_empty() {
            vec![NO_TEXT_SENTINEL.to_string()]
        } else {
            raw.text_lines
        };

        let risk_assessment = VisionContext::assess_risk(&detected_objects);
        let spatial_metrics = SpatialMetrics::derive(&detected_objects, &text_detected);

        VisionContext {
            scene_description: raw.caption,
            detected_objects,
            bounding_boxes,
            text_detected,
            risk_assessment,
            spatial_metrics,
            confidence_note: format!("Analysis performed using {}", self.backend.name()),
        }
    }
}

/// Default built-in backend: derives a coarse caption from pixel
/// statistics. Produces no detections or OCR lines, so counting and text
/// questions fall through to the generic fallback phrasing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelStatsBackend;

impl VisionBackend for PixelStatsBackend {
    fn name(&self) -> &str {
        "pixel statistics"
    }

    fn observe(&self, image: &ProcessedImage) -> AnyResult<RawObservations> {
        let pixels = image.pixels();
        let mut sums = [0u64; 3];
        for pixel in pixels.pixels() {
            for (sum, channel) in sums.iter_mut().zip(pixel.0) {
                *sum += u64::from(channel);
            }
        }
        let count = u64::from(image.width()) * u64::from(image.height());
        let count = count.max(1);
        let mean = [sums[0] / count, sums[1] / count, sums[2] / count];

        let palette = dominant_palette(mean);
        let brightness = (mean[0] + mean[1] + mean[2]) / 3;
        let light = match brightness {
            0..=85 => "dark",
            86..=170 => "evenly lit",
            _ => "bright",
        };

        Ok(RawObservations {
            caption: format!(
                "a {} image with a predominantly {} palette, {}x{} pixels",
                light,
                palette,
                image.width(),
                image.height()
            ),
            ..RawObservations::default()
        })
    }
}

fn dominant_palette(mean: [u64; 3]) -> &'static str {
    let max = mean.iter().copied().max().unwrap_or(0);
    let min = mean.iter().copied().min().unwrap_or(0);
    if max - min < 20 {
        return "neutral";
    }
    match mean.iter().position(|&v| v == max) {
        Some(0) => "warm red",
        Some(1) => "green",
        _ => "cool blue",
    }
}

/// Deterministic backend for tests and offline runs: returns a fixed set
/// of observations regardless of input.
#[derive(Debug, Clone, Default)]
pub struct StubBackend {
    caption: String,
    detections: Vec<Detection>,
    text_lines: Vec<String>,
}

impl StubBackend {
    pub fn new(caption: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            detections: Vec::new(),
            text_lines: Vec::new(),
        }
    }

    pub fn with_detection(mut self, label: &str, confidence: f32, bbox: [f32; 4]) -> Self {
        self.detections.push(Detection {
            label: label.to_string(),
            confidence,
            bbox,
        });
        self
    }

    pub fn with_text_line(mut self, line: &str) -> Self {
        self.text_lines.push(line.to_string());
        self
    }
}

impl VisionBackend for StubBackend {
    fn name(&self) -> &str {
        "stub backend"
    }

    fn observe(&self, _image: &ProcessedImage) -> AnyResult<RawObservations> {
        Ok(RawObservations {
            caption: self.caption.clone(),
            detections: self.detections.clone(),
            text_lines: self.text_lines.clone(),
        })
    }
}
