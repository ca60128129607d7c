//! Boundary detection
//!
//! Proposes a crop rectangle from a cluster's dispersion image: the tight
//! bounding box of all pixels darker than a threshold, expressed as ratios of
//! the image size. A blank image proposes the full page.

use image::GrayImage;
use imageproc::contrast::otsu_level;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dispersion::DispersionImage;
use crate::geometry::{CropRatio, PixelRect};

// ============================================================
// Constants
// ============================================================

/// Default ink threshold; pixels strictly below count as content
pub const DEFAULT_INK_THRESHOLD: u8 = 245;

// ============================================================
// Options
// ============================================================

/// How the ink threshold is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// Use `threshold` as is
    #[default]
    Fixed,
    /// Otsu level of the image, capped at `threshold`
    Otsu,
}

/// Boundary detection options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryOptions {
    /// Ink threshold (0-255)
    pub threshold: u8,
    /// Threshold selection mode
    pub mode: ThresholdMode,
}

impl Default for BoundaryOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_INK_THRESHOLD,
            mode: ThresholdMode::Fixed,
        }
    }
}

impl BoundaryOptions {
    /// Fixed threshold
    pub fn fixed(threshold: u8) -> Self {
        Self {
            threshold,
            mode: ThresholdMode::Fixed,
        }
    }

    /// Otsu threshold capped at the default
    pub fn otsu() -> Self {
        Self {
            mode: ThresholdMode::Otsu,
            ..Default::default()
        }
    }
}

// ============================================================
// Detector
// ============================================================

/// Inclusive ink extent
#[derive(Debug, Clone, Copy)]
struct InkBounds {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl InkBounds {
    fn merge(self, other: InkBounds) -> InkBounds {
        InkBounds {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Crop proposal from dispersion images
pub struct BoundaryDetector;

impl BoundaryDetector {
    /// Propose a crop ratio for a cluster preview
    ///
    /// Placeholders and blank images propose [`CropRatio::FULL`].
    pub fn detect(preview: &DispersionImage, options: &BoundaryOptions) -> CropRatio {
        if !preview.is_renderable() {
            return CropRatio::FULL;
        }
        Self::detect_ratio(preview.image(), options)
    }

    /// Propose a crop ratio for any grayscale image
    pub fn detect_ratio(image: &GrayImage, options: &BoundaryOptions) -> CropRatio {
        let (width, height) = image.dimensions();
        match Self::ink_rect(image, options) {
            Some(rect) => {
                CropRatio::from_pixel_rect(&rect, width, height).unwrap_or(CropRatio::FULL)
            }
            None => CropRatio::FULL,
        }
    }

    /// Threshold actually applied to an image
    pub fn effective_threshold(image: &GrayImage, options: &BoundaryOptions) -> u8 {
        match options.mode {
            ThresholdMode::Fixed => options.threshold,
            // Otsu's dark class is `<= level`
            ThresholdMode::Otsu => otsu_level(image).saturating_add(1).min(options.threshold),
        }
    }

    /// Bounding rectangle of all ink pixels, `None` when there are none
    pub fn ink_rect(image: &GrayImage, options: &BoundaryOptions) -> Option<PixelRect> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        let threshold = Self::effective_threshold(image, options);

        let bounds = image
            .as_raw()
            .par_chunks(width as usize)
            .enumerate()
            .filter_map(|(y, row)| {
                let first = row.iter().position(|&v| v < threshold)?;
                let last = row.iter().rposition(|&v| v < threshold)?;
                Some(InkBounds {
                    min_x: first as u32,
                    max_x: last as u32,
                    min_y: y as u32,
                    max_y: y as u32,
                })
            })
            .reduce_with(InkBounds::merge)?;

        debug!(threshold, ?bounds, "detected ink bounds");

        Some(PixelRect::new(
            bounds.min_x as i32,
            bounds.min_y as i32,
            (bounds.max_x - bounds.min_x + 1) as i32,
            (bounds.max_y - bounds.min_y + 1) as i32,
        ))
    }
}
