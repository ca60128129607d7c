//! Dispersion image
//!
//! Builds the per-cluster preview used for crop proposals: every sample page
//! of a cluster is downscaled to a common size and stacked, then each pixel is
//! reduced to `255 - round(stddev)` across the stack.
//!
//! # Algorithm
//!
//! 1. The first raster fixes the output size (height capped, aspect kept)
//! 2. Each raster is resized to that size and written into its sample slot
//! 3. Per pixel: mean, then variance as mean squared deviation
//! 4. Output intensity `255 - round(sqrt(variance))`
//!
//! Pixels that are white on every sampled page come out white; pixels that
//! change between pages (text lines, figures) come out dark. A cluster with a
//! single sample keeps that sample's grayscale unchanged.
//!
//! Rasters over the pixel budget switch the builder to a fixed placeholder.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================
// Constants
// ============================================================

/// Default maximum preview height in pixels
pub const DEFAULT_MAX_PREVIEW_HEIGHT: u32 = 900;

/// Default source raster budget (width * height)
pub const DEFAULT_MAX_RENDER_PIXELS: u64 = 2000 * 2000;

/// Edge length of the placeholder preview
pub const PLACEHOLDER_SIZE: u32 = 200;

/// Inset of the placeholder frame
const PLACEHOLDER_INSET: i32 = 5;

/// Resampling filter for sample rasters
const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

// ============================================================
// Options
// ============================================================

/// Dispersion builder options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispersionOptions {
    /// Output height cap; smaller rasters are not upscaled
    pub max_preview_height: u32,
    /// Largest accepted source raster, in pixels
    pub max_render_pixels: u64,
}

impl Default for DispersionOptions {
    fn default() -> Self {
        Self {
            max_preview_height: DEFAULT_MAX_PREVIEW_HEIGHT,
            max_render_pixels: DEFAULT_MAX_RENDER_PIXELS,
        }
    }
}

impl DispersionOptions {
    /// Create a new options builder
    pub fn builder() -> DispersionOptionsBuilder {
        DispersionOptionsBuilder::default()
    }
}

/// Builder for DispersionOptions
#[derive(Debug, Default)]
pub struct DispersionOptionsBuilder {
    options: DispersionOptions,
}

impl DispersionOptionsBuilder {
    /// Set output height cap (at least 1)
    #[must_use]
    pub fn max_preview_height(mut self, height: u32) -> Self {
        self.options.max_preview_height = height.max(1);
        self
    }

    /// Set source raster pixel budget
    #[must_use]
    pub fn max_render_pixels(mut self, pixels: u64) -> Self {
        self.options.max_render_pixels = pixels;
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> DispersionOptions {
        self.options
    }
}

// ============================================================
// Finished image
// ============================================================

/// Finished cluster preview, immutable
#[derive(Debug, Clone)]
pub enum DispersionImage {
    /// Computed from `sample_count` ingested rasters
    Rendered {
        image: GrayImage,
        sample_count: usize,
    },
    /// Oversize or sample-less cluster
    Placeholder(GrayImage),
}

impl DispersionImage {
    /// Fixed-size stand-in for clusters that cannot be previewed
    pub fn placeholder() -> Self {
        let mut image = GrayImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, Luma([255]));
        let edge = PLACEHOLDER_SIZE - 2 * PLACEHOLDER_INSET as u32;
        let far = (PLACEHOLDER_SIZE as i32 - PLACEHOLDER_INSET) as f32;
        let near = PLACEHOLDER_INSET as f32;

        draw_hollow_rect_mut(
            &mut image,
            Rect::at(PLACEHOLDER_INSET, PLACEHOLDER_INSET).of_size(edge, edge),
            Luma([0]),
        );
        draw_line_segment_mut(&mut image, (near, near), (far, far), Luma([0]));
        draw_line_segment_mut(&mut image, (near, far), (far, near), Luma([0]));

        DispersionImage::Placeholder(image)
    }

    pub fn image(&self) -> &GrayImage {
        match self {
            DispersionImage::Rendered { image, .. } => image,
            DispersionImage::Placeholder(image) => image,
        }
    }

    /// Whether the image carries real page statistics
    pub fn is_renderable(&self) -> bool {
        matches!(self, DispersionImage::Rendered { .. })
    }

    /// Number of samples behind the image (0 for placeholders)
    pub fn sample_count(&self) -> usize {
        match self {
            DispersionImage::Rendered { sample_count, .. } => *sample_count,
            DispersionImage::Placeholder(_) => 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.image().width()
    }

    pub fn height(&self) -> u32 {
        self.image().height()
    }
}

// ============================================================
// Builder
// ============================================================

/// Accumulates sample rasters for one cluster
///
/// Samples are stored pixel-major: the `capacity` slots of pixel `p` occupy
/// `samples[p * capacity..(p + 1) * capacity]`, so every pixel's stack is a
/// contiguous chunk that a worker can own exclusively.
#[derive(Debug)]
pub struct DispersionBuilder {
    options: DispersionOptions,
    capacity: usize,
    width: u32,
    height: u32,
    samples: Vec<u8>,
    sample_count: usize,
    renderable: bool,
}

impl DispersionBuilder {
    /// Create a builder for up to `capacity` samples
    pub fn new(capacity: usize, options: DispersionOptions) -> Self {
        Self {
            options,
            capacity,
            width: 0,
            height: 0,
            samples: Vec::new(),
            sample_count: 0,
            renderable: true,
        }
    }

    /// False once a raster tripped the pixel budget
    pub fn is_renderable(&self) -> bool {
        self.renderable
    }

    /// Samples ingested so far
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Output size, once the first sample fixed it
    pub fn output_size(&self) -> Option<(u32, u32)> {
        (self.width > 0).then_some((self.width, self.height))
    }

    /// Ingest the next sample raster
    ///
    /// Returns whether the raster contributed to the stack.
    pub fn add_sample(&mut self, raster: &GrayImage) -> bool {
        if !self.renderable {
            return false;
        }
        let (src_w, src_h) = raster.dimensions();
        if src_w as u64 * src_h as u64 > self.options.max_render_pixels {
            warn!(
                width = src_w,
                height = src_h,
                budget = self.options.max_render_pixels,
                "raster exceeds pixel budget, using placeholder preview"
            );
            self.renderable = false;
            self.samples = Vec::new();
            return false;
        }
        if src_w == 0 || src_h == 0 {
            warn!("ignoring empty raster");
            return false;
        }
        if self.sample_count >= self.capacity {
            warn!(capacity = self.capacity, "sample capacity reached, ignoring raster");
            return false;
        }

        if self.width == 0 {
            self.initialize_output(src_w, src_h);
        }

        let resized;
        let scaled: &GrayImage = if raster.dimensions() == (self.width, self.height) {
            raster
        } else {
            resized = imageops::resize(raster, self.width, self.height, RESAMPLE_FILTER);
            &resized
        };

        let slot = self.sample_count;
        self.samples
            .par_chunks_mut(self.capacity)
            .zip(scaled.as_raw().par_iter())
            .for_each(|(stack, &value)| stack[slot] = value);
        self.sample_count += 1;

        debug!(slot, width = self.width, height = self.height, "ingested sample");
        true
    }

    fn initialize_output(&mut self, src_w: u32, src_h: u32) {
        self.height = src_h.min(self.options.max_preview_height).max(1);
        let scale = self.height as f64 / src_h as f64;
        self.width = ((src_w as f64 * scale).round() as u32).max(1);
        self.samples = vec![0u8; self.width as usize * self.height as usize * self.capacity];
    }

    /// Reduce the stack into the finished preview, releasing sample storage
    pub fn finish(self) -> DispersionImage {
        if !self.renderable || self.sample_count == 0 {
            return DispersionImage::placeholder();
        }
        let count = self.sample_count;

        let pixels: Vec<u8> = if count == 1 {
            self.samples
                .par_chunks(self.capacity)
                .map(|stack| stack[0])
                .collect()
        } else {
            self.samples
                .par_chunks(self.capacity)
                .map(|stack| dispersion_value(&stack[..count]))
                .collect()
        };

        match GrayImage::from_raw(self.width, self.height, pixels) {
            Some(image) => DispersionImage::Rendered {
                image,
                sample_count: count,
            },
            None => {
                warn!("dispersion buffer size mismatch, using placeholder preview");
                DispersionImage::placeholder()
            }
        }
    }
}

/// `255 - round(stddev)` of one pixel's sample stack
fn dispersion_value(stack: &[u8]) -> u8 {
    let n = stack.len() as f64;
    let mean = stack.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = stack
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (255.0 - variance.sqrt().round()).clamp(0.0, 255.0) as u8
}
