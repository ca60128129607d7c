//! Cluster module core types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::GeometryError;

// ============================================================
// Constants
// ============================================================

/// Default rounding unit for page dimensions (native page units)
pub const DEFAULT_GRANULARITY: u32 = 20;

/// Default maximum number of pages rendered per cluster preview
pub const DEFAULT_MAX_SAMPLE_PAGES: usize = 15;

/// Smallest accepted granularity
const MIN_GRANULARITY: u32 = 1;

/// Smallest accepted sample count
const MIN_SAMPLE_PAGES: usize = 1;

// ============================================================
// Error Types
// ============================================================

/// Clustering and ratio-set errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClusterError {
    #[error("Ratio grid has {actual} cluster entries, document has {expected} clusters")]
    RatioGridMismatch { expected: usize, actual: usize },

    #[error("Invalid crop ratio for cluster {cluster_index}: {source}")]
    InvalidRatio {
        cluster_index: usize,
        #[source]
        source: GeometryError,
    },
}

pub type Result<T> = std::result::Result<T, ClusterError>;

// ============================================================
// Page Descriptor
// ============================================================

/// Geometry of one source page, consumed by clustering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDescriptor {
    /// Page number (1-indexed)
    pub page_number: usize,
    /// Width in native page units
    pub width: f32,
    /// Height in native page units
    pub height: f32,
    /// Page must never share a crop definition with other pages
    pub excluded: bool,
}

impl PageDescriptor {
    /// Create a new descriptor
    pub fn new(page_number: usize, width: f32, height: f32, excluded: bool) -> Self {
        Self {
            page_number,
            width,
            height,
            excluded,
        }
    }

    /// Whether the page number is even
    pub fn is_even(&self) -> bool {
        self.page_number % 2 == 0
    }
}

// ============================================================
// Options
// ============================================================

/// Clustering options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Rounding unit applied to page dimensions before comparison
    pub granularity: u32,
    /// Maximum number of sample pages per cluster
    pub max_sample_pages: usize,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            granularity: DEFAULT_GRANULARITY,
            max_sample_pages: DEFAULT_MAX_SAMPLE_PAGES,
        }
    }
}

impl ClusterOptions {
    /// Create a new options builder
    pub fn builder() -> ClusterOptionsBuilder {
        ClusterOptionsBuilder::default()
    }

    /// Round a page dimension down to the configured granularity
    pub fn round_dimension(&self, dim: f32) -> u32 {
        round_page_dim(dim, self.granularity)
    }
}

/// Builder for ClusterOptions
#[derive(Debug, Default)]
pub struct ClusterOptionsBuilder {
    options: ClusterOptions,
}

impl ClusterOptionsBuilder {
    /// Set dimension rounding granularity
    #[must_use]
    pub fn granularity(mut self, granularity: u32) -> Self {
        self.options.granularity = granularity.max(MIN_GRANULARITY);
        self
    }

    /// Set maximum sample pages per cluster
    #[must_use]
    pub fn max_sample_pages(mut self, count: usize) -> Self {
        self.options.max_sample_pages = count.max(MIN_SAMPLE_PAGES);
        self
    }

    /// Build the options
    #[must_use]
    pub fn build(self) -> ClusterOptions {
        self.options
    }
}

/// Round a dimension down to a multiple of `granularity`
///
/// Fractional units are truncated first, so `199.9` rounds like `199`.
pub fn round_page_dim(dim: f32, granularity: u32) -> u32 {
    let granularity = granularity.max(MIN_GRANULARITY);
    let dim = if dim.is_finite() && dim > 0.0 {
        dim as u32
    } else {
        0
    };
    (dim / granularity) * granularity
}

/// Evenly spaced selection of at most `max` members, order preserved
///
/// With `n >= max` the pick at step `i` is `floor(i * n / max)`, the same
/// sequence a fractional accumulator of width `n / max` produces, computed
/// exactly in integers so the result never depends on float rounding.
pub fn select_samples(members: &[usize], max: usize) -> Vec<usize> {
    let n = members.len();
    if max == 0 {
        return Vec::new();
    }
    if n < max {
        return members.to_vec();
    }
    (0..max).map(|i| members[i * n / max]).collect()
}
