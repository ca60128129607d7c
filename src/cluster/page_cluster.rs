//! A group of pages sharing rounded geometry and parity

use std::fmt;

use serde::Serialize;

use super::types::{select_samples, ClusterOptions, PageDescriptor};
use crate::dispersion::DispersionImage;
use crate::geometry::CropRatio;

/// Member pages printed per line in the text summary
const SUMMARY_PAGES_PER_LINE: usize = 12;

/// Pages treated as one crop unit
#[derive(Debug, Clone)]
pub struct PageCluster {
    rounded_width: u32,
    rounded_height: u32,
    even_pages: bool,
    excluded: bool,
    /// Insertion order, no duplicates
    member_pages: Vec<usize>,
    sample_pages: Vec<usize>,
    crop_ratios: Vec<CropRatio>,
    preview: Option<DispersionImage>,
}

impl PageCluster {
    /// Create a single-page cluster
    pub fn from_page(page: &PageDescriptor, options: &ClusterOptions) -> Self {
        Self {
            rounded_width: options.round_dimension(page.width),
            rounded_height: options.round_dimension(page.height),
            even_pages: page.is_even(),
            excluded: page.excluded,
            member_pages: vec![page.page_number],
            sample_pages: Vec::new(),
            crop_ratios: Vec::new(),
            preview: None,
        }
    }

    pub fn rounded_width(&self) -> u32 {
        self.rounded_width
    }

    pub fn rounded_height(&self) -> u32 {
        self.rounded_height
    }

    pub fn is_even_pages(&self) -> bool {
        self.even_pages
    }

    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Member page numbers in first-seen order
    pub fn member_pages(&self) -> &[usize] {
        &self.member_pages
    }

    /// Representative subset chosen by [`designate_sample_pages`](Self::designate_sample_pages)
    pub fn sample_pages(&self) -> &[usize] {
        &self.sample_pages
    }

    pub fn contains_page(&self, page_number: usize) -> bool {
        self.member_pages.contains(&page_number)
    }

    /// Smallest member page number
    pub fn first_page(&self) -> Option<usize> {
        self.member_pages.iter().copied().min()
    }

    /// Whether two clusters may share one crop definition
    ///
    /// Excluded clusters never merge, not even with each other.
    pub fn is_mergeable_with(&self, other: &PageCluster) -> bool {
        self.even_pages == other.even_pages
            && !self.excluded
            && !other.excluded
            && self.rounded_width == other.rounded_width
            && self.rounded_height == other.rounded_height
    }

    /// Append the other cluster's members that are not already present
    pub fn incorporate(&mut self, other: &PageCluster) {
        for &page in &other.member_pages {
            if !self.member_pages.contains(&page) {
                self.member_pages.push(page);
            }
        }
    }

    /// Choose the preview sample subset from the current members
    pub fn designate_sample_pages(&mut self, max_samples: usize) {
        self.sample_pages = select_samples(&self.member_pages, max_samples);
    }

    // ============================================================
    // Crop ratios
    // ============================================================

    /// Crop rectangles in enumeration order
    pub fn crop_ratios(&self) -> &[CropRatio] {
        &self.crop_ratios
    }

    /// Append a rectangle unless an identical one is already present
    pub fn add_crop_ratio(&mut self, ratio: CropRatio) {
        if !self.crop_ratios.contains(&ratio) {
            self.crop_ratios.push(ratio);
        }
    }

    /// Replace all rectangles
    pub fn set_crop_ratios(&mut self, ratios: &[CropRatio]) {
        self.clear_crop_ratios();
        for ratio in ratios {
            self.add_crop_ratio(*ratio);
        }
    }

    pub fn clear_crop_ratios(&mut self) {
        self.crop_ratios.clear();
    }

    // ============================================================
    // Preview
    // ============================================================

    /// Finished preview, if rendering completed for this cluster
    pub fn preview(&self) -> Option<&DispersionImage> {
        self.preview.as_ref()
    }

    /// Attach a finished preview; an existing preview is kept
    pub fn set_preview(&mut self, preview: DispersionImage) {
        if self.preview.is_none() {
            self.preview = Some(preview);
        }
    }

    /// Serializable summary for reports
    pub fn summary(&self, index: usize) -> ClusterSummary {
        ClusterSummary {
            index,
            even_pages: self.even_pages,
            excluded: self.excluded,
            rounded_width: self.rounded_width,
            rounded_height: self.rounded_height,
            member_pages: self.member_pages.clone(),
            sample_pages: self.sample_pages.clone(),
            crop_ratios: self.crop_ratios.clone(),
        }
    }
}

impl fmt::Display for PageCluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages{}, {}x{}, {} pages:",
            if self.even_pages { "Even" } else { "Odd" },
            if self.excluded { " (excluded)" } else { "" },
            self.rounded_width,
            self.rounded_height,
            self.member_pages.len()
        )?;
        for (i, page) in self.member_pages.iter().enumerate() {
            if i > 0 && i % SUMMARY_PAGES_PER_LINE == 0 {
                write!(f, "\n   ")?;
            }
            write!(f, " {}", page)?;
        }
        Ok(())
    }
}

/// Cluster report entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub index: usize,
    pub even_pages: bool,
    pub excluded: bool,
    pub rounded_width: u32,
    pub rounded_height: u32,
    pub member_pages: Vec<usize>,
    pub sample_pages: Vec<usize>,
    pub crop_ratios: Vec<CropRatio>,
}
