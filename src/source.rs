//! Collaborator interfaces
//!
//! The crop pipeline consumes page geometry and page rasters from a document
//! backend and hands its output page list to a document rewriter. The lopdf /
//! pdftoppm implementations live in [`crate::pdf`]; tests provide in-memory
//! ones.

use std::path::Path;

use image::GrayImage;
use thiserror::Error;

use crate::crop::OutputPage;
use crate::geometry::PageBox;

/// Document backend errors
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("Page {0} has no usable MediaBox or CropBox")]
    MissingPageBox(usize),

    #[error("Page tree loops back to object {0} {1} R")]
    PageTreeCycle(u32, u16),

    #[error("Render failed for page {page}: {message}")]
    Render { page: usize, message: String },

    #[error("Renderer not found: {0}")]
    RendererNotFound(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Page count and per-page box geometry
pub trait PageGeometrySource {
    /// Number of pages in the document
    fn page_count(&self) -> usize;

    /// Layout box of a page (1-indexed) in native page units
    fn page_box(&self, page_number: usize) -> Result<PageBox>;

    /// Clockwise display rotation of a page: 0, 90, 180 or 270
    ///
    /// Rasters are expected in displayed orientation, so ratios measured on
    /// them are mapped back through this rotation before cropping.
    fn page_rotation(&self, _page_number: usize) -> Result<u16> {
        Ok(0)
    }
}

/// Grayscale page rendering, used only for cluster sample pages
pub trait PageRasterSource {
    /// Render a page (1-indexed)
    fn render_page(&mut self, page_number: usize) -> Result<GrayImage>;
}

/// Sink that writes a new document from an output page list
pub trait DocumentRewriter {
    /// Write one output page per entry, in order, to `destination`
    fn write_cropped(&mut self, pages: &[OutputPage], destination: &Path) -> Result<()>;
}
