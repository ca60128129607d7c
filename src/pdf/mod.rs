//! PDF backend
//!
//! [`PdfDocument`] reads page geometry with lopdf and writes the cropped
//! document; [`PdftoppmRenderer`] renders sample pages with poppler.

mod document;
mod render;

pub use document::PdfDocument;
pub use render::{PdftoppmRenderer, DEFAULT_RENDER_DPI};
