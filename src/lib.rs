//! clustercrop - batch cropping for scanned PDFs
//!
//! Pages that share a rounded size and parity are grouped into clusters. For
//! each cluster a handful of sample pages are rendered and stacked into a
//! dispersion image whose dark pixels mark content that varies across pages.
//! The bounding box of that content becomes a crop proposal, stored as
//! page-size independent edge ratios and applied to every member page.
//!
//! # Modules
//!
//! - [`geometry`] - ratio rectangles and pixel/page box conversion
//! - [`cluster`] - page clustering and sample selection
//! - [`dispersion`] - dispersion image builder
//! - [`boundary`] - crop proposal from a dispersion image
//! - [`crop`] - crop application and the textual ratio grid
//! - [`page_range`] - page exclusion ranges
//! - [`source`] - document backend traits
//! - [`pdf`] - lopdf / pdftoppm backend
//! - [`pipeline`] - crop session workflow
//! - [`progress`] - progress reporting and cancellation
//! - [`config`] - TOML configuration
//! - [`cli`] - command line definitions
//!
//! # Example
//!
//! ```rust
//! use clustercrop::{ClusterOptions, ClusterSet, CropApplier, CropRatio, PageBox};
//! use clustercrop::source::{PageGeometrySource, Result};
//!
//! struct Letter(usize);
//!
//! impl PageGeometrySource for Letter {
//!     fn page_count(&self) -> usize {
//!         self.0
//!     }
//!     fn page_box(&self, _page: usize) -> Result<PageBox> {
//!         Ok(PageBox::from_size(612.0, 792.0))
//!     }
//! }
//!
//! let doc = Letter(4);
//! let mut set = ClusterSet::from_source(&doc, &Default::default(), ClusterOptions::default())
//!     .unwrap();
//! for cluster in set.clusters_mut() {
//!     cluster.add_crop_ratio(CropRatio::new(0.1, 0.1, 0.1, 0.1));
//! }
//!
//! let pages = CropApplier::apply(&set, &doc).unwrap();
//! assert_eq!(pages.len(), 4);
//! ```

pub mod boundary;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod crop;
pub mod dispersion;
pub mod geometry;
pub mod page_range;
pub mod pdf;
pub mod pipeline;
pub mod progress;
pub mod source;

// Re-exports for convenience
pub use boundary::{BoundaryDetector, BoundaryOptions, ThresholdMode, DEFAULT_INK_THRESHOLD};
pub use cli::{Cli, ClustersArgs, Commands, CropArgs};
pub use cluster::{
    ClusterError, ClusterOptions, ClusterSet, ClusterSummary, PageCluster, PageDescriptor,
};
pub use config::{CliOverrides, Config, ConfigError};
pub use crop::{CropApplier, CropError, OutputPage};
pub use dispersion::{DispersionBuilder, DispersionImage, DispersionOptions};
pub use geometry::{CropRatio, GeometryError, PageBox, PixelRect, RenderRect, SplitAxis};
pub use page_range::{parse_exclusions, PageRangeError};
pub use pdf::{PdfDocument, PdftoppmRenderer};
pub use pipeline::{CropSession, PipelineError, SessionOptions};
pub use progress::{
    CancelToken, ConsoleProgress, NoopProgress, OutputMode, ProcessingStage, ProgressObserver,
};
pub use source::{DocumentRewriter, PageGeometrySource, PageRasterSource, SourceError};

/// Process exit codes
pub mod exit_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// Unclassified failure
    pub const GENERAL_ERROR: i32 = 1;
    /// Invalid command line arguments (clap's own exit code)
    pub const INVALID_ARGS: i32 = 2;
    /// Input file missing
    pub const INPUT_NOT_FOUND: i32 = 3;
    /// A cluster has no crop rectangle
    pub const INCOMPLETE_CROP: i32 = 4;
    /// Cancelled by the user
    pub const CANCELLED: i32 = 5;
}
