//! Page Clustering module
//!
//! Groups document pages that share geometry so that a single crop
//! definition applies to many pages at once.
//!
//! # Features
//!
//! - Dimension rounding to a configurable granularity
//! - Odd/even page separation
//! - Excluded pages kept in singleton clusters
//! - Evenly spaced sample selection for preview rendering
//! - Ratio transplant between successive clusterings
//!
//! # Example
//!
//! ```rust
//! use clustercrop::{ClusterOptions, ClusterSet, PageDescriptor};
//!
//! let pages: Vec<_> = (1..=4)
//!     .map(|n| PageDescriptor::new(n, 612.0, 792.0, false))
//!     .collect();
//!
//! let set = ClusterSet::from_pages(&pages, ClusterOptions::default());
//! assert_eq!(set.len(), 2); // odd and even pages
//! ```

// Submodules
mod page_cluster;
mod set;
mod types;

// Re-export public API
pub use page_cluster::{ClusterSummary, PageCluster};
pub use set::ClusterSet;
pub use types::{
    round_page_dim, select_samples, ClusterError, ClusterOptions, ClusterOptionsBuilder,
    PageDescriptor, Result, DEFAULT_GRANULARITY, DEFAULT_MAX_SAMPLE_PAGES,
};
