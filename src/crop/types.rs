//! Common types for the crop module

use thiserror::Error;

use crate::geometry::GeometryError;
use crate::source::SourceError;

/// Crop application errors
#[derive(Debug, Error)]
pub enum CropError {
    #[error("Cluster {cluster_index} (first page {first_page}) has no crop rectangle")]
    IncompleteCropDefinition {
        cluster_index: usize,
        first_page: usize,
    },

    #[error("Page {0} does not belong to any cluster")]
    UnassignedPage(usize),

    #[error("Invalid crop rectangle in cluster {cluster_index}: {source}")]
    Geometry {
        cluster_index: usize,
        #[source]
        source: GeometryError,
    },

    #[error("Invalid ratio grid: {0}")]
    InvalidGrid(String),

    #[error("Document error: {0}")]
    Source(#[from] SourceError),
}

pub type Result<T> = std::result::Result<T, CropError>;
