//! Crop application
//!
//! Maps every cluster's ratio set onto the real box of each member page.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use super::types::{CropError, Result};
use crate::cluster::ClusterSet;
use crate::geometry::PageBox;
use crate::source::PageGeometrySource;

/// One page of the cropped document
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputPage {
    /// Source page number (1-indexed)
    pub source_page: usize,
    /// Position of the ratio rectangle in its cluster's list
    pub region_index: usize,
    /// Absolute crop box in the source page's unrotated coordinates
    pub crop_box: PageBox,
}

/// Expands source pages into output pages
pub struct CropApplier;

impl CropApplier {
    /// Build the output page list
    ///
    /// Pages are emitted in ascending source order; a page whose cluster holds
    /// several rectangles expands into one output page per rectangle, in list
    /// order. Ratios are read in displayed orientation and mapped through the
    /// page's rotation. Fails before emitting anything if a non-empty cluster has no
    /// rectangles or holds an invalid one.
    pub fn apply<S>(clusters: &ClusterSet, geometry: &S) -> Result<Vec<OutputPage>>
    where
        S: PageGeometrySource + ?Sized,
    {
        Self::check_definitions(clusters)?;

        let page_to_cluster: HashMap<usize, usize> = clusters
            .iter()
            .enumerate()
            .flat_map(|(i, c)| c.member_pages().iter().map(move |&p| (p, i)))
            .collect();

        let page_count = geometry.page_count();
        let mut output = Vec::with_capacity(page_count);
        for page in 1..=page_count {
            let cluster_index = *page_to_cluster
                .get(&page)
                .ok_or(CropError::UnassignedPage(page))?;
            let page_box = geometry.page_box(page)?;
            let rotation = geometry.page_rotation(page)?;

            for (region_index, ratio) in clusters.clusters()[cluster_index]
                .crop_ratios()
                .iter()
                .enumerate()
            {
                output.push(OutputPage {
                    source_page: page,
                    region_index,
                    crop_box: ratio.unrotated(rotation).to_page_box(&page_box),
                });
            }
        }

        debug!(
            source_pages = page_count,
            output_pages = output.len(),
            "applied crop definitions"
        );
        Ok(output)
    }

    /// Every non-empty cluster needs at least one valid rectangle
    pub fn check_definitions(clusters: &ClusterSet) -> Result<()> {
        for (cluster_index, cluster) in clusters.iter().enumerate() {
            let Some(first_page) = cluster.first_page() else {
                continue;
            };
            if cluster.crop_ratios().is_empty() {
                return Err(CropError::IncompleteCropDefinition {
                    cluster_index,
                    first_page,
                });
            }
            for ratio in cluster.crop_ratios() {
                ratio.validate().map_err(|source| CropError::Geometry {
                    cluster_index,
                    source,
                })?;
            }
        }
        Ok(())
    }
}
