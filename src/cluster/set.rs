//! Cluster set construction and bookkeeping

use std::collections::BTreeSet;

use tracing::debug;

use super::page_cluster::{ClusterSummary, PageCluster};
use super::types::{ClusterError, ClusterOptions, PageDescriptor, Result};
use crate::geometry::CropRatio;
use crate::source::{PageGeometrySource, SourceError};

/// All clusters of one document, in creation order
#[derive(Debug, Clone, Default)]
pub struct ClusterSet {
    clusters: Vec<PageCluster>,
    options: ClusterOptions,
}

impl ClusterSet {
    /// Create an empty set
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            clusters: Vec::new(),
            options,
        }
    }

    /// Cluster a sequence of page descriptors
    ///
    /// Pages are consumed in ascending page order regardless of input order.
    /// Sample pages are designated once all pages are placed.
    pub fn from_pages(pages: &[PageDescriptor], options: ClusterOptions) -> Self {
        let mut ordered: Vec<&PageDescriptor> = pages.iter().collect();
        ordered.sort_by_key(|p| p.page_number);

        let mut set = Self::new(options);
        for page in ordered {
            set.add_or_merge(PageCluster::from_page(page, &options));
        }
        set.designate_sample_pages();

        debug!(
            pages = pages.len(),
            clusters = set.len(),
            "clustered document pages"
        );
        set
    }

    /// Cluster every page of a geometry source
    ///
    /// Pages are keyed by their displayed size, so a rotated portrait page
    /// groups with landscape pages.
    pub fn from_source<S>(
        source: &S,
        excluded_pages: &BTreeSet<usize>,
        options: ClusterOptions,
    ) -> std::result::Result<Self, SourceError>
    where
        S: PageGeometrySource + ?Sized,
    {
        let pages = (1..=source.page_count())
            .map(|page_number| {
                let page_box = source.page_box(page_number)?;
                let rotation = source.page_rotation(page_number)?;
                let (width, height) = page_box.displayed_size(rotation);
                Ok(PageDescriptor::new(
                    page_number,
                    width,
                    height,
                    excluded_pages.contains(&page_number),
                ))
            })
            .collect::<std::result::Result<Vec<_>, SourceError>>()?;

        Ok(Self::from_pages(&pages, options))
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Merge into the first mergeable cluster, otherwise append
    ///
    /// Returns the index of the cluster that now holds the pages. A merge never
    /// cascades into further merges.
    pub fn add_or_merge(&mut self, cluster: PageCluster) -> usize {
        if let Some(index) = self
            .clusters
            .iter()
            .position(|existing| existing.is_mergeable_with(&cluster))
        {
            self.clusters[index].incorporate(&cluster);
            return index;
        }
        self.clusters.push(cluster);
        self.clusters.len() - 1
    }

    /// Recompute every cluster's sample subset
    pub fn designate_sample_pages(&mut self) {
        let max = self.options.max_sample_pages;
        for cluster in &mut self.clusters {
            cluster.designate_sample_pages(max);
        }
    }

    pub fn clusters(&self) -> &[PageCluster] {
        &self.clusters
    }

    pub fn clusters_mut(&mut self) -> &mut [PageCluster] {
        &mut self.clusters
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageCluster> {
        self.clusters.iter()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Total number of member pages across clusters
    pub fn page_count(&self) -> usize {
        self.clusters.iter().map(|c| c.member_pages().len()).sum()
    }

    /// Total number of sample renders needed for all previews
    pub fn pages_to_render(&self) -> usize {
        self.clusters.iter().map(|c| c.sample_pages().len()).sum()
    }

    /// Cluster holding a page, with its index
    pub fn cluster_containing_page(&self, page_number: usize) -> Option<(usize, &PageCluster)> {
        self.clusters
            .iter()
            .enumerate()
            .find(|(_, c)| c.contains_page(page_number))
    }

    /// Ratio sets of all clusters, cluster-major
    pub fn all_ratios(&self) -> Vec<Vec<CropRatio>> {
        self.clusters
            .iter()
            .map(|c| c.crop_ratios().to_vec())
            .collect()
    }

    /// Replace every cluster's ratio set from a cluster-major grid
    ///
    /// The grid must have one entry per cluster and every rectangle must be
    /// valid; on error no cluster is modified.
    pub fn apply_ratio_grid(&mut self, grid: &[Vec<CropRatio>]) -> Result<()> {
        if grid.len() != self.clusters.len() {
            return Err(ClusterError::RatioGridMismatch {
                expected: self.clusters.len(),
                actual: grid.len(),
            });
        }
        for (cluster_index, ratios) in grid.iter().enumerate() {
            for ratio in ratios {
                ratio
                    .validate()
                    .map_err(|source| ClusterError::InvalidRatio {
                        cluster_index,
                        source,
                    })?;
            }
        }
        for (cluster, ratios) in self.clusters.iter_mut().zip(grid) {
            cluster.set_crop_ratios(ratios);
        }
        Ok(())
    }

    /// Give every rectangle the largest width and height found in the set
    ///
    /// Rectangles keep their top-left corner where the page allows, so
    /// output pages come out the same size. Returns the shared size as page
    /// fractions, `None` when no cluster has a rectangle.
    pub fn equalize_crop_sizes(&mut self) -> Option<(f32, f32)> {
        let (width, height) = self
            .clusters
            .iter()
            .flat_map(|c| c.crop_ratios())
            .map(|r| (r.width_fraction(), r.height_fraction()))
            .reduce(|(w1, h1), (w2, h2)| (w1.max(w2), h1.max(h2)))?;

        for cluster in &mut self.clusters {
            let resized: Vec<CropRatio> = cluster
                .crop_ratios()
                .iter()
                .map(|r| r.with_size(width, height))
                .collect();
            cluster.set_crop_ratios(&resized);
        }
        debug!(width, height, "equalized crop sizes");
        Some((width, height))
    }

    /// Copy edited ratios from a previous clustering of the same document
    ///
    /// Every new cluster receives the ratios of each old cluster that held
    /// one of its member pages, in member order, duplicates ignored.
    pub fn transplant_ratios_from(&mut self, old: &ClusterSet) {
        for cluster in &mut self.clusters {
            let pages = cluster.member_pages().to_vec();
            for page in pages {
                if let Some((_, old_cluster)) = old.cluster_containing_page(page) {
                    for ratio in old_cluster.crop_ratios() {
                        cluster.add_crop_ratio(*ratio);
                    }
                }
            }
        }
    }

    /// Report entries for every cluster
    pub fn summaries(&self) -> Vec<ClusterSummary> {
        self.clusters
            .iter()
            .enumerate()
            .map(|(i, c)| c.summary(i))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ClusterSet {
    type Item = &'a PageCluster;
    type IntoIter = std::slice::Iter<'a, PageCluster>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.iter()
    }
}
