//! Crop session pipeline
//!
//! A [`CropSession`] owns the clustering of one document and walks it through
//! the crop workflow:
//!
//! 1. Cluster pages ([`CropSession::load`])
//! 2. Render sample pages into dispersion previews ([`CropSession::render_previews`])
//! 3. Propose crop rectangles ([`CropSession::propose_crops`])
//! 4. Map rectangles onto pages ([`CropSession::output_pages`])
//! 5. Write the cropped document ([`CropSession::write`])
//!
//! Ratios can be supplied directly instead of steps 2-3 through
//! [`CropSession::apply_ratio_grid`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::boundary::{BoundaryDetector, BoundaryOptions};
use crate::cluster::{ClusterError, ClusterOptions, ClusterSet};
use crate::crop::{CropApplier, CropError, OutputPage};
use crate::dispersion::{DispersionBuilder, DispersionOptions};
use crate::geometry::{CropRatio, SplitAxis};
use crate::progress::{CancelToken, ProcessingStage, ProgressObserver};
use crate::source::{DocumentRewriter, PageGeometrySource, PageRasterSource, SourceError};

/// Session errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Crop(#[from] CropError),

    #[error("Failed to save preview: {0}")]
    Preview(#[from] image::ImageError),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Options for every stage of a session
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionOptions {
    pub cluster: ClusterOptions,
    pub dispersion: DispersionOptions,
    pub boundary: BoundaryOptions,
}

/// Cluster state of one document across the crop workflow
#[derive(Debug)]
pub struct CropSession {
    clusters: ClusterSet,
    excluded: BTreeSet<usize>,
    options: SessionOptions,
}

impl CropSession {
    /// Cluster all pages of a document
    pub fn load<S>(
        source: &S,
        excluded: BTreeSet<usize>,
        options: SessionOptions,
        observer: &dyn ProgressObserver,
    ) -> Result<Self>
    where
        S: PageGeometrySource + ?Sized,
    {
        observer.on_stage(ProcessingStage::Clustering);
        let clusters = ClusterSet::from_source(source, &excluded, options.cluster)?;
        info!(
            pages = clusters.page_count(),
            clusters = clusters.len(),
            excluded = excluded.len(),
            "clustered document"
        );
        Ok(Self {
            clusters,
            excluded,
            options,
        })
    }

    /// Re-cluster with a new exclusion set, keeping ratios already assigned
    ///
    /// Previews are discarded since cluster membership may have changed.
    pub fn reload_with_excludes<S>(
        &mut self,
        source: &S,
        excluded: BTreeSet<usize>,
        observer: &dyn ProgressObserver,
    ) -> Result<()>
    where
        S: PageGeometrySource + ?Sized,
    {
        observer.on_stage(ProcessingStage::Clustering);
        let mut clusters = ClusterSet::from_source(source, &excluded, self.options.cluster)?;
        clusters.transplant_ratios_from(&self.clusters);
        debug!(
            old_clusters = self.clusters.len(),
            new_clusters = clusters.len(),
            "re-clustered with new exclusions"
        );
        self.clusters = clusters;
        self.excluded = excluded;
        Ok(())
    }

    pub fn clusters(&self) -> &ClusterSet {
        &self.clusters
    }

    pub fn clusters_mut(&mut self) -> &mut ClusterSet {
        &mut self.clusters
    }

    pub fn excluded_pages(&self) -> &BTreeSet<usize> {
        &self.excluded
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Render every cluster's sample pages into its dispersion preview
    ///
    /// Clusters that already have a preview are left alone. A page that fails
    /// to render is logged and skipped. Cancellation is checked before each
    /// render; the cluster in progress then keeps no preview.
    pub fn render_previews<R>(
        &mut self,
        raster: &mut R,
        observer: &dyn ProgressObserver,
        cancel: &CancelToken,
    ) -> Result<()>
    where
        R: PageRasterSource + ?Sized,
    {
        observer.on_stage(ProcessingStage::Rendering);

        let total: usize = self
            .clusters
            .iter()
            .filter(|c| c.preview().is_none())
            .map(|c| c.sample_pages().len())
            .sum();
        let mut done = 0;
        observer.on_sample_rendered(done, total);

        for (index, cluster) in self.clusters.clusters_mut().iter_mut().enumerate() {
            if cluster.preview().is_some() {
                continue;
            }
            let samples = cluster.sample_pages().to_vec();
            observer.on_cluster_start(index, samples.len());

            let mut builder = DispersionBuilder::new(samples.len(), self.options.dispersion);
            for page in samples {
                if cancel.is_cancelled() {
                    info!(cluster = index, "rendering cancelled");
                    return Err(PipelineError::Cancelled);
                }
                // Oversize previews stay placeholders, no need to render more
                if builder.is_renderable() {
                    match raster.render_page(page) {
                        Ok(image) => {
                            builder.add_sample(&image);
                        }
                        Err(e) => warn!(page, error = %e, "skipping sample page"),
                    }
                }
                done += 1;
                observer.on_sample_rendered(done, total);
            }

            let preview = builder.finish();
            debug!(
                cluster = index,
                samples = preview.sample_count(),
                renderable = preview.is_renderable(),
                "built dispersion preview"
            );
            cluster.set_preview(preview);
        }
        Ok(())
    }

    /// Propose a crop rectangle for every cluster that has a preview but no
    /// rectangles yet
    ///
    /// Returns the number of clusters that received a proposal.
    pub fn propose_crops(&mut self, observer: &dyn ProgressObserver) -> usize {
        observer.on_stage(ProcessingStage::Detecting);
        let boundary = self.options.boundary;
        let mut proposed = 0;
        for (index, cluster) in self.clusters.clusters_mut().iter_mut().enumerate() {
            if !cluster.crop_ratios().is_empty() {
                continue;
            }
            let Some(preview) = cluster.preview() else {
                continue;
            };
            let ratio = BoundaryDetector::detect(preview, &boundary);
            debug!(cluster = index, ?ratio, "proposed crop");
            cluster.add_crop_ratio(ratio);
            proposed += 1;
        }
        proposed
    }

    /// Replace all ratio sets from a cluster-major grid
    pub fn apply_ratio_grid(&mut self, grid: &[Vec<CropRatio>]) -> Result<()> {
        self.clusters.apply_ratio_grid(grid)?;
        Ok(())
    }

    /// Resize every rectangle to the largest width and height in the session
    pub fn equalize_crop_sizes(&mut self) -> Option<(f32, f32)> {
        self.clusters.equalize_crop_sizes()
    }

    /// Split every rectangle of every cluster into `parts` along `axis`
    pub fn split_crops(&mut self, parts: usize, axis: SplitAxis, overlap: f32) {
        if parts <= 1 {
            return;
        }
        for cluster in self.clusters.clusters_mut() {
            let split: Vec<CropRatio> = cluster
                .crop_ratios()
                .iter()
                .flat_map(|r| r.split(parts, axis, overlap))
                .collect();
            cluster.set_crop_ratios(&split);
        }
    }

    /// Map every cluster's rectangles onto its member pages
    pub fn output_pages<S>(
        &self,
        geometry: &S,
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<OutputPage>>
    where
        S: PageGeometrySource + ?Sized,
    {
        observer.on_stage(ProcessingStage::Cropping);
        Ok(CropApplier::apply(&self.clusters, geometry)?)
    }

    /// Write the cropped document
    pub fn write<W>(
        &self,
        writer: &mut W,
        pages: &[OutputPage],
        destination: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<()>
    where
        W: DocumentRewriter + ?Sized,
    {
        observer.on_stage(ProcessingStage::Writing);
        writer.write_cropped(pages, destination)?;
        observer.on_stage(ProcessingStage::Completed);
        Ok(())
    }

    /// Save every finished preview as `cluster-NN.png` under `dir`
    pub fn save_previews(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).map_err(SourceError::from)?;
        let mut written = Vec::new();
        for (index, cluster) in self.clusters.iter().enumerate() {
            if let Some(preview) = cluster.preview() {
                let path = dir.join(format!("cluster-{:02}.png", index + 1));
                preview.image().save(&path)?;
                written.push(path);
            }
        }
        Ok(written)
    }
}
