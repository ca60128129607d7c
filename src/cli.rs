//! Command line definitions

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::boundary::ThresholdMode;
use crate::config::CliOverrides;
use crate::geometry::SplitAxis;

/// Batch cropping for scanned PDFs
#[derive(Debug, Parser)]
#[command(name = "clustercrop", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Cluster pages, detect or apply crop rectangles and write a cropped PDF
    Crop(CropArgs),
    /// Print how the pages of a PDF are clustered
    Clusters(ClustersArgs),
    /// Show renderer availability and config file locations
    Info,
}

/// Split direction on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AxisArg {
    Horizontal,
    Vertical,
}

impl From<AxisArg> for SplitAxis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::Horizontal => SplitAxis::Horizontal,
            AxisArg::Vertical => SplitAxis::Vertical,
        }
    }
}

/// Threshold selection on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ThresholdModeArg {
    Fixed,
    Otsu,
}

impl From<ThresholdModeArg> for ThresholdMode {
    fn from(mode: ThresholdModeArg) -> Self {
        match mode {
            ThresholdModeArg::Fixed => ThresholdMode::Fixed,
            ThresholdModeArg::Otsu => ThresholdMode::Otsu,
        }
    }
}

#[derive(Debug, Args)]
pub struct CropArgs {
    /// Input PDF
    pub input: PathBuf,

    /// Output PDF [default: <input stem>_cropped.pdf]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Crop rectangles instead of auto-detection, e.g. "0.1/0.05/0.1/0.05:0/0/0.5/0"
    /// (clusters separated by ':', rectangles by ',', left/bottom/right/top by '/')
    #[arg(long, value_name = "GRID")]
    pub crop: Option<String>,

    /// Pages kept out of merging, e.g. "1;3-5;-1"
    #[arg(short, long, value_name = "RANGES", allow_hyphen_values = true)]
    pub exclude: Option<String>,

    /// Give every crop rectangle the largest width and height
    #[arg(long)]
    pub equalize: bool,

    /// Split every crop rectangle into N parts
    #[arg(long, value_name = "N", default_value_t = 1)]
    pub split: usize,

    /// Split direction
    #[arg(long, value_enum, default_value_t = AxisArg::Horizontal)]
    pub split_axis: AxisArg,

    /// Fraction of the page shared by neighbouring split parts
    #[arg(long, value_name = "FRACTION", default_value_t = 0.0)]
    pub split_overlap: f32,

    /// Ink threshold for crop detection (0-255)
    #[arg(long)]
    pub threshold: Option<u8>,

    /// Threshold selection
    #[arg(long, value_enum)]
    pub threshold_mode: Option<ThresholdModeArg>,

    /// Rounding unit for page dimensions when clustering
    #[arg(long)]
    pub granularity: Option<u32>,

    /// Maximum sample pages rendered per cluster
    #[arg(long)]
    pub max_samples: Option<usize>,

    /// Sample render resolution
    #[arg(long)]
    pub dpi: Option<u32>,

    /// Worker threads [default: all cores]
    #[arg(long)]
    pub threads: Option<usize>,

    /// Config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Save cluster previews as PNG to this directory
    #[arg(long, value_name = "DIR")]
    pub preview_dir: Option<PathBuf>,

    /// Print the crop plan without writing a PDF
    #[arg(long)]
    pub dry_run: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

impl CropArgs {
    /// Output path, defaulting to `<stem>_cropped.pdf` beside the input
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.input))
    }

    /// Config values set on the command line
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            granularity: self.granularity,
            max_sample_pages: self.max_samples,
            threshold: self.threshold,
            threshold_mode: self.threshold_mode.map(Into::into),
            dpi: self.dpi,
            threads: self.threads,
        }
    }
}

#[derive(Debug, Args)]
pub struct ClustersArgs {
    /// Input PDF
    pub input: PathBuf,

    /// Pages kept out of merging, e.g. "1;3-5;-1"
    #[arg(short, long, value_name = "RANGES", allow_hyphen_values = true)]
    pub exclude: Option<String>,

    /// Rounding unit for page dimensions
    #[arg(long)]
    pub granularity: Option<u32>,

    /// Config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ClustersArgs {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            granularity: self.granularity,
            ..Default::default()
        }
    }
}

/// `<dir>/<stem>_cropped.pdf`
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_cropped.pdf", stem))
}
