//! Configuration file support
//!
//! Settings are read from TOML and merged with command line overrides, CLI
//! values winning. Lookup order:
//!
//! 1. `--config PATH`
//! 2. `./clustercrop.toml`
//! 3. `<config dir>/clustercrop/config.toml`
//! 4. Built-in defaults
//!
//! ```toml
//! [clustering]
//! granularity = 20
//! max_sample_pages = 15
//!
//! [dispersion]
//! max_preview_height = 900
//! max_render_pixels = 4000000
//!
//! [boundary]
//! threshold = 245
//! mode = "fixed"
//!
//! [render]
//! dpi = 72
//! threads = 4
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::boundary::{BoundaryOptions, ThresholdMode};
use crate::cluster::ClusterOptions;
use crate::dispersion::DispersionOptions;
use crate::pdf::DEFAULT_RENDER_DPI;
use crate::pipeline::SessionOptions;

/// Local config file name
pub const LOCAL_CONFIG_FILE: &str = "clustercrop.toml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Rendering settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Sample page render resolution
    pub dpi: u32,
    /// Worker threads for pixel work (all cores when unset)
    pub threads: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_RENDER_DPI,
            threads: None,
        }
    }
}

/// Full configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub clustering: ClusterOptions,
    pub dispersion: DispersionOptions,
    pub boundary: BoundaryOptions,
    pub render: RenderConfig,
}

/// Values given on the command line; `None` keeps the config value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub granularity: Option<u32>,
    pub max_sample_pages: Option<usize>,
    pub threshold: Option<u8>,
    pub threshold_mode: Option<ThresholdMode>,
    pub dpi: Option<u32>,
    pub threads: Option<usize>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Config {
    /// Candidate config paths, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("clustercrop").join("config.toml"));
        }
        paths
    }

    /// Load the first config file found, or defaults
    pub fn load() -> Result<Self> {
        for path in Self::search_paths() {
            if path.is_file() {
                return Self::load_from_path(&path);
            }
        }
        debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Load a specific config file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse TOML text; out-of-range values are corrected
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        Ok(config.sanitized())
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn sanitized(mut self) -> Self {
        if self.clustering.granularity == 0 {
            warn!("clustering.granularity must be at least 1, using 1");
            self.clustering.granularity = 1;
        }
        if self.clustering.max_sample_pages == 0 {
            warn!("clustering.max_sample_pages must be at least 1, using 1");
            self.clustering.max_sample_pages = 1;
        }
        self.dispersion.max_preview_height = self.dispersion.max_preview_height.max(1);
        self.render.dpi = self.render.dpi.max(1);
        self
    }

    /// Apply command line overrides
    pub fn merge_with_cli(&self, cli: &CliOverrides) -> Config {
        let mut merged = *self;
        if let Some(g) = cli.granularity {
            merged.clustering.granularity = g;
        }
        if let Some(n) = cli.max_sample_pages {
            merged.clustering.max_sample_pages = n;
        }
        if let Some(t) = cli.threshold {
            merged.boundary.threshold = t;
        }
        if let Some(mode) = cli.threshold_mode {
            merged.boundary.mode = mode;
        }
        if let Some(dpi) = cli.dpi {
            merged.render.dpi = dpi;
        }
        if cli.threads.is_some() {
            merged.render.threads = cli.threads;
        }
        merged.sanitized()
    }

    /// Options for a crop session
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            cluster: self.clustering,
            dispersion: self.dispersion,
            boundary: self.boundary,
        }
    }

    /// Effective worker thread count
    pub fn thread_count(&self) -> usize {
        self.render.threads.unwrap_or_else(num_cpus::get).max(1)
    }

    /// Size the global rayon pool; only the first call in a process takes effect
    pub fn init_thread_pool(&self) {
        let threads = self.thread_count();
        if rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .is_err()
        {
            debug!("rayon pool already initialized");
        }
    }
}
