//! Page rasterization through poppler's `pdftoppm`

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use image::GrayImage;
use tempfile::TempDir;
use tracing::debug;

use crate::source::{PageRasterSource, Result, SourceError};

/// Default render resolution
pub const DEFAULT_RENDER_DPI: u32 = 72;

const PDFTOPPM: &str = "pdftoppm";

/// Renders single pages of a PDF to grayscale images
///
/// Pages are rasterized from their CropBox (MediaBox when absent) in
/// displayed orientation, the same frame [`crate::pdf::PdfDocument`] reports
/// through `page_box` and `page_rotation`.
pub struct PdftoppmRenderer {
    executable: PathBuf,
    input: PathBuf,
    dpi: u32,
    work_dir: TempDir,
}

impl PdftoppmRenderer {
    /// Locate `pdftoppm` and prepare a scratch directory
    pub fn new(input: &Path, dpi: u32) -> Result<Self> {
        let executable =
            which::which(PDFTOPPM).map_err(|_| SourceError::RendererNotFound(PDFTOPPM.into()))?;
        Ok(Self {
            executable,
            input: input.to_path_buf(),
            dpi: dpi.max(1),
            work_dir: tempfile::tempdir()?,
        })
    }

    /// Whether `pdftoppm` is on the PATH
    pub fn is_available() -> bool {
        which::which(PDFTOPPM).is_ok()
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }
}

impl PageRasterSource for PdftoppmRenderer {
    fn render_page(&mut self, page_number: usize) -> Result<GrayImage> {
        let prefix = self.work_dir.path().join(format!("page-{}", page_number));
        let output = Command::new(&self.executable)
            .args(pdftoppm_args(&self.input, page_number, self.dpi, &prefix))
            .output()?;

        if !output.status.success() {
            return Err(SourceError::Render {
                page: page_number,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let png = prefix.with_extension("png");
        let raster = image::open(&png)?.to_luma8();
        std::fs::remove_file(&png)?;

        debug!(
            page = page_number,
            width = raster.width(),
            height = raster.height(),
            "rendered page"
        );
        Ok(raster)
    }
}

/// Command line for one grayscale PNG of `page`, written to `<prefix>.png`
fn pdftoppm_args(input: &Path, page: usize, dpi: u32, prefix: &Path) -> Vec<OsString> {
    let page = page.to_string();
    let dpi = dpi.to_string();
    let mut args: Vec<OsString> = [
        "-f",
        page.as_str(),
        "-l",
        page.as_str(),
        "-r",
        dpi.as_str(),
        "-cropbox",
        "-gray",
        "-png",
        "-singlefile",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();
    args.push(input.as_os_str().to_os_string());
    args.push(prefix.as_os_str().to_os_string());
    args
}
