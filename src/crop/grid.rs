//! Textual ratio grid
//!
//! Clusters are separated by `:`, rectangles by `,` and the four insets of a
//! rectangle by `/`, in left/bottom/right/top order:
//!
//! ```text
//! 0.1/0.05/0.1/0.05:0/0/0.5/0,0.5/0/0/0
//! ```

use super::types::{CropError, Result};
use crate::geometry::CropRatio;

const CLUSTER_SEPARATOR: char = ':';
const RECT_SEPARATOR: char = ',';
const VALUE_SEPARATOR: char = '/';

/// Parse a cluster-major ratio grid
pub fn parse_ratio_grid(input: &str) -> Result<Vec<Vec<CropRatio>>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }
    input
        .split(CLUSTER_SEPARATOR)
        .enumerate()
        .map(|(cluster, entry)| {
            entry
                .split(RECT_SEPARATOR)
                .map(|rect| parse_rect(rect, cluster))
                .collect()
        })
        .collect()
}

fn parse_rect(rect: &str, cluster: usize) -> Result<CropRatio> {
    let values = rect
        .split(VALUE_SEPARATOR)
        .map(|v| {
            let v = v.trim();
            v.parse::<f32>().map_err(|_| {
                CropError::InvalidGrid(format!("cluster {}: invalid number '{}'", cluster, v))
            })
        })
        .collect::<Result<Vec<f32>>>()?;

    let &[left, bottom, right, top] = values.as_slice() else {
        return Err(CropError::InvalidGrid(format!(
            "cluster {}: expected 4 values in '{}', found {}",
            cluster,
            rect.trim(),
            values.len()
        )));
    };

    CropRatio::new(left, bottom, right, top)
        .validate()
        .map_err(|e| CropError::InvalidGrid(format!("cluster {}: {}", cluster, e)))
}

/// Format a cluster-major ratio grid
pub fn format_ratio_grid(grid: &[Vec<CropRatio>]) -> String {
    grid.iter()
        .map(|ratios| {
            ratios
                .iter()
                .map(|r| {
                    r.as_array()
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(&VALUE_SEPARATOR.to_string())
                })
                .collect::<Vec<_>>()
                .join(&RECT_SEPARATOR.to_string())
        })
        .collect::<Vec<_>>()
        .join(&CLUSTER_SEPARATOR.to_string())
}
