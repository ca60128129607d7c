//! Ratio geometry
//!
//! Conversion between pixel rectangles (top-left origin, as drawn on a
//! preview image) and resolution-independent crop ratios.
//!
//! A [`CropRatio`] stores four inset fractions measured inward from each page
//! edge (`left`, `bottom`, `right`, `top`). Because the fractions do not depend
//! on the absolute page size, one ratio set applies to every member page of a
//! cluster even when their native boxes differ slightly.
//!
//! # Example
//!
//! ```rust
//! use clustercrop::{CropRatio, PixelRect};
//!
//! let rect = PixelRect::new(10, 20, 80, 60);
//! let ratio = CropRatio::from_pixel_rect(&rect, 100, 100).unwrap();
//! assert_eq!(ratio.to_pixel_rect(100, 100), rect);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================
// Error Types
// ============================================================

/// Invalid or degenerate crop geometry
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Crop ratio contains a non-finite value")]
    NonFinite,

    #[error("Crop ratio value {0} is outside 0..=1")]
    OutOfRange(f32),

    #[error("Degenerate crop ratio: left+right={horizontal}, bottom+top={vertical}")]
    Degenerate { horizontal: f32, vertical: f32 },

    #[error("Image has no area ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },
}

pub type Result<T> = std::result::Result<T, GeometryError>;

// ============================================================
// Pixel space
// ============================================================

/// Rectangle in top-left-origin pixel space
///
/// Position may be negative and the extent may reach past the image; both are
/// clamped when converting to ratios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    /// Create a new rectangle
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge (exclusive), widened so extreme values cannot overflow
    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Bottom edge (exclusive), widened like [`PixelRect::right`]
    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }
}

/// Axis-aligned box in native page units, bottom-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PageBox {
    /// Lower-left X
    pub x: f32,
    /// Lower-left Y
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageBox {
    /// Create a box anchored at the origin
    pub fn from_size(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
        }
    }

    /// Create a box from lower-left and upper-right corners
    pub fn from_corners(llx: f32, lly: f32, urx: f32, ury: f32) -> Self {
        Self {
            x: llx.min(urx),
            y: lly.min(ury),
            width: (urx - llx).abs(),
            height: (ury - lly).abs(),
        }
    }

    /// Upper-right X
    pub fn urx(&self) -> f32 {
        self.x + self.width
    }

    /// Upper-right Y
    pub fn ury(&self) -> f32 {
        self.y + self.height
    }

    /// `[llx, lly, urx, ury]` as stored in PDF box arrays
    pub fn to_array(&self) -> [f32; 4] {
        [self.x, self.y, self.urx(), self.ury()]
    }

    /// Width and height as shown under a clockwise `/Rotate` of `rotation`
    pub fn displayed_size(&self, rotation: u16) -> (f32, f32) {
        if rotation % 180 == 90 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// Rectangle in top-left-origin render space, floating point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

// ============================================================
// Ratio space
// ============================================================

/// Axis along which [`CropRatio::split`] divides a rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitAxis {
    /// Side-by-side parts, enumerated left to right
    #[default]
    Horizontal,
    /// Stacked parts, enumerated top to bottom
    Vertical,
}

/// Crop rectangle as edge-inset fractions of the page
///
/// Origin is conceptually bottom-left: `bottom` is the fraction cut from the
/// lower edge, `top` the fraction cut from the upper edge.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropRatio {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

impl CropRatio {
    /// The whole page, nothing cut
    pub const FULL: CropRatio = CropRatio {
        left: 0.0,
        bottom: 0.0,
        right: 0.0,
        top: 0.0,
    };

    /// Create a ratio from its four insets
    pub fn new(left: f32, bottom: f32, right: f32, top: f32) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Insets as `[left, bottom, right, top]`
    pub fn as_array(&self) -> [f32; 4] {
        [self.left, self.bottom, self.right, self.top]
    }

    /// Convert a pixel rectangle drawn on a `width` x `height` image
    ///
    /// The rectangle is clamped to the image first; one that is inverted or
    /// has no area inside the image is rejected.
    pub fn from_pixel_rect(rect: &PixelRect, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GeometryError::EmptyImage { width, height });
        }
        let w = width as i64;
        let h = height as i64;

        let x1 = (rect.x as i64).clamp(0, w);
        let y1 = (rect.y as i64).clamp(0, h);
        let x2 = rect.right().clamp(0, w);
        let y2 = rect.bottom().clamp(0, h);

        let (wf, hf) = (w as f64, h as f64);
        let ratio = Self {
            left: (x1 as f64 / wf) as f32,
            bottom: ((hf - y2 as f64) / hf) as f32,
            right: (1.0 - x2 as f64 / wf) as f32,
            top: (1.0 - (hf - y1 as f64) / hf) as f32,
        };
        // Inverted or empty after clamping
        if x2 <= x1 || y2 <= y1 {
            return Err(GeometryError::Degenerate {
                horizontal: ratio.left + ratio.right,
                vertical: ratio.bottom + ratio.top,
            });
        }
        ratio.validate()
    }

    /// Convert back to a pixel rectangle on a `width` x `height` image
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> PixelRect {
        let r = self.to_render_rect(width as f32, height as f32);
        PixelRect {
            x: r.x.round() as i32,
            y: r.y.round() as i32,
            width: r.width.round() as i32,
            height: r.height.round() as i32,
        }
    }

    /// Absolute rectangle in top-origin render space for the given extent
    pub fn to_render_rect(&self, width: f32, height: f32) -> RenderRect {
        RenderRect {
            x: self.left * width,
            y: self.top * height,
            width: width * (1.0 - self.left - self.right),
            height: height * (1.0 - self.top - self.bottom),
        }
    }

    /// Absolute crop box for a page, in the page's own bottom-left coordinates
    pub fn to_page_box(&self, page: &PageBox) -> PageBox {
        let r = self.to_render_rect(page.width, page.height);
        PageBox {
            x: page.x + r.x,
            y: page.y + (page.height - r.y - r.height),
            width: r.width,
            height: r.height,
        }
    }

    /// Map a ratio measured on the displayed page back to the unrotated page
    ///
    /// `rotation` is the page's clockwise `/Rotate` in degrees. Under 90, the
    /// page's bottom edge is shown on the left and its left edge on top.
    pub fn unrotated(&self, rotation: u16) -> CropRatio {
        let Self {
            left,
            bottom,
            right,
            top,
        } = *self;
        match rotation % 360 {
            90 => Self::new(top, left, bottom, right),
            180 => Self::new(right, top, left, bottom),
            270 => Self::new(bottom, right, top, left),
            _ => *self,
        }
    }

    /// Check that the ratio describes a non-empty rectangle inside the page
    pub fn validate(&self) -> Result<Self> {
        let values = self.as_array();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        if let Some(v) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(GeometryError::OutOfRange(*v));
        }
        let horizontal = self.left + self.right;
        let vertical = self.bottom + self.top;
        if horizontal >= 1.0 || vertical >= 1.0 {
            return Err(GeometryError::Degenerate {
                horizontal,
                vertical,
            });
        }
        Ok(*self)
    }

    /// Clamp each inset into `0..=1`, then validate
    ///
    /// Clamping repairs small overshoots from editing; inverted rectangles are
    /// still rejected.
    pub fn clamped(&self) -> Result<Self> {
        if self.as_array().iter().any(|v| v.is_nan()) {
            return Err(GeometryError::NonFinite);
        }
        Self {
            left: self.left.clamp(0.0, 1.0),
            bottom: self.bottom.clamp(0.0, 1.0),
            right: self.right.clamp(0.0, 1.0),
            top: self.top.clamp(0.0, 1.0),
        }
        .validate()
    }

    /// Kept fraction of the page width
    pub fn width_fraction(&self) -> f32 {
        1.0 - self.left - self.right
    }

    /// Kept fraction of the page height
    pub fn height_fraction(&self) -> f32 {
        1.0 - self.top - self.bottom
    }

    /// Resize to `width` x `height` page fractions, keeping the top-left
    /// corner; the rectangle moves inward where it would leave the page
    pub fn with_size(&self, width: f32, height: f32) -> CropRatio {
        if width.is_nan() || height.is_nan() {
            return *self;
        }
        let width = width.clamp(0.0, 1.0);
        let height = height.clamp(0.0, 1.0);
        let left = self.left.clamp(0.0, 1.0 - width);
        let top = self.top.clamp(0.0, 1.0 - height);
        CropRatio {
            left,
            bottom: (1.0 - top - height).max(0.0),
            right: (1.0 - left - width).max(0.0),
            top,
        }
    }

    /// Whether nothing is cut from any edge
    pub fn is_full_page(&self) -> bool {
        *self == Self::FULL
    }

    /// Divide into `parts` equal sub-rectangles along `axis`
    ///
    /// `overlap` is a fraction of the page that neighbouring parts share,
    /// half on each side of every cut. Parts never extend beyond `self`.
    pub fn split(&self, parts: usize, axis: SplitAxis, overlap: f32) -> Vec<CropRatio> {
        if parts <= 1 {
            return vec![*self];
        }
        let half = overlap.max(0.0) / 2.0;

        // Positions measured from the left (or top) edge
        let (start, end) = match axis {
            SplitAxis::Horizontal => (self.left, 1.0 - self.right),
            SplitAxis::Vertical => (self.top, 1.0 - self.bottom),
        };
        let span = end - start;

        (0..parts)
            .map(|i| {
                let a = (start + span * i as f32 / parts as f32 - half).max(start);
                let b = (start + span * (i + 1) as f32 / parts as f32 + half).min(end);
                match axis {
                    SplitAxis::Horizontal => CropRatio {
                        left: a,
                        right: 1.0 - b,
                        ..*self
                    },
                    SplitAxis::Vertical => CropRatio {
                        top: a,
                        bottom: 1.0 - b,
                        ..*self
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-4, "{} != {}", a, b);
    }

    #[test]
    fn test_pixel_to_ratio_forward_formula() {
        let rect = PixelRect::new(10, 20, 50, 40);
        let ratio = CropRatio::from_pixel_rect(&rect, 100, 200).unwrap();

        assert_close(ratio.left, 0.1);
        assert_close(ratio.bottom, (200.0 - 60.0) / 200.0);
        assert_close(ratio.right, 1.0 - 60.0 / 100.0);
        assert_close(ratio.top, 1.0 - (200.0 - 20.0) / 200.0);
    }

    #[test]
    fn test_pixel_to_ratio_clamps_to_image() {
        let rect = PixelRect::new(-15, -5, 200, 300);
        let ratio = CropRatio::from_pixel_rect(&rect, 100, 100).unwrap();
        assert!(ratio.is_full_page());
    }

    #[test]
    fn test_pixel_to_ratio_rejects_inverted_rect() {
        let inverted = PixelRect::new(60, 60, -30, -30);
        assert!(matches!(
            CropRatio::from_pixel_rect(&inverted, 100, 100),
            Err(GeometryError::Degenerate { .. })
        ));

        let zero_width = PixelRect::new(40, 10, 0, 50);
        assert!(CropRatio::from_pixel_rect(&zero_width, 100, 100).is_err());

        // entirely outside the image
        let outside = PixelRect::new(150, 150, 20, 20);
        assert!(CropRatio::from_pixel_rect(&outside, 100, 100).is_err());
    }

    #[test]
    fn test_pixel_rect_extreme_edges() {
        let rect = PixelRect::new(i32::MAX, i32::MAX, i32::MAX, i32::MAX);
        assert_eq!(rect.right(), 2 * i32::MAX as i64);
        assert!(CropRatio::from_pixel_rect(&rect, 100, 100).is_err());

        let rect = PixelRect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert_eq!(rect.bottom(), -1);
    }

    #[test]
    fn test_pixel_to_ratio_empty_image() {
        let rect = PixelRect::new(0, 0, 10, 10);
        let err = CropRatio::from_pixel_rect(&rect, 0, 100).unwrap_err();
        assert_eq!(
            err,
            GeometryError::EmptyImage {
                width: 0,
                height: 100
            }
        );
    }

    #[test]
    fn test_round_trip_same_extent() {
        let sizes = [(100u32, 100u32), (637, 900), (1, 1), (333, 77)];
        for (w, h) in sizes {
            let points = [(0, 0), (1, 3), (w as i32 / 3, h as i32 / 4)];
            for (x, y) in points.into_iter().filter(|&(x, y)| x < w as i32 && y < h as i32) {
                let rect = PixelRect::new(x, y, w as i32 - x, h as i32 - y);
                let back = CropRatio::from_pixel_rect(&rect, w, h)
                    .unwrap()
                    .to_pixel_rect(w, h);
                assert!((back.x - rect.x).abs() <= 1);
                assert!((back.y - rect.y).abs() <= 1);
                assert!((back.width - rect.width).abs() <= 1);
                assert!((back.height - rect.height).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_render_rect_inverse_formula() {
        let ratio = CropRatio::new(0.1, 0.2, 0.3, 0.05);
        let r = ratio.to_render_rect(600.0, 800.0);
        assert_close(r.x, 60.0);
        assert_close(r.y, 40.0);
        assert_close(r.width, 600.0 * 0.6);
        assert_close(r.height, 800.0 * 0.75);
    }

    #[test]
    fn test_page_box_uses_bottom_left_origin() {
        let page = PageBox {
            x: 10.0,
            y: 20.0,
            width: 600.0,
            height: 800.0,
        };
        let crop = CropRatio::new(0.1, 0.25, 0.1, 0.0).to_page_box(&page);

        assert_close(crop.x, 70.0);
        assert_close(crop.y, 220.0);
        assert_close(crop.width, 480.0);
        assert_close(crop.height, 600.0);
        assert_close(crop.ury(), 820.0);
    }

    #[test]
    fn test_unrotated_edges() {
        let shown = CropRatio::new(0.1, 0.2, 0.3, 0.4);
        assert_eq!(shown.unrotated(0), shown);
        assert_eq!(shown.unrotated(90), CropRatio::new(0.4, 0.1, 0.2, 0.3));
        assert_eq!(shown.unrotated(180), CropRatio::new(0.3, 0.4, 0.1, 0.2));
        assert_eq!(shown.unrotated(270), CropRatio::new(0.2, 0.3, 0.4, 0.1));
        assert_eq!(shown.unrotated(450), shown.unrotated(90));
    }

    #[test]
    fn test_rotated_page_crop_box() {
        // 600x800 portrait shown as 800x600 landscape; cut the shown left quarter
        let page = PageBox::from_size(600.0, 800.0);
        assert_eq!(page.displayed_size(90), (800.0, 600.0));
        assert_eq!(page.displayed_size(180), (600.0, 800.0));

        let crop = CropRatio::new(0.25, 0.0, 0.0, 0.0)
            .unrotated(90)
            .to_page_box(&page);
        assert_close(crop.x, 0.0);
        assert_close(crop.y, 200.0);
        assert_close(crop.width, 600.0);
        assert_close(crop.height, 600.0);

        // under 270 the shown left edge is the page top
        let crop = CropRatio::new(0.25, 0.0, 0.0, 0.0)
            .unrotated(270)
            .to_page_box(&page);
        assert_close(crop.y, 0.0);
        assert_close(crop.ury(), 600.0);
    }

    #[test]
    fn test_with_size_keeps_top_left() {
        let ratio = CropRatio::new(0.1, 0.5, 0.6, 0.2).with_size(0.5, 0.4);
        assert_close(ratio.left, 0.1);
        assert_close(ratio.top, 0.2);
        assert_close(ratio.width_fraction(), 0.5);
        assert_close(ratio.height_fraction(), 0.4);
        assert_close(ratio.right, 0.4);
        assert_close(ratio.bottom, 0.4);
    }

    #[test]
    fn test_with_size_moves_inside_page() {
        let ratio = CropRatio::new(0.7, 0.0, 0.1, 0.8).with_size(0.5, 0.5);
        assert_close(ratio.left, 0.5);
        assert_close(ratio.right, 0.0);
        assert_close(ratio.top, 0.5);
        assert_close(ratio.bottom, 0.0);
        assert!(ratio.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_degenerate() {
        let err = CropRatio::new(0.6, 0.0, 0.4, 0.0).validate().unwrap_err();
        assert!(matches!(err, GeometryError::Degenerate { .. }));

        let err = CropRatio::new(0.0, 0.7, 0.0, 0.5).validate().unwrap_err();
        assert!(matches!(err, GeometryError::Degenerate { .. }));
    }

    #[test]
    fn test_validate_rejects_non_finite_and_out_of_range() {
        assert_eq!(
            CropRatio::new(f32::NAN, 0.0, 0.0, 0.0).validate(),
            Err(GeometryError::NonFinite)
        );
        assert_eq!(
            CropRatio::new(-0.1, 0.0, 0.0, 0.0).validate(),
            Err(GeometryError::OutOfRange(-0.1))
        );
    }

    #[test]
    fn test_clamped_repairs_overshoot() {
        let ratio = CropRatio::new(-0.01, 0.1, 0.2, 1e-7).clamped().unwrap();
        assert_eq!(ratio.left, 0.0);
        assert!(CropRatio::new(0.9, 0.0, 0.9, 0.0).clamped().is_err());
        assert!(CropRatio::new(0.0, f32::NAN, 0.0, 0.0).clamped().is_err());
    }

    #[test]
    fn test_split_horizontal_two_up() {
        let parts = CropRatio::new(0.1, 0.0, 0.1, 0.0).split(2, SplitAxis::Horizontal, 0.0);
        assert_eq!(parts.len(), 2);
        assert_close(parts[0].left, 0.1);
        assert_close(parts[0].right, 0.5);
        assert_close(parts[1].left, 0.5);
        assert_close(parts[1].right, 0.1);
        for p in &parts {
            assert!(p.validate().is_ok());
        }
    }

    #[test]
    fn test_split_vertical_with_overlap() {
        let parts = CropRatio::FULL.split(2, SplitAxis::Vertical, 0.1);
        assert_close(parts[0].top, 0.0);
        assert_close(parts[0].bottom, 0.45);
        assert_close(parts[1].top, 0.45);
        assert_close(parts[1].bottom, 0.0);
    }

    #[test]
    fn test_split_single_part_is_identity() {
        let ratio = CropRatio::new(0.1, 0.2, 0.3, 0.1);
        assert_eq!(ratio.split(1, SplitAxis::Horizontal, 0.2), vec![ratio]);
        assert_eq!(ratio.split(0, SplitAxis::Vertical, 0.0), vec![ratio]);
    }

    #[test]
    fn test_page_box_from_corners_normalizes() {
        let b = PageBox::from_corners(612.0, 792.0, 0.0, 0.0);
        assert_eq!(b, PageBox::from_size(612.0, 792.0));
        assert_eq!(b.to_array(), [0.0, 0.0, 612.0, 792.0]);
    }
}
