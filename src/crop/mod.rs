//! Crop Application module
//!
//! Turns per-cluster crop ratios into the page list of the output document.
//!
//! # Features
//!
//! - Ratio to page box mapping with PDF (bottom-left origin) coordinates
//! - Multiple rectangles per cluster, one output page each
//! - Up-front check that every cluster has a crop definition
//! - Textual ratio grid for the command line
//!
//! # Example
//!
//! ```rust
//! use clustercrop::crop::{format_ratio_grid, parse_ratio_grid};
//!
//! let grid = parse_ratio_grid("0.1/0.05/0.1/0.05:0/0/0.5/0,0.5/0/0/0").unwrap();
//! assert_eq!(grid.len(), 2);
//! assert_eq!(grid[1].len(), 2);
//! assert_eq!(format_ratio_grid(&grid), "0.1/0.05/0.1/0.05:0/0/0.5/0,0.5/0/0/0");
//! ```

// Submodules
mod applier;
mod grid;
mod types;

// Re-export public API
pub use applier::{CropApplier, OutputPage};
pub use grid::{format_ratio_grid, parse_ratio_grid};
pub use types::{CropError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClusterOptions, ClusterSet, PageDescriptor};
    use crate::geometry::{CropRatio, GeometryError, PageBox};
    use crate::source::{self, PageGeometrySource, SourceError};

    struct FixedBoxes(Vec<PageBox>);

    impl PageGeometrySource for FixedBoxes {
        fn page_count(&self) -> usize {
            self.0.len()
        }

        fn page_box(&self, page_number: usize) -> source::Result<PageBox> {
            page_number
                .checked_sub(1)
                .and_then(|i| self.0.get(i).copied())
                .ok_or(SourceError::PageOutOfRange {
                    page: page_number,
                    page_count: self.0.len(),
                })
        }
    }

    /// Portrait pages shown with a fixed `/Rotate`
    struct RotatedBoxes(FixedBoxes, u16);

    impl PageGeometrySource for RotatedBoxes {
        fn page_count(&self) -> usize {
            self.0.page_count()
        }

        fn page_box(&self, page_number: usize) -> source::Result<PageBox> {
            self.0.page_box(page_number)
        }

        fn page_rotation(&self, _page_number: usize) -> source::Result<u16> {
            Ok(self.1)
        }
    }

    fn letter_doc(count: usize) -> (ClusterSet, FixedBoxes) {
        let boxes = vec![PageBox::from_size(612.0, 792.0); count];
        let pages: Vec<_> = (1..=count)
            .map(|n| PageDescriptor::new(n, 612.0, 792.0, false))
            .collect();
        (
            ClusterSet::from_pages(&pages, ClusterOptions::default()),
            FixedBoxes(boxes),
        )
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-3, "{} != {}", a, b);
    }

    // TC-CRP-001: page-major then ratio-minor order
    #[test]
    fn test_output_order_with_two_ratios() {
        let (mut set, boxes) = letter_doc(5);
        let halves = [
            CropRatio::new(0.0, 0.0, 0.5, 0.0),
            CropRatio::new(0.5, 0.0, 0.0, 0.0),
        ];
        // odd pages 1,3,5 get two rectangles, even pages one
        set.clusters_mut()[0].set_crop_ratios(&halves);
        set.clusters_mut()[1].add_crop_ratio(CropRatio::FULL);

        let out = CropApplier::apply(&set, &boxes).unwrap();
        let order: Vec<_> = out.iter().map(|p| (p.source_page, p.region_index)).collect();
        assert_eq!(
            order,
            vec![(1, 0), (1, 1), (2, 0), (3, 0), (3, 1), (4, 0), (5, 0), (5, 1)]
        );

        let odd_count = out.iter().filter(|p| p.source_page % 2 == 1).count();
        assert_eq!(odd_count, 6);
    }

    // TC-CRP-002: incomplete definition fails before producing output
    #[test]
    fn test_incomplete_definition() {
        let (mut set, boxes) = letter_doc(4);
        set.clusters_mut()[0].add_crop_ratio(CropRatio::FULL);

        match CropApplier::apply(&set, &boxes) {
            Err(CropError::IncompleteCropDefinition {
                cluster_index,
                first_page,
            }) => {
                assert_eq!(cluster_index, 1);
                assert_eq!(first_page, 2);
            }
            other => panic!("expected IncompleteCropDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_ratio_rejected() {
        let (mut set, boxes) = letter_doc(2);
        for cluster in set.clusters_mut() {
            cluster.add_crop_ratio(CropRatio::new(0.6, 0.0, 0.6, 0.0));
        }
        let err = CropApplier::apply(&set, &boxes).unwrap_err();
        assert!(matches!(
            err,
            CropError::Geometry {
                cluster_index: 0,
                source: GeometryError::Degenerate { .. }
            }
        ));
    }

    #[test]
    fn test_unassigned_page() {
        let (mut set, _) = letter_doc(2);
        for cluster in set.clusters_mut() {
            cluster.add_crop_ratio(CropRatio::FULL);
        }
        let boxes = FixedBoxes(vec![PageBox::from_size(612.0, 792.0); 3]);
        assert!(matches!(
            CropApplier::apply(&set, &boxes),
            Err(CropError::UnassignedPage(3))
        ));
    }

    #[test]
    fn test_crop_box_uses_page_origin() {
        let boxes = FixedBoxes(vec![PageBox::from_corners(10.0, 20.0, 210.0, 420.0)]);
        let pages = [PageDescriptor::new(1, 200.0, 400.0, false)];
        let mut set = ClusterSet::from_pages(&pages, ClusterOptions::default());
        set.clusters_mut()[0].add_crop_ratio(CropRatio::new(0.1, 0.25, 0.2, 0.05));

        let out = CropApplier::apply(&set, &boxes).unwrap();
        assert_eq!(out.len(), 1);
        let b = out[0].crop_box;
        assert_close(b.x, 30.0);
        assert_close(b.width, 140.0);
        // bottom inset 0.25 of 400 above the page's lower edge at y=20
        assert_close(b.y, 120.0);
        assert_close(b.height, 280.0);
    }

    #[test]
    fn test_full_ratio_keeps_page_box() {
        let (mut set, boxes) = letter_doc(3);
        for cluster in set.clusters_mut() {
            cluster.add_crop_ratio(CropRatio::FULL);
        }
        let out = CropApplier::apply(&set, &boxes).unwrap();
        assert_eq!(out.len(), 3);
        for page in out {
            assert_eq!(page.crop_box, PageBox::from_size(612.0, 792.0));
        }
    }

    #[test]
    fn test_rotated_pages_cluster_and_crop_in_page_space() {
        let doc = RotatedBoxes(FixedBoxes(vec![PageBox::from_size(600.0, 800.0); 2]), 90);
        let mut set =
            ClusterSet::from_source(&doc, &Default::default(), ClusterOptions::default()).unwrap();
        // keyed by the displayed landscape size
        assert_eq!(set.clusters()[0].rounded_width(), 800);
        assert_eq!(set.clusters()[0].rounded_height(), 600);

        // cut the displayed left quarter, i.e. the bottom of the unrotated page
        for cluster in set.clusters_mut() {
            cluster.add_crop_ratio(CropRatio::new(0.25, 0.0, 0.0, 0.0));
        }
        let out = CropApplier::apply(&set, &doc).unwrap();
        assert_eq!(out.len(), 2);
        for page in out {
            assert_eq!(page.crop_box, PageBox::from_corners(0.0, 200.0, 600.0, 800.0));
        }
    }

    // TC-CRP-003: ratio grid text
    #[test]
    fn test_parse_grid() {
        let grid = parse_ratio_grid(" 0.1/0.2/0.3/0.4 : 0/0/0/0 , 0.5/0/0/0 ").unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0], vec![CropRatio::new(0.1, 0.2, 0.3, 0.4)]);
        assert_eq!(grid[1][0], CropRatio::FULL);
        assert_eq!(grid[1][1], CropRatio::new(0.5, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_parse_empty_grid() {
        assert!(parse_ratio_grid("").unwrap().is_empty());
        assert!(parse_ratio_grid("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_grid_errors() {
        let cases = [
            "0.1/0.2/0.3",
            "0.1/0.2/0.3/0.4/0.5",
            "a/0/0/0",
            "0/0/0/0:",
            "0.7/0/0.7/0",
        ];
        for bad in cases {
            assert!(
                matches!(parse_ratio_grid(bad), Err(CropError::InvalidGrid(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_format_grid() {
        let grid = vec![
            vec![CropRatio::new(0.25, 0.0, 0.25, 0.125)],
            vec![CropRatio::FULL, CropRatio::new(0.5, 0.0, 0.0, 0.0)],
        ];
        let text = format_ratio_grid(&grid);
        assert_eq!(text, "0.25/0/0.25/0.125:0/0/0/0,0.5/0/0/0");
        assert_eq!(parse_ratio_grid(&text).unwrap(), grid);
    }
}
