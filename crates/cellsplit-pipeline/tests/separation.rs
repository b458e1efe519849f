//! Integration tests: end-to-end separation properties on synthetic masks.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use cellsplit_pipeline::types::{BACKGROUND, FOREGROUND, is_foreground};
use cellsplit_pipeline::{GrayImage, RegionFilter, SegmentConfig, Threshold, segment};
use image::Luma;

fn disks(width: u32, height: u32, centers: &[(i64, i64)], radius: i64) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let inside = centers.iter().any(|&(cx, cy)| {
            let dx = i64::from(x) - cx;
            let dy = i64::from(y) - cy;
            dx * dx + dy * dy <= radius * radius
        });
        Luma([if inside { FOREGROUND } else { BACKGROUND }])
    })
}

fn two_squares() -> GrayImage {
    GrayImage::from_fn(20, 20, |x, y| {
        let in_x = (2..8).contains(&x) || (12..18).contains(&x);
        let in_y = (7..13).contains(&y);
        Luma([if in_x && in_y { FOREGROUND } else { BACKGROUND }])
    })
}

fn config(min_distance: u32) -> SegmentConfig {
    SegmentConfig {
        min_distance,
        ..SegmentConfig::default()
    }
}

fn assert_subset(inner: &GrayImage, outer: &GrayImage) {
    for (x, y, p) in inner.enumerate_pixels() {
        if is_foreground(p.0[0]) {
            assert!(
                is_foreground(outer.get_pixel(x, y).0[0]),
                "({x},{y}) is set but outside the mask"
            );
        }
    }
}

#[test]
fn result_is_always_inside_mask() {
    let masks = [
        disks(32, 24, &[(10, 12), (22, 12)], 8),
        disks(40, 40, &[(10, 10), (20, 14), (28, 28)], 7),
        two_squares(),
        GrayImage::from_pixel(6, 6, Luma([FOREGROUND])),
        GrayImage::new(6, 6),
    ];
    for mask in &masks {
        for min_distance in [1, 3, 6] {
            let seg = segment(mask, &config(min_distance)).unwrap();
            assert_subset(&seg.result, mask);
            assert_eq!(
                seg.region_count,
                seg.labels.pixels().map(|p| p.0[0]).max().unwrap_or(0)
            );
        }
    }
}

#[test]
fn two_squares_get_two_peaks() {
    let mask = two_squares();
    let seg = segment(&mask, &config(3)).unwrap();
    assert_eq!(seg.seeds.len(), 2);
    assert_eq!(seg.marker_count, 2);
    assert_eq!(seg.region_count, 2);
    // The squares do not touch, so nothing is erased.
    assert_eq!(seg.result, mask);
}

#[test]
fn square_blob_is_one_region() {
    let mask = GrayImage::from_fn(12, 12, |x, y| {
        let inside = (3..9).contains(&x) && (3..9).contains(&y);
        Luma([if inside { FOREGROUND } else { BACKGROUND }])
    });
    let seg = segment(&mask, &SegmentConfig::default()).unwrap();
    assert_eq!(seg.region_count, 1);
    assert_eq!(seg.result, mask);
}

#[test]
fn touching_disks_split_for_every_sweep_value() {
    let mask = disks(32, 24, &[(10, 12), (22, 12)], 8);
    for min_distance in 4..=8 {
        let seg = segment(&mask, &config(min_distance)).unwrap();
        assert_eq!(seg.region_count, 2, "min_distance={min_distance}");
        let seam = seg.seam_pixel_count(&mask);
        assert!(seam > 0, "min_distance={min_distance}");
        assert_subset(&seg.result, &mask);
    }
}

#[test]
fn larger_min_distance_never_adds_peaks_or_regions() {
    let masks = [
        disks(32, 24, &[(10, 12), (22, 12)], 8),
        disks(40, 40, &[(10, 10), (20, 14), (28, 28)], 7),
    ];
    for mask in &masks {
        let runs: Vec<(usize, u32)> = (1..=12)
            .map(|md| {
                let seg = segment(mask, &config(md)).unwrap();
                (seg.seeds.len(), seg.region_count)
            })
            .collect();
        for pair in runs.windows(2) {
            assert!(pair[1].0 <= pair[0].0, "peak counts not monotonic: {runs:?}");
            assert!(pair[1].1 <= pair[0].1, "region counts not monotonic: {runs:?}");
        }
    }

    // Once the window spans both centers they merge into one seed.
    let seg = segment(&masks[0], &config(12)).unwrap();
    assert_eq!(seg.seeds.len(), 1);
    assert_eq!(seg.region_count, 1);
}

#[test]
fn border_cells_are_dropped_when_excluded() {
    // One square in the top-left corner, one well inside the image.
    let mask = GrayImage::from_fn(20, 20, |x, y| {
        let corner = x < 6 && y < 6;
        let inner = (10..16).contains(&x) && (10..16).contains(&y);
        Luma([if corner || inner { FOREGROUND } else { BACKGROUND }])
    });

    let seg = segment(&mask, &SegmentConfig::default()).unwrap();
    assert_eq!(seg.region_count, 2);
    assert_eq!(seg.cells.len(), 2);
    assert!(seg.cells.iter().all(|c| c.area == 36));

    let excluding = SegmentConfig {
        cell_filter: RegionFilter {
            exclude_border: true,
            ..RegionFilter::default()
        },
        ..SegmentConfig::default()
    };
    let seg = segment(&mask, &excluding).unwrap();
    assert_eq!(seg.region_count, 2);
    assert_eq!(seg.cells.len(), 1);
    let cell = seg.cells[0];
    assert!(!cell.touches_border);
    assert!((cell.centroid_x - 12.5).abs() < 1e-9);
    assert!((cell.centroid_y - 12.5).abs() < 1e-9);
}

#[test]
fn area_limits_filter_cells() {
    let mask = disks(40, 40, &[(10, 10), (28, 28)], 3);
    let small_only = SegmentConfig {
        cell_filter: RegionFilter {
            max_area: Some(10),
            ..RegionFilter::default()
        },
        ..SegmentConfig::default()
    };
    let seg = segment(&mask, &small_only).unwrap();
    assert_eq!(seg.region_count, 2);
    assert!(seg.cells.is_empty());

    let large_only = SegmentConfig {
        cell_filter: RegionFilter {
            min_area: Some(10),
            max_area: Some(100),
            exclude_border: false,
        },
        ..SegmentConfig::default()
    };
    let seg = segment(&mask, &large_only).unwrap();
    assert_eq!(seg.cells.len(), 2);
    assert_eq!(seg.cells[0].area, 29);
}

#[test]
fn all_background_mask_has_zero_regions() {
    let mask = GrayImage::new(16, 16);
    let seg = segment(&mask, &SegmentConfig::default()).unwrap();
    assert_eq!(seg.region_count, 0);
    assert!(seg.result.pixels().all(|p| p.0[0] == BACKGROUND));
}

#[test]
fn otsu_threshold_feeds_segmentation() {
    // Cells at 200 on a 40 background: Otsu lands between the two.
    let gray = GrayImage::from_fn(32, 24, |x, y| {
        let cell = disks(32, 24, &[(10, 12), (22, 12)], 8).get_pixel(x, y).0[0];
        Luma([if is_foreground(cell) { 200 } else { 40 }])
    });
    let level = Threshold::Otsu.level(&gray);
    let mask = cellsplit_pipeline::threshold::binarize(&gray, level);
    assert_eq!(mask, disks(32, 24, &[(10, 12), (22, 12)], 8));

    let seg = segment(&mask, &SegmentConfig::default()).unwrap();
    assert_eq!(seg.region_count, 2);
}
