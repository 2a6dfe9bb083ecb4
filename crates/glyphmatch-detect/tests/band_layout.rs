//! Integration test: band layout on a synthetic page, from binary grid
//! through dilation, region detection and band construction.

use glyphmatch_core::{PixelGrid, Point, Rect};
use glyphmatch_detect::{Band, BandBuilder};
use glyphmatch_preprocess::{compute_kernel_size, dilate, DEFAULT_KERNEL_RATIO};
use proptest::prelude::*;

/// Paint filled blocks onto a blank page.
fn page(width: usize, height: usize, blocks: &[(usize, usize, usize, usize)]) -> PixelGrid {
    let mut g = PixelGrid::new(width, height);
    for &(x, y, w, h) in blocks {
        for yy in y..y + h {
            for xx in x..x + w {
                g.set(xx, yy, true);
            }
        }
    }
    g
}

fn layout(bands: &[Band]) -> Vec<Vec<(Rect, bool)>> {
    bands
        .iter()
        .map(|b| {
            b.artifacts()
                .iter()
                .map(|a| (a.bounds(), a.is_space()))
                .collect()
        })
        .collect()
}

#[test]
fn two_lines_of_words() {
    // Line 1: "ab cd", line 2: "ef". Glyphs 8x12, letter gap 3, word gap 14.
    // The word gap is above the space threshold but within the band merge
    // distance of 1.2 x 12.
    let mut blocks = Vec::new();
    for x in [10, 21, 43, 54] {
        blocks.push((x, 10, 8, 12));
    }
    for x in [10, 21] {
        blocks.push((x, 50, 8, 12));
    }
    let binary = page(400, 80, &blocks);
    let kernel = compute_kernel_size(binary.cols(), binary.rows(), DEFAULT_KERNEL_RATIO);
    let dilated = dilate(&binary, kernel);

    let bands = BandBuilder::default().build_page(&binary, &dilated);
    assert_eq!(bands.len(), 2);
    let spaces: Vec<usize> = bands
        .iter()
        .map(|b| b.artifacts().iter().filter(|a| a.is_space()).count())
        .collect();
    assert_eq!(spaces, vec![1, 0]);
    assert_eq!(bands[0].artifacts()[2].location_found, Point::new(31, 10));
}

#[test]
fn distant_words_on_a_row_are_separate_bands() {
    // Word gap 20 is past the 1.2 x 12 merge distance.
    let blocks = [(10, 10, 8, 12), (21, 10, 8, 12), (49, 10, 8, 12)];
    let binary = page(400, 40, &blocks);
    let dilated = dilate(&binary, compute_kernel_size(400, 40, DEFAULT_KERNEL_RATIO));
    let bands = BandBuilder::default().build_page(&binary, &dilated);
    assert_eq!(bands.len(), 2);
    assert_eq!(bands[0].bounds().x, 10);
    assert_eq!(bands[1].bounds().x, 49);
}

#[test]
fn dotted_glyph_is_one_artifact() {
    // An "i": 2x2 dot, 2-row gap, 2x8 stem.
    let binary = page(200, 40, &[(20, 10, 2, 2), (20, 14, 2, 8)]);
    let dilated = dilate(&binary, compute_kernel_size(200, 40, DEFAULT_KERNEL_RATIO));
    let bands = BandBuilder::default().build_page(&binary, &dilated);
    assert_eq!(bands.len(), 1);
    assert_eq!(bands[0].len(), 1);
    assert_eq!(bands[0].artifacts()[0].bounds(), Rect::new(20, 10, 2, 12));
}

#[test]
fn empty_page_has_no_bands() {
    let binary = PixelGrid::new(50, 50);
    let bands = BandBuilder::default().build_page(&binary, &binary);
    assert!(bands.is_empty());
}

fn block(x: usize, y: usize, w: usize, h: usize) -> PixelGrid {
    let mut g = PixelGrid::from_cells(w, vec![true; w * h]);
    g.location_found = Point::new(x, y);
    g.location_adjusted = g.location_found;
    g
}

proptest! {
    #[test]
    fn prop_layout_ignores_input_order(
        rects in proptest::collection::vec((0usize..120, 0usize..60, 1usize..12, 4usize..14), 1..8)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
    ) {
        let (original, shuffled) = rects;
        let build = |items: &[(usize, usize, usize, usize)]| {
            let regions: Vec<Rect> = items
                .iter()
                .map(|&(x, y, w, h)| Rect::new(x, y, w, h))
                .collect();
            let artifacts = items.iter().map(|&(x, y, w, h)| block(x, y, w, h)).collect();
            layout(&BandBuilder::default().build(&regions, artifacts))
        };
        prop_assert_eq!(build(&original), build(&shuffled));
    }
}
