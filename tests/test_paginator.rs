//! Pagination properties.

use proptest::prelude::*;
use rfpress::layout::{Paginator, RenderedBlock};
use rfpress::Diagnostic;

fn blocks(heights: &[f32]) -> Vec<RenderedBlock> {
    heights
        .iter()
        .enumerate()
        .map(|(i, &h)| RenderedBlock::new(i, i..i + 1, h))
        .collect()
}

fn layout(pages: &[rfpress::layout::PageGroup]) -> Vec<Vec<usize>> {
    pages
        .iter()
        .map(|page| page.blocks.iter().map(|b| b.index).collect())
        .collect()
}

#[test]
fn test_three_blocks_two_pages() {
    let result = Paginator::new(1000.0).paginate(blocks(&[400.0, 400.0, 400.0]));
    assert_eq!(layout(&result.pages), vec![vec![0, 1], vec![2]]);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_oversized_block_alone() {
    let result = Paginator::new(1000.0).paginate(blocks(&[1500.0]));
    assert_eq!(layout(&result.pages), vec![vec![0]]);
    assert_eq!(result.pages[0].height_px(), 1500.0);
}

#[test]
fn test_oversized_block_between_others() {
    let result = Paginator::new(1000.0).paginate(blocks(&[300.0, 1200.0, 300.0]));
    assert_eq!(layout(&result.pages), vec![vec![0], vec![1], vec![2]]);
}

#[test]
fn test_exact_fit_stays_on_page() {
    let result = Paginator::new(1000.0).paginate(blocks(&[600.0, 400.0, 1.0]));
    assert_eq!(layout(&result.pages), vec![vec![0, 1], vec![2]]);
}

#[test]
fn test_zero_and_invalid_heights_skipped() {
    let result = Paginator::new(1000.0).paginate(blocks(&[100.0, 0.0, f32::NAN, -5.0, 100.0]));
    assert_eq!(layout(&result.pages), vec![vec![0, 4]]);
    let skipped: Vec<usize> = result
        .diagnostics
        .iter()
        .map(|d| match d {
            Diagnostic::MeasurementFailure { block, .. } => *block,
            other => panic!("unexpected diagnostic {:?}", other),
        })
        .collect();
    assert_eq!(skipped, vec![1, 2, 3]);
}

#[test]
fn test_no_blocks_no_pages() {
    let result = Paginator::new(1000.0).paginate(Vec::new());
    assert!(result.pages.is_empty());
}

proptest! {
    #[test]
    fn prop_pages_respect_budget(
        heights in prop::collection::vec(0.0f32..2500.0, 0..40),
        max in 100.0f32..2000.0,
    ) {
        let result = Paginator::new(max).paginate(blocks(&heights));
        for page in &result.pages {
            prop_assert!(!page.is_empty());
            if page.blocks.len() > 1 {
                prop_assert!(page.height_px() <= max);
            }
        }
    }

    #[test]
    fn prop_concatenation_preserves_order(
        heights in prop::collection::vec(0.0f32..2500.0, 0..40),
        max in 100.0f32..2000.0,
    ) {
        let result = Paginator::new(max).paginate(blocks(&heights));
        let flattened: Vec<usize> = layout(&result.pages).into_iter().flatten().collect();
        let expected: Vec<usize> = heights
            .iter()
            .enumerate()
            .filter(|(_, &h)| h > 0.0)
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(flattened, expected);
        prop_assert_eq!(
            result.diagnostics.len(),
            heights.iter().filter(|&&h| h <= 0.0).count()
        );
    }

    #[test]
    fn prop_greedy_pages_are_full(
        heights in prop::collection::vec(1.0f32..1500.0, 1..40),
        max in 100.0f32..2000.0,
    ) {
        // Each page after the first could not have taken the next page's
        // first block.
        let result = Paginator::new(max).paginate(blocks(&heights));
        for pair in result.pages.windows(2) {
            let next_first = pair[1].blocks[0].height_px;
            prop_assert!(pair[0].height_px() + next_first > max);
        }
    }
}
