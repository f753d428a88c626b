use std::{iter::FusedIterator, num::NonZeroU32};

use itertools::Itertools as _;

use crate::geometry::{ScreenBlock, ScreenPoint, ScreenSize};

pub trait ScreenBlockExt {
    fn from_size(size: ScreenSize) -> Self;
    fn is_empty_or_negative(&self) -> bool;
    fn area(&self) -> u32;
    fn internal_points(&self) -> InternalPoints;
    fn tile_ordering(&self, tile_size: NonZeroU32) -> Vec<ScreenBlock>;
}

impl ScreenBlockExt for ScreenBlock {
    fn from_size(size: ScreenSize) -> Self {
        ScreenBlock::with_size(ScreenPoint::origin(), &size)
    }

    fn is_empty_or_negative(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    fn area(&self) -> u32 {
        if self.is_empty_or_negative() {
            0
        } else {
            self.width() * self.height()
        }
    }

    /// Create an iterator over coordinates (x, y) pairs inside the block,
    /// in C order (x changes first, then y)
    fn internal_points(&self) -> InternalPoints {
        if self.is_empty_or_negative() {
            InternalPoints::empty()
        } else {
            InternalPoints {
                min_x: self.min.x,
                max: self.max,

                cursor: self.min,
            }
        }
    }

    /// Split the block into tiles of `tile_size * tile_size` pixels, ordered
    /// by distance from the middle of the block, so that the interesting part of
    /// the image is finished first.
    /// Tiles on the bottom and right edge get clipped if the tile size doesn't
    /// divide the block size.
    fn tile_ordering(&self, tile_size: NonZeroU32) -> Vec<ScreenBlock> {
        if self.is_empty_or_negative() {
            return Vec::new();
        }

        let tile_size = tile_size.get();
        let tiles_x = self.width().div_ceil(tile_size);
        let tiles_y = self.height().div_ceil(tile_size);
        let center = self.center().map(|x| x as i64);

        (0..tiles_y)
            .cartesian_product(0..tiles_x)
            .map(|(ty, tx)| {
                let min = ScreenPoint::new(
                    self.min.x + tx * tile_size,
                    self.min.y + ty * tile_size,
                );
                let max = ScreenPoint::new(
                    (min.x + tile_size).min(self.max.x),
                    (min.y + tile_size).min(self.max.y),
                );
                ScreenBlock::new(min, max)
            })
            .sorted_by_key(|tile| chebyshev_distance(&tile_center(tile), &center))
            .collect()
    }
}

fn tile_center(tile: &ScreenBlock) -> nalgebra::Point2<i64> {
    tile.center().map(|x| x as i64)
}

fn chebyshev_distance(a: &nalgebra::Point2<i64>, b: &nalgebra::Point2<i64>) -> i64 {
    let d = a - b;
    d.x.abs().max(d.y.abs())
}

#[derive(Copy, Clone, Debug)]
pub struct InternalPoints {
    min_x: u32,
    max: ScreenPoint,

    cursor: ScreenPoint,
}

impl InternalPoints {
    // Construct an iterator over internal points that returns no points
    fn empty() -> Self {
        InternalPoints {
            min_x: 1,
            max: ScreenPoint::origin(),

            cursor: ScreenPoint::origin(),
        }
    }
}

impl Iterator for InternalPoints {
    type Item = ScreenPoint;

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.y >= self.max.y {
            return None;
        }

        let ret = self.cursor;

        debug_assert!(self.cursor.x < self.max.x);
        self.cursor.x += 1;
        if self.cursor.x >= self.max.x {
            self.cursor.x = self.min_x;
            self.cursor.y += 1;
        }

        Some(ret)
    }
}

impl ExactSizeIterator for InternalPoints {
    fn len(&self) -> usize {
        if self.cursor.y >= self.max.y {
            0
        } else {
            let whole_rows = ScreenBlock::new(
                ScreenPoint::new(self.min_x, self.cursor.y + 1),
                self.max,
            );
            let current_row =
                ScreenBlock::new(self.cursor, ScreenPoint::new(self.max.x, self.cursor.y + 1));
            (whole_rows.area() + current_row.area()) as usize
        }
    }
}

impl FusedIterator for InternalPoints {}

#[cfg(test)]
mod test {
    use super::*;
    use assert2::assert;
    use proptest::prelude::*;
    use test_strategy::proptest;

    #[derive(Clone, Debug)]
    struct ScreenBlockWrapper(ScreenBlock);

    impl std::ops::Deref for ScreenBlockWrapper {
        type Target = ScreenBlock;
        fn deref(&self) -> &ScreenBlock {
            &self.0
        }
    }

    impl Arbitrary for ScreenBlockWrapper {
        type Parameters = ();
        type Strategy = proptest::strategy::BoxedStrategy<Self>;
        fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
            const RANGE: std::ops::Range<u32> = 0..100u32;
            (RANGE, RANGE, RANGE, RANGE)
                .prop_map(|coords| {
                    ScreenBlockWrapper(ScreenBlock::new(
                        ScreenPoint::new(coords.0, coords.1),
                        ScreenPoint::new(coords.2, coords.3),
                    ))
                })
                .boxed()
        }
    }

    fn contains(block: &ScreenBlock, p: &ScreenPoint) -> bool {
        p.x >= block.min.x && p.x < block.max.x && p.y >= block.min.y && p.y < block.max.y
    }

    /// Goes through the whole iterator and checks that at every step iterator's size hint is equal
    /// to its reported length and equal to the expected number of elements.
    fn check_exact_length<T: Iterator + ExactSizeIterator>(
        mut iterator: T,
        expected_length: usize,
    ) {
        let mut remaining = expected_length;
        loop {
            assert!(iterator.len() == remaining);
            assert!(iterator.size_hint() == (remaining, Some(remaining)));
            if iterator.next().is_none() {
                break;
            }
            remaining -= 1;
        }
        assert!(remaining == 0);
    }

    /// Check that all pixels in the block are covered exactly once by a pixel iterator
    fn check_pixel_iterator_covers_block<T: Iterator<Item = ScreenPoint>>(
        pixel_iterator: T,
        block: &ScreenBlock,
    ) {
        let mut vec = vec![false; block.area() as usize];
        for p in pixel_iterator {
            assert!(contains(block, &p));
            let index = (p.x - block.min.x) + (p.y - block.min.y) * block.width();
            assert!(!vec[index as usize]);
            vec[index as usize] = true;
        }
        assert!(vec.into_iter().all(|v| v));
    }

    /// Tests that pixel iterator covers all pixels in a block
    #[proptest]
    fn pixel_iterator_covers_all(block: ScreenBlockWrapper) {
        check_pixel_iterator_covers_block(block.internal_points(), &block);
    }

    /// Tests that pixel iterator is a well behaved exact length iterator
    #[proptest]
    fn pixel_iterator_exact_length(block: ScreenBlockWrapper) {
        check_exact_length(block.internal_points(), block.area() as usize);
    }

    /// Tests that tiles cover every pixel of the block exactly once
    #[proptest]
    fn tiles_cover_all(block: ScreenBlockWrapper, tile_size_minus_one: u8) {
        let tile_size = NonZeroU32::new(tile_size_minus_one as u32 + 1).unwrap();
        check_pixel_iterator_covers_block(
            block
                .tile_ordering(tile_size)
                .into_iter()
                .flat_map(|tile| tile.internal_points()),
            &block,
        );
    }

    #[proptest]
    fn tiles_go_from_center_out(block: ScreenBlockWrapper, tile_size_minus_one: u8) {
        let tile_size = NonZeroU32::new(tile_size_minus_one as u32 + 1).unwrap();
        let center = block.center().map(|x| x as i64);

        let distances = block
            .tile_ordering(tile_size)
            .iter()
            .map(|tile| chebyshev_distance(&tile_center(tile), &center))
            .collect::<Vec<_>>();
        assert!(distances.is_sorted());
    }

    #[test]
    fn edge_tiles_are_clipped() {
        let block = ScreenBlock::from_size(ScreenSize::new(10, 5));
        let tiles = block.tile_ordering(NonZeroU32::new(4).unwrap());

        assert!(tiles.len() == 6);
        assert!(tiles.iter().all(|tile| tile.max.x <= 10 && tile.max.y <= 5));
        assert!(tiles.iter().any(|tile| tile.width() == 2 && tile.height() == 1));
    }
}
