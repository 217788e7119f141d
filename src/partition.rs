//! Square block partitioning over the fixed-width address grid
//!
//! A bit array of length `L` is viewed as a grid of rows `W` bits wide
//! (`row = index / W`, `column = index % W`). For a block count `N = k²`
//! the grid is cut into `k × k` square blocks of side
//! `chunk = isqrt(L / N)`.
//!
//! When `N × chunk²` does not cover the array, the leftover `excess` bits are
//! never assigned to any block. The whole block grid is instead shifted
//! diagonally by `x_offset = ceil((excess / divisor) / 2)` columns and
//! `x_offset` rows so that the blocks sit away from the array edges. The
//! divisor (511 by default) was tuned for `L = 65536, W = 256`; other
//! geometries are accepted but the offset is not guaranteed to centre the
//! grid there.
//!
//! ```text
//!   x_offset
//!   ├──┤
//!   ┌──────────────────────────┐
//!   │  ┌─────┬─────┬─────┐     │  each block: chunk rows of chunk bits,
//!   │  │ 0,0 │ 0,1 │ 0,2 │     │  sub-row m starts at block_start + m·W
//!   │  ├─────┼─────┼─────┤     │
//!   │  │ 1,0 │ 1,1 │ 1,2 │     │  blocks are emitted row-major
//!   │  ├─────┼─────┼─────┤     │  (block row outer, block column inner)
//!   │  │ 2,0 │ 2,1 │ 2,2 │     │
//!   │  └─────┴─────┴─────┘     │
//!   └──────────────────────────┘
//! ```

use crate::bitstream::BitArray;
use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Address grid geometry shared by every block-count configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// Expected bit-array length L
    pub bit_len: usize,
    /// Grid row width W in bits
    pub row_width: usize,
    /// Empirical centering divisor applied to the excess bit count
    pub centering_divisor: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            bit_len: 65536,
            row_width: 256,
            centering_divisor: 511,
        }
    }
}

impl Geometry {
    pub fn validate(&self) -> Result<()> {
        if self.bit_len == 0 {
            return Err(AnalysisError::InvalidConfig(
                "bit_len must be positive".to_string(),
            ));
        }
        if self.row_width == 0 {
            return Err(AnalysisError::InvalidConfig(
                "row_width must be positive".to_string(),
            ));
        }
        if self.row_width > self.bit_len {
            return Err(AnalysisError::InvalidConfig(format!(
                "row_width {} exceeds bit_len {}",
                self.row_width, self.bit_len
            )));
        }
        if self.centering_divisor == 0 {
            return Err(AnalysisError::InvalidConfig(
                "centering_divisor must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Layout of `blocks` blocks over an array of the configured length
    pub fn layout(&self, blocks: usize) -> Result<BlockLayout> {
        BlockLayout::compute(self.bit_len, self, blocks)
    }
}

/// Integer square root (floor)
pub fn isqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}

/// Side length `k` when `blocks == k²`
pub fn perfect_square_root(blocks: usize) -> Option<usize> {
    let k = isqrt(blocks);
    (blocks > 0 && k * k == blocks).then_some(k)
}

/// Computed placement of `k × k` square blocks over one bit array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockLayout {
    /// Bit-array length the layout was computed for
    pub len: usize,
    pub row_width: usize,
    /// Block count N
    pub blocks: usize,
    /// Blocks per side
    pub k: usize,
    /// Block side length in bits
    pub chunk_size: usize,
    /// Bits covered by no block
    pub excess: usize,
    /// Stride between block rows (`row_width × chunk_size`)
    pub row_size: usize,
    pub x_offset: usize,
    /// Row shift expressed in bits (`x_offset × row_width`)
    pub y_offset: usize,
}

impl BlockLayout {
    /// Compute the layout for `blocks` blocks over `len` bits
    ///
    /// # Errors
    /// `Partition` when `blocks` is not a perfect square, when the blocks
    /// would be empty (`len / blocks == 0`), or when the shifted grid would
    /// reach past the end of the array.
    pub fn compute(len: usize, geometry: &Geometry, blocks: usize) -> Result<Self> {
        geometry.validate()?;

        let k = perfect_square_root(blocks).ok_or_else(|| {
            AnalysisError::partition(blocks, len, format!("{} is not a perfect square", blocks))
        })?;

        let chunk_size = isqrt(len / blocks);
        if chunk_size == 0 {
            return Err(AnalysisError::partition(
                blocks,
                len,
                "block side resolves to zero bits",
            ));
        }

        let overflow = || {
            AnalysisError::partition(blocks, len, "block grid overflows the address range")
        };
        let row_width = geometry.row_width;
        let excess = len - blocks * chunk_size * chunk_size;
        let row_size = row_width.checked_mul(chunk_size).ok_or_else(overflow)?;
        let x_offset = (excess / geometry.centering_divisor).div_ceil(2);
        let y_offset = x_offset.checked_mul(row_width).ok_or_else(overflow)?;

        let layout = Self {
            len,
            row_width,
            blocks,
            k,
            chunk_size,
            excess,
            row_size,
            x_offset,
            y_offset,
        };

        let end = layout.checked_end_index().ok_or_else(overflow)?;
        if end > len {
            return Err(AnalysisError::partition(
                blocks,
                len,
                format!(
                    "block grid ends at bit {} past the array (row width {}, offset {})",
                    end, row_width, x_offset
                ),
            ));
        }

        if layout.wraps_rows() {
            tracing::warn!(
                blocks,
                grid_width = k * chunk_size + x_offset,
                row_width,
                "block grid is wider than one address row; blocks wrap across rows"
            );
        }

        Ok(layout)
    }

    /// First bit index of block (`row`, `col`)
    pub fn block_start(&self, row: usize, col: usize) -> usize {
        row * self.row_size + col * self.chunk_size + self.x_offset + self.y_offset
    }

    /// One past the highest bit index read by any block
    pub fn end_index(&self) -> usize {
        let last = self.k - 1;
        self.block_start(last, last) + (self.chunk_size - 1) * self.row_width + self.chunk_size
    }

    fn checked_end_index(&self) -> Option<usize> {
        let last = self.k - 1;
        last.checked_mul(self.row_size)?
            .checked_add(last.checked_mul(self.chunk_size)?)?
            .checked_add(self.x_offset)?
            .checked_add(self.y_offset)?
            .checked_add((self.chunk_size - 1).checked_mul(self.row_width)?)?
            .checked_add(self.chunk_size)
    }

    /// Bits per block (`chunk_size²`)
    pub fn block_area(&self) -> usize {
        self.chunk_size * self.chunk_size
    }

    /// True when one row of blocks spans more than one address row
    pub fn wraps_rows(&self) -> bool {
        self.k * self.chunk_size + self.x_offset > self.row_width
    }

    /// Member bits of every block, row-major over the block grid
    ///
    /// `bits` must have the length the layout was computed for.
    pub fn blocks<'a>(&'a self, bits: &'a BitArray) -> impl Iterator<Item = Block> + 'a {
        debug_assert_eq!(bits.len(), self.len);
        let raw = bits.as_slice();
        (0..self.k).flat_map(move |row| {
            (0..self.k).map(move |col| {
                let start = self.block_start(row, col);
                let mut members = Vec::with_capacity(self.block_area());
                for m in 0..self.chunk_size {
                    let vertical = start + m * self.row_width;
                    members.extend_from_slice(&raw[vertical..vertical + self.chunk_size]);
                }
                Block {
                    row,
                    col,
                    start,
                    bits: members,
                }
            })
        })
    }
}

/// One square block and its member bits in row-major order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub row: usize,
    pub col: usize,
    /// Bit index of the block's top-left corner
    pub start: usize,
    pub bits: Vec<u8>,
}

impl Block {
    pub fn ones(&self) -> usize {
        self.bits.iter().map(|&b| b as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(values: &[u8]) -> BitArray {
        values.iter().map(|&b| b == 1).collect()
    }

    fn small_geometry() -> Geometry {
        Geometry {
            bit_len: 16,
            row_width: 4,
            centering_divisor: 511,
        }
    }

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(809), 28);
        assert_eq!(isqrt(1 << 40), 1 << 20);
        assert_eq!(isqrt((1 << 40) - 1), (1 << 20) - 1);
    }

    #[test]
    fn test_perfect_square_root() {
        assert_eq!(perfect_square_root(81), Some(9));
        assert_eq!(perfect_square_root(1), Some(1));
        assert_eq!(perfect_square_root(0), None);
        assert_eq!(perfect_square_root(10), None);
    }

    #[test]
    fn test_small_grid_layout() {
        let layout = small_geometry().layout(4).unwrap();
        assert_eq!(layout.k, 2);
        assert_eq!(layout.chunk_size, 2);
        assert_eq!(layout.excess, 0);
        assert_eq!(layout.row_size, 8);
        assert_eq!(layout.x_offset, 0);
        assert_eq!(layout.y_offset, 0);
    }

    #[test]
    fn test_small_grid_quadrants() {
        #[rustfmt::skip]
        let bits = grid(&[
            1, 1, 0, 0,
            1, 0, 0, 0,
            0, 1, 1, 1,
            0, 0, 1, 1,
        ]);
        let layout = small_geometry().layout(4).unwrap();
        let blocks: Vec<Block> = layout.blocks(&bits).collect();

        assert_eq!(blocks.len(), 4);
        assert_eq!((blocks[0].row, blocks[0].col), (0, 0));
        assert_eq!((blocks[1].row, blocks[1].col), (0, 1));
        assert_eq!((blocks[2].row, blocks[2].col), (1, 0));
        assert_eq!(blocks[0].bits, vec![1, 1, 1, 0]);
        assert_eq!(blocks[1].bits, vec![0, 0, 0, 0]);
        assert_eq!(blocks[2].bits, vec![0, 1, 0, 0]);
        assert_eq!(blocks[3].bits, vec![1, 1, 1, 1]);
        assert_eq!(blocks[3].start, 10);
    }

    #[test]
    fn test_default_geometry_81_blocks() {
        let layout = Geometry::default().layout(81).unwrap();
        assert_eq!(layout.chunk_size, 28);
        assert_eq!(layout.excess, 2032);
        assert_eq!(layout.row_size, 7168);
        assert_eq!(layout.x_offset, 2);
        assert_eq!(layout.y_offset, 512);
        assert_eq!(layout.block_start(0, 0), 514);
        assert_eq!(layout.block_start(1, 2), 7168 + 56 + 514);
    }

    #[test]
    fn test_default_geometry_offsets() {
        let geometry = Geometry::default();
        let expected = [
            (2, 128, 0, 0),
            (3, 85, 511, 1),
            (10, 25, 3036, 3),
            (13, 19, 4527, 4),
            (20, 12, 7936, 8),
        ];
        for (k, chunk, excess, x_offset) in expected {
            let layout = geometry.layout(k * k).unwrap();
            assert_eq!(layout.chunk_size, chunk, "k={}", k);
            assert_eq!(layout.excess, excess, "k={}", k);
            assert_eq!(layout.x_offset, x_offset, "k={}", k);
        }
    }

    #[test]
    fn test_default_sweep_fits_array_and_rows() {
        let geometry = Geometry::default();
        for k in 1..=20 {
            let layout = geometry.layout(k * k).unwrap();
            assert!(layout.end_index() <= layout.len, "k={}", k);
            assert!(!layout.wraps_rows(), "k={}", k);
            assert!(layout.blocks * layout.block_area() <= layout.len);
        }
    }

    #[test]
    fn test_single_block_covers_array() {
        let layout = small_geometry().layout(1).unwrap();
        assert_eq!(layout.chunk_size, 4);
        assert_eq!(layout.excess, 0);
        let bits = grid(&[1, 0, 0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 0, 0, 0, 1]);
        let blocks: Vec<Block> = layout.blocks(&bits).collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].ones(), 4);
    }

    #[test]
    fn test_rejects_non_square_count() {
        let err = Geometry::default().layout(10).unwrap_err();
        assert!(matches!(err, AnalysisError::Partition { blocks: 10, .. }));
        assert!(Geometry::default().layout(0).is_err());
    }

    #[test]
    fn test_rejects_zero_chunk() {
        let err = small_geometry().layout(25).unwrap_err();
        match err {
            AnalysisError::Partition { blocks, len, .. } => {
                assert_eq!(blocks, 25);
                assert_eq!(len, 16);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejects_grid_past_array_end() {
        // 16 bits in rows of 8: two block rows of two sub-rows need four
        // address rows, the array only has two.
        let geometry = Geometry {
            bit_len: 16,
            row_width: 8,
            centering_divisor: 511,
        };
        let err = geometry.layout(4).unwrap_err();
        assert!(err.to_string().contains("past the array"));
    }

    #[test]
    fn test_rejects_row_wider_than_array() {
        let geometry = Geometry {
            bit_len: 65536,
            row_width: usize::MAX / 64,
            centering_divisor: 511,
        };
        assert!(matches!(
            geometry.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));
        assert!(geometry.layout(4).is_err());
    }

    #[test]
    fn test_oversized_row_width_overflow_is_an_error() {
        // Geometry validated against a small array, applied to a large one
        let geometry = Geometry {
            bit_len: usize::MAX / 2,
            row_width: usize::MAX / 64,
            centering_divisor: 511,
        };
        let err = BlockLayout::compute(usize::MAX / 2, &geometry, 4).unwrap_err();
        assert!(matches!(err, AnalysisError::Partition { blocks: 4, .. }));
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_wrapping_layout_is_allowed() {
        // Blocks two columns wide on a three-column grid wrap, but stay in bounds
        let geometry = Geometry {
            bit_len: 18,
            row_width: 3,
            centering_divisor: 511,
        };
        let layout = geometry.layout(4).unwrap();
        assert!(layout.wraps_rows());
        assert!(layout.end_index() <= 18);
    }

    #[test]
    fn test_small_divisor_shifts_grid() {
        let geometry = Geometry {
            bit_len: 40,
            row_width: 5,
            centering_divisor: 2,
        };
        let layout = geometry.layout(4).unwrap();
        // chunk 3, excess 4, x_offset ceil((4 / 2) / 2) = 1
        assert_eq!(layout.chunk_size, 3);
        assert_eq!(layout.excess, 4);
        assert_eq!(layout.x_offset, 1);
        assert_eq!(layout.block_start(0, 0), 6);
        assert!(layout.end_index() <= 40);
    }

    #[test]
    fn test_validate_geometry() {
        assert!(Geometry::default().validate().is_ok());
        let bad = Geometry {
            centering_divisor: 0,
            ..Geometry::default()
        };
        assert!(bad.layout(4).is_err());
    }
}
