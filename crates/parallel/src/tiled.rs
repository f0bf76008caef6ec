//! Tiled processing for large region grids

use forestmgmt_core::{Error, Result};
use ndarray::{s, Array2};
use rayon::prelude::*;

/// A rectangular block of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset in the full grid
    pub row_offset: usize,
    /// Column offset in the full grid
    pub col_offset: usize,
    /// Number of rows in this tile
    pub rows: usize,
    /// Number of columns in this tile
    pub cols: usize,
}

impl Tile {
    pub fn new(row_offset: usize, col_offset: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_offset,
            col_offset,
            rows,
            cols,
        }
    }

    /// Convert tile-local coordinates to grid coordinates
    pub fn to_source_coords(&self, local_row: usize, local_col: usize) -> (usize, usize) {
        (self.row_offset + local_row, self.col_offset + local_col)
    }

    /// Grid row/col ranges covered by this tile (end exclusive)
    pub fn row_range(&self) -> std::ops::Range<usize> {
        self.row_offset..self.row_offset + self.rows
    }

    pub fn col_range(&self) -> std::ops::Range<usize> {
        self.col_offset..self.col_offset + self.cols
    }
}

/// Iterator over non-overlapping tiles covering a grid, row-major
pub struct TileIterator {
    total_rows: usize,
    total_cols: usize,
    tile_size: usize,
    current_row: usize,
    current_col: usize,
}

impl TileIterator {
    pub fn new(total_rows: usize, total_cols: usize, tile_size: usize) -> Self {
        Self {
            total_rows,
            total_cols,
            tile_size: tile_size.max(1),
            current_row: 0,
            current_col: 0,
        }
    }
}

impl Iterator for TileIterator {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.total_rows || self.total_cols == 0 {
            return None;
        }

        let row_end = (self.current_row + self.tile_size).min(self.total_rows);
        let col_end = (self.current_col + self.tile_size).min(self.total_cols);
        let tile = Tile::new(
            self.current_row,
            self.current_col,
            row_end - self.current_row,
            col_end - self.current_col,
        );

        self.current_col = col_end;
        if self.current_col >= self.total_cols {
            self.current_col = 0;
            self.current_row = row_end;
        }

        Some(tile)
    }
}

/// Builds a full grid from independently computed tiles
#[derive(Debug, Clone, Copy)]
pub struct TiledProcessor {
    tile_size: usize,
}

impl TiledProcessor {
    pub fn new(tile_size: usize) -> Self {
        Self {
            tile_size: tile_size.max(1),
        }
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Compute every tile of a `rows x cols` grid in parallel and stitch
    /// the blocks together.
    ///
    /// `f` must return a block with exactly the tile's dimensions.
    pub fn assemble<T, F>(&self, rows: usize, cols: usize, fill: T, f: F) -> Result<Array2<T>>
    where
        T: Clone + Send + Sync,
        F: Fn(&Tile) -> Array2<T> + Sync + Send,
    {
        let tiles: Vec<Tile> = TileIterator::new(rows, cols, self.tile_size).collect();

        let blocks: Vec<(Tile, Array2<T>)> = tiles
            .into_par_iter()
            .map(|tile| {
                let block = f(&tile);
                (tile, block)
            })
            .collect();

        let mut output = Array2::from_elem((rows, cols), fill);
        for (tile, block) in blocks {
            let (ar, ac) = block.dim();
            if (ar, ac) != (tile.rows, tile.cols) {
                return Err(Error::SizeMismatch {
                    er: tile.rows,
                    ec: tile.cols,
                    ar,
                    ac,
                });
            }
            output
                .slice_mut(s![tile.row_range(), tile.col_range()])
                .assign(&block);
        }

        Ok(output)
    }
}

impl Default for TiledProcessor {
    /// 512x512 cell tiles
    fn default() -> Self {
        Self::new(512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_iterator_edges() {
        let tiles: Vec<_> = TileIterator::new(100, 70, 32).collect();
        assert_eq!(tiles.len(), 4 * 3);
        assert_eq!(tiles[0], Tile::new(0, 0, 32, 32));
        assert_eq!(tiles[2], Tile::new(0, 64, 32, 6));
        assert_eq!(tiles[11], Tile::new(96, 64, 4, 6));
    }

    #[test]
    fn test_tile_coverage_is_exact() {
        let (rows, cols) = (100, 90);
        let mut hits = vec![vec![0u8; cols]; rows];

        for tile in TileIterator::new(rows, cols, 32) {
            for r in tile.row_range() {
                for c in tile.col_range() {
                    hits[r][c] += 1;
                }
            }
        }

        assert!(hits.iter().flatten().all(|&h| h == 1));
    }

    #[test]
    fn test_empty_grid_has_no_tiles() {
        assert_eq!(TileIterator::new(0, 10, 8).count(), 0);
        assert_eq!(TileIterator::new(10, 0, 8).count(), 0);
    }

    #[test]
    fn test_assemble_matches_direct_computation() {
        let processor = TiledProcessor::new(7);
        let grid = processor
            .assemble(20, 15, 0usize, |tile| {
                Array2::from_shape_fn((tile.rows, tile.cols), |(r, c)| {
                    let (gr, gc) = tile.to_source_coords(r, c);
                    gr * 100 + gc
                })
            })
            .unwrap();

        assert_eq!(grid[(0, 0)], 0);
        assert_eq!(grid[(19, 14)], 1914);
        assert_eq!(grid[(8, 13)], 813);
    }

    #[test]
    fn test_assemble_rejects_wrong_block_size() {
        let processor = TiledProcessor::new(4);
        let result = processor.assemble(8, 8, false, |_| Array2::from_elem((1, 1), true));
        assert!(matches!(result, Err(Error::SizeMismatch { .. })));
    }
}
