//! Tile numbering, flips, output naming and tile selection.
//!
//! Tiles are numbered row by row starting at the north-west corner of the
//! map. A map `grid_width` pixels wide is `grid_width / 2` pixels tall, so it
//! holds `columns × rows` tiles of `tile_size` pixels.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub grid_width: usize,
    pub tile_size: usize,
}

/// Where one tile is sampled from and where it is written to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileAddress {
    /// Linear index in rendering order.
    pub index: usize,
    pub column: usize,
    pub row: usize,
    /// Linear index after flips; names the output file.
    pub position: usize,
    /// File path relative to a layer folder.
    pub path: PathBuf,
}

impl TileGrid {
    pub fn new(grid_width: usize, tile_size: usize) -> Self {
        Self {
            grid_width,
            tile_size,
        }
    }

    pub fn columns(&self) -> usize {
        (self.grid_width / self.tile_size).max(1)
    }

    pub fn rows(&self) -> usize {
        (self.grid_width / 2 / self.tile_size).max(1)
    }

    pub fn tile_count(&self) -> usize {
        self.columns() * self.rows()
    }

    /// Pixel height of a tile; a single tile row never exceeds the map height.
    pub fn tile_height(&self) -> usize {
        self.tile_size.min(self.grid_width / 2)
    }

    /// `(column, row)` of a linear index.
    pub fn position(&self, index: usize) -> (usize, usize) {
        let columns = self.columns();
        (index % columns, index / columns)
    }

    /// Absolute pixel origin `(x, y)` of a tile. Pixel rows grow northwards, so
    /// row 0 of the tile grid has the largest `y`.
    pub fn origin(&self, index: usize) -> (usize, usize) {
        let (column, row) = self.position(index);
        let top = (self.grid_width / 2).saturating_sub(self.tile_size);
        (column * self.tile_size, top.saturating_sub(row * self.tile_size))
    }

    /// Relabel a tile index for mirrored output. A vertical flip keeps the
    /// column and mirrors the row, a horizontal flip keeps the row and mirrors
    /// the column. Each flip is its own inverse.
    pub fn apply_flip(&self, index: usize, flip_h: bool, flip_v: bool) -> usize {
        let columns = self.columns();
        let rows = self.rows();
        let mut n = index;

        if flip_v {
            n = (rows - 1 - n / columns) * columns + n % columns;
        }

        if flip_h {
            n = (n / columns) * columns + columns - 1 - n % columns;
        }

        n
    }

    /// Output path of a tile relative to its layer folder.
    ///
    /// Leaflet layout is `<column>/<row>.png`; the flat layout is
    /// `Tile0000.png`. Both use the flipped position.
    pub fn output_name(&self, position: usize, leaflet: bool) -> PathBuf {
        if leaflet {
            let columns = self.columns();
            PathBuf::from((position % columns).to_string()).join(format!("{}.png", position / columns))
        } else {
            PathBuf::from(format!("Tile{:04}.png", position))
        }
    }

    pub fn address(&self, index: usize, flip_h: bool, flip_v: bool, leaflet: bool) -> TileAddress {
        let (column, row) = self.position(index);
        let position = self.apply_flip(index, flip_h, flip_v);
        TileAddress {
            index,
            column,
            row,
            position,
            path: self.output_name(position, leaflet),
        }
    }
}

/// Which tiles to render.
///
/// A tile is selected if it is listed explicitly or lies in the
/// `from..=to` range (an open end extends to the first or last tile). With no
/// list and no bounds every tile is selected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileFilter {
    pub tiles: BTreeSet<usize>,
    pub from: Option<usize>,
    pub to: Option<usize>,
}

impl TileFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn selects(&self, index: usize) -> bool {
        if self.tiles.is_empty() && self.from.is_none() && self.to.is_none() {
            return true;
        }

        let in_range = match (self.from, self.to) {
            (Some(from), Some(to)) => index >= from && index <= to,
            (Some(from), None) => index >= from,
            (None, Some(to)) => index <= to,
            (None, None) => false,
        };

        in_range || self.tiles.contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_dimensions() {
        let grid = TileGrid::new(2048, 512);
        assert_eq!(grid.columns(), 4);
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.tile_count(), 8);
        assert_eq!(grid.tile_height(), 512);

        let single = TileGrid::new(8, 8);
        assert_eq!(single.columns(), 1);
        assert_eq!(single.rows(), 1);
        assert_eq!(single.tile_height(), 4);
    }

    #[test]
    fn test_origins_start_north_west() {
        let grid = TileGrid::new(16, 4);
        assert_eq!(grid.origin(0), (0, 4));
        assert_eq!(grid.origin(3), (12, 4));
        assert_eq!(grid.origin(4), (0, 0));
        assert_eq!(grid.origin(7), (12, 0));
    }

    #[test]
    fn test_flip_remaps() {
        let grid = TileGrid::new(16, 4);
        // 4 columns, 2 rows
        assert_eq!(grid.apply_flip(0, true, false), 3);
        assert_eq!(grid.apply_flip(5, true, false), 6);
        assert_eq!(grid.apply_flip(1, false, true), 5);
        assert_eq!(grid.apply_flip(6, false, true), 2);
        assert_eq!(grid.apply_flip(0, true, true), 7);
    }

    #[test]
    fn test_flip_is_involution() {
        for &(width, tile) in &[(16, 4), (2048, 1024), (8, 8), (4096, 256)] {
            let grid = TileGrid::new(width, tile);
            for index in 0..grid.tile_count() {
                let h = grid.apply_flip(index, true, false);
                assert_eq!(grid.apply_flip(h, true, false), index);
                let v = grid.apply_flip(index, false, true);
                assert_eq!(grid.apply_flip(v, false, true), index);
                assert!(h < grid.tile_count() && v < grid.tile_count());
            }
        }
    }

    #[test]
    fn test_output_names() {
        let grid = TileGrid::new(16, 4);
        assert_eq!(grid.output_name(7, false), PathBuf::from("Tile0007.png"));
        assert_eq!(grid.output_name(6, true), PathBuf::from("2").join("1.png"));

        let address = grid.address(0, true, false, false);
        assert_eq!(address.position, 3);
        assert_eq!(address.path, PathBuf::from("Tile0003.png"));
        assert_eq!((address.column, address.row), (0, 0));
    }

    #[test]
    fn test_filter_defaults_to_all() {
        let filter = TileFilter::all();
        assert!((0..100).all(|i| filter.selects(i)));
    }

    #[test]
    fn test_filter_range_and_list() {
        let single = TileFilter { from: Some(2), to: Some(2), ..TileFilter::default() };
        let selected: Vec<usize> = (0..8).filter(|&i| single.selects(i)).collect();
        assert_eq!(selected, vec![2]);

        let mixed = TileFilter {
            tiles: [0, 7].into_iter().collect(),
            from: Some(3),
            to: Some(4),
        };
        let selected: Vec<usize> = (0..8).filter(|&i| mixed.selects(i)).collect();
        assert_eq!(selected, vec![0, 3, 4, 7]);
    }

    #[test]
    fn test_filter_open_ranges() {
        let from = TileFilter { from: Some(5), ..TileFilter::default() };
        assert!(!from.selects(4));
        assert!(from.selects(5) && from.selects(100));

        let to = TileFilter { to: Some(1), ..TileFilter::default() };
        assert!(to.selects(0) && to.selects(1));
        assert!(!to.selects(2));
    }
}
