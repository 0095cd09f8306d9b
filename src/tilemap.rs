use std::collections::TryReserveError;

/// A dense 2D grid stored row by row, addressed as `y * width + x`.
///
/// Unlike a world map this grid does not wrap: tiles carry their own halo
/// instead of reaching into neighbours.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Allocate a grid, reporting allocation failure instead of aborting.
    pub fn try_new_with(width: usize, height: usize, value: T) -> Result<Self, TryReserveError> {
        let len = width.saturating_mul(height);
        let mut data = Vec::new();
        data.try_reserve_exact(len)?;
        data.resize(len, value);
        Ok(Self { width, height, data })
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "({x}, {y}) out of bounds");
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mirror left to right.
    pub fn flip_horizontal(&mut self) {
        for row in self.data.chunks_exact_mut(self.width.max(1)) {
            row.reverse();
        }
    }

    /// Mirror top to bottom.
    pub fn flip_vertical(&mut self) {
        let (w, h) = (self.width, self.height);
        for y in 0..h / 2 {
            let (top, bottom) = self.data.split_at_mut((h - 1 - y) * w);
            top[y * w..(y + 1) * w].swap_with_slice(&mut bottom[..w]);
        }
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| {
            let x = idx % width;
            let y = idx / width;
            (x, y, val)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(width: usize, height: usize) -> Tilemap<usize> {
        let mut map = Tilemap::new_with(width, height, 0);
        for y in 0..height {
            for x in 0..width {
                map.set(x, y, y * width + x);
            }
        }
        map
    }

    #[test]
    fn test_row_major_layout() {
        let map = numbered(3, 2);
        assert_eq!(map.as_slice(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(*map.get(2, 1), 5);
    }

    #[test]
    fn test_flip_horizontal() {
        let mut map = numbered(3, 2);
        map.flip_horizontal();
        assert_eq!(map.as_slice(), &[2, 1, 0, 5, 4, 3]);
    }

    #[test]
    fn test_flip_vertical() {
        let mut map = numbered(2, 3);
        map.flip_vertical();
        assert_eq!(map.as_slice(), &[4, 5, 2, 3, 0, 1]);

        map.flip_vertical();
        assert_eq!(map, numbered(2, 3));
    }

    #[test]
    fn test_try_new_with_reports_overflow() {
        assert!(Tilemap::try_new_with(4, 4, 0u8).is_ok());
        assert!(Tilemap::try_new_with(usize::MAX, 2, 0u64).is_err());
    }

    #[test]
    fn test_iter_yields_coordinates() {
        let map = numbered(2, 2);
        let cells: Vec<(usize, usize, usize)> = map.iter().map(|(x, y, v)| (x, y, *v)).collect();
        assert_eq!(cells, vec![(0, 0, 0), (1, 0, 1), (0, 1, 2), (1, 1, 3)]);
    }
}
