use glam::DVec2;
use std::collections::HashMap;

/// Spatial hash grid over projected positions for radius queries.
/// Stores indices into a caller-owned node list.
pub struct PointGrid {
    /// Grid cells indexed by (cell_x, cell_y)
    cells: HashMap<(i64, i64), Vec<usize>>,
    cell_size: f64,
}

impl PointGrid {
    /// Create an empty grid. Cell size should match the typical query radius.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            cell_size: cell_size.max(f64::EPSILON),
        }
    }

    /// Build a grid from an iterator of positions; item `i` gets index `i`
    pub fn build(positions: impl Iterator<Item = DVec2>, cell_size: f64) -> Self {
        let mut grid = Self::new(cell_size);
        for (idx, pos) in positions.enumerate() {
            grid.insert(pos, idx);
        }
        grid
    }

    #[inline(always)]
    fn to_cell(&self, pos: DVec2) -> (i64, i64) {
        let x = (pos.x / self.cell_size).floor() as i64;
        let y = (pos.y / self.cell_size).floor() as i64;
        (x, y)
    }

    pub fn insert(&mut self, pos: DVec2, idx: usize) {
        let cell = self.to_cell(pos);
        self.cells.entry(cell).or_default().push(idx);
    }

    /// Candidate indices whose cell lies within `radius` of `pos`.
    /// Callers filter by exact distance.
    pub fn candidates(&self, pos: DVec2, radius: f64) -> Vec<usize> {
        let min = self.to_cell(pos - DVec2::splat(radius));
        let max = self.to_cell(pos + DVec2::splat(radius));

        let mut results = Vec::new();
        for y in min.1..=max.1 {
            for x in min.0..=max.0 {
                if let Some(indices) = self.cells.get(&(x, y)) {
                    results.extend_from_slice(indices);
                }
            }
        }
        results
    }

    /// Indices within `radius` of `pos`, using `position_of` to resolve them
    pub fn within<F>(&self, pos: DVec2, radius: f64, position_of: F) -> Vec<usize>
    where
        F: Fn(usize) -> DVec2,
    {
        let r2 = radius * radius;
        let mut found: Vec<usize> = self
            .candidates(pos, radius)
            .into_iter()
            .filter(|&idx| position_of(idx).distance_squared(pos) <= r2)
            .collect();
        found.sort_unstable();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_filters_by_distance() {
        let points = [
            DVec2::new(0.0, 0.0),
            DVec2::new(0.5, 0.0),
            DVec2::new(1.5, 0.0),
            DVec2::new(-0.9, 0.2),
        ];
        let grid = PointGrid::build(points.iter().copied(), 1.0);
        let found = grid.within(DVec2::ZERO, 1.0, |i| points[i]);
        assert_eq!(found, vec![0, 1, 3]);
    }

    #[test]
    fn test_negative_coordinates_hash_to_distinct_cells() {
        let mut grid = PointGrid::new(1.0);
        grid.insert(DVec2::new(-0.5, -0.5), 0);
        grid.insert(DVec2::new(0.5, 0.5), 1);
        assert_eq!(grid.candidates(DVec2::new(-0.5, -0.5), 0.1), vec![0]);
    }
}
