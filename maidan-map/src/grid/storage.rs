//! Fixed-extent global obstacle grid.

use crate::arc::Arc;
use crate::core::{GridCoord, Pose2D};

/// Maximum obstacle confidence a cell can accumulate.
pub const MAX_CONFIDENCE: i8 = 4;

/// Fixed-extent obstacle grid centered at the world origin.
///
/// Storage is a single contiguous row-major buffer (`i * size + j`),
/// allocated once and kept for the process lifetime; there is no
/// allocation in the scan or planning hot paths. Cell `(i, j)`
/// corresponds to world `((i - size/2) * resolution, (j - size/2) *
/// resolution)`.
///
/// Out-of-bounds access is defined, not an error: reads return 0 and
/// writes are discarded.
#[derive(Clone, Debug)]
pub struct ObstacleGrid {
    size: usize,
    resolution: f32,
    cells: Vec<i8>,
}

impl ObstacleGrid {
    /// Create an empty grid of `size * size` cells at the given
    /// resolution in meters per cell.
    pub fn new(size: usize, resolution: f32) -> Self {
        Self {
            size,
            resolution,
            cells: vec![0; size * size],
        }
    }

    /// Grid side length in cells.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Resolution in meters per cell.
    #[inline]
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Cell coordinate containing a world position.
    #[inline]
    pub fn world_to_grid(&self, x: f32, y: f32) -> GridCoord {
        let half = (self.size / 2) as i32;
        GridCoord::new(
            (x / self.resolution).round() as i32 + half,
            (y / self.resolution).round() as i32 + half,
        )
    }

    #[inline]
    fn index(&self, x: f32, y: f32) -> Option<usize> {
        let coord = self.world_to_grid(x, y);
        let n = self.size as i32;
        if coord.x >= 0 && coord.x < n && coord.y >= 0 && coord.y < n {
            Some(coord.x as usize * self.size + coord.y as usize)
        } else {
            None
        }
    }

    /// Obstacle confidence at a world position; 0 outside the grid.
    #[inline]
    pub fn get(&self, x: f32, y: f32) -> i8 {
        match self.index(x, y) {
            Some(i) => self.cells[i],
            None => 0,
        }
    }

    /// Store an obstacle confidence at a world position, clamped to
    /// `[0, MAX_CONFIDENCE]`. Writes outside the grid are discarded.
    #[inline]
    pub fn set(&mut self, x: f32, y: f32, value: i8) {
        if let Some(i) = self.index(x, y) {
            self.cells[i] = value.clamp(0, MAX_CONFIDENCE);
        }
    }

    /// Whether the cell containing a world position holds any obstacle
    /// evidence.
    #[inline]
    pub fn occupied(&self, x: f32, y: f32) -> bool {
        self.get(x, y) != 0
    }

    /// Test an arc for collision by sampling it at half the grid
    /// resolution. Returns false as soon as any sample lands on a
    /// nonzero cell.
    pub fn arc_is_clear(&self, start: Pose2D, arc: Arc) -> bool {
        arc.sample(start, self.resolution * 0.5)
            .all(|p| !self.occupied(p.x, p.y))
    }
}
