use crate::core::utils::geometry::BoundingBox;
use nalgebra::{Point3, Vector3};
use thiserror::Error;

/// Extra grid cells added on every side of the padded bounding box.
pub const MARGIN_CELLS: f32 = 3.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("Scale factor must be positive and finite (got {0})")]
    InvalidScaleFactor(f32),
    #[error("Grid spacing must be positive and finite along every axis (got {0:?})")]
    InvalidSpacing([f32; 3]),
    #[error("Grid dimensions must be at least 1 along every axis (got {0:?})")]
    DegenerateDimensions([usize; 3]),
    #[error("Requested grid of {requested} points exceeds the budget of {budget} points")]
    BudgetExceeded { requested: u64, budget: u64 },
}

/// A regular lattice of sample points.
///
/// Vertex `(i, j, k)` lives at `origin + (i, j, k) ⊙ spacing` and at flat index
/// `(i·ny + j)·nz + k`, so an x-slab is a contiguous run of `ny·nz` values.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    origin: Point3<f32>,
    spacing: Vector3<f32>,
    dims: [usize; 3],
}

/// Half-open range `lo..hi` of cube lower corners on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridBox {
    pub lo: [usize; 3],
    pub hi: [usize; 3],
}

impl GridBox {
    pub fn new(lo: [usize; 3], hi: [usize; 3]) -> Self {
        Self { lo, hi }
    }

    pub fn contains(&self, i: usize, j: usize, k: usize) -> bool {
        (self.lo[0]..self.hi[0]).contains(&i)
            && (self.lo[1]..self.hi[1]).contains(&j)
            && (self.lo[2]..self.hi[2]).contains(&k)
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|a| self.lo[a] >= self.hi[a])
    }
}

impl Grid {
    pub fn new(
        origin: Point3<f32>,
        spacing: Vector3<f32>,
        dims: [usize; 3],
    ) -> Result<Self, GridError> {
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(GridError::InvalidSpacing([spacing.x, spacing.y, spacing.z]));
        }
        if dims.iter().any(|&d| d == 0) {
            return Err(GridError::DegenerateDimensions(dims));
        }
        Ok(Self {
            origin,
            spacing,
            dims,
        })
    }

    /// A grid in plain index space: origin at zero and unit spacing.
    pub fn unit(dims: [usize; 3]) -> Result<Self, GridError> {
        Self::new(Point3::origin(), Vector3::repeat(1.0), dims)
    }

    /// Builds the sampling grid around `bbox` grown by `padding` plus [`MARGIN_CELLS`] cells.
    ///
    /// Bounds are snapped to multiples of `1 / scale_factor`. When the grid would hold more
    /// than `max_points` vertices the request fails, unless `fit_to_budget` is set, in which
    /// case the scale factor is shrunk by `(max_points / points)^(1/3)` until it fits. An
    /// empty `bbox` yields a single vertex at the origin.
    pub fn enclosing(
        bbox: Option<&BoundingBox>,
        padding: f32,
        scale_factor: f32,
        max_points: u64,
        fit_to_budget: bool,
    ) -> Result<Self, GridError> {
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(GridError::InvalidScaleFactor(scale_factor));
        }
        let Some(bbox) = bbox else {
            return Self::new(Point3::origin(), Vector3::repeat(1.0 / scale_factor), [1, 1, 1]);
        };

        let mut sf = scale_factor;
        loop {
            let (origin, dims) = snap(bbox, padding + MARGIN_CELLS / sf, sf);
            let points = dims.iter().fold(1u64, |acc, &d| acc.saturating_mul(d as u64));
            if points <= max_points {
                return Self::new(origin, Vector3::repeat(1.0 / sf), dims);
            }
            if !fit_to_budget {
                return Err(GridError::BudgetExceeded {
                    requested: points,
                    budget: max_points,
                });
            }
            let shrunk = sf * (max_points as f64 / points as f64).cbrt() as f32;
            // Rounding in the snap can leave the grid a hair over budget; keep shrinking.
            sf = if shrunk < sf { shrunk } else { sf * 0.99 };
            if !sf.is_finite() || sf <= 0.0 {
                return Err(GridError::InvalidScaleFactor(sf));
            }
        }
    }

    #[inline]
    pub fn origin(&self) -> Point3<f32> {
        self.origin
    }

    #[inline]
    pub fn spacing(&self) -> Vector3<f32> {
        self.spacing
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Grid points per Å along x.
    #[inline]
    pub fn scale_factor(&self) -> f32 {
        1.0 / self.spacing.x
    }

    /// Largest spacing over the three axes.
    #[inline]
    pub fn max_spacing(&self) -> f32 {
        self.spacing.max()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of values in one x-slab.
    #[inline]
    pub fn slab_len(&self) -> usize {
        self.dims[1] * self.dims[2]
    }

    #[inline]
    pub fn flat_index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.dims[1] + j) * self.dims[2] + k
    }

    #[inline]
    pub fn position(&self, i: usize, j: usize, k: usize) -> Point3<f32> {
        Point3::new(
            self.origin.x + i as f32 * self.spacing.x,
            self.origin.y + j as f32 * self.spacing.y,
            self.origin.z + k as f32 * self.spacing.z,
        )
    }

    /// Fractional grid coordinates of a world-space point.
    pub fn to_grid(&self, p: &Point3<f32>) -> Point3<f32> {
        Point3::from((p - self.origin).component_div(&self.spacing))
    }

    /// Maps a point in grid-index space to world space.
    pub fn to_world_point(&self, p: &Point3<f32>) -> Point3<f32> {
        self.origin + p.coords.component_mul(&self.spacing)
    }

    /// Maps a grid-space normal to world space.
    ///
    /// The grid→world map is a diagonal scale, so normals transform with its inverse transpose
    /// and are renormalized.
    pub fn to_world_normal(&self, n: &Vector3<f32>) -> Vector3<f32> {
        let scaled = n.component_div(&self.spacing);
        let norm = scaled.norm();
        if norm > 0.0 { scaled / norm } else { scaled }
    }

    /// The box of cube lower corners covering a world-space cube of edge `size` around
    /// `center`, clipped to the grid.
    pub fn box_around(&self, center: &Point3<f32>, size: f32) -> GridBox {
        let half = Vector3::repeat(size * 0.5);
        let lo = self.to_grid(&(center - half));
        let hi = self.to_grid(&(center + half));
        let mut gbox = GridBox::new([0; 3], [0; 3]);
        for a in 0..3 {
            let upper = self.dims[a] as f32;
            gbox.lo[a] = lo[a].floor().clamp(0.0, upper) as usize;
            gbox.hi[a] = hi[a].ceil().clamp(0.0, upper) as usize;
        }
        gbox
    }

    /// Box covering every cube of the grid.
    pub fn full_box(&self) -> GridBox {
        GridBox::new([0; 3], self.dims)
    }
}

fn snap(bbox: &BoundingBox, padding: f32, sf: f32) -> (Point3<f32>, [usize; 3]) {
    let mut origin = Point3::origin();
    let mut dims = [1usize; 3];
    for a in 0..3 {
        let lo = ((bbox.min[a] - padding) * sf).floor();
        let hi = ((bbox.max[a] + padding) * sf).ceil();
        origin[a] = lo / sf;
        dims[a] = (hi - lo).max(0.0) as usize + 1;
    }
    (origin, dims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn new_rejects_zero_dimension() {
        let result = Grid::new(Point3::origin(), Vector3::repeat(1.0), [4, 0, 4]);
        assert_eq!(result, Err(GridError::DegenerateDimensions([4, 0, 4])));
    }

    #[test]
    fn new_rejects_non_positive_spacing() {
        let result = Grid::new(Point3::origin(), Vector3::new(1.0, 0.0, 1.0), [2, 2, 2]);
        assert!(matches!(result, Err(GridError::InvalidSpacing(_))));
    }

    #[test]
    fn flat_index_is_x_major() {
        let grid = Grid::unit([2, 3, 4]).unwrap();
        assert_eq!(grid.flat_index(0, 0, 1), 1);
        assert_eq!(grid.flat_index(0, 1, 0), 4);
        assert_eq!(grid.flat_index(1, 0, 0), 12);
        assert_eq!(grid.slab_len(), 12);
        assert_eq!(grid.len(), 24);
    }

    #[test]
    fn enclosing_snaps_bounds_to_the_lattice() {
        let grid = Grid::enclosing(Some(&unit_box()), 1.0, 2.0, u64::MAX, false).unwrap();
        // padding 1.0 + 3 cells of 0.5 = 2.5 on each side
        assert_eq!(grid.origin(), Point3::new(-2.5, -2.5, -2.5));
        assert_eq!(grid.dims(), [13, 13, 13]);
        assert_eq!(grid.spacing(), Vector3::repeat(0.5));
        assert_eq!(grid.position(12, 12, 12), Point3::new(3.5, 3.5, 3.5));
    }

    #[test]
    fn enclosing_empty_box_is_a_single_vertex() {
        let grid = Grid::enclosing(None, 3.0, 2.0, 10, false).unwrap();
        assert_eq!(grid.dims(), [1, 1, 1]);
    }

    #[test]
    fn enclosing_over_budget_is_rejected() {
        let result = Grid::enclosing(Some(&unit_box()), 1.0, 2.0, 1000, false);
        assert_eq!(
            result,
            Err(GridError::BudgetExceeded {
                requested: 13 * 13 * 13,
                budget: 1000
            })
        );
    }

    #[test]
    fn enclosing_fit_to_budget_shrinks_scale_factor() {
        let grid = Grid::enclosing(Some(&unit_box()), 1.0, 2.0, 1000, true).unwrap();
        assert!(grid.len() as u64 <= 1000);
        assert!(grid.scale_factor() < 2.0);
    }

    #[test]
    fn enclosing_rejects_bad_scale_factor() {
        let result = Grid::enclosing(Some(&unit_box()), 1.0, 0.0, 1000, false);
        assert_eq!(result, Err(GridError::InvalidScaleFactor(0.0)));
    }

    #[test]
    fn world_transforms_apply_origin_and_spacing() {
        let grid = Grid::new(
            Point3::new(1.0, 2.0, 3.0),
            Vector3::new(0.5, 1.0, 2.0),
            [4, 4, 4],
        )
        .unwrap();
        let p = grid.to_world_point(&Point3::new(2.0, 2.0, 2.0));
        assert_eq!(p, Point3::new(2.0, 4.0, 7.0));
        assert_eq!(grid.to_grid(&p), Point3::new(2.0, 2.0, 2.0));

        let n = grid.to_world_normal(&Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(n, Vector3::new(1.0, 0.0, 0.0));
        let n = grid.to_world_normal(&Vector3::new(1.0, 1.0, 0.0));
        assert!((n.norm() - 1.0).abs() < 1e-6);
        assert!(n.x > n.y);
    }

    #[test]
    fn box_around_is_clipped_to_the_grid() {
        let grid = Grid::unit([10, 10, 10]).unwrap();
        let gbox = grid.box_around(&Point3::new(1.0, 5.0, 9.0), 4.0);
        assert_eq!(gbox.lo, [0, 3, 7]);
        assert_eq!(gbox.hi, [3, 7, 10]);
        assert!(gbox.contains(2, 3, 9));
        assert!(!gbox.contains(3, 3, 9));
        assert!(!gbox.is_empty());
    }
}
