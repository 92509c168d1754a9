use crate::core::models::atoms::AtomSet;
use itertools::iproduct;
use nalgebra::Point3;
use std::collections::HashMap;
use std::ops::Range;
use thiserror::Error;
use tracing::debug;

// Keeps a neighbour at exactly the influence radius inside the 3×3×3 block despite rounding.
const CELL_INFLATION: f32 = 1.0 + 1.0e-5;

/// Cells allocated densely regardless of the atom count.
const DENSE_CELL_FLOOR: usize = 1 << 20;
/// Beyond the floor, dense cells allowed per indexed atom.
const DENSE_CELLS_PER_ATOM: usize = 8;
/// Cells along one axis; coordinates further apart than this many cells are not representable.
const MAX_AXIS_CELLS: usize = i32::MAX as usize;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpatialIndexError {
    #[error("Influence radius must be positive and finite (got {0})")]
    InvalidInfluenceRadius(f32),
    #[error("Query reach {reach:.3} exceeds the index cell size {cell_size:.3}")]
    QueryExceedsCell { reach: f32, cell_size: f32 },
    #[error("Extra query radius must be non-negative and finite (got {0})")]
    InvalidExtraRadius(f32),
    #[error("Atom extent spans more than {limit} index cells along one axis")]
    ExtentTooLarge { limit: usize },
}

/// Work done by a single query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub cells_visited: usize,
    pub atoms_tested: usize,
    pub matches: usize,
}

/// Bucket grid over the usable atoms of an [`AtomSet`].
///
/// Entries are sorted by cell, so every cell owns a contiguous slot range of `entries`. Each
/// entry carries the atom's centre and radius next to its position in the atom set so a query
/// never touches the atom set itself.
///
/// Compact atom sets keep the ranges in a dense offset array over all cells. Sets whose bounding
/// box would need far more cells than there are atoms keep only the occupied cells in a map.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    min: Point3<f32>,
    cell_size: f32,
    dims: [usize; 3],
    buckets: Buckets,
    entries: Vec<u32>,
    spheres: Vec<[f32; 4]>,
    max_radius: f32,
}

impl SpatialIndex {
    /// Buckets the usable atoms into cells of edge `influence_radius`.
    ///
    /// Atoms with non-finite coordinates or non-positive radii are skipped.
    pub fn build(atoms: &AtomSet, influence_radius: f32) -> Result<Self, SpatialIndexError> {
        if !influence_radius.is_finite() || influence_radius <= 0.0 {
            return Err(SpatialIndexError::InvalidInfluenceRadius(influence_radius));
        }
        let cell_size = influence_radius * CELL_INFLATION;

        let (min, max) = match atoms.bounding_box() {
            Some(bbox) => (bbox.min, bbox.max),
            None => (Point3::origin(), Point3::origin()),
        };
        let mut dims = [1usize; 3];
        for (a, dim) in dims.iter_mut().enumerate() {
            let span = ((max[a] - min[a]) / cell_size).floor();
            if !(span < MAX_AXIS_CELLS as f32) {
                return Err(SpatialIndexError::ExtentTooLarge {
                    limit: MAX_AXIS_CELLS,
                });
            }
            *dim = span as usize + 1;
        }

        let cell_of = |p: &Point3<f32>| -> [usize; 3] {
            std::array::from_fn(|a| {
                (((p[a] - min[a]) / cell_size).floor() as usize).min(dims[a] - 1)
            })
        };

        let mut usable: Vec<([usize; 3], usize)> = atoms
            .usable()
            .map(|i| (cell_of(&atoms.position(i)), i))
            .collect();
        usable.sort_unstable();

        let mut entries = Vec::with_capacity(usable.len());
        let mut spheres = Vec::with_capacity(usable.len());
        for &(_, atom) in &usable {
            let p = atoms.position(atom);
            entries.push(atom as u32);
            spheres.push([p.x, p.y, p.z, atoms.radius(atom)]);
        }

        let dense_limit = DENSE_CELL_FLOOR.max(DENSE_CELLS_PER_ATOM * usable.len());
        let n_cells = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .filter(|&n| n <= dense_limit);
        let buckets = match n_cells {
            Some(n_cells) => Buckets::dense(&usable, dims, n_cells),
            None => Buckets::sparse(&usable),
        };

        debug!(
            atoms = usable.len(),
            dense = matches!(buckets, Buckets::Dense(_)),
            cell_size,
            "Built spatial index {}x{}x{}",
            dims[0],
            dims[1],
            dims[2]
        );

        Ok(Self {
            min,
            cell_size,
            dims,
            buckets,
            entries,
            spheres,
            max_radius: atoms.max_radius(),
        })
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Number of indexed atoms.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn max_radius(&self) -> f32 {
        self.max_radius
    }

    /// Fails if a query with `extra_radius` could reach beyond the neighbouring cells.
    pub fn check_reach(&self, extra_radius: f32) -> Result<(), SpatialIndexError> {
        if !extra_radius.is_finite() || extra_radius < 0.0 {
            return Err(SpatialIndexError::InvalidExtraRadius(extra_radius));
        }
        let reach = self.max_radius + extra_radius;
        if reach > self.cell_size {
            return Err(SpatialIndexError::QueryExceedsCell {
                reach,
                cell_size: self.cell_size,
            });
        }
        Ok(())
    }

    /// Writes into `out` every atom whose centre is closer to `point` than its radius plus
    /// `extra_radius`, and returns how many were found.
    ///
    /// `out` is cleared first. Indices are positions in the indexed [`AtomSet`].
    pub fn within_radii(
        &self,
        point: &Point3<f32>,
        extra_radius: f32,
        out: &mut Vec<u32>,
    ) -> Result<usize, SpatialIndexError> {
        self.within_radii_with_stats(point, extra_radius, out)
            .map(|stats| stats.matches)
    }

    /// Like [`within_radii`](Self::within_radii) but reports the cells and atoms inspected.
    pub fn within_radii_with_stats(
        &self,
        point: &Point3<f32>,
        extra_radius: f32,
        out: &mut Vec<u32>,
    ) -> Result<QueryStats, SpatialIndexError> {
        self.check_reach(extra_radius)?;
        out.clear();

        let mut stats = QueryStats::default();
        let Some([xs, ys, zs]) = self.neighbourhood(point) else {
            return Ok(stats);
        };

        for (ci, cj, ck) in iproduct!(xs, ys, zs) {
            stats.cells_visited += 1;
            for slot in self.buckets.slots([ci, cj, ck], self.dims) {
                stats.atoms_tested += 1;
                let [x, y, z, r] = self.spheres[slot];
                let (dx, dy, dz) = (x - point.x, y - point.y, z - point.z);
                let reach = r + extra_radius;
                if dx * dx + dy * dy + dz * dz < reach * reach {
                    out.push(self.entries[slot]);
                }
            }
        }

        stats.matches = out.len();
        Ok(stats)
    }

    /// Cell ranges of the 3×3×3 block around `point`, clipped to the populated cells.
    fn neighbourhood(&self, point: &Point3<f32>) -> Option<[Range<usize>; 3]> {
        let mut ranges: [Range<usize>; 3] = [0..0, 0..0, 0..0];
        for (a, range) in ranges.iter_mut().enumerate() {
            let c = ((point[a] - self.min[a]) / self.cell_size).floor();
            if !c.is_finite() {
                return None;
            }
            let c = c as i64;
            let lo = c.saturating_sub(1).max(0);
            let hi = c.saturating_add(2).min(self.dims[a] as i64);
            if lo >= hi {
                return None;
            }
            *range = lo as usize..hi as usize;
        }
        Some(ranges)
    }
}

/// Slot ranges of `entries` per cell.
#[derive(Debug, Clone)]
enum Buckets {
    /// `offsets[c]..offsets[c + 1]` belongs to the cell with flat index `c`.
    Dense(Vec<u32>),
    /// Occupied cells only.
    Sparse(HashMap<[usize; 3], Range<u32>>),
}

impl Buckets {
    /// `sorted` holds `(cell, atom)` pairs in ascending cell order.
    fn dense(sorted: &[([usize; 3], usize)], dims: [usize; 3], n_cells: usize) -> Self {
        let mut offsets = vec![0u32; n_cells + 1];
        for &([ci, cj, ck], _) in sorted {
            offsets[(ci * dims[1] + cj) * dims[2] + ck + 1] += 1;
        }
        for c in 0..n_cells {
            offsets[c + 1] += offsets[c];
        }
        Self::Dense(offsets)
    }

    fn sparse(sorted: &[([usize; 3], usize)]) -> Self {
        let mut cells: HashMap<[usize; 3], Range<u32>> = HashMap::new();
        for (slot, &(cell, _)) in sorted.iter().enumerate() {
            let slot = slot as u32;
            cells.entry(cell).or_insert(slot..slot).end = slot + 1;
        }
        Self::Sparse(cells)
    }

    #[inline]
    fn slots(&self, [ci, cj, ck]: [usize; 3], dims: [usize; 3]) -> Range<usize> {
        match self {
            Self::Dense(offsets) => {
                let c = (ci * dims[1] + cj) * dims[2] + ck;
                offsets[c] as usize..offsets[c + 1] as usize
            }
            Self::Sparse(cells) => cells
                .get(&[ci, cj, ck])
                .map_or(0..0, |r| r.start as usize..r.end as usize),
        }
    }
}
