//! Solvent-excluded field by the accessible-volume method.
//!
//! Every atom is grown by the probe radius `p` to `R_i = r_i + p`; the union of these spheres
//! is the solvent-accessible volume and its boundary is the locus of probe centres. For a
//! vertex inside that volume the depth `D` is its distance to the nearest reachable probe
//! centre, found in two passes:
//!
//! 1. **Point projection.** The vertex is projected radially onto each containing sphere. A
//!    projection not buried in another grown sphere is a valid probe centre at distance
//!    `R_i - |g - c_i|`.
//! 2. **Torus projection.** For each pair of intersecting grown spheres, probes are placed on
//!    their circle of intersection. Unburied probes lower the depth of nearby vertices to
//!    their straight-line distance.
//!
//! The field is `p - D` inside the accessible volume and `p + min_i(|g - c_i| - R_i)`
//! outside it, so the zero level is the solvent-excluded surface. Depths are clamped to
//! `p + cutoff`, which bounds the field below by `-cutoff`.

use super::fill_slabs;
use crate::core::models::atoms::AtomSet;
use crate::core::models::field::FAR_OUTSIDE;
use crate::core::models::grid::Grid;
use crate::core::spatial::SpatialIndex;
use crate::core::utils::geometry::normal_to_line;
use crate::engine::cancel::CancellationToken;
use crate::engine::error::SurfaceError;
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::{Point3, Vector3};
use std::f32::consts::PI;
use tracing::{debug, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Smallest half-width, in cells, of the window a torus probe updates.
const MIN_TORUS_WINDOW: usize = 5;

/// Marks a vertex outside the accessible volume in the depth buffer.
const OUTSIDE: f32 = -1.0;

#[derive(Debug, Clone, Copy)]
pub struct AccessibleVolumeParams {
    pub probe_radius: f32,
    pub cutoff: f32,
    pub probe_positions: usize,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    /// Final value for outside vertices; unused inside until the last pass.
    value: f32,
    /// Distance to the nearest reachable probe centre, `INFINITY` if none was found yet, or
    /// [`OUTSIDE`].
    depth: f32,
    atom: i32,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            value: FAR_OUTSIDE,
            depth: OUTSIDE,
            atom: -1,
        }
    }
}

/// Computes the solvent-excluded field. Returned ids are positions in `atoms`.
#[instrument(skip_all, name = "accessible_volume_task")]
pub fn run(
    atoms: &AtomSet,
    index: &SpatialIndex,
    grid: &Grid,
    params: &AccessibleVolumeParams,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<(Vec<f32>, Vec<i32>), SurfaceError> {
    let p = params.probe_radius;
    let max_expanded = index.max_radius() + p;
    let vertex_extra = p + params.cutoff.max(max_expanded);
    index.check_reach(vertex_extra)?;
    index.check_reach(max_expanded + p)?;

    let mut samples = vec![Sample::default(); grid.len()];

    reporter.report(Progress::PhaseStart {
        name: "Point projection",
    });
    reporter.report(Progress::TaskStart {
        total_steps: grid.dims()[0] as u64,
    });
    project_points(atoms, index, grid, p, params.cutoff, vertex_extra, &mut samples, reporter, cancel)?;
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Torus projection",
    });
    let probes = project_torii(atoms, index, grid, params, &mut samples, cancel)?;
    reporter.report(Progress::PhaseFinish);
    debug!(unobscured_probes = probes, "Torus projection finished");

    let max_depth = p + params.cutoff;

    #[cfg(not(feature = "parallel"))]
    let iterator = samples.into_iter();

    #[cfg(feature = "parallel")]
    let iterator = samples.into_par_iter();

    Ok(iterator
        .map(|s| {
            if s.depth == OUTSIDE {
                (s.value, s.atom)
            } else {
                (p - s.depth.min(max_depth), s.atom)
            }
        })
        .unzip())
}

#[allow(clippy::too_many_arguments)]
fn project_points(
    atoms: &AtomSet,
    index: &SpatialIndex,
    grid: &Grid,
    p: f32,
    cutoff: f32,
    extra: f32,
    samples: &mut [Sample],
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<(), SurfaceError> {
    let [_, ny, nz] = grid.dims();

    fill_slabs(grid, samples, reporter, cancel, "point projection", |i, slab| {
        let mut neighbours = Vec::new();
        for j in 0..ny {
            for k in 0..nz {
                let g = grid.position(i, j, k);
                index.within_radii(&g, extra, &mut neighbours)?;
                slab[j * nz + k] = classify_vertex(atoms, &neighbours, &g, p, cutoff);
            }
        }
        Ok(())
    })
}

fn classify_vertex(
    atoms: &AtomSet,
    neighbours: &[u32],
    g: &Point3<f32>,
    p: f32,
    cutoff: f32,
) -> Sample {
    let mut depth = f32::INFINITY;
    let mut depth_atom = -1i32;
    let mut deepest = f32::NEG_INFINITY;
    let mut deepest_atom = -1i32;
    let mut gap = f32::INFINITY;
    let mut gap_atom = -1i32;

    for &a in neighbours {
        let a = a as usize;
        let centre = atoms.position(a);
        let expanded = atoms.radius(a) + p;
        let offset = g - centre;
        let d = offset.norm();

        if d >= expanded {
            if d - expanded < gap && d < expanded + cutoff {
                gap = d - expanded;
                gap_atom = a as i32;
            }
            continue;
        }

        let below = expanded - d;
        if below > deepest {
            deepest = below;
            deepest_atom = a as i32;
        }
        if below >= depth {
            continue;
        }
        let direction = if d > f32::EPSILON {
            offset / d
        } else {
            Vector3::x()
        };
        let projected = centre + direction * expanded;
        if !is_obscured(atoms, neighbours, &projected, p, a, a) {
            depth = below;
            depth_atom = a as i32;
        }
    }

    if deepest_atom >= 0 {
        Sample {
            value: 0.0,
            depth,
            atom: if depth_atom >= 0 { depth_atom } else { deepest_atom },
        }
    } else if gap_atom >= 0 {
        Sample {
            value: p + gap,
            depth: OUTSIDE,
            atom: gap_atom,
        }
    } else {
        Sample::default()
    }
}

/// True if `point` lies strictly inside the grown sphere of a neighbour other than `a`, `b`.
fn is_obscured(
    atoms: &AtomSet,
    neighbours: &[u32],
    point: &Point3<f32>,
    p: f32,
    a: usize,
    b: usize,
) -> bool {
    neighbours.iter().any(|&n| {
        let n = n as usize;
        if n == a || n == b {
            return false;
        }
        let expanded = atoms.radius(n) + p;
        (atoms.position(n) - point).norm_squared() < expanded * expanded
    })
}

fn project_torii(
    atoms: &AtomSet,
    index: &SpatialIndex,
    grid: &Grid,
    params: &AccessibleVolumeParams,
    samples: &mut [Sample],
    cancel: &CancellationToken,
) -> Result<usize, SurfaceError> {
    let p = params.probe_radius;
    let window = MIN_TORUS_WINDOW.max(2 + (p * grid.scale_factor()).floor() as usize);
    let angles: Vec<(f32, f32)> = (0..params.probe_positions)
        .map(|t| {
            let theta = 2.0 * PI * t as f32 / params.probe_positions as f32;
            (theta.cos(), theta.sin())
        })
        .collect();

    let mut neighbours = Vec::new();
    let mut unobscured = 0usize;

    for a in atoms.usable() {
        if cancel.is_cancelled() {
            return Err(SurfaceError::Cancelled {
                stage: "torus projection",
            });
        }
        let ca = atoms.position(a);
        let ra = atoms.radius(a) + p;
        index.within_radii(&ca, ra + p, &mut neighbours)?;

        for &b in &neighbours {
            let b = b as usize;
            if b <= a {
                continue;
            }
            let rb = atoms.radius(b) + p;
            let to_b = atoms.position(b) - ca;
            let d = to_b.norm();
            // Disjoint, or one sphere inside the other: no circle of intersection.
            if d >= ra + rb || d <= (ra - rb).abs() {
                continue;
            }

            let cos_a = (ra * ra + d * d - rb * rb) / (2.0 * ra * d);
            let along = ra * cos_a;
            let axis = to_b / d;
            let n1 = normal_to_line(&axis);
            let n2 = axis.cross(&n1).normalize();
            let circle_radius = (ra * ra - along * along).max(0.0).sqrt();
            let mid = ca + axis * along;

            for &(cos_t, sin_t) in &angles {
                let probe = mid + (n1 * cos_t + n2 * sin_t) * circle_radius;
                if is_obscured(atoms, &neighbours, &probe, p, a, b) {
                    continue;
                }
                unobscured += 1;
                stamp_probe(grid, samples, &probe, &axis, window, a, b);
            }
        }
    }

    trace!(window, "Torus probe window");
    Ok(unobscured)
}

/// Lowers the depth of vertices inside the accessible volume near `probe`.
fn stamp_probe(
    grid: &Grid,
    samples: &mut [Sample],
    probe: &Point3<f32>,
    axis: &Vector3<f32>,
    window: usize,
    a: usize,
    b: usize,
) {
    let cell = grid.to_grid(probe);
    let dims = grid.dims();
    let mut lo = [0usize; 3];
    let mut hi = [0usize; 3];
    for ax in 0..3 {
        let c = cell[ax].floor() as i64;
        lo[ax] = (c - window as i64).max(0) as usize;
        hi[ax] = (c + window as i64 + 2).clamp(0, dims[ax] as i64) as usize;
    }

    for i in lo[0]..hi[0] {
        for j in lo[1]..hi[1] {
            for k in lo[2]..hi[2] {
                let sample = &mut samples[grid.flat_index(i, j, k)];
                if sample.depth == OUTSIDE {
                    continue;
                }
                let to_probe = probe - grid.position(i, j, k);
                let d2 = to_probe.norm_squared();
                if d2 < sample.depth * sample.depth {
                    sample.depth = d2.sqrt();
                    sample.atom = (if to_probe.dot(axis) < 0.0 { b } else { a }) as i32;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(probe_radius: f32) -> AccessibleVolumeParams {
        AccessibleVolumeParams {
            probe_radius,
            cutoff: 2.0,
            probe_positions: 30,
        }
    }

    fn grid_around_origin(half: f32, spacing: f32) -> Grid {
        let n = (2.0 * half / spacing).round() as usize + 1;
        Grid::new(
            Point3::new(-half, -half, -half),
            Vector3::repeat(spacing),
            [n, n, n],
        )
        .unwrap()
    }

    fn compute(atoms: &AtomSet, grid: &Grid, p: f32) -> (Vec<f32>, Vec<i32>) {
        let max_r = atoms.max_radius();
        let influence = (max_r + p + 2.0).max(2.0 * (max_r + p));
        let index = SpatialIndex::build(atoms, influence).unwrap();
        run(
            atoms,
            &index,
            grid,
            &params(p),
            &ProgressReporter::new(),
            &CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn single_atom_gives_its_van_der_waals_sphere() {
        let atoms = AtomSet::new(vec![0.0], vec![0.0], vec![0.0], vec![1.5], None).unwrap();
        let grid = grid_around_origin(5.0, 0.5);
        let (values, ids) = compute(&atoms, &grid, 1.4);

        let n = grid.dims()[0];
        let c = n / 2;
        for (i, expected) in [(c, -1.5), (c + 2, -0.5), (c + 4, 0.5), (c + 6, 1.5)] {
            let v = values[grid.flat_index(i, c, c)];
            assert!((v - expected).abs() < 1e-5, "x={} got {}", i, v);
        }
        assert_eq!(ids[grid.flat_index(c + 2, c, c)], 0);
    }

    #[test]
    fn crevice_between_two_atoms_is_filled() {
        // Two atoms whose grown spheres overlap: the probe cannot reach the midpoint between
        // their van der Waals spheres, so it lies inside the excluded surface.
        let atoms =
            AtomSet::new(vec![-1.8, 1.8], vec![0.0; 2], vec![0.0; 2], vec![1.5, 1.5], None).unwrap();
        let grid = grid_around_origin(6.0, 0.25);
        let (values, _) = compute(&atoms, &grid, 1.4);

        let c = grid.dims()[0] / 2;
        // Point just above the contact, outside both van der Waals spheres.
        let above = values[grid.flat_index(c, c + 2, c)];
        assert!(above < 0.0, "expected buried crevice, got {}", above);

        // Well outside along y the field is positive again.
        let outside = values[grid.flat_index(c, c + 20, c)];
        assert!(outside > 0.0);
    }

    #[test]
    fn ids_follow_the_nearer_atom() {
        let atoms =
            AtomSet::new(vec![-1.8, 1.8], vec![0.0; 2], vec![0.0; 2], vec![1.5, 1.5], None).unwrap();
        let grid = grid_around_origin(6.0, 0.25);
        let (values, ids) = compute(&atoms, &grid, 1.4);
        let c = grid.dims()[0] / 2;
        // (c ± 3, y = 1.75) is reached by point projection, (c ± 1, y = 1.0) only by a
        // probe on the torus between the two atoms.
        for (i, j, expected) in [(c - 3, c + 7, 0), (c + 3, c + 7, 1), (c - 1, c + 4, 0), (c + 1, c + 4, 1)] {
            let idx = grid.flat_index(i, j, c);
            assert!(values[idx] < FAR_OUTSIDE);
            assert_eq!(ids[idx], expected, "vertex ({}, {})", i, j);
        }
    }

    #[test]
    fn far_vertices_stay_sentinel() {
        let atoms = AtomSet::new(vec![0.0], vec![0.0], vec![0.0], vec![1.0], None).unwrap();
        let grid = grid_around_origin(10.0, 1.0);
        let (values, ids) = compute(&atoms, &grid, 1.4);
        assert_eq!(values[0], FAR_OUTSIDE);
        assert_eq!(ids[0], -1);
    }
}
