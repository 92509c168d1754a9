//! # Marching Cubes
//!
//! Extracts the isosurface of a sampled scalar field as a triangle mesh, or as contour lines
//! traced on the grid's axis-aligned slices.
//!
//! ## Overview
//!
//! Every cube of the grid is classified by which of its eight corners lie below the isolevel.
//! The classification selects the crossed edges and the triangle fan from the classic lookup
//! tables in [`tables`]. A crossing is interpolated linearly from the edge's lower grid corner,
//! so the two cubes sharing an edge produce bit-identical positions. Vertices are not welded:
//! each cube emits its own copy of every crossing it uses.
//!
//! Output positions are in grid-index space (vertex `(i, j, k)` sits at `(i, j, k)`); callers
//! map them to world space with [`Grid::to_world_point`](crate::core::models::grid::Grid).
//!
//! ## Attributes
//!
//! - **Normals** are the central-difference gradient of the field at the two edge corners,
//!   interpolated and normalized. They point towards increasing values, i.e. out of the
//!   enclosed region.
//! - **Atom ids** are copied from the corner nearer to the crossing, falling back to the other
//!   corner when the nearer one carries no atom.
//!
//! Work is split into slabs along x (into single slices for contours); with the `parallel` feature slabs
//! run on the rayon pool and are concatenated in order, so the output does not depend on the
//! thread count.

mod contour;
mod tables;

use super::cancel::CancellationToken;
use super::config::{ConfigError, TriangulationConfig};
use super::error::SurfaceError;
use crate::core::models::mesh::Mesh;
use nalgebra::Vector3;
use std::ops::Range;
use tables::{CORNER_OFFSETS, EDGE_CORNERS, EDGE_TABLE, TRI_TABLE};
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Triangulates the `isolevel` surface of `values` sampled on a grid of `dims` vertices.
///
/// Triangles are wound counter-clockwise seen from the side with the higher values. With
/// `config.contour` the result holds line segments in every x-, y- and z-slice instead, without
/// normals.
///
/// # Errors
///
/// Returns a [`ConfigError`] when `dims` is degenerate or when `values` or `atom_ids` do not
/// hold one entry per grid vertex, and [`SurfaceError::Cancelled`] when `cancel` fires.
#[instrument(skip_all, name = "triangulate", fields(dims = ?dims, contour = config.contour))]
pub fn triangulate(
    values: &[f32],
    dims: [usize; 3],
    atom_ids: Option<&[i32]>,
    config: &TriangulationConfig,
    cancel: &CancellationToken,
) -> Result<Mesh, SurfaceError> {
    let volume = Volume::new(values, dims, atom_ids, config.wrap)?;

    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if !(min < config.isolevel && config.isolevel <= max) {
        debug!(min, max, isolevel = config.isolevel, "Isolevel outside the value range");
        return Ok(Mesh::empty(config.contour));
    }

    let with_normals = !config.no_normals && !config.contour;
    let ranges = lower_corner_ranges(dims, config);

    let fragments: Vec<Fragment> = if config.contour {
        let slices = slice_ranges(dims, config);
        let jobs: Vec<(usize, usize)> = [2, 0, 1]
            .into_iter()
            .flat_map(|axis| slices[axis].clone().map(move |s| (axis, s)))
            .collect();
        let extract = |(axis, s): (usize, usize)| {
            contour::extract_slice(&volume, axis, s, &ranges, config.isolevel, cancel)
        };
        collect_fragments(jobs, extract)?
    } else {
        let extract =
            |i: usize| extract_slab(&volume, i, &ranges, config.isolevel, with_normals, cancel);
        collect_fragments(ranges[0].clone().collect(), extract)?
    };

    let mesh = assemble(fragments, with_normals, atom_ids.is_some(), config.contour);
    debug!(
        vertices = mesh.vertex_count(),
        primitives = mesh.primitive_count(),
        "Isosurface extracted"
    );
    Ok(mesh)
}

/// Cube (or square) lower corners to visit along each axis.
///
/// Without wrapping a cube needs a vertex on its far side, so the last vertex of each axis
/// starts no cube. The optional grid box clips all three.
fn lower_corner_ranges(dims: [usize; 3], config: &TriangulationConfig) -> [Range<usize>; 3] {
    std::array::from_fn(|a| {
        let limit = if config.wrap { dims[a] } else { dims[a] - 1 };
        clip(a, limit, config)
    })
}

/// Contour slice positions along each axis: every vertex plane, clipped by the grid box.
fn slice_ranges(dims: [usize; 3], config: &TriangulationConfig) -> [Range<usize>; 3] {
    std::array::from_fn(|a| clip(a, dims[a], config))
}

fn clip(axis: usize, limit: usize, config: &TriangulationConfig) -> Range<usize> {
    match &config.grid_box {
        Some(b) => b.lo[axis].min(limit)..b.hi[axis].min(limit),
        None => 0..limit,
    }
}

fn collect_fragments<J, F>(jobs: Vec<J>, extract: F) -> Result<Vec<Fragment>, SurfaceError>
where
    J: Send,
    F: Fn(J) -> Result<Fragment, SurfaceError> + Sync + Send,
{
    #[cfg(not(feature = "parallel"))]
    let fragments = jobs.into_iter().map(extract).collect();

    #[cfg(feature = "parallel")]
    let fragments = jobs.into_par_iter().map(extract).collect();

    fragments
}

fn extract_slab(
    volume: &Volume,
    i: usize,
    ranges: &[Range<usize>; 3],
    isolevel: f32,
    with_normals: bool,
    cancel: &CancellationToken,
) -> Result<Fragment, SurfaceError> {
    if cancel.is_cancelled() {
        return Err(SurfaceError::Cancelled {
            stage: "triangulation",
        });
    }

    let mut fragment = Fragment::default();
    let mut edge_vertex = [0u32; 12];

    for j in ranges[1].clone() {
        for k in ranges[2].clone() {
            let corners: [[usize; 3]; 8] = std::array::from_fn(|c| {
                let [dx, dy, dz] = CORNER_OFFSETS[c];
                [i + dx, j + dy, k + dz]
            });
            let values: [f32; 8] = std::array::from_fn(|c| volume.value(corners[c]));

            let mut cube = 0usize;
            for (c, &v) in values.iter().enumerate() {
                if v < isolevel {
                    cube |= 1 << c;
                }
            }
            let crossed = EDGE_TABLE[cube];
            if crossed == 0 {
                continue;
            }

            for (e, &[a, b]) in EDGE_CORNERS.iter().enumerate() {
                if crossed & (1 << e) != 0 {
                    edge_vertex[e] = fragment.push_crossing(
                        volume,
                        corners[a],
                        corners[b],
                        values[a],
                        values[b],
                        isolevel,
                        with_normals,
                    );
                }
            }

            // Table order faces the low side; swap to face the high side.
            for tri in TRI_TABLE[cube].chunks_exact(3).take_while(|t| t[0] >= 0) {
                fragment.indices.extend_from_slice(&[
                    edge_vertex[tri[0] as usize],
                    edge_vertex[tri[2] as usize],
                    edge_vertex[tri[1] as usize],
                ]);
            }
        }
    }
    Ok(fragment)
}

fn assemble(fragments: Vec<Fragment>, with_normals: bool, with_atoms: bool, contour: bool) -> Mesh {
    let vertex_total: usize = fragments.iter().map(Fragment::vertex_count).sum();
    let index_total: usize = fragments.iter().map(|f| f.indices.len()).sum();

    let mut positions = Vec::with_capacity(3 * vertex_total);
    let mut normals = Vec::with_capacity(if with_normals { 3 * vertex_total } else { 0 });
    let mut atoms = Vec::with_capacity(if with_atoms { vertex_total } else { 0 });
    let mut indices = Vec::with_capacity(index_total);

    for fragment in fragments {
        let offset = (positions.len() / 3) as u32;
        indices.extend(fragment.indices.iter().map(|&v| v + offset));
        positions.extend(fragment.positions);
        normals.extend(fragment.normals);
        atoms.extend(fragment.atoms);
    }

    Mesh::new(
        positions,
        with_normals.then_some(normals),
        indices,
        with_atoms.then_some(atoms),
        contour,
    )
}

/// Read-only view of the sampled field with optional periodic addressing.
///
/// Coordinates passed in may equal `dims` along an axis when wrapping is enabled.
struct Volume<'a> {
    values: &'a [f32],
    dims: [usize; 3],
    atom_ids: Option<&'a [i32]>,
    wrap: bool,
}

impl<'a> Volume<'a> {
    fn new(
        values: &'a [f32],
        dims: [usize; 3],
        atom_ids: Option<&'a [i32]>,
        wrap: bool,
    ) -> Result<Self, ConfigError> {
        if dims.contains(&0) {
            return Err(ConfigError::DegenerateDimensions(dims));
        }
        let expected = dims[0] * dims[1] * dims[2];
        if values.len() != expected {
            return Err(ConfigError::LengthMismatch {
                array: "values",
                expected,
                actual: values.len(),
            });
        }
        if let Some(ids) = atom_ids {
            if ids.len() != expected {
                return Err(ConfigError::LengthMismatch {
                    array: "atom_ids",
                    expected,
                    actual: ids.len(),
                });
            }
        }
        Ok(Self {
            values,
            dims,
            atom_ids,
            wrap,
        })
    }

    #[inline]
    fn flat(&self, c: [usize; 3]) -> usize {
        let [_, ny, nz] = self.dims;
        if self.wrap {
            ((c[0] % self.dims[0]) * ny + c[1] % ny) * nz + c[2] % nz
        } else {
            (c[0] * ny + c[1]) * nz + c[2]
        }
    }

    #[inline]
    fn value(&self, c: [usize; 3]) -> f32 {
        self.values[self.flat(c)]
    }

    /// Id of the corner nearer to the crossing at fraction `mu` from `a` to `b`.
    fn atom_near(&self, a: [usize; 3], b: [usize; 3], mu: f32) -> Option<i32> {
        let ids = self.atom_ids?;
        let (near, far) = if mu < 0.5 { (a, b) } else { (b, a) };
        let id = ids[self.flat(near)];
        Some(if id >= 0 { id } else { ids[self.flat(far)] })
    }

    /// Central-difference gradient, one-sided at non-periodic boundaries.
    fn gradient(&self, c: [usize; 3]) -> Vector3<f32> {
        let c: [usize; 3] = std::array::from_fn(|a| c[a] % self.dims[a]);
        let mut g = Vector3::zeros();
        for a in 0..3 {
            let n = self.dims[a];
            if n == 1 {
                continue;
            }
            let shifted = |to: usize| {
                let mut s = c;
                s[a] = to;
                self.value(s)
            };
            g[a] = if self.wrap {
                0.5 * (shifted((c[a] + 1) % n) - shifted((c[a] + n - 1) % n))
            } else if c[a] == 0 {
                shifted(1) - shifted(0)
            } else if c[a] == n - 1 {
                shifted(n - 1) - shifted(n - 2)
            } else {
                0.5 * (shifted(c[a] + 1) - shifted(c[a] - 1))
            };
        }
        g
    }
}

/// Mesh data produced by one slab, with slab-local indices.
#[derive(Debug, Default)]
struct Fragment {
    positions: Vec<f32>,
    normals: Vec<f32>,
    atoms: Vec<i32>,
    indices: Vec<u32>,
}

impl Fragment {
    fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Appends the crossing on the edge from `a` (lower corner) to `b` and returns its index.
    #[allow(clippy::too_many_arguments)]
    fn push_crossing(
        &mut self,
        volume: &Volume,
        a: [usize; 3],
        b: [usize; 3],
        va: f32,
        vb: f32,
        isolevel: f32,
        with_normal: bool,
    ) -> u32 {
        let delta = vb - va;
        let mu = if delta.abs() > f32::EPSILON {
            (isolevel - va) / delta
        } else {
            0.5
        };

        let index = self.vertex_count() as u32;
        for axis in 0..3 {
            let pa = a[axis] as f32;
            self.positions.push(pa + mu * (b[axis] as f32 - pa));
        }

        if with_normal {
            let ga = volume.gradient(a);
            let gb = volume.gradient(b);
            let n = ga + (gb - ga) * mu;
            let norm = n.norm();
            let n = if norm > 0.0 { n / norm } else { n };
            self.normals.extend_from_slice(&[n.x, n.y, n.z]);
        }
        if let Some(id) = volume.atom_near(a, b, mu) {
            self.atoms.push(id);
        }
        index
    }
}
