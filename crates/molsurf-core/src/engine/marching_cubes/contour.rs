//! Marching squares over axis-aligned slices of the volume.
//!
//! Slices are taken normal to each of the three axes, so the isolines trace the surface on
//! every cube face and no orientation of the surface is missed.

use super::{Fragment, Volume};
use crate::engine::cancel::CancellationToken;
use crate::engine::error::SurfaceError;
use std::ops::Range;

/// `(du, dv)` offsets of the four square corners, counter-clockwise from the lower corner.
const SQUARE_CORNERS: [[usize; 2]; 4] = [[0, 0], [1, 0], [1, 1], [0, 1]];

/// Corner pairs of the four square edges, lower grid corner first.
const SQUARE_EDGES: [[usize; 2]; 4] = [[0, 1], [1, 2], [3, 2], [0, 3]];

/// Edge pairs joined by a segment for each corner configuration (bit `c` set when corner `c` is
/// below the isolevel); `-1` terminates. Saddles keep the low corners apart.
const SEGMENT_TABLE: [[i8; 4]; 16] = [
    [-1, -1, -1, -1],
    [3, 0, -1, -1],
    [0, 1, -1, -1],
    [3, 1, -1, -1],
    [1, 2, -1, -1],
    [3, 0, 1, 2],
    [0, 2, -1, -1],
    [3, 2, -1, -1],
    [2, 3, -1, -1],
    [0, 2, -1, -1],
    [0, 1, 2, 3],
    [1, 2, -1, -1],
    [1, 3, -1, -1],
    [0, 1, -1, -1],
    [3, 0, -1, -1],
    [-1, -1, -1, -1],
];

/// Extracts the isoline segments of slice `s` normal to `axis`.
///
/// `squares` gives the lower corners to visit along every axis; the entry for `axis` itself is
/// ignored. The in-plane axes follow cyclically, so z-slices are spanned by x and y.
pub(super) fn extract_slice(
    volume: &Volume,
    axis: usize,
    s: usize,
    squares: &[Range<usize>; 3],
    isolevel: f32,
    cancel: &CancellationToken,
) -> Result<Fragment, SurfaceError> {
    if cancel.is_cancelled() {
        return Err(SurfaceError::Cancelled { stage: "contouring" });
    }

    let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
    let mut fragment = Fragment::default();
    let mut edge_vertex = [0u32; 4];

    for a in squares[u].clone() {
        for b in squares[v].clone() {
            let corners: [[usize; 3]; 4] = std::array::from_fn(|c| {
                let [du, dv] = SQUARE_CORNERS[c];
                let mut corner = [0; 3];
                corner[axis] = s;
                corner[u] = a + du;
                corner[v] = b + dv;
                corner
            });
            let values: [f32; 4] = std::array::from_fn(|c| volume.value(corners[c]));

            let mut square = 0usize;
            for (c, &value) in values.iter().enumerate() {
                if value < isolevel {
                    square |= 1 << c;
                }
            }
            if square == 0 || square == 15 {
                continue;
            }

            let segments = &SEGMENT_TABLE[square];
            for (e, &[a, b]) in SQUARE_EDGES.iter().enumerate() {
                if segments.contains(&(e as i8)) {
                    edge_vertex[e] = fragment.push_crossing(
                        volume,
                        corners[a],
                        corners[b],
                        values[a],
                        values[b],
                        isolevel,
                        false,
                    );
                }
            }
            for pair in segments.chunks_exact(2).take_while(|p| p[0] >= 0) {
                fragment
                    .indices
                    .extend_from_slice(&[edge_vertex[pair[0] as usize], edge_vertex[pair[1] as usize]]);
            }
        }
    }
    Ok(fragment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mixed_square_uses_each_crossed_edge_once() {
        for (square, segments) in SEGMENT_TABLE.iter().enumerate() {
            for (e, &[a, b]) in SQUARE_EDGES.iter().enumerate() {
                let crossed = ((square >> a) & 1) != ((square >> b) & 1);
                let used = segments.iter().filter(|&&s| s == e as i8).count();
                assert_eq!(used, usize::from(crossed), "square {} edge {}", square, e);
            }
        }
    }
}
