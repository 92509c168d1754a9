//! Field-synthesis tasks.
//!
//! Each task fills a per-vertex buffer of the sampling grid. Work is split into x-slabs, each a
//! contiguous, independently written run of `ny·nz` vertices; with the `parallel` feature the
//! slabs run on the rayon pool. Results do not depend on the split.

pub mod accessible_volume;
pub mod smoothing;
pub mod sphere_distance;

use crate::core::models::grid::Grid;
use crate::engine::cancel::CancellationToken;
use crate::engine::error::SurfaceError;
use crate::engine::progress::{Progress, ProgressReporter};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Runs `fill(i, slab)` for every x-slab `i` of `data`, checking `cancel` before each slab.
pub(crate) fn fill_slabs<T, F>(
    grid: &Grid,
    data: &mut [T],
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
    stage: &'static str,
    fill: F,
) -> Result<(), SurfaceError>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> Result<(), SurfaceError> + Sync,
{
    let slab_len = grid.slab_len();
    let process = |(i, slab): (usize, &mut [T])| {
        if cancel.is_cancelled() {
            return Err(SurfaceError::Cancelled { stage });
        }
        fill(i, slab)?;
        reporter.report(Progress::TaskIncrement);
        Ok(())
    };

    #[cfg(not(feature = "parallel"))]
    let result = data.chunks_mut(slab_len).enumerate().try_for_each(process);

    #[cfg(feature = "parallel")]
    let result = data.par_chunks_mut(slab_len).enumerate().try_for_each(process);

    result
}
