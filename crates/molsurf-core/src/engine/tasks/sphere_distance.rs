use super::fill_slabs;
use crate::core::models::atoms::AtomSet;
use crate::core::models::field::FAR_OUTSIDE;
use crate::core::models::grid::Grid;
use crate::core::spatial::SpatialIndex;
use crate::engine::cancel::CancellationToken;
use crate::engine::error::SurfaceError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{debug, instrument};

/// Signed distance to a union of spheres of radius `r + probe_radius`.
///
/// Each vertex takes `min_i(|g - c_i| - (r_i + probe_radius))` over the atoms within
/// `cutoff` of their grown surface, or [`FAR_OUTSIDE`] when there are none. The returned
/// ids are positions in `atoms` (`-1` where no atom contributed).
#[instrument(skip_all, name = "sphere_distance_task")]
pub fn run(
    atoms: &AtomSet,
    index: &SpatialIndex,
    grid: &Grid,
    probe_radius: f32,
    cutoff: f32,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<(Vec<f32>, Vec<i32>), SurfaceError> {
    let extra = probe_radius + cutoff;
    index.check_reach(extra)?;

    let [_, ny, nz] = grid.dims();
    let mut samples = vec![(FAR_OUTSIDE, -1i32); grid.len()];

    reporter.report(Progress::TaskStart {
        total_steps: grid.dims()[0] as u64,
    });
    fill_slabs(grid, &mut samples, reporter, cancel, "sphere distance", |i, slab| {
        let mut neighbours = Vec::new();
        for j in 0..ny {
            for k in 0..nz {
                let g = grid.position(i, j, k);
                index.within_radii(&g, extra, &mut neighbours)?;

                let sample = &mut slab[j * nz + k];
                for &a in &neighbours {
                    let a = a as usize;
                    let d = (atoms.position(a) - g).norm() - (atoms.radius(a) + probe_radius);
                    if d < sample.0 {
                        *sample = (d, a as i32);
                    }
                }
            }
        }
        Ok(())
    })?;
    reporter.report(Progress::TaskFinish);

    debug!(vertices = samples.len(), "Sphere distance field sampled");
    Ok(samples.into_iter().unzip())
}
