use super::fill_slabs;
use crate::core::models::field::FAR_OUTSIDE;
use crate::core::models::grid::Grid;
use crate::engine::cancel::CancellationToken;
use crate::engine::error::SurfaceError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::instrument;

/// Applies `passes` rounds of a 3×3×3 box filter.
///
/// Sentinel vertices ([`FAR_OUTSIDE`]) keep their value and are left out of their neighbours'
/// averages. The filter is clipped at the grid boundary.
#[instrument(skip_all, name = "smoothing_task", fields(passes))]
pub fn run(
    grid: &Grid,
    values: Vec<f32>,
    passes: u32,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<Vec<f32>, SurfaceError> {
    if passes == 0 {
        return Ok(values);
    }
    let [nx, ny, nz] = grid.dims();
    let mut src = values;
    let mut dst = src.clone();

    reporter.report(Progress::TaskStart {
        total_steps: passes as u64 * nx as u64,
    });
    for _ in 0..passes {
        let input = &src;
        fill_slabs(grid, &mut dst, reporter, cancel, "smoothing", |i, slab| {
            for j in 0..ny {
                for k in 0..nz {
                    let centre = input[grid.flat_index(i, j, k)];
                    if centre == FAR_OUTSIDE {
                        slab[j * nz + k] = centre;
                        continue;
                    }
                    let mut sum = 0.0f32;
                    let mut count = 0u32;
                    for ii in i.saturating_sub(1)..(i + 2).min(nx) {
                        for jj in j.saturating_sub(1)..(j + 2).min(ny) {
                            for kk in k.saturating_sub(1)..(k + 2).min(nz) {
                                let v = input[grid.flat_index(ii, jj, kk)];
                                if v != FAR_OUTSIDE {
                                    sum += v;
                                    count += 1;
                                }
                            }
                        }
                    }
                    slab[j * nz + k] = sum / count as f32;
                }
            }
            Ok(())
        })?;
        std::mem::swap(&mut src, &mut dst);
    }
    reporter.report(Progress::TaskFinish);
    Ok(src)
}

/// Reduces the field to membership: `-1` inside (below zero), `+1` elsewhere.
pub fn binarize(values: &mut [f32]) {
    for v in values.iter_mut() {
        *v = if *v < 0.0 { -1.0 } else { 1.0 };
    }
}
