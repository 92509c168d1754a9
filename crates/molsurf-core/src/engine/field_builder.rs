use super::cancel::CancellationToken;
use super::config::{ConfigError, FieldConfig, SurfaceType};
use super::error::SurfaceError;
use super::progress::{Progress, ProgressReporter};
use super::tasks::accessible_volume::{self, AccessibleVolumeParams};
use super::tasks::{smoothing, sphere_distance};
use crate::core::models::atoms::{AtomSet, NumericWarning};
use crate::core::models::field::ScalarField;
use crate::core::models::grid::Grid;
use crate::core::spatial::SpatialIndex;
use tracing::{debug, info, instrument, warn};

/// A sampled field together with the atoms that were left out of it.
#[derive(Debug, Clone)]
pub struct FieldOutput {
    pub field: ScalarField,
    pub warnings: Vec<NumericWarning>,
}

/// Samples the surface field of `atoms` on every vertex of `grid`.
///
/// The field is negative inside the surface and positive outside, so the surface itself is the
/// zero isolevel. Vertices beyond the cutoff of every atom hold
/// [`FAR_OUTSIDE`](crate::core::models::field::FAR_OUTSIDE). Atoms with non-finite values or
/// non-positive radii are skipped and reported in [`FieldOutput::warnings`].
///
/// `index` must have been built over `atoms` with a cell size of at least
/// [`FieldConfig::influence_radius`] for the effective cutoff on `grid`.
///
/// # Errors
///
/// Returns [`ConfigError::IndexTooCoarse`] when the index cannot answer the required queries
/// within its neighbourhood bound, and [`SurfaceError::Cancelled`] when `cancel` fires.
#[instrument(skip_all, name = "compute_field", fields(surface = %config.surface_type))]
pub fn compute_field(
    atoms: &AtomSet,
    index: &SpatialIndex,
    grid: &Grid,
    config: &FieldConfig,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<FieldOutput, SurfaceError> {
    let warnings = atoms.screen();
    for warning in &warnings {
        warn!("Skipping atom: {}", warning);
    }

    if atoms.usable().next().is_none() {
        info!("No usable atoms; every vertex is far outside.");
        return Ok(FieldOutput {
            field: ScalarField::far_outside(grid.clone(), config.set_atom_id),
            warnings,
        });
    }

    let cutoff = config.effective_cutoff(grid);
    let required = config.influence_radius(atoms.max_radius(), cutoff);
    if index.cell_size() < required {
        return Err(ConfigError::IndexTooCoarse {
            required,
            actual: index.cell_size(),
        }
        .into());
    }
    debug!(cutoff, influence_radius = required, "Field parameters resolved");

    reporter.report(Progress::PhaseStart {
        name: "Field synthesis",
    });
    let probe_radius = config.effective_probe_radius();
    let (values, ids) = match config.surface_type {
        SurfaceType::Vdw | SurfaceType::Sas => {
            sphere_distance::run(atoms, index, grid, probe_radius, cutoff, reporter, cancel)?
        }
        SurfaceType::Ses => {
            let params = AccessibleVolumeParams {
                probe_radius,
                cutoff,
                probe_positions: config.probe_positions,
            };
            accessible_volume::run(atoms, index, grid, &params, reporter, cancel)?
        }
    };
    reporter.report(Progress::PhaseFinish);

    let mut values = if config.smooth > 0 {
        reporter.report(Progress::PhaseStart { name: "Smoothing" });
        let smoothed = smoothing::run(grid, values, config.smooth, reporter, cancel)?;
        reporter.report(Progress::PhaseFinish);
        smoothed
    } else {
        values
    };
    if config.contour {
        smoothing::binarize(&mut values);
    }

    let atom_ids = config.set_atom_id.then(|| {
        ids.into_iter()
            .map(|id| {
                usize::try_from(id)
                    .ok()
                    .and_then(|i| i32::try_from(atoms.external_index(i)).ok())
                    .unwrap_or(-1)
            })
            .collect()
    });

    let field = ScalarField::new(grid.clone(), values, atom_ids)?;
    info!(
        vertices = grid.len(),
        excluded_atoms = warnings.len(),
        "Scalar field computed."
    );
    Ok(FieldOutput { field, warnings })
}
