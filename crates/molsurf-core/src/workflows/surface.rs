use crate::core::models::atoms::{AtomSet, NumericWarning};
use crate::core::models::field::ScalarField;
use crate::core::models::grid::Grid;
use crate::core::models::mesh::Mesh;
use crate::core::spatial::SpatialIndex;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::SurfaceConfig;
use crate::engine::error::SurfaceError;
use crate::engine::field_builder::{self, FieldOutput};
use crate::engine::marching_cubes;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::PipelineStage;
use nalgebra::{Point3, Vector3};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct SurfaceResult {
    pub grid: Grid,
    pub field: ScalarField,
    /// Mesh in world coordinates.
    pub mesh: Mesh,
    /// Atoms left out of the surface.
    pub warnings: Vec<NumericWarning>,
}

/// Builds the surface of `atoms` described by `config`.
///
/// # Errors
///
/// Fails with [`SurfaceError::Resource`] before any field allocation when the grid would exceed
/// `config.field.max_grid_points`, with [`SurfaceError::Cancelled`] when `cancel` fires, and
/// with a configuration error for invalid inputs. No partial result is returned.
#[instrument(skip_all, name = "surface_workflow", fields(surface = %config.field.surface_type))]
pub fn run(
    atoms: &AtomSet,
    config: &SurfaceConfig,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<SurfaceResult, SurfaceError> {
    let mut stage = PipelineStage::Idle;
    reporter.report(Progress::StageReached(stage));

    // === Phase 1: Sampling grid and spatial index ===
    reporter.report(Progress::PhaseStart {
        name: "Spatial index",
    });
    let max_radius = atoms.max_radius();
    let bbox = atoms.bounding_box();
    let grid = Grid::enclosing(
        bbox.as_ref(),
        config.field.grid_padding(max_radius),
        config.field.scale_factor,
        config.field.max_grid_points,
        config.field.fit_to_budget,
    )?;
    if grid.scale_factor() < config.field.scale_factor {
        info!(
            "Scale factor reduced from {} to {:.3} to fit the grid budget.",
            config.field.scale_factor,
            grid.scale_factor()
        );
    }
    let [nx, ny, nz] = grid.dims();
    debug!("Sampling grid {}x{}x{} ({} points)", nx, ny, nz, grid.len());

    let cutoff = config.field.effective_cutoff(&grid);
    let index = SpatialIndex::build(atoms, config.field.influence_radius(max_radius, cutoff))?;
    reporter.report(Progress::PhaseFinish);
    stage = advance(stage, reporter, cancel)?;
    info!("Spatial index built over {} atoms.", index.len());

    // === Phase 2: Scalar field ===
    let FieldOutput { field, warnings } =
        field_builder::compute_field(atoms, &index, &grid, &config.field, reporter, cancel)?;
    stage = advance(stage, reporter, cancel)?;

    // === Phase 3: Isosurface ===
    reporter.report(Progress::PhaseStart {
        name: "Triangulation",
    });
    let triangulation = config.triangulation(&grid);
    let mut mesh = marching_cubes::triangulate(
        field.values(),
        grid.dims(),
        field.atom_ids(),
        &triangulation,
        cancel,
    )?;
    to_world(&mut mesh, &grid);
    reporter.report(Progress::PhaseFinish);
    stage = advance(stage, reporter, cancel)?;

    debug_assert!(stage.is_terminal());
    info!(
        "Surface complete: {} vertices, {} {}.",
        mesh.vertex_count(),
        mesh.primitive_count(),
        if mesh.contour { "segments" } else { "triangles" }
    );
    Ok(SurfaceResult {
        grid,
        field,
        mesh,
        warnings,
    })
}

/// Moves to the next stage unless the run was cancelled in the meantime.
fn advance(
    stage: PipelineStage,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<PipelineStage, SurfaceError> {
    if cancel.is_cancelled() {
        return Err(SurfaceError::Cancelled {
            stage: "pipeline",
        });
    }
    let next = stage.next().unwrap_or(stage);
    reporter.report(Progress::StageReached(next));
    Ok(next)
}

fn to_world(mesh: &mut Mesh, grid: &Grid) {
    for p in mesh.positions.chunks_exact_mut(3) {
        let w = grid.to_world_point(&Point3::new(p[0], p[1], p[2]));
        p.copy_from_slice(&[w.x, w.y, w.z]);
    }
    if let Some(normals) = mesh.normals.as_mut() {
        for n in normals.chunks_exact_mut(3) {
            let w = grid.to_world_normal(&Vector3::new(n[0], n[1], n[2]));
            n.copy_from_slice(&[w.x, w.y, w.z]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::field::FAR_OUTSIDE;
    use crate::engine::config::{SurfaceConfigBuilder, SurfaceRegion, SurfaceType};
    use crate::engine::error::ErrorKind;
    use std::f64::consts::PI;
    use std::sync::Mutex;

    const CENTRE: [f32; 3] = [10.0, -3.0, 5.0];

    fn single_atom() -> AtomSet {
        AtomSet::new(
            vec![CENTRE[0]],
            vec![CENTRE[1]],
            vec![CENTRE[2]],
            vec![1.5],
            None,
        )
        .unwrap()
    }

    fn two_atoms() -> AtomSet {
        AtomSet::new(
            vec![-1.5, 1.5],
            vec![0.0; 2],
            vec![0.0; 2],
            vec![1.6, 1.6],
            Some(vec![10, 20]),
        )
        .unwrap()
    }

    fn config(surface_type: SurfaceType) -> SurfaceConfigBuilder {
        SurfaceConfigBuilder::new()
            .surface_type(surface_type)
            .probe_radius(1.4)
            .scale_factor(4.0)
    }

    fn surface(atoms: &AtomSet, config: SurfaceConfigBuilder) -> SurfaceResult {
        run(
            atoms,
            &config.build().unwrap(),
            &ProgressReporter::new(),
            &CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn single_atom_sas_lies_on_the_grown_sphere() {
        let result = surface(&single_atom(), config(SurfaceType::Sas));
        let mesh = &result.mesh;
        assert!(mesh.triangle_count() > 0);

        let centre = Point3::from(CENTRE);
        let h = result.grid.max_spacing();
        for v in 0..mesh.vertex_count() {
            let offset = mesh.position(v) - centre;
            assert!((offset.norm() - 2.9).abs() < h, "vertex {} at {}", v, offset.norm());
            let n = mesh.normal(v).unwrap();
            assert!(n.dot(&offset.normalize()) > 0.9);
        }

        let analytic = 4.0 / 3.0 * PI * 2.9f64.powi(3);
        assert!((mesh.enclosed_volume() - analytic).abs() / analytic < 0.05);
    }

    #[test]
    fn surfaces_are_nested() {
        let atoms = two_atoms();
        let volume = |surface_type| {
            surface(&atoms, config(surface_type).scale_factor(5.0))
                .mesh
                .enclosed_volume()
        };
        let vdw = volume(SurfaceType::Vdw);
        let ses = volume(SurfaceType::Ses);
        let sas = volume(SurfaceType::Sas);
        assert!(vdw < ses, "vdw {} ses {}", vdw, ses);
        assert!(ses < sas, "ses {} sas {}", ses, sas);
    }

    #[test]
    fn mesh_atom_ids_are_external_ids_of_the_nearest_atom() {
        let atoms = AtomSet::new(
            vec![-5.0, 5.0],
            vec![0.0; 2],
            vec![0.0; 2],
            vec![1.5, 1.5],
            Some(vec![10, 20]),
        )
        .unwrap();
        let result = surface(&atoms, config(SurfaceType::Vdw));
        let ids = result.mesh.atom_index.as_ref().unwrap();
        for (v, &id) in ids.iter().enumerate() {
            let expected = if result.mesh.position(v).x < 0.0 { 10 } else { 20 };
            assert_eq!(id, expected);
        }
    }

    #[test]
    fn atom_ids_can_be_disabled() {
        let result = surface(&two_atoms(), config(SurfaceType::Vdw).set_atom_id(false));
        assert!(result.mesh.atom_index.is_none());
        assert!(result.field.atom_ids().is_none());
    }

    #[test]
    fn empty_atom_set_gives_an_empty_mesh() {
        let result = surface(&AtomSet::empty(), config(SurfaceType::Ses));
        assert_eq!(result.grid.dims(), [1, 1, 1]);
        assert!(result.field.values().iter().all(|&v| v == FAR_OUTSIDE));
        assert!(result.mesh.is_empty());
        assert_eq!(result.mesh.triangle_count(), 0);
    }

    #[test]
    fn unusable_atoms_are_reported() {
        let atoms = AtomSet::new(
            vec![0.0, f32::INFINITY],
            vec![0.0; 2],
            vec![0.0; 2],
            vec![1.5, 1.5],
            None,
        )
        .unwrap();
        let result = surface(&atoms, config(SurfaceType::Vdw));
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].atom(), 1);
        assert!(!result.mesh.is_empty());
    }

    #[test]
    fn oversized_grid_is_a_resource_error() {
        let config = config(SurfaceType::Sas).max_grid_points(100).build().unwrap();
        let err = run(
            &single_atom(),
            &config,
            &ProgressReporter::new(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
    }

    #[test]
    fn fit_to_budget_coarsens_the_grid() {
        let result = surface(
            &single_atom(),
            config(SurfaceType::Sas)
                .max_grid_points(20_000)
                .fit_to_budget(true),
        );
        assert!(result.grid.len() <= 20_000);
        assert!(result.grid.scale_factor() < 4.0);
        assert!(!result.mesh.is_empty());
    }

    #[test]
    fn cancelled_run_returns_no_result() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = run(
            &two_atoms(),
            &config(SurfaceType::Ses).build().unwrap(),
            &ProgressReporter::new(),
            &cancel,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let first = surface(&two_atoms(), config(SurfaceType::Ses));
        let second = surface(&two_atoms(), config(SurfaceType::Ses));
        assert_eq!(first.mesh, second.mesh);
        assert_eq!(first.field, second.field);
    }

    #[test]
    fn stages_are_reported_in_order() {
        let stages = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::StageReached(stage) = event {
                stages.lock().unwrap().push(stage);
            }
        }));
        run(
            &single_atom(),
            &config(SurfaceType::Vdw).build().unwrap(),
            &reporter,
            &CancellationToken::new(),
        )
        .unwrap();
        drop(reporter);
        assert_eq!(
            stages.into_inner().unwrap(),
            vec![
                PipelineStage::Idle,
                PipelineStage::IndexBuilt,
                PipelineStage::FieldComputed,
                PipelineStage::Triangulated
            ]
        );
    }

    #[test]
    fn region_limits_the_mesh() {
        let full = surface(&single_atom(), config(SurfaceType::Sas));
        let region = SurfaceRegion {
            center: [CENTRE[0] + 2.0, CENTRE[1], CENTRE[2]],
            size: 2.0,
        };
        let part = surface(&single_atom(), config(SurfaceType::Sas).region(region));
        assert!(!part.mesh.is_empty());
        assert!(part.mesh.triangle_count() < full.mesh.triangle_count());
        assert!(part.mesh.bounds().unwrap().min.x > CENTRE[0]);
    }

    #[test]
    fn contour_mode_yields_segments() {
        let result = surface(&single_atom(), config(SurfaceType::Vdw).contour(true));
        assert!(result.mesh.contour);
        assert!(result.mesh.normals.is_none());
        assert!(result.mesh.primitive_count() > 0);
        assert!(result.field.values().iter().all(|&v| v == -1.0 || v == 1.0));
    }
}
