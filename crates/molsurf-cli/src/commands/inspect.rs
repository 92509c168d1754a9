use crate::cli::InspectArgs;
use crate::error::{CliError, Result};
use molsurf::{
    core::{
        io::{traits::AtomFile, xyzr::XyzrFile},
        models::{atoms::AtomSet, grid::Grid},
    },
    engine::config::{DEFAULT_MAX_GRID_POINTS, SurfaceConfigBuilder, SurfaceType},
};
use std::str::FromStr;
use tracing::{info, warn};

/// What a surface run over an atom file would allocate.
#[derive(Debug, Clone, PartialEq)]
struct InspectionReport {
    atoms: usize,
    usable: usize,
    excluded: usize,
    max_radius: f32,
    extent: Option<([f32; 3], [f32; 3])>,
    dims: [usize; 3],
    grid_points: usize,
    within_budget: bool,
}

fn inspect(atoms: &AtomSet, args: &InspectArgs) -> Result<InspectionReport> {
    let surface_type =
        SurfaceType::from_str(&args.surface_type).map_err(|e| CliError::Config(e.to_string()))?;
    let mut builder = SurfaceConfigBuilder::new().surface_type(surface_type);
    if let Some(radius) = args.probe_radius {
        builder = builder.probe_radius(radius);
    }
    if let Some(factor) = args.scale_factor {
        builder = builder.scale_factor(factor);
    }
    let config = builder.build().map_err(|e| CliError::Config(e.to_string()))?;

    let warnings = atoms.screen();
    for warning in &warnings {
        warn!("{}", warning);
    }

    let bbox = atoms.bounding_box();
    let max_radius = atoms.max_radius();
    let grid = Grid::enclosing(
        bbox.as_ref(),
        config.field.grid_padding(max_radius),
        config.field.scale_factor,
        u64::MAX,
        false,
    )
    .map_err(|e| CliError::Argument(e.to_string()))?;

    Ok(InspectionReport {
        atoms: atoms.len(),
        usable: atoms.len() - warnings.len(),
        excluded: warnings.len(),
        max_radius,
        extent: bbox.map(|b| (b.min.coords.into(), b.max.coords.into())),
        dims: grid.dims(),
        grid_points: grid.len(),
        within_budget: grid.len() as u64 <= DEFAULT_MAX_GRID_POINTS,
    })
}

pub async fn run(args: InspectArgs) -> Result<()> {
    info!("Loading atoms from {:?}", &args.input);
    let (atoms, metadata) =
        XyzrFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;
    let report = inspect(&atoms, &args)?;

    println!("File:            {}", args.input.display());
    for line in &metadata.header {
        println!("  # {}", line);
    }
    println!(
        "Atoms:           {} ({} usable, {} excluded)",
        report.atoms, report.usable, report.excluded
    );
    println!("Largest radius:  {:.3} Å", report.max_radius);
    match report.extent {
        Some((min, max)) => println!(
            "Extent:          [{:.3}, {:.3}, {:.3}] to [{:.3}, {:.3}, {:.3}]",
            min[0], min[1], min[2], max[0], max[1], max[2]
        ),
        None => println!("Extent:          (no usable atoms)"),
    }
    let [nx, ny, nz] = report.dims;
    println!(
        "Grid ({}):       {}x{}x{} = {} points",
        args.surface_type, nx, ny, nz, report.grid_points
    );
    if report.within_budget {
        println!("Budget:          within the default of {}", DEFAULT_MAX_GRID_POINTS);
    } else {
        println!(
            "Budget:          exceeds the default of {}; pass --fit-to-budget or lower --scale-factor",
            DEFAULT_MAX_GRID_POINTS
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args(surface_type: &str, scale_factor: Option<f32>) -> InspectArgs {
        InspectArgs {
            input: PathBuf::from("atoms.xyzr"),
            surface_type: surface_type.to_string(),
            probe_radius: Some(1.0),
            scale_factor,
        }
    }

    fn two_atoms() -> AtomSet {
        AtomSet::new(
            vec![0.0, 4.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![1.5, 2.0],
            None,
        )
        .unwrap()
    }

    #[test]
    fn reports_atoms_and_grid() {
        let report = inspect(&two_atoms(), &args("sas", Some(2.0))).unwrap();
        assert_eq!(report.atoms, 2);
        assert_eq!(report.usable, 2);
        assert_eq!(report.excluded, 0);
        assert_eq!(report.max_radius, 2.0);
        assert_eq!(report.extent, Some(([0.0, 0.0, 0.0], [4.0, 0.0, 0.0])));
        assert_eq!(report.grid_points, report.dims.iter().product::<usize>());
        assert!(report.dims[0] > report.dims[1]);
        assert!(report.within_budget);
    }

    #[test]
    fn probe_widens_the_grid() {
        let vdw = inspect(&two_atoms(), &args("vdw", Some(2.0))).unwrap();
        let sas = inspect(&two_atoms(), &args("sas", Some(2.0))).unwrap();
        assert!(sas.grid_points > vdw.grid_points);
    }

    #[test]
    fn unusable_atoms_are_counted() {
        let atoms = AtomSet::new(
            vec![0.0, f32::NAN],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![1.5, 1.5],
            None,
        )
        .unwrap();
        let report = inspect(&atoms, &args("ses", None)).unwrap();
        assert_eq!(report.usable, 1);
        assert_eq!(report.excluded, 1);
    }

    #[test]
    fn unknown_surface_type_is_a_config_error() {
        let result = inspect(&two_atoms(), &args("edt", None));
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
