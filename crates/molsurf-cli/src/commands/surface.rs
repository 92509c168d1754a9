use crate::cli::SurfaceArgs;
use crate::config::PartialSurfaceConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use molsurf::{
    core::io::{
        obj::ObjFile,
        traits::{AtomFile, MeshFile},
        xyzr::XyzrFile,
    },
    engine::{cancel::CancellationToken, progress::ProgressReporter},
    workflows,
};
use tracing::{info, warn};

pub async fn run(args: SurfaceArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialSurfaceConfig::from_file(path)?,
        None => PartialSurfaceConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let final_config = partial_config.merge_with_cli(&args)?;

    info!("Loading atoms from {:?}", &args.input);
    let (atoms, _metadata) =
        XyzrFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
            path: args.input.clone(),
            source: e.into(),
        })?;
    info!("Loaded {} atoms.", atoms.len());

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling the surface computation...");
                cancel.cancel();
            }
        })
    };

    println!(
        "Building {} surface for {} atoms...",
        final_config.field.surface_type,
        atoms.len()
    );
    info!("Invoking the core surface workflow...");

    let outcome = tokio::task::block_in_place(|| {
        workflows::surface::run(&atoms, &final_config, &reporter, &cancel)
    });
    interrupt.abort();
    let result = outcome?;

    for warning in &result.warnings {
        warn!("{}", warning);
    }
    if !result.warnings.is_empty() {
        println!(
            "Warning: {} atom(s) were excluded from the surface.",
            result.warnings.len()
        );
    }

    let [nx, ny, nz] = result.grid.dims();
    info!(
        "Sampled {}x{}x{} grid at {:.3} points/Å.",
        nx,
        ny,
        nz,
        result.grid.scale_factor()
    );

    let mesh = &result.mesh;
    if mesh.is_empty() {
        warn!("The isolevel does not cross the field; the mesh is empty.");
        println!("Warning: the surface is empty.");
    }

    info!("Writing mesh to {:?}", &args.output);
    ObjFile::write_to_path(mesh, &args.output).map_err(|e| CliError::FileWriting {
        path: args.output.clone(),
        source: e.into(),
    })?;

    if mesh.contour {
        println!(
            "✓ Contour with {} vertices and {} segments written to: {}",
            mesh.vertex_count(),
            mesh.primitive_count(),
            args.output.display()
        );
    } else {
        println!(
            "✓ Surface with {} vertices and {} triangles (enclosed volume {:.2} Å³) written to: {}",
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.enclosed_volume(),
            args.output.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn surface_args(input: &Path, output: &Path, extra: &[&str]) -> SurfaceArgs {
        let mut argv = vec![
            "molsurf".to_string(),
            "surface".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        argv.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(argv).command {
            Commands::Surface(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn writes_an_obj_mesh_for_a_small_molecule() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("water.xyzr");
        let output = dir.path().join("water.obj");
        fs::write(
            &input,
            "# water\n0.0 0.0 0.0 O\n0.96 0.0 0.0 1.1\n-0.24 0.93 0.0 1.1\n",
        )
        .unwrap();

        run(surface_args(&input, &output, &["-t", "sas", "-s", "3"]))
            .await
            .unwrap();

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.starts_with("# molsurf mesh:"));
        assert!(content.lines().any(|l| l.starts_with("v ")));
        assert!(content.lines().any(|l| l.starts_with("vn ")));
        assert!(content.lines().any(|l| l.starts_with("f ")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn contour_mode_writes_line_elements() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("atom.xyzr");
        let output = dir.path().join("atom.obj");
        fs::write(&input, "1.0 2.0 3.0 1.8\n").unwrap();

        run(surface_args(&input, &output, &["-t", "vdw", "--contour"]))
            .await
            .unwrap();

        let content = fs::read_to_string(&output).unwrap();
        assert!(content.lines().any(|l| l.starts_with("l ")));
        assert!(!content.lines().any(|l| l.starts_with("f ")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_input_is_a_parsing_error() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("bad.xyzr");
        let output = dir.path().join("bad.obj");
        fs::write(&input, "1.0 2.0\n").unwrap();

        let result = run(surface_args(&input, &output, &[])).await;
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
        assert!(!output.exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn budget_overrun_is_reported_without_writing() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("atom.xyzr");
        let output = dir.path().join("atom.obj");
        fs::write(&input, "0.0 0.0 0.0 2.0\n").unwrap();

        let result = run(surface_args(&input, &output, &["--max-grid-points", "64"])).await;
        assert!(matches!(result, Err(CliError::Surface(_))));
        assert!(!output.exists());
    }
}
