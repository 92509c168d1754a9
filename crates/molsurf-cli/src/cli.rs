use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "molsurf CLI - Builds van der Waals, solvent-accessible and solvent-excluded surface meshes for molecular structures.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a surface mesh for an XYZR atom file and write it as Wavefront OBJ.
    Surface(SurfaceArgs),
    /// Summarize an XYZR atom file and the sampling grid a surface run would allocate.
    Inspect(InspectArgs),
}

/// Arguments for the `surface` subcommand.
#[derive(Args, Debug)]
pub struct SurfaceArgs {
    // --- Core Arguments ---
    /// Path to the input atom file (x y z radius|element [id] per line).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output mesh (Wavefront OBJ).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Field Overrides ---
    /// Surface type: vdw, sas, ses (aliases: ms, av).
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub surface_type: Option<String>,

    /// Override the probe radius in Å.
    #[arg(short, long, value_name = "FLOAT")]
    pub probe_radius: Option<f32>,

    /// Override the grid resolution in points per Å.
    #[arg(short, long, value_name = "FLOAT")]
    pub scale_factor: Option<f32>,

    /// Override the influence cutoff beyond each atom's surface in Å.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f32>,

    /// Override the number of box-filter passes applied to the field.
    #[arg(long, value_name = "INT")]
    pub smooth: Option<u32>,

    /// Emit contour lines on the grid slices from a binarized field instead of triangles.
    #[arg(long)]
    pub contour: bool,

    /// Do not record the originating atom of each mesh vertex.
    #[arg(long)]
    pub no_atom_ids: bool,

    // --- Extraction Overrides ---
    /// Override the isolevel at which the surface is extracted.
    #[arg(long, value_name = "FLOAT", allow_negative_numbers = true)]
    pub isolevel: Option<f32>,

    /// Do not compute vertex normals.
    #[arg(long)]
    pub no_normals: bool,

    /// Treat the grid as periodic when extracting the surface.
    #[arg(long)]
    pub wrap: bool,

    /// Only triangulate inside a cube centred here (requires --box-size).
    #[arg(
        long,
        value_name = "X,Y,Z",
        value_delimiter = ',',
        allow_negative_numbers = true,
        requires = "box_size"
    )]
    pub box_center: Option<Vec<f32>>,

    /// Edge length of the triangulation cube in Å.
    #[arg(long, value_name = "FLOAT", requires = "box_center")]
    pub box_size: Option<f32>,

    // --- Resource Overrides ---
    /// Override the maximum number of grid points.
    #[arg(long, value_name = "INT")]
    pub max_grid_points: Option<u64>,

    /// Coarsen the grid instead of failing when it exceeds the point budget.
    #[arg(long)]
    pub fit_to_budget: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S surface.probe-radius=1.2
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the input atom file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Surface type used to size the grid.
    #[arg(short = 't', long = "type", value_name = "TYPE", default_value = "ses")]
    pub surface_type: String,

    /// Probe radius in Å used to size the grid.
    #[arg(short, long, value_name = "FLOAT")]
    pub probe_radius: Option<f32>,

    /// Grid resolution in points per Å.
    #[arg(short, long, value_name = "FLOAT")]
    pub scale_factor: Option<f32>,
}
