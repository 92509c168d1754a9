use crate::core::models::grid::{Grid, GridBox};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Grid points allowed by default: the viewer's limit of 256·10⁶ floats spread over three
/// per-vertex arrays.
pub const DEFAULT_MAX_GRID_POINTS: u64 = 256_000_000 / 3;

pub const DEFAULT_PROBE_RADIUS: f32 = 1.4;
pub const DEFAULT_SCALE_FACTOR: f32 = 2.0;
pub const DEFAULT_CUTOFF: f32 = 2.0;
pub const DEFAULT_PROBE_POSITIONS: usize = 30;

/// The cutoff is raised to at least this many grid cells.
pub const MIN_CUTOFF_CELLS: f32 = 2.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error("Array '{array}' has {actual} entries but {expected} were expected")]
    LengthMismatch {
        array: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Grid dimensions must be at least 1 along every axis (got {0:?})")]
    DegenerateDimensions([usize; 3]),
    #[error("Spatial index cell size {actual:.3} is smaller than the required influence radius {required:.3}")]
    IndexTooCoarse { required: f32, actual: f32 },
    #[error("Unknown surface type '{0}' (expected vdw, sas, ses, ms or av)")]
    UnknownSurfaceType(String),
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceType {
    /// Union of van der Waals spheres.
    Vdw,
    /// Union of spheres grown by the probe radius.
    Sas,
    /// Surface traced by the inner face of a rolling probe (accessible-volume method).
    #[serde(alias = "ms", alias = "av")]
    Ses,
}

impl SurfaceType {
    /// Whether the probe radius takes part in the surface definition.
    pub fn uses_probe(&self) -> bool {
        !matches!(self, Self::Vdw)
    }
}

impl fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vdw => "vdw",
            Self::Sas => "sas",
            Self::Ses => "ses",
        };
        f.write_str(name)
    }
}

impl FromStr for SurfaceType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vdw" => Ok(Self::Vdw),
            "sas" => Ok(Self::Sas),
            "ses" | "ms" | "av" => Ok(Self::Ses),
            other => Err(ConfigError::UnknownSurfaceType(other.to_string())),
        }
    }
}

/// Parameters of scalar-field synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    pub surface_type: SurfaceType,
    pub probe_radius: f32,
    /// Grid points per Å.
    pub scale_factor: f32,
    /// Distance beyond an atom's surface over which it still contributes, in Å.
    pub cutoff: f32,
    pub set_atom_id: bool,
    /// Box-filter passes applied to the finished field.
    pub smooth: u32,
    /// Binarize the field to inside/outside membership.
    pub contour: bool,
    /// Probe placements per atom pair on the torus pass.
    pub probe_positions: usize,
    pub max_grid_points: u64,
    pub fit_to_budget: bool,
}

impl FieldConfig {
    /// Probe radius as seen by the surface type (zero for van der Waals surfaces).
    pub fn effective_probe_radius(&self) -> f32 {
        if self.surface_type.uses_probe() {
            self.probe_radius
        } else {
            0.0
        }
    }

    /// Cutoff raised to at least [`MIN_CUTOFF_CELLS`] cells of `grid`.
    pub fn effective_cutoff(&self, grid: &Grid) -> f32 {
        self.cutoff.max(MIN_CUTOFF_CELLS * grid.max_spacing())
    }

    /// Padding around the atom bounding box before grid margins are added.
    pub fn grid_padding(&self, max_radius: f32) -> f32 {
        max_radius + self.effective_probe_radius()
    }

    /// Smallest spatial-index cell size that lets every field query stay within 27 cells.
    pub fn influence_radius(&self, max_radius: f32, cutoff: f32) -> f32 {
        let p = self.effective_probe_radius();
        match self.surface_type {
            SurfaceType::Vdw | SurfaceType::Sas => max_radius + p + cutoff,
            // The torus pass pairs atoms whose expanded spheres intersect.
            SurfaceType::Ses => (max_radius + p + cutoff).max(2.0 * (max_radius + p)),
        }
    }
}

/// World-space cube restricting triangulation to part of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRegion {
    pub center: [f32; 3],
    pub size: f32,
}

/// Parameters of isosurface extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangulationConfig {
    pub isolevel: f32,
    pub no_normals: bool,
    /// Only cubes whose lower corner lies in this box are visited.
    pub grid_box: Option<GridBox>,
    /// Emit isoline segments on the x-, y- and z-slices instead of triangles.
    pub contour: bool,
    /// Treat the grid as periodic.
    pub wrap: bool,
}

impl Default for TriangulationConfig {
    fn default() -> Self {
        Self {
            isolevel: 0.0,
            no_normals: false,
            grid_box: None,
            contour: false,
            wrap: false,
        }
    }
}

/// Complete configuration of one surface pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    pub field: FieldConfig,
    pub isolevel: f32,
    pub no_normals: bool,
    pub region: Option<SurfaceRegion>,
    pub wrap: bool,
}

impl SurfaceConfig {
    /// Extraction parameters for a field sampled on `grid`.
    pub fn triangulation(&self, grid: &Grid) -> TriangulationConfig {
        let grid_box = self.region.map(|region| {
            let center = Point3::from(region.center);
            grid.box_around(&center, region.size)
        });
        TriangulationConfig {
            isolevel: self.isolevel,
            no_normals: self.no_normals || self.field.contour,
            grid_box,
            contour: self.field.contour,
            wrap: self.wrap,
        }
    }
}

#[derive(Default)]
pub struct SurfaceConfigBuilder {
    surface_type: Option<SurfaceType>,
    probe_radius: Option<f32>,
    scale_factor: Option<f32>,
    cutoff: Option<f32>,
    set_atom_id: Option<bool>,
    smooth: Option<u32>,
    contour: Option<bool>,
    probe_positions: Option<usize>,
    max_grid_points: Option<u64>,
    fit_to_budget: Option<bool>,
    isolevel: Option<f32>,
    no_normals: Option<bool>,
    region: Option<SurfaceRegion>,
    wrap: Option<bool>,
}

impl SurfaceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface_type(mut self, surface_type: SurfaceType) -> Self {
        self.surface_type = Some(surface_type);
        self
    }
    pub fn probe_radius(mut self, radius: f32) -> Self {
        self.probe_radius = Some(radius);
        self
    }
    pub fn scale_factor(mut self, factor: f32) -> Self {
        self.scale_factor = Some(factor);
        self
    }
    pub fn cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn set_atom_id(mut self, enabled: bool) -> Self {
        self.set_atom_id = Some(enabled);
        self
    }
    pub fn smooth(mut self, passes: u32) -> Self {
        self.smooth = Some(passes);
        self
    }
    pub fn contour(mut self, enabled: bool) -> Self {
        self.contour = Some(enabled);
        self
    }
    pub fn probe_positions(mut self, count: usize) -> Self {
        self.probe_positions = Some(count);
        self
    }
    pub fn max_grid_points(mut self, points: u64) -> Self {
        self.max_grid_points = Some(points);
        self
    }
    pub fn fit_to_budget(mut self, enabled: bool) -> Self {
        self.fit_to_budget = Some(enabled);
        self
    }
    pub fn isolevel(mut self, isolevel: f32) -> Self {
        self.isolevel = Some(isolevel);
        self
    }
    pub fn no_normals(mut self, enabled: bool) -> Self {
        self.no_normals = Some(enabled);
        self
    }
    pub fn region(mut self, region: SurfaceRegion) -> Self {
        self.region = Some(region);
        self
    }
    pub fn wrap(mut self, enabled: bool) -> Self {
        self.wrap = Some(enabled);
        self
    }

    pub fn build(self) -> Result<SurfaceConfig, ConfigError> {
        let surface_type = self
            .surface_type
            .ok_or(ConfigError::MissingParameter("surface_type"))?;

        let probe_radius = self.probe_radius.unwrap_or(DEFAULT_PROBE_RADIUS);
        if !probe_radius.is_finite() || probe_radius < 0.0 {
            return Err(invalid("probe_radius", format!("must be >= 0, got {}", probe_radius)));
        }
        let scale_factor = self.scale_factor.unwrap_or(DEFAULT_SCALE_FACTOR);
        if !scale_factor.is_finite() || scale_factor <= 0.0 {
            return Err(invalid("scale_factor", format!("must be > 0, got {}", scale_factor)));
        }
        let cutoff = self.cutoff.unwrap_or(DEFAULT_CUTOFF);
        if !cutoff.is_finite() || cutoff < 0.0 {
            return Err(invalid("cutoff", format!("must be >= 0, got {}", cutoff)));
        }
        let probe_positions = self.probe_positions.unwrap_or(DEFAULT_PROBE_POSITIONS);
        if probe_positions == 0 {
            return Err(invalid("probe_positions", "must be at least 1"));
        }
        let max_grid_points = self.max_grid_points.unwrap_or(DEFAULT_MAX_GRID_POINTS);
        if max_grid_points == 0 {
            return Err(invalid("max_grid_points", "must be at least 1"));
        }
        let isolevel = self.isolevel.unwrap_or(0.0);
        if !isolevel.is_finite() {
            return Err(invalid("isolevel", "must be finite"));
        }
        if let Some(region) = &self.region {
            if !region.size.is_finite() || region.size <= 0.0 {
                return Err(invalid("box", format!("size must be > 0, got {}", region.size)));
            }
            if region.center.iter().any(|c| !c.is_finite()) {
                return Err(invalid("box", "center must be finite"));
            }
        }

        Ok(SurfaceConfig {
            field: FieldConfig {
                surface_type,
                probe_radius,
                scale_factor,
                cutoff,
                set_atom_id: self.set_atom_id.unwrap_or(true),
                smooth: self.smooth.unwrap_or(0),
                contour: self.contour.unwrap_or(false),
                probe_positions,
                max_grid_points,
                fit_to_budget: self.fit_to_budget.unwrap_or(false),
            },
            isolevel,
            no_normals: self.no_normals.unwrap_or(false),
            region: self.region,
            wrap: self.wrap.unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_applies_defaults() {
        let config = SurfaceConfigBuilder::new()
            .surface_type(SurfaceType::Sas)
            .build()
            .unwrap();
        assert_eq!(config.field.probe_radius, DEFAULT_PROBE_RADIUS);
        assert_eq!(config.field.scale_factor, DEFAULT_SCALE_FACTOR);
        assert_eq!(config.field.cutoff, DEFAULT_CUTOFF);
        assert!(config.field.set_atom_id);
        assert_eq!(config.field.smooth, 0);
        assert_eq!(config.field.probe_positions, 30);
        assert_eq!(config.field.max_grid_points, DEFAULT_MAX_GRID_POINTS);
        assert_eq!(config.isolevel, 0.0);
        assert!(!config.wrap);
    }

    #[test]
    fn build_requires_surface_type() {
        let result = SurfaceConfigBuilder::new().build();
        assert_eq!(result, Err(ConfigError::MissingParameter("surface_type")));
    }

    #[test]
    fn build_rejects_invalid_values() {
        let base = || SurfaceConfigBuilder::new().surface_type(SurfaceType::Vdw);
        for (builder, name) in [
            (base().probe_radius(-1.0), "probe_radius"),
            (base().scale_factor(0.0), "scale_factor"),
            (base().cutoff(f32::NAN), "cutoff"),
            (base().probe_positions(0), "probe_positions"),
            (base().max_grid_points(0), "max_grid_points"),
            (base().isolevel(f32::INFINITY), "isolevel"),
            (
                base().region(SurfaceRegion {
                    center: [0.0; 3],
                    size: 0.0,
                }),
                "box",
            ),
        ] {
            match builder.build() {
                Err(ConfigError::InvalidParameter { name: got, .. }) => assert_eq!(got, name),
                other => panic!("expected invalid {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn surface_type_parses_aliases() {
        assert_eq!("ms".parse::<SurfaceType>(), Ok(SurfaceType::Ses));
        assert_eq!("AV".parse::<SurfaceType>(), Ok(SurfaceType::Ses));
        assert_eq!("vdw".parse::<SurfaceType>(), Ok(SurfaceType::Vdw));
        assert!(matches!(
            "edt".parse::<SurfaceType>(),
            Err(ConfigError::UnknownSurfaceType(_))
        ));
        assert_eq!(SurfaceType::Sas.to_string(), "sas");
    }

    #[test]
    fn effective_probe_radius_is_zero_for_vdw() {
        let config = SurfaceConfigBuilder::new()
            .surface_type(SurfaceType::Vdw)
            .probe_radius(1.4)
            .build()
            .unwrap();
        assert_eq!(config.field.effective_probe_radius(), 0.0);
        assert_eq!(config.field.influence_radius(2.0, 2.0), 4.0);
    }

    #[test]
    fn influence_radius_covers_atom_pairs_for_ses() {
        let config = SurfaceConfigBuilder::new()
            .surface_type(SurfaceType::Ses)
            .probe_radius(1.5)
            .build()
            .unwrap();
        assert_eq!(config.field.influence_radius(2.0, 1.0), 7.0);
        assert_eq!(config.field.influence_radius(2.0, 5.0), 8.5);
    }

    #[test]
    fn effective_cutoff_is_at_least_two_cells() {
        let config = SurfaceConfigBuilder::new()
            .surface_type(SurfaceType::Vdw)
            .cutoff(0.1)
            .build()
            .unwrap();
        let grid = Grid::new(Point3::origin(), nalgebra::Vector3::repeat(0.5), [2, 2, 2]).unwrap();
        assert_eq!(config.field.effective_cutoff(&grid), 1.0);
    }

    #[test]
    fn contour_disables_normals_for_triangulation() {
        let config = SurfaceConfigBuilder::new()
            .surface_type(SurfaceType::Vdw)
            .contour(true)
            .build()
            .unwrap();
        let grid = Grid::unit([4, 4, 4]).unwrap();
        let tri = config.triangulation(&grid);
        assert!(tri.contour);
        assert!(tri.no_normals);
        assert!(tri.grid_box.is_none());
    }
}
