mod defaults;

use crate::cli::SurfaceArgs;
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use molsurf::engine::config::{self as core_config, SurfaceRegion, SurfaceType};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

// Unknown keys are ignored so that config files shared with other tools still load.

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct PartialFieldConfig {
    #[serde(rename = "type")]
    surface_type: Option<String>,
    probe_radius: Option<f32>,
    scale_factor: Option<f32>,
    cutoff: Option<f32>,
    smooth: Option<u32>,
    contour: Option<bool>,
    set_atom_id: Option<bool>,
    probe_positions: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone, Copy)]
struct PartialRegion {
    center: Option<[f32; 3]>,
    size: Option<f32>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct PartialExtractionConfig {
    isolevel: Option<f32>,
    no_normals: Option<bool>,
    wrap: Option<bool>,
    #[serde(rename = "box")]
    region: Option<PartialRegion>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case")]
struct PartialResourceConfig {
    max_grid_points: Option<u64>,
    fit_to_budget: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
pub struct PartialSurfaceConfig {
    surface: Option<PartialFieldConfig>,
    extraction: Option<PartialExtractionConfig>,
    resources: Option<PartialResourceConfig>,
}

impl PartialSurfaceConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Layers command-line overrides over the file values and fills the rest with defaults.
    pub fn merge_with_cli(mut self, args: &SurfaceArgs) -> Result<core_config::SurfaceConfig> {
        self.apply_set_values(&args.set_values)?;
        let defaults = DefaultsConfig::default();

        let field = self.surface.take().unwrap_or_default();
        let extraction = self.extraction.take().unwrap_or_default();
        let resources = self.resources.take().unwrap_or_default();

        let type_name = args
            .surface_type
            .as_ref()
            .or(field.surface_type.as_ref())
            .unwrap_or(&defaults.surface_type);
        let surface_type =
            SurfaceType::from_str(type_name).map_err(|e| CliError::Config(e.to_string()))?;

        let mut builder = core_config::SurfaceConfigBuilder::new()
            .surface_type(surface_type)
            .probe_radius(
                args.probe_radius
                    .or(field.probe_radius)
                    .unwrap_or(defaults.probe_radius),
            )
            .scale_factor(
                args.scale_factor
                    .or(field.scale_factor)
                    .unwrap_or(defaults.scale_factor),
            )
            .cutoff(args.cutoff.or(field.cutoff).unwrap_or(defaults.cutoff))
            .smooth(args.smooth.or(field.smooth).unwrap_or(defaults.smooth))
            .contour(args.contour || field.contour.unwrap_or(defaults.contour))
            .set_atom_id(!args.no_atom_ids && field.set_atom_id.unwrap_or(defaults.set_atom_id))
            .probe_positions(field.probe_positions.unwrap_or(defaults.probe_positions))
            .isolevel(
                args.isolevel
                    .or(extraction.isolevel)
                    .unwrap_or(defaults.isolevel),
            )
            .no_normals(args.no_normals || extraction.no_normals.unwrap_or(defaults.no_normals))
            .wrap(args.wrap || extraction.wrap.unwrap_or(defaults.wrap))
            .max_grid_points(
                args.max_grid_points
                    .or(resources.max_grid_points)
                    .unwrap_or(defaults.max_grid_points),
            )
            .fit_to_budget(
                args.fit_to_budget || resources.fit_to_budget.unwrap_or(defaults.fit_to_budget),
            );

        if let Some(region) = Self::merge_region(args, extraction.region)? {
            builder = builder.region(region);
        }

        builder.build().map_err(|e| CliError::Config(e.to_string()))
    }

    fn merge_region(
        args: &SurfaceArgs,
        file_region: Option<PartialRegion>,
    ) -> Result<Option<SurfaceRegion>> {
        if let (Some(center), Some(size)) = (&args.box_center, args.box_size) {
            let center: [f32; 3] = center.as_slice().try_into().map_err(|_| {
                CliError::Argument("--box-center takes exactly three values".to_string())
            })?;
            return Ok(Some(SurfaceRegion { center, size }));
        }
        match file_region {
            None => Ok(None),
            Some(PartialRegion {
                center: Some(center),
                size: Some(size),
            }) => Ok(Some(SurfaceRegion { center, size })),
            Some(_) => Err(CliError::Config(
                "`extraction.box` requires both `center` and `size`.".to_string(),
            )),
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "surface.type" => {
                    self.surface.get_or_insert_with(Default::default).surface_type = Some(value.to_string());
                }
                "surface.probe-radius" => {
                    self.surface.get_or_insert_with(Default::default).probe_radius = Some(parse(key, value)?);
                }
                "surface.scale-factor" => {
                    self.surface.get_or_insert_with(Default::default).scale_factor = Some(parse(key, value)?);
                }
                "surface.cutoff" => {
                    self.surface.get_or_insert_with(Default::default).cutoff = Some(parse(key, value)?);
                }
                "surface.smooth" => {
                    self.surface.get_or_insert_with(Default::default).smooth = Some(parse(key, value)?);
                }
                "surface.contour" => {
                    self.surface.get_or_insert_with(Default::default).contour = Some(parse(key, value)?);
                }
                "surface.set-atom-id" => {
                    self.surface.get_or_insert_with(Default::default).set_atom_id = Some(parse(key, value)?);
                }
                "surface.probe-positions" => {
                    self.surface.get_or_insert_with(Default::default).probe_positions =
                        Some(parse(key, value)?);
                }
                "extraction.isolevel" => {
                    self.extraction
                        .get_or_insert_with(Default::default)
                        .isolevel = Some(parse(key, value)?);
                }
                "extraction.no-normals" => {
                    self.extraction
                        .get_or_insert_with(Default::default)
                        .no_normals = Some(parse(key, value)?);
                }
                "extraction.wrap" => {
                    self.extraction.get_or_insert_with(Default::default).wrap =
                        Some(parse(key, value)?);
                }
                "resources.max-grid-points" => {
                    self.resources
                        .get_or_insert_with(Default::default)
                        .max_grid_points = Some(parse(key, value)?);
                }
                "resources.fit-to-budget" => {
                    self.resources
                        .get_or_insert_with(Default::default)
                        .fit_to_budget = Some(parse(key, value)?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let file_path = dir.path().join("molsurf.toml");
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn surface_args(extra: &[&str]) -> SurfaceArgs {
        let mut argv = vec!["molsurf", "surface", "-i", "in.xyzr", "-o", "out.obj"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Surface(args) => args,
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = PartialSurfaceConfig::default()
            .merge_with_cli(&surface_args(&[]))
            .unwrap();
        assert_eq!(config.field.surface_type, SurfaceType::Ses);
        assert_eq!(config.field.probe_radius, 1.4);
        assert_eq!(config.field.scale_factor, 2.0);
        assert!(config.field.set_atom_id);
        assert!(!config.field.contour);
        assert_eq!(config.isolevel, 0.0);
        assert!(config.region.is_none());
    }

    #[test]
    fn file_values_are_loaded_and_unknown_keys_ignored() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            color-scheme = "element"

            [surface]
            type = "sas"
            probe-radius = 1.2
            scale-factor = 3.0
            smooth = 2
            opacity = 0.5

            [extraction]
            isolevel = 0.25
            wrap = true
            box = { center = [1.0, 2.0, 3.0], size = 8.0 }

            [resources]
            max-grid-points = 500000
            "#,
        );
        let config = PartialSurfaceConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&surface_args(&[]))
            .unwrap();

        assert_eq!(config.field.surface_type, SurfaceType::Sas);
        assert_eq!(config.field.probe_radius, 1.2);
        assert_eq!(config.field.scale_factor, 3.0);
        assert_eq!(config.field.smooth, 2);
        assert_eq!(config.field.max_grid_points, 500_000);
        assert_eq!(config.isolevel, 0.25);
        assert!(config.wrap);
        assert_eq!(
            config.region,
            Some(SurfaceRegion {
                center: [1.0, 2.0, 3.0],
                size: 8.0
            })
        );
    }

    #[test]
    fn cli_arguments_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [surface]
            type = "sas"
            probe-radius = 1.2
            set-atom-id = true
            "#,
        );
        let args = surface_args(&[
            "-t",
            "vdw",
            "--probe-radius",
            "1.6",
            "--no-atom-ids",
            "--isolevel",
            "-0.5",
            "--box-center",
            "0,-1,2",
            "--box-size",
            "4",
        ]);
        let config = PartialSurfaceConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();

        assert_eq!(config.field.surface_type, SurfaceType::Vdw);
        assert_eq!(config.field.probe_radius, 1.6);
        assert!(!config.field.set_atom_id);
        assert_eq!(config.isolevel, -0.5);
        assert_eq!(
            config.region,
            Some(SurfaceRegion {
                center: [0.0, -1.0, 2.0],
                size: 4.0
            })
        );
    }

    #[test]
    fn box_center_takes_one_comma_separated_value() {
        let args = surface_args(&["--box-center", "1.5,-2,3", "--box-size", "6"]);
        assert_eq!(args.box_center, Some(vec![1.5, -2.0, 3.0]));
        let config = PartialSurfaceConfig::default().merge_with_cli(&args).unwrap();
        assert_eq!(
            config.region,
            Some(SurfaceRegion {
                center: [1.5, -2.0, 3.0],
                size: 6.0
            })
        );

        let args = surface_args(&["--box-center", "1,2", "--box-size", "6"]);
        assert!(matches!(
            PartialSurfaceConfig::default().merge_with_cli(&args),
            Err(CliError::Argument(_))
        ));
    }

    #[test]
    fn set_values_override_the_file() {
        let mut partial = PartialSurfaceConfig::from_toml("[surface]\ncutoff = 3.0\n").unwrap();
        partial
            .apply_set_values(&[
                "surface.cutoff=1.5".to_string(),
                "surface.type=ms".to_string(),
                "resources.fit-to-budget=true".to_string(),
            ])
            .unwrap();
        let config = partial.merge_with_cli(&surface_args(&[])).unwrap();
        assert_eq!(config.field.cutoff, 1.5);
        assert_eq!(config.field.surface_type, SurfaceType::Ses);
        assert!(config.field.fit_to_budget);
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        let mut partial = PartialSurfaceConfig::default();
        for bad in ["surface.cutoff", "surface.cutoff=abc", "surface.colour=red"] {
            let result = partial.apply_set_values(&[bad.to_string()]);
            assert!(matches!(result, Err(CliError::Config(_))), "{}", bad);
        }
    }

    #[test]
    fn invalid_values_surface_as_config_errors() {
        let partial = PartialSurfaceConfig::from_toml("[surface]\ntype = \"edt\"\n").unwrap();
        assert!(matches!(
            partial.merge_with_cli(&surface_args(&[])),
            Err(CliError::Config(_))
        ));

        let partial =
            PartialSurfaceConfig::from_toml("[surface]\nscale-factor = -1.0\n").unwrap();
        assert!(matches!(
            partial.merge_with_cli(&surface_args(&[])),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn incomplete_box_in_file_is_rejected() {
        let partial =
            PartialSurfaceConfig::from_toml("[extraction]\nbox = { size = 4.0 }\n").unwrap();
        assert!(matches!(
            partial.merge_with_cli(&surface_args(&[])),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn unreadable_file_is_a_parsing_error() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "[surface\ntype = ");
        assert!(matches!(
            PartialSurfaceConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
