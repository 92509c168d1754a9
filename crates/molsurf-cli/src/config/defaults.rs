use molsurf::engine::config::{
    DEFAULT_CUTOFF, DEFAULT_MAX_GRID_POINTS, DEFAULT_PROBE_POSITIONS, DEFAULT_PROBE_RADIUS,
    DEFAULT_SCALE_FACTOR,
};

/// Values used when neither the command line nor the config file sets an option.
pub struct DefaultsConfig {
    pub surface_type: String,
    pub probe_radius: f32,
    pub scale_factor: f32,
    pub cutoff: f32,
    pub smooth: u32,
    pub contour: bool,
    pub set_atom_id: bool,
    pub probe_positions: usize,
    pub isolevel: f32,
    pub no_normals: bool,
    pub wrap: bool,
    pub max_grid_points: u64,
    pub fit_to_budget: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            surface_type: "ses".to_string(),
            probe_radius: DEFAULT_PROBE_RADIUS,
            scale_factor: DEFAULT_SCALE_FACTOR,
            cutoff: DEFAULT_CUTOFF,
            smooth: 0,
            contour: false,
            set_atom_id: true,
            probe_positions: DEFAULT_PROBE_POSITIONS,
            isolevel: 0.0,
            no_normals: false,
            wrap: false,
            max_grid_points: DEFAULT_MAX_GRID_POINTS,
            fit_to_budget: false,
        }
    }
}
