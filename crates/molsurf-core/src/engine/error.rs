use super::config::ConfigError;
use crate::core::models::atoms::AtomSetError;
use crate::core::models::field::FieldError;
use crate::core::models::grid::GridError;
use crate::core::spatial::SpatialIndexError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Invalid atom set: {0}")]
    AtomSet(#[from] AtomSetError),

    #[error("Invalid grid: {0}")]
    Grid(GridError),

    #[error("Spatial index error: {0}")]
    SpatialIndex(#[from] SpatialIndexError),

    #[error("Invalid field: {0}")]
    Field(#[from] FieldError),

    #[error("Requested grid of {requested} points exceeds the budget of {budget} points")]
    Resource { requested: u64, budget: u64 },

    #[error("Computation cancelled during {stage}")]
    Cancelled { stage: &'static str },
}

/// Coarse classification of a [`SurfaceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input or parameters; nothing was computed.
    Configuration,
    /// The request exceeded the grid budget; nothing was computed.
    Resource,
    Cancelled,
}

impl SurfaceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resource { .. } => ErrorKind::Resource,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            _ => ErrorKind::Configuration,
        }
    }
}

impl From<GridError> for SurfaceError {
    fn from(err: GridError) -> Self {
        match err {
            GridError::BudgetExceeded { requested, budget } => Self::Resource { requested, budget },
            other => Self::Grid(other),
        }
    }
}
