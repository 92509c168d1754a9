//! Uniform-grid bucketing of atoms for radius-aware neighbour queries.
//!
//! The cell edge is at least the largest distance any query may reach, so every true
//! neighbour of a query point lies in the 3×3×3 block of cells around it.

mod index;

pub use index::{QueryStats, SpatialIndex, SpatialIndexError};
