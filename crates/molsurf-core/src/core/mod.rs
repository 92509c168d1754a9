//! # Core Module
//!
//! Fundamental building blocks of the surface pipeline: the data model shared by every stage,
//! the spatial index used for radius-aware neighbour queries, and small I/O and geometry
//! helpers.
//!
//! ## Architecture
//!
//! - **Data Model** ([`models`]) - Atom sets, sampling grids, scalar fields, meshes and the
//!   van der Waals radii table
//! - **Spatial Indexing** ([`spatial`]) - Uniform-grid bucketing of atoms with bounded
//!   3×3×3 neighbourhood queries
//! - **File I/O** ([`io`]) - XYZR atom input and Wavefront OBJ mesh output
//! - **Geometry** ([`utils`]) - Bounding boxes and vector helpers
//!
//! All types here are plain values: they are created once per pipeline run and never mutated
//! by a later stage.

pub mod io;
pub mod models;
pub mod spatial;
pub mod utils;
