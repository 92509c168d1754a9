//! # molsurf Core Library
//!
//! Molecular surface construction for structure viewers: a uniform-grid spatial index over
//! atoms, scalar fields describing van der Waals, solvent-accessible and solvent-excluded
//! surfaces, and marching-cubes extraction of a triangle mesh from those fields.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture so that each piece can be tested on its own.
//!
//! - **[`core`]: The Foundation.** Immutable value types (`AtomSet`, `Grid`, `ScalarField`,
//!   `Mesh`), the `SpatialIndex` used for neighbour queries, a van der Waals radii table and
//!   simple text I/O.
//!
//! - **[`engine`]: The Logic Core.** Configuration, error types, progress and cancellation,
//!   the field-synthesis tasks and the marching-cubes extractor. Every stage is a pure function
//!   of its inputs and owns the buffers it produces.
//!
//! - **[`workflows`]: The Public API.** Ties `core` and `engine` together into the
//!   `Idle → IndexBuilt → FieldComputed → Triangulated` pipeline.

pub mod core;
pub mod engine;
pub mod workflows;
