//! # Workflows Module
//!
//! End-to-end entry points that turn an atom set into a surface mesh.
//!
//! ## Overview
//!
//! A workflow owns everything a surface request needs: it derives the sampling grid from the
//! atoms and the configuration, builds the spatial index, samples the field and triangulates
//! it, reporting each [`PipelineStage`](crate::engine::state::PipelineStage) as it is reached.
//! Callers that need finer control can run the individual stages from [`crate::engine`]
//! themselves.
//!
//! ## Architecture
//!
//! - **Surface Workflow** ([`surface`]) - `Idle → IndexBuilt → FieldComputed → Triangulated`,
//!   with the mesh returned in world coordinates

pub mod surface;
