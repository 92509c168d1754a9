//! # Engine Module
//!
//! The computational stages of the surface pipeline: scalar-field synthesis over a sampling
//! grid and isosurface extraction from the sampled field.
//!
//! ## Overview
//!
//! Each stage is a pure function of immutable inputs. It owns the buffers it allocates and
//! hands them to the next stage by value, so independent invocations share no state. Long
//! loops are split into slabs that are checked against a [`cancel::CancellationToken`] and, with
//! the `parallel` feature, distributed over the rayon thread pool.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Surface type, probe radius, grid resolution and
//!   extraction parameters, assembled through a validating builder
//! - **Field Synthesis** ([`field_builder`]) - Signed distance fields for van der Waals and
//!   solvent-accessible surfaces, and the accessible-volume method for solvent-excluded ones
//! - **Isosurface Extraction** ([`marching_cubes`]) - Marching cubes with normals and atom
//!   attribution, or marching-squares contours per slice
//! - **Pipeline State** ([`state`]) - The stages a surface request passes through
//! - **Progress and Cancellation** ([`progress`], [`cancel`]) - Callback-based progress
//!   reporting and cooperative cancellation
//! - **Error Handling** ([`error`]) - Stage errors and their coarse classification

pub mod cancel;
pub mod config;
pub mod error;
pub mod field_builder;
pub mod marching_cubes;
pub mod progress;
pub mod state;
pub(crate) mod tasks;
