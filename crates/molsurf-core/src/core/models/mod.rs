//! Value types flowing through the surface pipeline.
//!
//! Atom data and field data use a struct-of-arrays layout so that the hot loops touch
//! contiguous `f32` slices.

pub mod atoms;
pub mod field;
pub mod grid;
pub mod mesh;
pub mod radii;
