//! Plain-text input of atom sets and output of meshes.
//!
//! Readers and writers implement the [`traits::AtomFile`] and [`traits::MeshFile`] seams so
//! that front ends can pick a format without knowing its details.

pub mod obj;
pub mod traits;
pub mod xyzr;
