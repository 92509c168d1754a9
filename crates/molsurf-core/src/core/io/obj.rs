use crate::core::io::traits::MeshFile;
use crate::core::models::mesh::Mesh;
use std::io::{self, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Mesh index {index} is out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
}

/// Wavefront OBJ writer.
///
/// Emits `v` and `vn` records followed by `f` faces, or `l` line elements for contour meshes.
/// OBJ indices are 1-based.
pub struct ObjFile;

impl MeshFile for ObjFile {
    type Error = ObjError;

    fn write_to(mesh: &Mesh, writer: &mut impl Write) -> Result<(), Self::Error> {
        let vertices = mesh.vertex_count();
        if let Some(index) = mesh.indices.iter().find(|&i| i as usize >= vertices) {
            return Err(ObjError::IndexOutOfRange { index, vertices });
        }

        let kind = if mesh.contour { "segments" } else { "triangles" };
        writeln!(
            writer,
            "# molsurf mesh: {} vertices, {} {}",
            vertices,
            mesh.primitive_count(),
            kind
        )?;

        for p in mesh.positions.chunks_exact(3) {
            writeln!(writer, "v {} {} {}", p[0], p[1], p[2])?;
        }
        let has_normals = match &mesh.normals {
            Some(normals) => {
                for n in normals.chunks_exact(3) {
                    writeln!(writer, "vn {} {} {}", n[0], n[1], n[2])?;
                }
                true
            }
            None => false,
        };

        let arity = mesh.primitive_arity();
        let indices = mesh.indices.to_u32();
        for prim in indices.chunks_exact(arity) {
            if mesh.contour {
                writeln!(writer, "l {} {}", prim[0] + 1, prim[1] + 1)?;
            } else if has_normals {
                let [a, b, c] = [prim[0] + 1, prim[1] + 1, prim[2] + 1];
                writeln!(writer, "f {a}//{a} {b}//{b} {c}//{c}")?;
            } else {
                writeln!(writer, "f {} {} {}", prim[0] + 1, prim[1] + 1, prim[2] + 1)?;
            }
        }
        Ok(())
    }
}
