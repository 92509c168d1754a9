use crate::core::utils::geometry::BoundingBox;
use nalgebra::{Point3, Vector3};

/// Index buffer sized to the vertex count: 16-bit when every index fits, 32-bit otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshIndices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl MeshIndices {
    /// Narrows `indices` to `u16` when `vertex_count` allows it.
    pub fn for_vertex_count(indices: Vec<u32>, vertex_count: usize) -> Self {
        if vertex_count <= u16::MAX as usize {
            Self::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            Self::U32(indices)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U16(v) => v.len(),
            Self::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> u32 {
        match self {
            Self::U16(v) => v[i] as u32,
            Self::U32(v) => v[i],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn to_u32(&self) -> Vec<u32> {
        self.iter().collect()
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, Self::U32(_))
    }
}

impl Default for MeshIndices {
    fn default() -> Self {
        Self::U16(Vec::new())
    }
}

/// Output of isosurface extraction.
///
/// `positions` and `normals` are flat `f32` triples. `indices` holds triangle triples, or
/// segment pairs when `contour` is set. `atom_index` has one entry per vertex.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mesh {
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    pub indices: MeshIndices,
    pub atom_index: Option<Vec<i32>>,
    pub contour: bool,
}

impl Mesh {
    pub fn new(
        positions: Vec<f32>,
        normals: Option<Vec<f32>>,
        indices: Vec<u32>,
        atom_index: Option<Vec<i32>>,
        contour: bool,
    ) -> Self {
        let vertex_count = positions.len() / 3;
        Self {
            positions,
            normals,
            indices: MeshIndices::for_vertex_count(indices, vertex_count),
            atom_index,
            contour,
        }
    }

    pub fn empty(contour: bool) -> Self {
        Self {
            contour,
            ..Self::default()
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    /// Number of vertices per primitive: 2 for contour segments, 3 for triangles.
    #[inline]
    pub fn primitive_arity(&self) -> usize {
        if self.contour { 2 } else { 3 }
    }

    /// Triangles, or segments in contour mode.
    #[inline]
    pub fn primitive_count(&self) -> usize {
        self.indices.len() / self.primitive_arity()
    }

    pub fn triangle_count(&self) -> usize {
        if self.contour { 0 } else { self.primitive_count() }
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[inline]
    pub fn position(&self, v: usize) -> Point3<f32> {
        Point3::new(
            self.positions[3 * v],
            self.positions[3 * v + 1],
            self.positions[3 * v + 2],
        )
    }

    pub fn normal(&self, v: usize) -> Option<Vector3<f32>> {
        self.normals
            .as_ref()
            .map(|n| Vector3::new(n[3 * v], n[3 * v + 1], n[3 * v + 2]))
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let count = self.triangle_count();
        (0..count).map(move |t| {
            [
                self.indices.get(3 * t),
                self.indices.get(3 * t + 1),
                self.indices.get(3 * t + 2),
            ]
        })
    }

    /// True when every index refers to an existing vertex.
    pub fn indices_in_bounds(&self) -> bool {
        let n = self.vertex_count() as u32;
        self.indices.iter().all(|i| i < n)
    }

    /// Signed volume enclosed by the triangles (divergence theorem).
    ///
    /// Positive for a closed mesh wound counter-clockwise seen from outside. Accumulated in
    /// `f64`; zero in contour mode.
    pub fn enclosed_volume(&self) -> f64 {
        self.triangles()
            .map(|[a, b, c]| {
                let pa = self.position(a as usize).cast::<f64>().coords;
                let pb = self.position(b as usize).cast::<f64>().coords;
                let pc = self.position(c as usize).cast::<f64>().coords;
                pa.dot(&pb.cross(&pc))
            })
            .sum::<f64>()
            / 6.0
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points((0..self.vertex_count()).map(|v| self.position(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrahedron() -> Mesh {
        let positions = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0,
        ];
        // counter-clockwise seen from outside
        let indices = vec![0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3];
        Mesh::new(positions, None, indices, None, false)
    }

    #[test]
    fn small_meshes_use_16_bit_indices() {
        let mesh = tetrahedron();
        assert!(!mesh.indices.is_wide());
        assert_eq!(mesh.indices.get(5), 3);
    }

    #[test]
    fn large_meshes_use_32_bit_indices() {
        let indices = MeshIndices::for_vertex_count(vec![0, 70_000], 70_001);
        assert!(indices.is_wide());
        assert_eq!(indices.to_u32(), vec![0, 70_000]);
    }

    #[test]
    fn counts_follow_primitive_arity() {
        let mesh = tetrahedron();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.primitive_count(), 4);
        assert_eq!(mesh.triangle_count(), 4);

        let segments = Mesh::new(vec![0.0; 9], None, vec![0, 1, 1, 2], None, true);
        assert_eq!(segments.primitive_count(), 2);
        assert_eq!(segments.triangle_count(), 0);
    }

    #[test]
    fn enclosed_volume_of_unit_tetrahedron() {
        let volume = tetrahedron().enclosed_volume();
        assert!((volume - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn indices_in_bounds_detects_dangling_index() {
        assert!(tetrahedron().indices_in_bounds());
        let broken = Mesh::new(vec![0.0; 6], None, vec![0, 1, 2], None, false);
        assert!(!broken.indices_in_bounds());
    }

    #[test]
    fn bounds_cover_all_vertices() {
        let bounds = tetrahedron().bounds().unwrap();
        assert_eq!(bounds.min, Point3::origin());
        assert_eq!(bounds.max, Point3::new(1.0, 1.0, 1.0));
        assert!(Mesh::empty(false).bounds().is_none());
    }
}
