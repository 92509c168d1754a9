use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Self::new(first, first);
        for p in iter {
            bbox.include(&p);
        }
        Some(bbox)
    }

    pub fn include(&mut self, p: &Point3<f32>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Grows the box by `margin` on every side.
    pub fn padded(&self, margin: f32) -> Self {
        let m = Vector3::repeat(margin);
        Self::new(self.min - m, self.max + m)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn contains(&self, p: &Point3<f32>) -> bool {
        (0..3).all(|a| p[a] >= self.min[a] && p[a] <= self.max[a])
    }
}

/// Returns a unit vector perpendicular to the unit vector `axis`.
///
/// The first non-zero component of `axis` is solved for so that the dot product vanishes.
pub fn normal_to_line(axis: &Vector3<f32>) -> Vector3<f32> {
    let mut out = Vector3::repeat(1.0);
    if axis.x != 0.0 {
        out.x = (axis.y + axis.z) / -axis.x;
    } else if axis.y != 0.0 {
        out.y = (axis.x + axis.z) / -axis.y;
    } else if axis.z != 0.0 {
        out.z = (axis.x + axis.y) / -axis.z;
    }
    out.normalize()
}
