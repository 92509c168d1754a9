use crate::core::utils::geometry::BoundingBox;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AtomSetError {
    #[error("Array '{array}' has {actual} entries but {expected} atoms were given")]
    LengthMismatch {
        array: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Interleaved coordinate list length {0} is not a multiple of 3")]
    RaggedCoordinates(usize),
    #[error("Atom id {id} at position {position} exceeds the largest supported id {max}", max = MAX_ATOM_ID)]
    IdOutOfRange { position: usize, id: u64 },
}

/// Largest atom id that fits the signed per-vertex id arrays.
pub const MAX_ATOM_ID: u32 = i32::MAX as u32;

/// A non-fatal problem with a single atom.
///
/// The atom is left out of the index and the field; processing continues and the warning is
/// handed back to the caller alongside the result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericWarning {
    /// At least one of the atom's coordinates is NaN or infinite.
    NonFiniteCoordinate { atom: usize },
    /// The atom's radius is NaN or infinite.
    NonFiniteRadius { atom: usize },
    /// The atom's radius is zero or negative.
    NonPositiveRadius { atom: usize, radius: f32 },
}

impl NumericWarning {
    pub fn atom(&self) -> usize {
        match *self {
            Self::NonFiniteCoordinate { atom }
            | Self::NonFiniteRadius { atom }
            | Self::NonPositiveRadius { atom, .. } => atom,
        }
    }
}

impl std::fmt::Display for NumericWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFiniteCoordinate { atom } => {
                write!(f, "atom {} has a non-finite coordinate and was excluded", atom)
            }
            Self::NonFiniteRadius { atom } => {
                write!(f, "atom {} has a non-finite radius and was excluded", atom)
            }
            Self::NonPositiveRadius { atom, radius } => write!(
                f,
                "atom {} has non-positive radius {} and was excluded",
                atom, radius
            ),
        }
    }
}

/// Atom coordinates and radii in struct-of-arrays layout.
///
/// `index` carries the caller's atom ids (for example the position of the atom in the full
/// structure when only a selection is surfaced). It defaults to `0..len`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AtomSet {
    x: Vec<f32>,
    y: Vec<f32>,
    z: Vec<f32>,
    radius: Vec<f32>,
    index: Vec<u32>,
}

impl AtomSet {
    pub fn new(
        x: Vec<f32>,
        y: Vec<f32>,
        z: Vec<f32>,
        radius: Vec<f32>,
        index: Option<Vec<u32>>,
    ) -> Result<Self, AtomSetError> {
        let expected = x.len();
        for (array, actual) in [("y", y.len()), ("z", z.len()), ("radius", radius.len())] {
            if actual != expected {
                return Err(AtomSetError::LengthMismatch {
                    array,
                    expected,
                    actual,
                });
            }
        }

        let index = match index {
            Some(index) if index.len() != expected => {
                return Err(AtomSetError::LengthMismatch {
                    array: "index",
                    expected,
                    actual: index.len(),
                });
            }
            Some(index) => index,
            None => {
                if expected > MAX_ATOM_ID as usize + 1 {
                    return Err(AtomSetError::IdOutOfRange {
                        position: MAX_ATOM_ID as usize + 1,
                        id: MAX_ATOM_ID as u64 + 1,
                    });
                }
                (0..expected as u32).collect()
            }
        };
        if let Some(position) = index.iter().position(|&id| id > MAX_ATOM_ID) {
            return Err(AtomSetError::IdOutOfRange {
                position,
                id: index[position] as u64,
            });
        }

        Ok(Self {
            x,
            y,
            z,
            radius,
            index,
        })
    }

    /// Builds an atom set from an interleaved `[x0, y0, z0, x1, ...]` coordinate list.
    pub fn from_interleaved(
        coords: &[f32],
        radius: Vec<f32>,
        index: Option<Vec<u32>>,
    ) -> Result<Self, AtomSetError> {
        if coords.len() % 3 != 0 {
            return Err(AtomSetError::RaggedCoordinates(coords.len()));
        }
        let n = coords.len() / 3;
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        let mut z = Vec::with_capacity(n);
        for c in coords.chunks_exact(3) {
            x.push(c[0]);
            y.push(c[1]);
            z.push(c[2]);
        }
        Self::new(x, y, z, radius, index)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    #[inline]
    pub fn x(&self) -> &[f32] {
        &self.x
    }

    #[inline]
    pub fn y(&self) -> &[f32] {
        &self.y
    }

    #[inline]
    pub fn z(&self) -> &[f32] {
        &self.z
    }

    #[inline]
    pub fn radii(&self) -> &[f32] {
        &self.radius
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.index
    }

    #[inline]
    pub fn position(&self, i: usize) -> Point3<f32> {
        Point3::new(self.x[i], self.y[i], self.z[i])
    }

    #[inline]
    pub fn radius(&self, i: usize) -> f32 {
        self.radius[i]
    }

    /// The caller-facing id of atom `i`, never above [`MAX_ATOM_ID`].
    #[inline]
    pub fn external_index(&self, i: usize) -> u32 {
        self.index[i]
    }

    /// Returns the reason atom `i` must be excluded, or `None` if it is usable.
    pub fn check(&self, i: usize) -> Option<NumericWarning> {
        if !(self.x[i].is_finite() && self.y[i].is_finite() && self.z[i].is_finite()) {
            return Some(NumericWarning::NonFiniteCoordinate { atom: i });
        }
        let r = self.radius[i];
        if !r.is_finite() {
            return Some(NumericWarning::NonFiniteRadius { atom: i });
        }
        if r <= 0.0 {
            return Some(NumericWarning::NonPositiveRadius { atom: i, radius: r });
        }
        None
    }

    #[inline]
    pub fn is_usable(&self, i: usize) -> bool {
        self.check(i).is_none()
    }

    /// Collects a warning for every atom that cannot take part in the computation.
    pub fn screen(&self) -> Vec<NumericWarning> {
        (0..self.len()).filter_map(|i| self.check(i)).collect()
    }

    /// Iterates over the positions of usable atoms.
    pub fn usable(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&i| self.is_usable(i))
    }

    /// Bounding box of the usable atom centres, `None` if there are none.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.usable().map(|i| self.position(i)))
    }

    /// Largest radius among usable atoms, `0.0` if there are none.
    pub fn max_radius(&self) -> f32 {
        self.usable().map(|i| self.radius[i]).fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_atoms() -> AtomSet {
        AtomSet::new(
            vec![0.0, 1.0, f32::NAN],
            vec![0.0, 2.0, 0.0],
            vec![0.0, 3.0, 0.0],
            vec![1.5, 0.0, 1.0],
            None,
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_arrays_of_different_lengths() {
        let result = AtomSet::new(vec![0.0; 3], vec![0.0; 3], vec![0.0; 2], vec![1.0; 3], None);
        assert_eq!(
            result,
            Err(AtomSetError::LengthMismatch {
                array: "z",
                expected: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn new_rejects_index_of_wrong_length() {
        let result = AtomSet::new(vec![0.0], vec![0.0], vec![0.0], vec![1.0], Some(vec![4, 5]));
        assert!(matches!(
            result,
            Err(AtomSetError::LengthMismatch { array: "index", .. })
        ));
    }

    #[test]
    fn new_rejects_ids_beyond_signed_range() {
        let result = AtomSet::new(
            vec![0.0; 2],
            vec![0.0; 2],
            vec![0.0; 2],
            vec![1.0; 2],
            Some(vec![7, u32::MAX]),
        );
        assert_eq!(
            result,
            Err(AtomSetError::IdOutOfRange {
                position: 1,
                id: u32::MAX as u64
            })
        );
    }

    #[test]
    fn new_accepts_largest_supported_id() {
        let atoms = AtomSet::new(vec![0.0], vec![0.0], vec![0.0], vec![1.0], Some(vec![MAX_ATOM_ID]))
            .unwrap();
        assert_eq!(atoms.external_index(0), i32::MAX as u32);
    }

    #[test]
    fn index_defaults_to_positions() {
        let atoms = three_atoms();
        assert_eq!(atoms.indices(), &[0, 1, 2]);
    }

    #[test]
    fn from_interleaved_splits_coordinates() {
        let atoms = AtomSet::from_interleaved(
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![1.0, 1.0],
            Some(vec![10, 20]),
        )
        .unwrap();
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms.position(1), Point3::new(4.0, 5.0, 6.0));
        assert_eq!(atoms.external_index(1), 20);
    }

    #[test]
    fn from_interleaved_rejects_ragged_input() {
        let result = AtomSet::from_interleaved(&[1.0, 2.0], vec![], None);
        assert_eq!(result, Err(AtomSetError::RaggedCoordinates(2)));
    }

    #[test]
    fn screen_reports_each_excluded_atom() {
        let warnings = three_atoms().screen();
        assert_eq!(
            warnings,
            vec![
                NumericWarning::NonPositiveRadius {
                    atom: 1,
                    radius: 0.0
                },
                NumericWarning::NonFiniteCoordinate { atom: 2 },
            ]
        );
    }

    #[test]
    fn bounding_box_and_max_radius_ignore_excluded_atoms() {
        let atoms = three_atoms();
        let bbox = atoms.bounding_box().unwrap();
        assert_eq!(bbox.min, Point3::origin());
        assert_eq!(bbox.max, Point3::origin());
        assert_eq!(atoms.max_radius(), 1.5);
    }

    #[test]
    fn empty_set_has_no_bounding_box() {
        let atoms = AtomSet::empty();
        assert!(atoms.is_empty());
        assert!(atoms.bounding_box().is_none());
        assert_eq!(atoms.max_radius(), 0.0);
    }
}
