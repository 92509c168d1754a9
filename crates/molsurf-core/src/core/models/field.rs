use super::grid::Grid;
use thiserror::Error;

/// Value given to vertices beyond the cutoff of every atom.
pub const FAR_OUTSIDE: f32 = 1.0e4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Field '{array}' has {actual} entries but the grid has {expected} vertices")]
    LengthMismatch {
        array: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Signed samples on a [`Grid`], negative inside the surface.
///
/// `atom_ids`, when present, holds the external id of the atom that dominated each vertex
/// (`-1` where no atom contributed).
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    grid: Grid,
    values: Vec<f32>,
    atom_ids: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStatistics {
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub rms: f32,
}

impl ScalarField {
    pub fn new(grid: Grid, values: Vec<f32>, atom_ids: Option<Vec<i32>>) -> Result<Self, FieldError> {
        let expected = grid.len();
        if values.len() != expected {
            return Err(FieldError::LengthMismatch {
                array: "values",
                expected,
                actual: values.len(),
            });
        }
        if let Some(ids) = &atom_ids {
            if ids.len() != expected {
                return Err(FieldError::LengthMismatch {
                    array: "atom_ids",
                    expected,
                    actual: ids.len(),
                });
            }
        }
        Ok(Self {
            grid,
            values,
            atom_ids,
        })
    }

    /// A field with every vertex set to [`FAR_OUTSIDE`].
    pub fn far_outside(grid: Grid, with_atom_ids: bool) -> Self {
        let n = grid.len();
        Self {
            grid,
            values: vec![FAR_OUTSIDE; n],
            atom_ids: with_atom_ids.then(|| vec![-1; n]),
        }
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    #[inline]
    pub fn atom_ids(&self) -> Option<&[i32]> {
        self.atom_ids.as_deref()
    }

    #[inline]
    pub fn value(&self, i: usize, j: usize, k: usize) -> f32 {
        self.values[self.grid.flat_index(i, j, k)]
    }

    pub fn into_parts(self) -> (Grid, Vec<f32>, Option<Vec<i32>>) {
        (self.grid, self.values, self.atom_ids)
    }

    /// Min, max, mean and root-mean-square over all vertices.
    ///
    /// Sums are accumulated in `f64`.
    pub fn statistics(&self) -> FieldStatistics {
        let n = self.values.len().max(1) as f64;
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for &v in &self.values {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            sum_sq += (v as f64) * (v as f64);
        }
        FieldStatistics {
            min,
            max,
            mean: (sum / n) as f32,
            rms: (sum_sq / n).sqrt() as f32,
        }
    }

    /// The field value `sigma` standard units away from the mean (`mean + sigma·rms`).
    pub fn value_for_sigma(&self, sigma: f32) -> f32 {
        let stats = self.statistics();
        stats.mean + sigma * stats.rms
    }

    /// Inverse of [`value_for_sigma`](Self::value_for_sigma).
    pub fn sigma_for_value(&self, value: f32) -> f32 {
        let stats = self.statistics();
        if stats.rms == 0.0 {
            return 0.0;
        }
        (value - stats.mean) / stats.rms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> Grid {
        Grid::unit([2, 2, 1]).unwrap()
    }

    #[test]
    fn new_rejects_wrong_value_count() {
        let result = ScalarField::new(grid(), vec![0.0; 3], None);
        assert_eq!(
            result,
            Err(FieldError::LengthMismatch {
                array: "values",
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn new_rejects_wrong_atom_id_count() {
        let result = ScalarField::new(grid(), vec![0.0; 4], Some(vec![0; 5]));
        assert!(matches!(
            result,
            Err(FieldError::LengthMismatch {
                array: "atom_ids",
                ..
            })
        ));
    }

    #[test]
    fn far_outside_fills_sentinels() {
        let field = ScalarField::far_outside(grid(), true);
        assert!(field.values().iter().all(|&v| v == FAR_OUTSIDE));
        assert_eq!(field.atom_ids(), Some(&[-1, -1, -1, -1][..]));
        assert!(ScalarField::far_outside(grid(), false).atom_ids().is_none());
    }

    #[test]
    fn statistics_and_sigma_helpers_agree() {
        let field = ScalarField::new(grid(), vec![1.0, -1.0, 1.0, -1.0], None).unwrap();
        let stats = field.statistics();
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 1.0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.rms, 1.0);
        assert_eq!(field.value_for_sigma(2.0), 2.0);
        assert_eq!(field.sigma_for_value(2.0), 2.0);
    }

    #[test]
    fn sigma_for_value_of_zero_field_is_zero() {
        let field = ScalarField::new(grid(), vec![0.0; 4], None).unwrap();
        assert_eq!(field.sigma_for_value(3.0), 0.0);
    }
}
