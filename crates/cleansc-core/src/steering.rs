//! Steering field and microphone weighting
//!
//! A [`SteeringField`] holds one P-length steering vector per scan point of
//! an N×M grid. It is produced outside this crate (array geometry, frequency
//! and propagation model are the caller's concern) and read-only here.
//!
//! A [`WeightVector`] applies a per-microphone shading to every steering
//! vector. Weights may come in as real or complex data and as either a row
//! (1×P) or a column (P×1); internally they are a plain length-P vector.
//!
//! ## Example
//!
//! ```rust
//! use cleansc_core::steering::{SteeringField, WeightVector};
//! use num_complex::Complex64;
//!
//! let one = Complex64::new(1.0, 0.0);
//! let field = SteeringField::new(2, 3, 4, vec![one; 2 * 3 * 4]).unwrap();
//! assert_eq!(field.vector(1, 2).len(), 4);
//!
//! // A 1×4 row of weights is accepted the same as a 4×1 column
//! let w = WeightVector::from_matrix(1, 4, vec![1.0, 0.5, 0.5, 1.0]).unwrap();
//! assert_eq!(w.len(), 4);
//! ```

use num_complex::Complex64;

use crate::types::{CleanScError, CleanScResult};

/// N×M×P complex steering vectors, stored as `[(row * cols + col) * mics + p]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SteeringField {
    data: Vec<Complex64>,
    rows: usize,
    cols: usize,
    mics: usize,
}

impl SteeringField {
    /// Create from a flat array laid out row, column, microphone.
    pub fn new(rows: usize, cols: usize, mics: usize, data: Vec<Complex64>) -> CleanScResult<Self> {
        let expected = rows * cols * mics;
        if data.len() != expected {
            return Err(CleanScError::mismatch("steering field data", expected, data.len()));
        }
        Ok(Self {
            data,
            rows,
            cols,
            mics,
        })
    }

    pub(crate) fn from_raw(rows: usize, cols: usize, mics: usize, data: Vec<Complex64>) -> Self {
        debug_assert_eq!(data.len(), rows * cols * mics);
        Self {
            data,
            rows,
            cols,
            mics,
        }
    }

    /// Create from one steering vector per grid point, in row-major order.
    pub fn from_vectors(rows: usize, cols: usize, vectors: &[Vec<Complex64>]) -> CleanScResult<Self> {
        if vectors.len() != rows * cols {
            return Err(CleanScError::mismatch(
                "steering field points",
                rows * cols,
                vectors.len(),
            ));
        }
        let mics = vectors.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows * cols * mics);
        for v in vectors {
            if v.len() != mics {
                return Err(CleanScError::mismatch("steering vector length", mics, v.len()));
            }
            data.extend_from_slice(v);
        }
        Ok(Self {
            data,
            rows,
            cols,
            mics,
        })
    }

    /// Grid height N.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Grid width M.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Microphone count P.
    pub fn mics(&self) -> usize {
        self.mics
    }

    /// Number of scan points N·M.
    pub fn num_points(&self) -> usize {
        self.rows * self.cols
    }

    /// Steering vector `e[row, col, :]`.
    pub fn vector(&self, row: usize, col: usize) -> &[Complex64] {
        let start = (row * self.cols + col) * self.mics;
        &self.data[start..start + self.mics]
    }

    /// Steering vectors of one grid row, `cols` chunks of `mics` entries.
    pub fn row_vectors(&self, row: usize) -> std::slice::ChunksExact<'_, Complex64> {
        let stride = self.cols * self.mics;
        self.data[row * stride..(row + 1) * stride].chunks_exact(self.mics.max(1))
    }
}

/// Per-microphone shading applied to every steering vector.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector {
    weights: Vec<Complex64>,
}

impl WeightVector {
    /// Complex weights.
    pub fn new(weights: Vec<Complex64>) -> Self {
        Self { weights }
    }

    /// Real weights.
    pub fn from_real(weights: &[f64]) -> Self {
        Self {
            weights: weights.iter().map(|&w| Complex64::new(w, 0.0)).collect(),
        }
    }

    /// Uniform (unshaded) weighting.
    pub fn ones(len: usize) -> Self {
        Self {
            weights: vec![Complex64::new(1.0, 0.0); len],
        }
    }

    /// Real weights given as a `rows`×`cols` matrix that must be a single row
    /// or a single column.
    pub fn from_matrix(rows: usize, cols: usize, data: Vec<f64>) -> CleanScResult<Self> {
        if data.len() != rows * cols {
            return Err(CleanScError::mismatch("weight matrix data", rows * cols, data.len()));
        }
        if rows != 1 && cols != 1 {
            return Err(CleanScError::mismatch("weight vector orientation", 1, rows.min(cols)));
        }
        Ok(Self::from_real(&data))
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.weights
    }

    /// Element-wise product `w ⊙ v`.
    pub fn apply(&self, v: &[Complex64]) -> Vec<Complex64> {
        self.weights.iter().zip(v).map(|(w, x)| w * x).collect()
    }

    /// Element-wise product `w ⊙ v` into an existing buffer.
    pub fn apply_into(&self, v: &[Complex64], out: &mut [Complex64]) {
        for ((o, w), x) in out.iter_mut().zip(&self.weights).zip(v) {
            *o = w * x;
        }
    }
}

impl From<Vec<Complex64>> for WeightVector {
    fn from(weights: Vec<Complex64>) -> Self {
        Self::new(weights)
    }
}

impl From<Vec<f64>> for WeightVector {
    fn from(weights: Vec<f64>) -> Self {
        Self::from_real(&weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_layout() {
        let data: Vec<Complex64> = (0..2 * 3 * 2).map(|i| Complex64::new(i as f64, 0.0)).collect();
        let field = SteeringField::new(2, 3, 2, data).unwrap();
        assert_eq!(field.num_points(), 6);
        // (row 1, col 2) is the last point
        assert_eq!(field.vector(1, 2)[0].re, 10.0);
        assert_eq!(field.vector(0, 1)[1].re, 3.0);

        let row: Vec<&[Complex64]> = field.row_vectors(1).collect();
        assert_eq!(row.len(), 3);
        assert_eq!(row[0][0].re, 6.0);
    }

    #[test]
    fn test_field_rejects_bad_length() {
        let err = SteeringField::new(2, 2, 3, vec![Complex64::new(0.0, 0.0); 11]).unwrap_err();
        assert!(matches!(err, CleanScError::DimensionMismatch { expected: 12, actual: 11, .. }));
    }

    #[test]
    fn test_from_vectors_checks_lengths() {
        let one = Complex64::new(1.0, 0.0);
        let ok = SteeringField::from_vectors(1, 2, &[vec![one; 3], vec![one; 3]]).unwrap();
        assert_eq!(ok.mics(), 3);

        assert!(SteeringField::from_vectors(1, 2, &[vec![one; 3], vec![one; 2]]).is_err());
        assert!(SteeringField::from_vectors(2, 2, &[vec![one; 3]]).is_err());
    }

    #[test]
    fn test_weight_orientation() {
        let row = WeightVector::from_matrix(1, 3, vec![1.0, 2.0, 3.0]).unwrap();
        let col = WeightVector::from_matrix(3, 1, vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(row, col);

        assert!(WeightVector::from_matrix(2, 2, vec![1.0; 4]).is_err());
        assert!(WeightVector::from_matrix(1, 3, vec![1.0; 2]).is_err());
    }

    #[test]
    fn test_weight_apply() {
        let w = WeightVector::new(vec![Complex64::new(0.0, 1.0), Complex64::new(2.0, 0.0)]);
        let out = w.apply(&[Complex64::new(1.0, 0.0), Complex64::new(0.5, 0.5)]);
        assert_eq!(out[0], Complex64::new(0.0, 1.0));
        assert_eq!(out[1], Complex64::new(1.0, 1.0));

        let mut buf = vec![Complex64::new(0.0, 0.0); 2];
        w.apply_into(&[Complex64::new(1.0, 0.0), Complex64::new(0.5, 0.5)], &mut buf);
        assert_eq!(buf, out);
    }
}
