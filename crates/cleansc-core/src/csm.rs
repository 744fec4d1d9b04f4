//! Cross-Spectral Matrix: pairwise microphone correlations at one frequency
//!
//! The CSM is the P×P Hermitian matrix `D[i][j] = E{pᵢ pⱼ*}` of microphone
//! spectra. CLEAN-SC works on its off-diagonal part only: the auto-spectra on
//! the diagonal carry the uncorrelated self-noise of each channel, so the
//! deconvolver zeroes them before the first iteration and after every
//! residual update.
//!
//! ## Example
//!
//! ```rust
//! use cleansc_core::csm::CrossSpectralMatrix;
//! use num_complex::Complex64;
//!
//! let a = vec![Complex64::new(1.0, 0.0), Complex64::new(0.0, 1.0)];
//! let mut csm = CrossSpectralMatrix::from_outer(&a, 2.0);
//! assert_eq!(csm.get(0, 0), Complex64::new(2.0, 0.0));
//!
//! csm.zero_diagonal();
//! assert_eq!(csm.get(0, 0), Complex64::new(0.0, 0.0));
//! assert!((csm.abs_sum() - 4.0).abs() < 1e-12);
//! ```

use num_complex::Complex64;

use crate::types::{CleanScError, CleanScResult, C_ZERO};

/// Square complex matrix stored in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSpectralMatrix {
    data: Vec<Complex64>,
    size: usize,
}

impl CrossSpectralMatrix {
    /// Create from a flat row-major array of `size * size` entries.
    pub fn new(size: usize, data: Vec<Complex64>) -> CleanScResult<Self> {
        if data.len() != size * size {
            return Err(CleanScError::mismatch(
                "cross-spectral matrix data",
                size * size,
                data.len(),
            ));
        }
        Ok(Self { data, size })
    }

    /// Create from a 2D array (Vec of rows). Every row must hold as many entries as there are rows.
    pub fn from_rows(matrix: &[Vec<Complex64>]) -> CleanScResult<Self> {
        let size = matrix.len();
        let mut data = Vec::with_capacity(size * size);
        for row in matrix {
            if row.len() != size {
                return Err(CleanScError::mismatch(
                    "cross-spectral matrix row",
                    size,
                    row.len(),
                ));
            }
            data.extend_from_slice(row);
        }
        Ok(Self { data, size })
    }

    /// All-zero matrix.
    pub fn zeros(size: usize) -> Self {
        Self {
            data: vec![C_ZERO; size * size],
            size,
        }
    }

    /// Rank-one matrix `scale · v·vᴴ`.
    pub fn from_outer(v: &[Complex64], scale: f64) -> Self {
        let mut csm = Self::zeros(v.len());
        csm.add_outer(v, scale);
        csm
    }

    /// Number of microphones P.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.size + col]
    }

    /// Set element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: Complex64) {
        self.data[row * self.size + col] = value;
    }

    /// Row-major view of the entries.
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Diagonal entries (auto-spectra).
    pub fn diagonal(&self) -> Vec<Complex64> {
        (0..self.size).map(|i| self.get(i, i)).collect()
    }

    /// Force the auto-spectra to exactly zero.
    pub fn zero_diagonal(&mut self) {
        for i in 0..self.size {
            self.data[i * self.size + i] = C_ZERO;
        }
    }

    /// Sum of absolute values over all entries, `Σ|D_ij|`.
    ///
    /// This is the residual energy measure used by the divergence criterion.
    pub fn abs_sum(&self) -> f64 {
        self.data.iter().map(|z| z.norm()).sum()
    }

    /// Check `D == Dᴴ` within an absolute tolerance.
    pub fn is_hermitian(&self, tolerance: f64) -> bool {
        for i in 0..self.size {
            for j in i..self.size {
                if (self.get(i, j) - self.get(j, i).conj()).norm() > tolerance {
                    return false;
                }
            }
        }
        true
    }

    /// Matrix-vector product `D·v`.
    ///
    /// `v` must hold `size()` entries.
    pub fn mul_vec(&self, v: &[Complex64]) -> Vec<Complex64> {
        debug_assert_eq!(v.len(), self.size);
        self.data
            .chunks_exact(self.size.max(1))
            .map(|row| row.iter().zip(v).map(|(d, x)| d * x).sum())
            .collect()
    }

    /// Hermitian form `vᴴ·D·v`.
    ///
    /// Evaluated row by row in a fixed order so that repeated calls on
    /// identical inputs give bit-identical results.
    pub fn quadratic_form(&self, v: &[Complex64]) -> Complex64 {
        debug_assert_eq!(v.len(), self.size);
        let mut acc = C_ZERO;
        for (row, vi) in self.data.chunks_exact(self.size.max(1)).zip(v) {
            let dv: Complex64 = row.iter().zip(v).map(|(d, x)| d * x).sum();
            acc += vi.conj() * dv;
        }
        acc
    }

    /// In-place rank-one update `D ← D + scale · v·vᴴ`.
    pub fn add_outer(&mut self, v: &[Complex64], scale: f64) {
        debug_assert_eq!(v.len(), self.size);
        for (row, vi) in self.data.chunks_exact_mut(self.size.max(1)).zip(v) {
            let a = *vi * scale;
            for (d, vj) in row.iter_mut().zip(v) {
                *d += a * vj.conj();
            }
        }
    }

    /// In-place rank-one removal `D ← D − scale · v·vᴴ`.
    pub fn subtract_outer(&mut self, v: &[Complex64], scale: f64) {
        self.add_outer(v, -scale);
    }
}
