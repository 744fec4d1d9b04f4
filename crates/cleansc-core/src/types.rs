//! Core types for CLEAN-SC deconvolution
//!
//! This module defines the scalar aliases and the error type shared by every
//! stage of the deconvolution loop.
//!
//! ## Conventions
//!
//! - Complex quantities (CSM entries, steering vectors, weights) use
//!   [`Complex64`], double-precision real/imaginary pairs.
//! - Grids are row-major: a scan point is addressed as `(row, col)`, where
//!   `row` runs over the N grid rows (y) and `col` over the M columns (x).
//!
//! ```text
//!          col (x) →
//!        ┌───┬───┬───┐
//!  row   │0,0│0,1│0,2│
//!  (y)   ├───┼───┼───┤
//!   ↓    │1,0│1,1│1,2│
//!        └───┴───┴───┘
//! ```

use num_complex::Complex64;

/// Type alias for complex numbers using f64 precision
pub type Complex = Complex64;

/// Complex zero, used to clear diagonals and seed accumulators.
pub const C_ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Result type for deconvolution operations
pub type CleanScResult<T> = Result<T, CleanScError>;

/// Errors that can occur while setting up or running CLEAN-SC
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CleanScError {
    #[error("Dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Too few microphones: {0}. At least 2 are needed for cross-spectra")]
    TooFewMicrophones(usize),

    #[error("Invalid loop gain: {0}. Must lie strictly between 0 and 1")]
    InvalidLoopGain(f64),

    #[error("Invalid iteration budget: {0}. Must be at least 1")]
    InvalidIterationBudget(usize),

    #[error("Invalid inner solver setting: {0}")]
    InvalidSolverSetting(String),

    #[error("Degenerate peak {peak:e} at iteration {iteration}")]
    DegeneratePeak { iteration: usize, peak: f64 },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CleanScError {
    pub(crate) fn mismatch(what: &'static str, expected: usize, actual: usize) -> Self {
        CleanScError::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }
}
