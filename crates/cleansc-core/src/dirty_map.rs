//! Dirty Map: conventional beamforming with diagonal removal
//!
//! For every scan point the beamformed power is the Hermitian form of the
//! weighted steering vector with the residual CSM:
//!
//! ```text
//! P[y,x] = ν · (w⊙e[y,x])ᴴ · D · (w⊙e[y,x]),     ν = 1 / (P² − P)
//! ```
//!
//! The factor ν compensates for the P auto-spectra that are zeroed in `D`,
//! so a unit-modulus steering vector pointed at a unit-power source reads
//! exactly 1.0. This is the O(N·M·P²) hot loop of CLEAN-SC; with the
//! `parallel` feature the grid rows are distributed over the rayon pool.
//! Every cell runs the same sequential kernel either way, so both paths give
//! bit-identical maps.
//!
//! ## Example
//!
//! ```rust
//! use cleansc_core::csm::CrossSpectralMatrix;
//! use cleansc_core::dirty_map::dirty_map;
//! use cleansc_core::steering::{SteeringField, WeightVector};
//! use num_complex::Complex64;
//!
//! let a = vec![Complex64::new(1.0, 0.0); 4];
//! let mut csm = CrossSpectralMatrix::from_outer(&a, 1.0);
//! csm.zero_diagonal();
//!
//! let field = SteeringField::from_vectors(1, 1, &[a]).unwrap();
//! let map = dirty_map(&csm, &field, &WeightVector::ones(4)).unwrap();
//! assert!((map.get(0, 0) - 1.0).abs() < 1e-12);
//! ```

use num_complex::Complex64;

use crate::csm::CrossSpectralMatrix;
use crate::power_map::PowerMap;
use crate::steering::{SteeringField, WeightVector};
use crate::types::{CleanScError, CleanScResult, C_ZERO};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Normalization `1 / (P² − P)` for a diagonal-free CSM of P microphones.
pub fn norm_factor(mics: usize) -> f64 {
    let p = mics as f64;
    1.0 / (p * p - p)
}

/// Check that CSM, steering field and weights agree on the microphone count.
pub fn check_dimensions(
    csm: &CrossSpectralMatrix,
    steering: &SteeringField,
    weights: &WeightVector,
) -> CleanScResult<()> {
    let p = csm.size();
    if steering.mics() != p {
        return Err(CleanScError::mismatch("steering vector length", p, steering.mics()));
    }
    if weights.len() != p {
        return Err(CleanScError::mismatch("weight vector length", p, weights.len()));
    }
    if p < 2 {
        return Err(CleanScError::TooFewMicrophones(p));
    }
    Ok(())
}

/// Beamformed power map of `csm` over the whole steering grid.
///
/// The CSM is used as given; callers that want the CLEAN-SC convention zero
/// its diagonal first.
pub fn dirty_map(
    csm: &CrossSpectralMatrix,
    steering: &SteeringField,
    weights: &WeightVector,
) -> CleanScResult<PowerMap> {
    check_dimensions(csm, steering, weights)?;
    let mut map = PowerMap::zeros(steering.rows(), steering.cols());
    form_dirty_map(csm, steering, weights, norm_factor(csm.size()), &mut map);
    Ok(map)
}

/// Fill `out` with the dirty map. Dimensions must already be checked.
pub(crate) fn form_dirty_map(
    csm: &CrossSpectralMatrix,
    steering: &SteeringField,
    weights: &WeightVector,
    nu: f64,
    out: &mut PowerMap,
) {
    let cols = steering.cols();
    if cols == 0 {
        return;
    }

    #[cfg(feature = "parallel")]
    out.as_mut_slice()
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(row, cells)| fill_row(csm, steering, weights, nu, row, cells));

    #[cfg(not(feature = "parallel"))]
    for (row, cells) in out.as_mut_slice().chunks_mut(cols).enumerate() {
        fill_row(csm, steering, weights, nu, row, cells);
    }
}

fn fill_row(
    csm: &CrossSpectralMatrix,
    steering: &SteeringField,
    weights: &WeightVector,
    nu: f64,
    row: usize,
    cells: &mut [f64],
) {
    let mut ew: Vec<Complex64> = vec![C_ZERO; steering.mics()];
    for (cell, e) in cells.iter_mut().zip(steering.row_vectors(row)) {
        weights.apply_into(e, &mut ew);
        *cell = nu * csm.quadratic_form(&ew).re;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth;

    #[test]
    fn test_norm_factor() {
        assert!((norm_factor(4) - 1.0 / 12.0).abs() < 1e-15);
        assert!((norm_factor(2) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_dimension_checks() {
        let field = synth::random_steering_field(2, 2, 4, 1);
        let csm = CrossSpectralMatrix::zeros(3);
        let err = dirty_map(&csm, &field, &WeightVector::ones(3)).unwrap_err();
        assert_eq!(err, CleanScError::mismatch("steering vector length", 3, 4));

        let csm = CrossSpectralMatrix::zeros(4);
        let err = dirty_map(&csm, &field, &WeightVector::ones(5)).unwrap_err();
        assert_eq!(err, CleanScError::mismatch("weight vector length", 4, 5));

        let field = synth::random_steering_field(2, 2, 1, 1);
        let csm = CrossSpectralMatrix::zeros(1);
        let err = dirty_map(&csm, &field, &WeightVector::ones(1)).unwrap_err();
        assert_eq!(err, CleanScError::TooFewMicrophones(1));
    }

    #[test]
    fn test_unit_source_reads_unit_power() {
        let field = synth::random_steering_field(5, 6, 8, 42);
        let csm = synth::point_source_csm(&field, &[synth::PointSource::new(3, 2, 2.5)]);
        let map = dirty_map(&csm, &field, &WeightVector::ones(8)).unwrap();

        assert!((map.get(3, 2) - 2.5).abs() < 1e-12);
        let peak = map.peak().unwrap();
        assert_eq!((peak.row, peak.col), (3, 2));
    }

    #[test]
    fn test_zero_csm_gives_zero_map() {
        let field = synth::random_steering_field(3, 3, 4, 7);
        let map = dirty_map(&CrossSpectralMatrix::zeros(4), &field, &WeightVector::ones(4)).unwrap();
        assert!(map.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_weights_shade_the_map() {
        let field = synth::random_steering_field(2, 2, 4, 3);
        let csm = synth::point_source_csm(&field, &[synth::PointSource::new(0, 0, 1.0)]);

        let full = dirty_map(&csm, &field, &WeightVector::ones(4)).unwrap();
        let half = dirty_map(&csm, &field, &WeightVector::from_real(&[0.5; 4])).unwrap();
        // A uniform weight of 0.5 enters the Hermitian form twice
        for (f, h) in full.as_slice().iter().zip(half.as_slice()) {
            assert!((h - 0.25 * f).abs() < 1e-12);
        }
    }

    #[test]
    fn test_repeatable() {
        let field = synth::random_steering_field(4, 4, 6, 11);
        let csm = synth::point_source_csm(
            &field,
            &[synth::PointSource::new(1, 1, 1.0), synth::PointSource::new(2, 3, 0.4)],
        );
        let a = dirty_map(&csm, &field, &WeightVector::ones(6)).unwrap();
        let b = dirty_map(&csm, &field, &WeightVector::ones(6)).unwrap();
        assert_eq!(a, b);
    }
}
