//! Synthetic fixtures for tests and benchmarks
//!
//! Deterministic, seed-driven steering fields and point-source CSMs. The
//! steering vectors here are unit-modulus random phasors, not a propagation
//! model; they only need to be distinct enough across the grid for peaks to
//! be unambiguous.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

use crate::csm::CrossSpectralMatrix;
use crate::steering::SteeringField;

/// An ideal point source sitting exactly on a grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSource {
    pub row: usize,
    pub col: usize,
    pub power: f64,
}

impl PointSource {
    pub fn new(row: usize, col: usize, power: f64) -> Self {
        Self { row, col, power }
    }
}

/// Steering field of unit-modulus phasors with uniformly random phase.
pub fn random_steering_field(rows: usize, cols: usize, mics: usize, seed: u64) -> SteeringField {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<Complex64> = (0..rows * cols * mics)
        .map(|_| Complex64::from_polar(1.0, rng.gen_range(-PI..PI)))
        .collect();
    SteeringField::from_raw(rows, cols, mics, data)
}

/// CSM of mutually incoherent point sources, `Σ powerₖ · eₖ·eₖᴴ`, with the
/// diagonal zeroed.
pub fn point_source_csm(steering: &SteeringField, sources: &[PointSource]) -> CrossSpectralMatrix {
    let mut csm = CrossSpectralMatrix::zeros(steering.mics());
    for s in sources {
        csm.add_outer(steering.vector(s.row, s.col), s.power);
    }
    csm.zero_diagonal();
    csm
}

/// Add a random Hermitian perturbation with per-component standard deviation
/// `sigma` to the off-diagonal entries.
pub fn add_hermitian_noise(csm: &mut CrossSpectralMatrix, sigma: f64, seed: u64) {
    if sigma <= 0.0 {
        return;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = match Normal::new(0.0, sigma) {
        Ok(n) => n,
        Err(_) => return,
    };
    let p = csm.size();
    for i in 0..p {
        for j in (i + 1)..p {
            let n = Complex64::new(normal.sample(&mut rng), normal.sample(&mut rng));
            csm.set(i, j, csm.get(i, j) + n);
            csm.set(j, i, csm.get(j, i) + n.conj());
        }
    }
}
