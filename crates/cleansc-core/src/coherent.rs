//! Coherent-Component Solver
//!
//! Given the peak of the dirty map, CLEAN-SC does not remove the array's
//! point-spread function from the CSM. It removes the part of the CSM that is
//! spatially coherent with the peak. That part is modelled as `h·hᴴ`, and `h`
//! solves the fixed-point equation
//!
//! ```text
//!        D·(g⊙w) / Pmax + H·(g⊙w)
//! h  =  ─────────────────────────────
//!        sqrt(1 + (w⊙g)ᴴ·H·(g⊙w))
//! ```
//!
//! where `g` is the normalized steering vector of the peak and `H` stands in
//! for the entries of `h·hᴴ` that the diagonal-free `D` cannot supply. The
//! iteration starts at `h = g` and runs for a fixed number of steps, leaving
//! early once successive iterates differ by less than a tolerance in the
//! Euclidean norm.
//!
//! ## Example
//!
//! ```rust
//! use cleansc_core::coherent::{solve_coherent_component, SolverSettings};
//! use cleansc_core::csm::CrossSpectralMatrix;
//! use cleansc_core::steering::WeightVector;
//! use num_complex::Complex64;
//!
//! // Unit source with steering vector a, normalized g = a / sqrt(P² − P)
//! let a = vec![Complex64::new(1.0, 0.0); 4];
//! let mut csm = CrossSpectralMatrix::from_outer(&a, 1.0);
//! csm.zero_diagonal();
//! let g: Vec<Complex64> = a.iter().map(|z| *z / 12f64.sqrt()).collect();
//!
//! let sol = solve_coherent_component(&csm, &g, &WeightVector::ones(4), 1.0, &SolverSettings::default());
//! assert!(sol.converged);
//! assert!(sol.h.iter().all(|z| (z - Complex64::new(1.0, 0.0)).norm() < 1e-5));
//! ```

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::csm::CrossSpectralMatrix;
use crate::steering::WeightVector;
use crate::types::{CleanScError, CleanScResult, C_ZERO};

/// Which entries of `h·hᴴ` the solver feeds back through `H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoherenceModel {
    /// `H = diag(|hᵢ|²)`: the auto-spectra removed from `D`. A noise-free
    /// single source is recovered exactly.
    AutoSpectra,
    /// `H = h·hᴴ` with its diagonal zeroed.
    CrossSpectra,
}

impl Default for CoherenceModel {
    fn default() -> Self {
        CoherenceModel::AutoSpectra
    }
}

/// Step budget, stopping tolerance and model of the fixed-point iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// Maximum number of fixed-point steps
    pub max_steps: usize,
    /// Stop once `‖h_new − h‖₂` falls below this
    pub tolerance: f64,
    /// Feedback model for `H`
    pub model: CoherenceModel,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_steps: 50,
            tolerance: 1e-6,
            model: CoherenceModel::AutoSpectra,
        }
    }
}

impl SolverSettings {
    pub fn validate(&self) -> CleanScResult<()> {
        if self.max_steps == 0 {
            return Err(CleanScError::InvalidSolverSetting(
                "max_steps must be > 0".to_string(),
            ));
        }
        if !(self.tolerance > 0.0) || !self.tolerance.is_finite() {
            return Err(CleanScError::InvalidSolverSetting(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Result of one coherent-component solve.
#[derive(Debug, Clone, PartialEq)]
pub struct CoherentSolution {
    /// Coherent amplitude vector `h`
    pub h: Vec<Complex64>,
    /// Fixed-point steps taken
    pub steps: usize,
    /// Whether the step size dropped below the tolerance
    pub converged: bool,
}

impl CoherentSolution {
    /// True when every entry of `h` is finite.
    pub fn is_finite(&self) -> bool {
        self.h.iter().all(|z| z.re.is_finite() && z.im.is_finite())
    }
}

/// Solve for the coherent component `h` of the source at the current peak.
///
/// `g` is the peak's steering vector scaled by `sqrt(1 / (P² − P))` and
/// `max_peak` the dirty-map value at the peak. Running out of steps is not
/// an error; the last iterate is returned with `converged == false`.
pub fn solve_coherent_component(
    csm: &CrossSpectralMatrix,
    g: &[Complex64],
    weights: &WeightVector,
    max_peak: f64,
    settings: &SolverSettings,
) -> CoherentSolution {
    let gw = weights.apply(g);
    let d_gw: Vec<Complex64> = csm.mul_vec(&gw).into_iter().map(|z| z / max_peak).collect();

    let mut h = g.to_vec();
    let mut h_gw = vec![C_ZERO; h.len()];

    for step in 1..=settings.max_steps {
        let q = feedback(settings.model, &h, &gw, &mut h_gw);
        let scale = 1.0 / (1.0 + q).sqrt();

        let mut delta = 0.0;
        for ((hi, d), f) in h.iter_mut().zip(&d_gw).zip(&h_gw) {
            let next = (d + f) * scale;
            delta += (next - *hi).norm_sqr();
            *hi = next;
        }

        if delta.sqrt() < settings.tolerance {
            return CoherentSolution {
                h,
                steps: step,
                converged: true,
            };
        }
    }

    CoherentSolution {
        h,
        steps: settings.max_steps,
        converged: false,
    }
}

/// Write `H·gw` into `out` and return `gwᴴ·H·gw`.
fn feedback(model: CoherenceModel, h: &[Complex64], gw: &[Complex64], out: &mut [Complex64]) -> f64 {
    match model {
        CoherenceModel::AutoSpectra => {
            let mut q = 0.0;
            for ((o, hi), gi) in out.iter_mut().zip(h).zip(gw) {
                let p = hi.norm_sqr();
                *o = *gi * p;
                q += p * gi.norm_sqr();
            }
            q
        }
        CoherenceModel::CrossSpectra => {
            // (h·hᴴ − diag)·gw = h·(hᴴ·gw) − |h|²⊙gw
            let s: Complex64 = h.iter().zip(gw).map(|(hj, gj)| hj.conj() * gj).sum();
            let mut q = C_ZERO;
            for ((o, hi), gi) in out.iter_mut().zip(h).zip(gw) {
                *o = hi * s - *gi * hi.norm_sqr();
                q += gi.conj() * *o;
            }
            q.re
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirty_map::norm_factor;
    use crate::synth;

    fn normalized(e: &[Complex64]) -> Vec<Complex64> {
        let s = norm_factor(e.len()).sqrt();
        e.iter().map(|z| *z * s).collect()
    }

    #[test]
    fn test_settings_validation() {
        assert!(SolverSettings::default().validate().is_ok());
        let bad = SolverSettings {
            max_steps: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = SolverSettings {
            tolerance: f64::NAN,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_single_source_recovered_exactly() {
        let field = synth::random_steering_field(3, 3, 6, 21);
        let power = 2.0;
        let csm = synth::point_source_csm(&field, &[synth::PointSource::new(1, 2, power)]);
        let a = field.vector(1, 2);
        let g = normalized(a);

        let sol = solve_coherent_component(&csm, &g, &WeightVector::ones(6), power, &SolverSettings::default());
        assert!(sol.converged);
        assert!(sol.steps < 50);

        // power · h·hᴴ reproduces the source's off-diagonal CSM
        let mut model = CrossSpectralMatrix::from_outer(&sol.h, power);
        model.zero_diagonal();
        for i in 0..6 {
            for j in 0..6 {
                assert!((model.get(i, j) - csm.get(i, j)).norm() < 1e-5);
            }
        }
    }

    #[test]
    fn test_cross_spectra_model_overshoots_single_source() {
        let field = synth::random_steering_field(2, 2, 4, 5);
        let csm = synth::point_source_csm(&field, &[synth::PointSource::new(0, 0, 1.0)]);
        let g = normalized(field.vector(0, 0));
        let settings = SolverSettings {
            model: CoherenceModel::CrossSpectra,
            ..Default::default()
        };

        let sol = solve_coherent_component(&csm, &g, &WeightVector::ones(4), 1.0, &settings);
        assert!(sol.converged);
        // Fixed point is |hᵢ|² = P − 1 for a unit-modulus steering vector
        for z in &sol.h {
            assert!((z.norm_sqr() - 3.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_step_budget_is_respected() {
        let field = synth::random_steering_field(2, 2, 4, 9);
        let csm = synth::point_source_csm(&field, &[synth::PointSource::new(1, 1, 1.0)]);
        let g = normalized(field.vector(1, 1));
        let settings = SolverSettings {
            max_steps: 2,
            tolerance: 1e-300,
            ..Default::default()
        };

        let sol = solve_coherent_component(&csm, &g, &WeightVector::ones(4), 1.0, &settings);
        assert_eq!(sol.steps, 2);
        assert!(!sol.converged);
        assert!(sol.is_finite());
    }

    #[test]
    fn test_pure_function() {
        let field = synth::random_steering_field(3, 2, 5, 17);
        let csm = synth::point_source_csm(
            &field,
            &[synth::PointSource::new(0, 0, 1.0), synth::PointSource::new(2, 1, 0.3)],
        );
        let g = normalized(field.vector(0, 0));
        let w = WeightVector::ones(5);
        let a = solve_coherent_component(&csm, &g, &w, 1.1, &SolverSettings::default());
        let b = solve_coherent_component(&csm, &g, &w, 1.1, &SolverSettings::default());
        assert_eq!(a, b);
    }
}
