//! CLEAN-SC Deconvolver
//!
//! Iteratively sharpens a beamformed map into point sources plus residual:
//!
//! ```text
//!  D ─► dirty map ─► peak ─► coherent h ─► Q[peak] += γ·Pmax
//!        ▲                                 D −= γ·Pmax·h·hᴴ, diag(D) = 0
//!        │                                   │
//!        └────────── Σ|D| did not grow ◄─────┘
//!
//!  Σ|D| grew, peak fell below the floor, budget spent
//!  or degenerate peak ─► Q += last dirty map
//! ```
//!
//! The residual CSM is the only state that survives from one iteration to
//! the next. It is a private copy of the input, so an invocation never
//! touches caller data and repeated calls are bit-identical.
//!
//! ## Example
//!
//! ```rust
//! use cleansc_core::deconvolver::CleanSc;
//! use cleansc_core::steering::WeightVector;
//! use cleansc_core::synth::{point_source_csm, random_steering_field, PointSource};
//!
//! let field = random_steering_field(10, 10, 4, 7);
//! let csm = point_source_csm(&field, &[PointSource::new(5, 5, 1.0)]);
//!
//! let result = CleanSc::new()
//!     .deconvolve(&csm, &field, &WeightVector::ones(4))
//!     .unwrap();
//!
//! let peak = result.map.peak().unwrap();
//! assert_eq!((peak.row, peak.col), (5, 5));
//! assert!((peak.value - 1.0).abs() < 1e-3);
//! println!("{}", result.termination);
//! ```

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::coherent::{solve_coherent_component, CoherenceModel, SolverSettings};
use crate::config::{CleanScConfig, SolverConfig};
use crate::csm::CrossSpectralMatrix;
use crate::dirty_map::{check_dimensions, form_dirty_map, norm_factor};
use crate::power_map::{Peak, PowerMap};
use crate::steering::{SteeringField, WeightVector};
use crate::types::{CleanScError, CleanScResult};

/// Default fraction of the peak removed per iteration.
pub const DEFAULT_LOOP_GAIN: f64 = 0.9;

/// Default outer iteration budget.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Default relative floor: a peak at or below this fraction of the first
/// peak ends the run as converged.
pub const DEFAULT_PEAK_FLOOR: f64 = 1e-12;

/// What to do when the dirty-map peak is missing, zero, negative or
/// non-finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePeakPolicy {
    /// Stop as if converged and return the map built so far
    Converge,
    /// Abort with [`CleanScError::DegeneratePeak`]
    Fail,
}

impl Default for DegeneratePeakPolicy {
    fn default() -> Self {
        DegeneratePeakPolicy::Converge
    }
}

/// What ended a converged run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceReason {
    /// `Σ|D|` rose; the update of that iteration is kept.
    EnergyIncreased,
    /// The peak fell to `peak_floor` times the first peak or below; that
    /// iteration removed nothing.
    PeakBelowFloor,
}

impl fmt::Display for ConvergenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceReason::EnergyIncreased => f.write_str("residual energy increased"),
            ConvergenceReason::PeakBelowFloor => f.write_str("peak below floor"),
        }
    }
}

/// Why the outer loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Stopped at `iteration` before the budget ran out.
    ConvergedEarly {
        iteration: usize,
        reason: ConvergenceReason,
    },
    /// The iteration budget ran out.
    MaxIterationsReached { iterations: usize },
    /// No usable peak at `iteration`; nothing was removed in it.
    DegeneratePeak { iteration: usize },
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::ConvergedEarly { iteration, reason } => {
                write!(f, "converged early at iteration {}: {}", iteration, reason)
            }
            Termination::MaxIterationsReached { iterations } => {
                write!(f, "maximum of {} iterations reached", iterations)
            }
            Termination::DegeneratePeak { iteration } => {
                write!(f, "stopped at iteration {}: degenerate peak", iteration)
            }
        }
    }
}

/// One clean beam placed on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleanComponent {
    pub iteration: usize,
    pub row: usize,
    pub col: usize,
    /// `loop_gain · peak`
    pub power: f64,
}

/// Per-iteration diagnostics, recorded when history is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    /// Dirty-map peak before the update
    pub peak: f64,
    pub row: usize,
    pub col: usize,
    /// `Σ|D|` after the update
    pub residual_energy: f64,
    /// Fixed-point steps used by the coherent solver
    pub inner_steps: usize,
    pub inner_converged: bool,
}

/// Read-only view handed to an observer after every residual update.
#[derive(Debug)]
pub struct IterationView<'a> {
    pub iteration: usize,
    pub residual: &'a CrossSpectralMatrix,
    pub map: &'a PowerMap,
    pub component: &'a CleanComponent,
}

/// Output of one deconvolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Deconvolution {
    /// Clean map plus the final dirty-map residual.
    ///
    /// The clean beams are non-negative, but the residual dirty map is not:
    /// away from a source the diagonal-free beamformer can read below zero,
    /// so individual cells of `map` may be negative. Use
    /// [`Deconvolution::source_powers`] for the beams alone.
    pub map: PowerMap,
    pub termination: Termination,
    /// Number of residual updates applied
    pub iterations: usize,
    /// Clean beams in the order they were placed
    pub sources: Vec<CleanComponent>,
    /// Empty unless history recording is enabled
    pub history: Vec<IterationRecord>,
    /// Residual CSM after the last update
    pub residual: CrossSpectralMatrix,
    /// `Σ|D|` of `residual`
    pub final_residual_energy: f64,
}

impl Deconvolution {
    /// Human-readable termination status.
    pub fn status(&self) -> String {
        self.termination.to_string()
    }

    /// Clean beams only, summed per cell, without the residual dirty map.
    pub fn source_powers(&self) -> PowerMap {
        let mut map = PowerMap::zeros(self.map.rows(), self.map.cols());
        for s in &self.sources {
            map.add(s.row, s.col, s.power);
        }
        map
    }
}

/// CLEAN-SC engine. Holds settings only; every call starts from scratch.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanSc {
    loop_gain: f64,
    max_iterations: usize,
    solver: SolverSettings,
    peak_floor: f64,
    degenerate_policy: DegeneratePeakPolicy,
    record_history: bool,
}

impl Default for CleanSc {
    fn default() -> Self {
        Self {
            loop_gain: DEFAULT_LOOP_GAIN,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            solver: SolverSettings::default(),
            peak_floor: DEFAULT_PEAK_FLOOR,
            degenerate_policy: DegeneratePeakPolicy::Converge,
            record_history: false,
        }
    }
}

impl CleanSc {
    /// Engine with the default loop gain (0.9) and budget (100).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `solver` section of a configuration.
    pub fn from_config(config: &CleanScConfig) -> CleanScResult<Self> {
        let engine = Self::from_settings(&config.solver);
        engine.validate()?;
        Ok(engine)
    }

    /// Engine carrying `s` as is, without validation.
    pub(crate) fn from_settings(s: &SolverConfig) -> Self {
        Self {
            loop_gain: s.loop_gain,
            max_iterations: s.max_iterations,
            solver: SolverSettings {
                max_steps: s.inner_max_steps,
                tolerance: s.inner_tolerance,
                model: s.coherence_model,
            },
            peak_floor: s.peak_floor,
            degenerate_policy: s.degenerate_policy,
            record_history: s.record_history,
        }
    }

    pub fn with_loop_gain(mut self, loop_gain: f64) -> Self {
        self.loop_gain = loop_gain;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_inner_steps(mut self, steps: usize) -> Self {
        self.solver.max_steps = steps;
        self
    }

    pub fn with_inner_tolerance(mut self, tolerance: f64) -> Self {
        self.solver.tolerance = tolerance;
        self
    }

    pub fn with_coherence_model(mut self, model: CoherenceModel) -> Self {
        self.solver.model = model;
        self
    }

    pub fn with_peak_floor(mut self, peak_floor: f64) -> Self {
        self.peak_floor = peak_floor;
        self
    }

    pub fn with_degenerate_policy(mut self, policy: DegeneratePeakPolicy) -> Self {
        self.degenerate_policy = policy;
        self
    }

    /// Record an [`IterationRecord`] for every iteration.
    pub fn with_history(mut self, enabled: bool) -> Self {
        self.record_history = enabled;
        self
    }

    pub fn loop_gain(&self) -> f64 {
        self.loop_gain
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn solver_settings(&self) -> &SolverSettings {
        &self.solver
    }

    /// Reject settings outside their valid ranges.
    pub fn validate(&self) -> CleanScResult<()> {
        if !(self.loop_gain > 0.0 && self.loop_gain < 1.0) {
            return Err(CleanScError::InvalidLoopGain(self.loop_gain));
        }
        if self.max_iterations == 0 {
            return Err(CleanScError::InvalidIterationBudget(self.max_iterations));
        }
        if !(self.peak_floor >= 0.0 && self.peak_floor < 1.0) {
            return Err(CleanScError::InvalidSolverSetting(format!(
                "peak_floor must lie in [0, 1), got {}",
                self.peak_floor
            )));
        }
        self.solver.validate()
    }

    /// Run CLEAN-SC on `csm` over the scan grid of `steering`.
    ///
    /// The CSM's diagonal is ignored. All validation happens before the
    /// first iteration; on error no partial result is produced.
    pub fn deconvolve(
        &self,
        csm: &CrossSpectralMatrix,
        steering: &SteeringField,
        weights: &WeightVector,
    ) -> CleanScResult<Deconvolution> {
        self.deconvolve_with(csm, steering, weights, |_| {})
    }

    /// Like [`CleanSc::deconvolve`], calling `observer` after every residual
    /// update.
    pub fn deconvolve_with<F>(
        &self,
        csm: &CrossSpectralMatrix,
        steering: &SteeringField,
        weights: &WeightVector,
        mut observer: F,
    ) -> CleanScResult<Deconvolution>
    where
        F: FnMut(&IterationView<'_>),
    {
        self.validate()?;
        check_dimensions(csm, steering, weights)?;

        let mics = csm.size();
        let nu = norm_factor(mics);
        let g_scale = nu.sqrt();

        let mut residual = csm.clone();
        residual.zero_diagonal();

        let mut map = PowerMap::zeros(steering.rows(), steering.cols());
        let mut dirty = PowerMap::zeros(steering.rows(), steering.cols());
        let mut sources = Vec::new();
        let mut history = Vec::new();

        let mut sum_degraded = residual.abs_sum();
        let mut first_peak: Option<f64> = None;
        let mut iteration = 0;

        tracing::debug!(
            mics,
            rows = steering.rows(),
            cols = steering.cols(),
            loop_gain = self.loop_gain,
            max_iterations = self.max_iterations,
            initial_energy = sum_degraded,
            "starting CLEAN-SC"
        );

        let termination = loop {
            if iteration == self.max_iterations {
                break Termination::MaxIterationsReached { iterations: iteration };
            }
            iteration += 1;

            form_dirty_map(&residual, steering, weights, nu, &mut dirty);

            let peak = match self.classify_peak(dirty.peak(), first_peak) {
                PeakCheck::Usable(peak) => peak,
                PeakCheck::BelowFloor(value) => {
                    tracing::debug!(iteration, peak = value, "peak below floor");
                    break Termination::ConvergedEarly {
                        iteration,
                        reason: ConvergenceReason::PeakBelowFloor,
                    };
                }
                PeakCheck::Degenerate(value) => {
                    self.on_degenerate(iteration, value)?;
                    break Termination::DegeneratePeak { iteration };
                }
            };
            first_peak.get_or_insert(peak.value);

            let g: Vec<Complex64> = steering
                .vector(peak.row, peak.col)
                .iter()
                .map(|e| *e * g_scale)
                .collect();
            let solution = solve_coherent_component(&residual, &g, weights, peak.value, &self.solver);
            if !solution.converged {
                tracing::trace!(iteration, steps = solution.steps, "coherent solver hit its step budget");
            }
            if !solution.is_finite() {
                self.on_degenerate(iteration, peak.value)?;
                break Termination::DegeneratePeak { iteration };
            }

            let removed = self.loop_gain * peak.value;
            map.add(peak.row, peak.col, removed);
            residual.subtract_outer(&solution.h, removed);
            residual.zero_diagonal();

            let component = CleanComponent {
                iteration,
                row: peak.row,
                col: peak.col,
                power: removed,
            };
            sources.push(component);

            let energy = residual.abs_sum();
            tracing::debug!(
                iteration,
                peak = peak.value,
                row = peak.row,
                col = peak.col,
                residual_energy = energy,
                inner_steps = solution.steps,
                "clean component removed"
            );
            if self.record_history {
                history.push(IterationRecord {
                    iteration,
                    peak: peak.value,
                    row: peak.row,
                    col: peak.col,
                    residual_energy: energy,
                    inner_steps: solution.steps,
                    inner_converged: solution.converged,
                });
            }

            observer(&IterationView {
                iteration,
                residual: &residual,
                map: &map,
                component: &component,
            });

            if energy > sum_degraded {
                break Termination::ConvergedEarly {
                    iteration,
                    reason: ConvergenceReason::EnergyIncreased,
                };
            }
            sum_degraded = energy;
        };

        map.add_map(&dirty);

        let final_residual_energy = residual.abs_sum();
        tracing::info!(
            iterations = sources.len(),
            residual_energy = final_residual_energy,
            "CLEAN-SC finished: {}",
            termination
        );

        Ok(Deconvolution {
            map,
            termination,
            iterations: sources.len(),
            sources,
            history,
            residual,
            final_residual_energy,
        })
    }

    fn classify_peak(&self, peak: Option<Peak>, first_peak: Option<f64>) -> PeakCheck {
        let peak = match peak {
            Some(peak) => peak,
            None => return PeakCheck::Degenerate(f64::NAN),
        };
        if !peak.value.is_finite() || peak.value <= 0.0 {
            return PeakCheck::Degenerate(peak.value);
        }
        match first_peak {
            Some(first) if peak.value <= self.peak_floor * first => PeakCheck::BelowFloor(peak.value),
            _ => PeakCheck::Usable(peak),
        }
    }

    fn on_degenerate(&self, iteration: usize, peak: f64) -> CleanScResult<()> {
        match self.degenerate_policy {
            DegeneratePeakPolicy::Converge => {
                tracing::warn!(iteration, peak, "degenerate peak, stopping");
                Ok(())
            }
            DegeneratePeakPolicy::Fail => Err(CleanScError::DegeneratePeak { iteration, peak }),
        }
    }
}

/// Dirty-map peak sorted by what the loop does with it.
enum PeakCheck {
    Usable(Peak),
    /// Positive but negligible next to the first peak
    BelowFloor(f64),
    /// Missing (NaN), non-finite or not positive
    Degenerate(f64),
}

/// One-shot CLEAN-SC with optional loop gain and iteration budget.
///
/// `None` selects the defaults (0.9 and 100).
pub fn clean_sc(
    csm: &CrossSpectralMatrix,
    steering: &SteeringField,
    weights: &WeightVector,
    loop_gain: Option<f64>,
    max_iterations: Option<usize>,
) -> CleanScResult<Deconvolution> {
    CleanSc::new()
        .with_loop_gain(loop_gain.unwrap_or(DEFAULT_LOOP_GAIN))
        .with_max_iterations(max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS))
        .deconvolve(csm, steering, weights)
}
