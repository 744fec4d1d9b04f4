//! # CLEAN-SC Deconvolution
//!
//! This crate sharpens beamformed acoustic source maps with CLEAN-SC, the
//! "CLEAN based on spatial source coherence" algorithm. A conventional
//! beamforming map of a microphone array smears every source with the
//! array's point-spread function. CLEAN-SC repeatedly locates the strongest
//! source, removes the part of the cross-spectral matrix that is coherent
//! with it and places a clean beam at its position.
//!
//! ## Overview
//!
//! - **Cross-spectral matrix**: P×P Hermitian [`CrossSpectralMatrix`]
//! - **Steering**: N×M grid of P-length vectors in a [`SteeringField`], with
//!   per-microphone [`WeightVector`] shading
//! - **Dirty map**: diagonal-removed conventional beamforming
//! - **Coherent solver**: fixed-point estimate of the peak's coherent part
//! - **Deconvolver**: the outer CLEAN-SC loop with its energy criterion
//!
//! ## Signal Flow
//!
//! ```text
//! CSM ─► zero diagonal ─► dirty map ─► peak ─► coherent h ─► subtract γ·Pmax·h·hᴴ
//!                            ▲                                     │
//!                            └──────────── residual CSM ◄──────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use cleansc_core::prelude::*;
//!
//! let field = random_steering_field(10, 10, 4, 42);
//! let csm = point_source_csm(&field, &[PointSource::new(5, 5, 1.0)]);
//!
//! let result = clean_sc(&csm, &field, &WeightVector::ones(4), Some(0.9), Some(100)).unwrap();
//! assert!((result.map.get(5, 5) - 1.0).abs() < 1e-3);
//! ```
//!
//! ## Features
//!
//! - `parallel`: distribute the dirty-map grid rows over a rayon pool

pub mod coherent;
pub mod config;
pub mod csm;
pub mod deconvolver;
pub mod dirty_map;
pub mod observe;
pub mod power_map;
pub mod steering;
pub mod synth;
pub mod types;

pub use coherent::{solve_coherent_component, CoherenceModel, CoherentSolution, SolverSettings};
pub use config::{CleanScConfig, ConfigError, SolverConfig};
pub use csm::CrossSpectralMatrix;
pub use deconvolver::{
    clean_sc, CleanComponent, CleanSc, ConvergenceReason, Deconvolution, DegeneratePeakPolicy,
    IterationRecord, IterationView, Termination,
};
pub use dirty_map::dirty_map;
pub use power_map::{Peak, PowerMap};
pub use steering::{SteeringField, WeightVector};
pub use types::{CleanScError, CleanScResult, Complex};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::csm::CrossSpectralMatrix;
    pub use crate::deconvolver::{clean_sc, CleanSc, Deconvolution, Termination};
    pub use crate::dirty_map::dirty_map;
    pub use crate::power_map::PowerMap;
    pub use crate::steering::{SteeringField, WeightVector};
    pub use crate::types::{CleanScError, CleanScResult, Complex};
    // Synthetic fixtures
    pub use crate::synth::{point_source_csm, random_steering_field, PointSource};
}
