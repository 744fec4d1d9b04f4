//! # Observability
//!
//! Logging setup for hosts embedding the deconvolver. The engine itself only
//! emits `tracing` events; installing a subscriber is left to the caller.

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
