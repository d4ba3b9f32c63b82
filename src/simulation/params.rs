//! Numerical parameters for a simulation run
//!
//! `Parameters` holds runtime settings:
//! - fixed step size used by headless runs and benchmarks,
//! - number of frames a headless run advances,
//! - seed for the random particle generator

#[derive(Debug, Clone)]
pub struct Parameters {
    pub dt: f64,       // fixed step size (seconds)
    pub frames: usize, // frames to run when headless
    pub seed: u64,     // deterministic seed
}
