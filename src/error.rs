//! Error type shared by the simulation core and the scenario loader.
//!
//! Everything here is a configuration problem detected up front. Per-frame
//! work never returns errors: a particle that cannot be inserted or a pair
//! that cannot be resolved is skipped for that frame.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("worker thread count must be at least 1")]
    ZeroThreads,

    #[error("quadtree bucket capacity must be at least 1")]
    ZeroCapacity,

    #[error("quadtree half extent must be positive and finite, got {0}")]
    InvalidExtent(f64),

    #[error("arena must have positive finite size, got {width} x {height}")]
    InvalidArena { width: f64, height: f64 },

    #[error("invalid scenario: {0}")]
    InvalidConfig(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type SimResult<T> = Result<T, SimError>;
