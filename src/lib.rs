pub mod error;
pub mod simulation;
pub mod configuration;
pub mod visualization;
pub mod benchmark;

pub use error::{SimError, SimResult};

pub use simulation::states::{ArenaBounds, NVec2, Particle, ParticleSystem};
pub use simulation::quadtree::QuadTree;
pub use simulation::collisions::{resolve, resolve_pair, BroadPhase, BruteForce};
pub use simulation::integrator::{integrate_particle, step_frame};
pub use simulation::parallel::ParallelDriver;
pub use simulation::scenario::{FrameStats, Scenario};

pub use configuration::config::{ArenaConfig, BodyConfig, BroadPhaseConfig, EngineConfig, ParametersConfig, ParticlesConfig, ScenarioConfig};

pub use visualization::viewer2d::run_2d;

pub use benchmark::benchmark::{bench_broad_phase, bench_thread_scaling};
