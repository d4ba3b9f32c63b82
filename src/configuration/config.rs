//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]     – broad phase, serial/parallel stepping, quadtree capacity
//! - [`ArenaConfig`]      – initial arena (window) size
//! - [`ParametersConfig`] – fixed step, headless frame count, random seed
//! - [`ParticlesConfig`]  – random particle generator settings
//! - [`BodyConfig`]       – explicitly placed particles
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! # YAML format
//! An example scenario YAML matching these types:
//!
//! ```yaml
//! engine:
//!   broad_phase: "quadtree"   # or "brute_force"
//!   parallel: true
//!   threads: 8                # omit to use every hardware thread
//!   capacity: 6               # quadtree bucket size
//!   draw_tree: false
//!
//! arena:
//!   width: 1280.0
//!   height: 720.0
//!
//! parameters:
//!   dt: 0.016                 # fixed step for headless runs
//!   frames: 600
//!   seed: 42
//!
//! particles:
//!   count: 15000
//!   min_radius: 3.0
//!   max_radius: 3.0
//!   min_speed: 10
//!   max_speed: 20
//!
//! bodies:
//!   - x: [ -20.0, 0.0 ]
//!     v: [  30.0, 0.0 ]
//!     radius: 8.0
//!     color: [ 1.0, 0.3, 0.3 ]
//! ```
//!
//! The engine then maps this configuration into its internal runtime scenario
//! representation (see [`crate::simulation::scenario::Scenario`]).

use serde::Deserialize;

use crate::error::{SimError, SimResult};

/// Which broad phase feeds candidate pairs to the resolver
/// broad_phase: "quadtree"` or `broad_phase: "brute_force"
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadPhaseConfig {
    #[serde(rename = "quadtree")] // Bucket quadtree rebuilt every frame
    #[default]
    QuadTree,

    #[serde(rename = "brute_force")] // Every particle against every later particle, O(n^2)
    BruteForce,
}

/// High-level engine configuration
/// Controls how a frame is computed
#[derive(Deserialize, Debug, Clone)]
pub struct EngineConfig {
    #[serde(default)]
    pub broad_phase: BroadPhaseConfig, // candidate source for collisions
    #[serde(default)]
    pub parallel: bool, // `true` - step on a worker pool, `false` - single thread
    pub threads: Option<usize>, // worker count, `None` - one per hardware thread
    #[serde(default = "default_capacity")]
    pub capacity: usize, // quadtree bucket size
    #[serde(default)]
    pub draw_tree: bool, // draw quadtree node outlines in the viewer
}

fn default_capacity() -> usize {
    6
}

/// Initial arena size, matching the window the viewer opens
#[derive(Deserialize, Debug, Clone)]
pub struct ArenaConfig {
    pub width: f64,
    pub height: f64,
}

/// Global numerical parameters for a scenario
#[derive(Deserialize, Debug, Clone)]
pub struct ParametersConfig {
    pub dt: f64,       // fixed time step for headless runs
    pub frames: usize, // frames advanced by a headless run
    pub seed: u64,     // deterministic seed to make runs reproducable
}

/// Random particle generator settings
#[derive(Deserialize, Debug, Clone)]
pub struct ParticlesConfig {
    pub count: usize,    // number of generated particles
    pub min_radius: f64, // radius range
    pub max_radius: f64,
    pub min_speed: i64, // outward speed range, whole units per second
    pub max_speed: i64,
}

/// Configuration for a single explicitly placed particle
#[derive(Deserialize, Debug, Clone)]
pub struct BodyConfig {
    pub x: Vec<f64>,             // Initial position `[x, y]`
    pub v: Vec<f64>,             // Initial velocity `[vx, vy]`
    pub radius: f64,             // Disk radius, also the mass weight in collisions
    pub color: Option<[f32; 3]>, // Render colour, white when omitted
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub engine: EngineConfig,         // broad phase, threading, quadtree capacity
    pub arena: ArenaConfig,           // initial arena size
    pub parameters: ParametersConfig, // step size, frame count, seed
    pub particles: Option<ParticlesConfig>, // random particles, none when omitted
    #[serde(default)]
    pub bodies: Vec<BodyConfig>,      // explicit particles appended after the random ones
}

impl ScenarioConfig {
    /// Reject configurations that would fail at runtime.
    /// Everything checked here is fatal and reported before the first frame
    pub fn validate(&self) -> SimResult<()> {
        let a = &self.arena;
        if !(a.width.is_finite() && a.height.is_finite() && a.width > 0.0 && a.height > 0.0) {
            return Err(SimError::InvalidArena { width: a.width, height: a.height });
        }

        if self.engine.capacity == 0 {
            return Err(SimError::ZeroCapacity);
        }
        if self.engine.threads == Some(0) {
            return Err(SimError::ZeroThreads);
        }

        if !(self.parameters.dt.is_finite() && self.parameters.dt >= 0.0) {
            return Err(SimError::InvalidConfig(format!("dt must be a non-negative number, got {}", self.parameters.dt)));
        }

        if let Some(p) = &self.particles {
            if !(p.min_radius >= 0.0 && p.min_radius <= p.max_radius) {
                return Err(SimError::InvalidConfig(format!(
                    "radius range [{}, {}] is empty or negative",
                    p.min_radius, p.max_radius
                )));
            }
            if p.min_speed > p.max_speed {
                return Err(SimError::InvalidConfig(format!("speed range [{}, {}] is empty", p.min_speed, p.max_speed)));
            }
            let half_min = a.width.min(a.height) / 2.0;
            if p.max_radius >= half_min {
                return Err(SimError::InvalidConfig(format!(
                    "max_radius {} does not fit in a {} x {} arena",
                    p.max_radius, a.width, a.height
                )));
            }
        }

        for (i, b) in self.bodies.iter().enumerate() {
            if b.x.len() != 2 || b.v.len() != 2 {
                return Err(SimError::InvalidConfig(format!("body {i}: x and v must have two components")));
            }
            if !b.x.iter().chain(b.v.iter()).all(|c| c.is_finite()) {
                return Err(SimError::InvalidConfig(format!("body {i}: x and v must be finite")));
            }
            if !(b.radius >= 0.0) {
                return Err(SimError::InvalidConfig(format!("body {i}: radius must be non-negative")));
            }
        }

        Ok(())
    }
}
