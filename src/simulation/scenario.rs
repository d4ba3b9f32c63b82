//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces the runtime bundle
//! `Scenario` containing:
//! - engine settings (`Engine`)
//! - numerical parameters (`Parameters`)
//! - particle state (`ParticleSystem` at t = 0)
//! - arena bounds and, for parallel runs, the worker pool
//!
//! The scenario is inserted into Bevy as a `Resource` by the viewer, or
//! stepped directly by the headless runner and the benchmarks

use std::time::Instant;

use bevy::prelude::Resource;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::configuration::config::{BodyConfig, BroadPhaseConfig, ParticlesConfig, ScenarioConfig};
use crate::error::SimResult;
use crate::simulation::collisions::BruteForce;
use crate::simulation::engine::Engine;
use crate::simulation::integrator::{momentum, step_frame};
use crate::simulation::parallel::ParallelDriver;
use crate::simulation::params::Parameters;
use crate::simulation::quadtree::QuadTree;
use crate::simulation::states::{ArenaBounds, NVec2, Particle, ParticleSystem};

/// What one frame did, for logging and the viewer title
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub contacts: usize,   // pairs resolved this frame
    pub tree_nodes: usize, // 0 for the brute force broad phase
    pub tree_depth: usize,
}

/// Bevy resource representing a fully-initialized simulation scenario
///
/// This is the main "runtime bundle" constructed from a [`ScenarioConfig`]:
/// it contains the engine settings, parameters, current particle state, the
/// arena, and the worker pool when stepping in parallel
///
/// `tree` keeps the quadtree of the last frame so the viewer can draw it
#[derive(Resource)]
pub struct Scenario {
    pub engine: Engine,
    pub parameters: Parameters,
    pub system: ParticleSystem,
    pub arena: ArenaBounds,
    pub driver: Option<ParallelDriver>,
    pub tree: Option<QuadTree>,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> SimResult<Self> {
        cfg.validate()?;

        let arena = ArenaBounds::from_size(cfg.arena.width, cfg.arena.height);

        // Parameters (runtime) from ParametersConfig
        let p_cfg = &cfg.parameters;
        let parameters = Parameters {
            dt: p_cfg.dt,
            frames: p_cfg.frames,
            seed: p_cfg.seed,
        };

        // Particles: random ones first, then the explicit bodies
        let mut rng = StdRng::seed_from_u64(parameters.seed);
        let mut particles = match &cfg.particles {
            Some(generator) => generate_particles(generator, &arena, &mut rng),
            None => Vec::new(),
        };
        particles.extend(cfg.bodies.iter().map(body_from_config));

        let system = ParticleSystem::new(particles);

        // Engine (runtime) from EngineConfig
        let e_cfg = cfg.engine;
        let driver = if e_cfg.parallel {
            Some(match e_cfg.threads {
                Some(n) => ParallelDriver::new(n)?,
                None => ParallelDriver::with_available_parallelism()?,
            })
        } else {
            None
        };

        let engine = Engine {
            broad_phase: e_cfg.broad_phase,
            parallel: e_cfg.parallel,
            threads: driver.as_ref().map_or(1, ParallelDriver::threads),
            capacity: e_cfg.capacity,
            draw_tree: e_cfg.draw_tree,
        };

        info!(
            "scenario: {} particles, {:?} broad phase, {} thread(s), arena {}x{}",
            system.particles.len(),
            engine.broad_phase,
            engine.threads,
            cfg.arena.width,
            cfg.arena.height
        );

        Ok(Self {
            engine,
            parameters,
            system,
            arena,
            driver,
            tree: None,
        })
    }

    /// Follow a window resize. A zero-sized (minimized) window keeps the
    /// previous arena.
    pub fn resize_arena(&mut self, width: f64, height: f64) {
        if width > 0.0 && height > 0.0 {
            self.arena = ArenaBounds::from_size(width, height);
        }
    }

    /// Advance the simulation by one frame of `dt` seconds.
    ///
    /// With the quadtree broad phase the tree is rebuilt from scratch on the
    /// calling thread, then shared by the serial or parallel step.
    pub fn step(&mut self, dt: f64) -> SimResult<FrameStats> {
        let bounds = self.arena;
        let particles = &mut self.system.particles;
        let mut stats = FrameStats::default();

        match self.engine.broad_phase {
            BroadPhaseConfig::QuadTree => {
                let tree = QuadTree::build(particles.as_slice(), NVec2::zeros(), bounds.root_half_extent(), self.engine.capacity)?;
                stats.tree_nodes = tree.node_count();
                stats.tree_depth = tree.depth();

                stats.contacts = match &self.driver {
                    Some(driver) => driver.step_frame(particles, &tree, &bounds, dt),
                    None => step_frame(particles, &tree, &bounds, dt),
                };
                self.tree = Some(tree);
            }
            BroadPhaseConfig::BruteForce => {
                stats.contacts = match &self.driver {
                    Some(driver) => driver.step_frame(particles, &BruteForce, &bounds, dt),
                    None => step_frame(particles, &BruteForce, &bounds, dt),
                };
                self.tree = None;
            }
        }

        self.system.t += dt;
        Ok(stats)
    }

    /// Run `parameters.frames` fixed steps without a window, logging progress
    /// about once per simulated second.
    pub fn run_headless(&mut self) -> SimResult<()> {
        let dt = self.parameters.dt;
        let frames = self.parameters.frames;
        let log_every = if dt > 0.0 { ((1.0 / dt).round() as usize).max(1) } else { 60 };

        let e0 = self.system.kinetic_energy();
        info!("headless: {frames} frames, dt = {dt}, initial energy {e0:.3}");

        let started = Instant::now();
        for frame in 1..=frames {
            let stats = self.step(dt)?;

            if frame % log_every == 0 {
                let p = momentum(&self.system.particles);
                debug!(
                    "t = {:.3}: {} contacts, {} nodes (depth {}), energy {:.3}, momentum ({:.3}, {:.3})",
                    self.system.t,
                    stats.contacts,
                    stats.tree_nodes,
                    stats.tree_depth,
                    self.system.kinetic_energy(),
                    p.x,
                    p.y
                );
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        let escaped = self.escaped_particles();
        if escaped > 0 {
            warn!("headless: {escaped} particles ended outside the arena");
        }
        info!(
            "headless: {frames} frames in {elapsed:.3} s ({:.1} frames/s), final energy {:.3}",
            if elapsed > 0.0 { frames as f64 / elapsed } else { 0.0 },
            self.system.kinetic_energy()
        );
        Ok(())
    }

    /// Particles whose disk is not fully inside the arena.
    /// Non-zero only transiently, after a collision pushed a particle into a
    /// wall and before its next bounce.
    pub fn escaped_particles(&self) -> usize {
        let b = &self.arena;
        self.system
            .particles
            .iter()
            .filter(|p| p.position.x.abs() > b.half_width - p.radius || p.position.y.abs() > b.half_height - p.radius)
            .count()
    }
}

/// Random particles spread over the arena.
///
/// Positions and radii are whole numbers, positions in
/// `[-(half - max_r), half - max_r]` on each axis; velocity points away from
/// the origin with a whole-number speed in `[min_speed, max_speed]`; colour
/// channels are drawn from 0.25..=1.0 in steps of 0.01.
pub fn generate_particles<R: Rng>(cfg: &ParticlesConfig, arena: &ArenaBounds, rng: &mut R) -> Vec<Particle> {
    let range_x = (arena.half_width - cfg.max_radius).max(0.0) as i64;
    let range_y = (arena.half_height - cfg.max_radius).max(0.0) as i64;
    // whole-number radii inside [min_radius, max_radius]
    let r_lo = cfg.min_radius.ceil() as i64;
    let r_hi = cfg.max_radius.floor() as i64;

    (0..cfg.count)
        .map(|_| {
            let position = NVec2::new(rng.gen_range(-range_x..=range_x) as f64, rng.gen_range(-range_y..=range_y) as f64);

            // The origin has no outward direction; send it along +x
            let direction = position.try_normalize(0.0).unwrap_or_else(NVec2::x);
            let speed = rng.gen_range(cfg.min_speed..=cfg.max_speed) as f64;

            // a range with no whole number inside keeps min_radius
            let radius = if r_lo <= r_hi { rng.gen_range(r_lo..=r_hi) as f64 } else { cfg.min_radius };

            let mut color = [0.0f32; 3];
            for c in color.iter_mut() {
                *c = rng.gen_range(25..=100) as f32 / 100.0;
            }

            Particle {
                position,
                velocity: direction * speed,
                radius,
                color,
            }
        })
        .collect()
}

fn body_from_config(bc: &BodyConfig) -> Particle {
    Particle {
        position: NVec2::new(bc.x[0], bc.x[1]),
        velocity: NVec2::new(bc.v[0], bc.v[1]),
        radius: bc.radius,
        color: bc.color.unwrap_or([1.0, 1.0, 1.0]),
    }
}
