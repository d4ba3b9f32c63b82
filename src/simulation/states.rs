//! Core state types for the disk collision simulation.
//!
//! - `Particle`       a single disk (position, velocity, radius, colour)
//! - `ParticleSystem` the fixed particle array plus the simulated time `t`
//! - `ArenaBounds`    half extents of the box the particles bounce inside
//!
//! The particle array is allocated once per scenario and mutated in place
//! every frame. Per-frame structures (the quadtree, contact lists) only hold
//! indices into it.

use nalgebra::Vector2;
pub type NVec2 = Vector2<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: NVec2,
    pub velocity: NVec2,
    pub radius: f64,
    pub color: [f32; 3], // cosmetic only, carried through to the renderer
}

impl Particle {
    pub fn new(position: NVec2, velocity: NVec2, radius: f64) -> Self {
        Self {
            position,
            velocity,
            radius,
            color: [1.0, 1.0, 1.0],
        }
    }

    /// Exact circle overlap test. Touching disks count as overlapping.
    pub fn intersects(&self, other: &Particle) -> bool {
        (self.position - other.position).norm() <= self.radius + other.radius
    }
}

#[derive(Debug, Clone)]
pub struct ParticleSystem {
    pub particles: Vec<Particle>,
    pub t: f64, // simulated time
}

impl ParticleSystem {
    pub fn new(particles: Vec<Particle>) -> Self {
        Self { particles, t: 0.0 }
    }

    /// Sum of `radius * |v|^2 / 2`. Radius stands in for mass in the resolver,
    /// so this is the quantity elastic collisions and wall bounces keep.
    pub fn kinetic_energy(&self) -> f64 {
        self.particles
            .iter()
            .map(|p| 0.5 * p.radius * p.velocity.norm_squared())
            .sum()
    }
}

/// Half width / half height of the arena, centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaBounds {
    pub half_width: f64,
    pub half_height: f64,
}

impl ArenaBounds {
    pub fn new(half_width: f64, half_height: f64) -> Self {
        Self { half_width, half_height }
    }

    /// Arena matching a window of `width x height` with the origin at its centre.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(width / 2.0, height / 2.0)
    }

    /// Half extent of the square quadtree root that covers the whole arena.
    pub fn root_half_extent(&self) -> f64 {
        self.half_width.max(self.half_height)
    }
}
