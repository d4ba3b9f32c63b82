//! Fixed-step integration of the particle system
//!
//! Provides the wall bounce, the explicit Euler position update and the
//! single-threaded frame step that strings query, resolve and integrate
//! together for every particle in index order

use log::trace;

use super::collisions::{resolve, BroadPhase};
use super::states::{ArenaBounds, NVec2, Particle};

/// Keep a particle inside the arena.
/// On each axis the centre is clamped to `[-(half - r), half - r]`; when a
/// clamp happens the matching velocity component is negated (no energy loss)
pub fn reflect_at_walls(p: &mut Particle, bounds: &ArenaBounds) {
    let max_x = bounds.half_width - p.radius;
    let min_x = -max_x;
    let max_y = bounds.half_height - p.radius;
    let min_y = -max_y;

    if p.position.x <= min_x {
        p.velocity.x = -p.velocity.x;
        p.position.x = min_x;
    } else if p.position.x >= max_x {
        p.velocity.x = -p.velocity.x;
        p.position.x = max_x;
    }

    if p.position.y <= min_y {
        p.velocity.y = -p.velocity.y;
        p.position.y = min_y;
    } else if p.position.y >= max_y {
        p.velocity.y = -p.velocity.y;
        p.position.y = max_y;
    }
}

/// Explicit Euler: x_n+1 = x_n + dt v_n
pub fn euler_step(p: &mut Particle, dt: f64) {
    p.position += dt * p.velocity;
}

/// Wall bounce followed by one Euler step
pub fn integrate_particle(p: &mut Particle, bounds: &ArenaBounds, dt: f64) {
    reflect_at_walls(p, bounds);
    euler_step(p, dt);
}

/// Advance every particle by one frame on the calling thread.
///
/// For each particle `i` in index order: gather candidates from `broad`,
/// resolve `i` against them (mutating both sides of each pair), then bounce
/// and integrate `i`. Later particles therefore see the corrections applied
/// by earlier ones. Returns the number of resolved pairs
pub fn step_frame<B: BroadPhase + ?Sized>(particles: &mut [Particle], broad: &B, bounds: &ArenaBounds, dt: f64) -> usize {
    let mut candidates = Vec::new();
    let mut resolved = 0;

    for i in 0..particles.len() {
        candidates.clear();
        broad.candidates(i, particles, &mut candidates);
        resolved += resolve(particles, i, &candidates);
        integrate_particle(&mut particles[i], bounds, dt);
    }

    trace!("serial step: {} particles, {resolved} contacts", particles.len());
    resolved
}

/// Total radius-weighted momentum, used by the headless runner to report drift
pub fn momentum(particles: &[Particle]) -> NVec2 {
    particles
        .iter()
        .fold(NVec2::zeros(), |acc, p| acc + p.radius * p.velocity)
}
