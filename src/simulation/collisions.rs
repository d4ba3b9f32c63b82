//! Broad phase candidates and pairwise collision resolution
//!
//! Defines the [`BroadPhase`] trait with two sources of candidate pairs
//! (the per-frame [`QuadTree`] and an all-pairs [`BruteForce`] baseline) and
//! the impulse + de-penetration resolver applied to every overlapping pair

use crate::simulation::quadtree::QuadTree;
use crate::simulation::states::Particle;

/// Source of collision candidates for one particle.
/// Implementations append indices of possible partners of `particles[i]`
/// to `out`; the exact overlap test is done by the resolver
pub trait BroadPhase {
    fn candidates(&self, i: usize, particles: &[Particle], out: &mut Vec<usize>);
}

impl BroadPhase for QuadTree {
    fn candidates(&self, i: usize, particles: &[Particle], out: &mut Vec<usize>) {
        self.query(i, particles, out);
    }
}

/// O(n^2) baseline: particle `i` is tested against every later particle,
/// so each unordered pair is seen exactly once per frame
pub struct BruteForce;

impl BroadPhase for BruteForce {
    fn candidates(&self, i: usize, particles: &[Particle], out: &mut Vec<usize>) {
        out.extend((i + 1)..particles.len());
    }
}

/// Resolve one pair in place. Returns `true` if the pair overlapped and was
/// resolved.
///
/// `a` plays the role of the particle being updated and `b` of the candidate.
/// Radius is used as the mass weight of each side:
///
/// ```text
/// n  = normalize(b.x - a.x)
/// p  = 2 (n . (a.v - b.v)) / (ra + rb)
/// a.v -= p rb n
/// b.v += p ra n
/// ```
///
/// followed by pushing both disks apart along the line of centres in
/// proportion to their radii. Pairs at exactly the same position have no
/// normal and are left alone.
pub fn resolve_pair(a: &mut Particle, b: &mut Particle) -> bool {
    if !a.intersects(b) {
        return false;
    }

    let separation = a.position - b.position;
    let distance = separation.norm();
    if distance == 0.0 {
        return false;
    }

    let sum_r = a.radius + b.radius;

    // Impulse along the normal from a to b
    let normal = -separation / distance;
    let relative = a.velocity - b.velocity;
    let impulse = 2.0 * normal.dot(&relative) / sum_r;

    a.velocity -= impulse * b.radius * normal;
    b.velocity += impulse * a.radius * normal;

    // Remove the overlap
    let overlap = sum_r - distance;
    let correction = (separation / distance) * overlap;

    a.position += correction * a.radius / sum_r;
    b.position -= correction * b.radius / sum_r;

    true
}

/// Resolve particle `i` against each of `candidates` in order.
/// Returns how many pairs were actually resolved.
pub fn resolve(particles: &mut [Particle], i: usize, candidates: &[usize]) -> usize {
    let mut resolved = 0;
    for &j in candidates {
        if let Some((a, b)) = pair_mut(particles, i, j) {
            if resolve_pair(a, b) {
                resolved += 1;
            }
        }
    }
    resolved
}

/// Two distinct mutable particles, in the order asked for.
/// `None` when `i == j` or either index is out of range.
pub fn pair_mut(particles: &mut [Particle], i: usize, j: usize) -> Option<(&mut Particle, &mut Particle)> {
    if i == j || i >= particles.len() || j >= particles.len() {
        return None;
    }

    if i < j {
        let (lo, hi) = particles.split_at_mut(j);
        Some((&mut lo[i], &mut hi[0]))
    } else {
        let (lo, hi) = particles.split_at_mut(i);
        Some((&mut hi[0], &mut lo[j]))
    }
}
