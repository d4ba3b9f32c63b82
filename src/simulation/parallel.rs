//! Multi-threaded frame step
//!
//! The particle array is cut into contiguous chunks, one per worker, and the
//! broad phase (normally the frame's quadtree) is shared read-only by all of
//! them. A frame runs in three phases separated by joins:
//!
//! 1. gather: every worker queries the broad phase for the particles of its
//!    chunk and keeps the pairs that pass the exact overlap test. Nothing is
//!    written, so the particle slice is shared immutably.
//! 2. resolve: the contact lists are merged, each unordered pair is kept once,
//!    and pairs are resolved on the calling thread in index order.
//! 3. integrate: every worker bounces and integrates the particles of its own
//!    chunk, which are disjoint `&mut` slices.
//!
//! A partner found by a query can belong to another worker's chunk, so
//! resolving inside phase 1 would mean two workers writing the same particle.
//! Deferring the writes to phase 2 removes that race and makes the result
//! independent of the worker count.

use std::ops::Range;

use log::{info, trace};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{SimError, SimResult};
use crate::simulation::collisions::{pair_mut, resolve_pair, BroadPhase};
use crate::simulation::integrator::integrate_particle;
use crate::simulation::states::{ArenaBounds, Particle};

/// Unordered overlapping pair, stored as (lower index, higher index)
pub type Contact = (usize, usize);

/// Fixed-size worker pool that steps a particle array chunk by chunk.
///
/// The pool is created once and reused every frame; each frame spawns one
/// task per chunk inside a scope and waits for all of them before moving on.
pub struct ParallelDriver {
    pool: ThreadPool,
    threads: usize,
}

impl ParallelDriver {
    /// Pool with exactly `threads` workers. Zero is a configuration error.
    pub fn new(threads: usize) -> SimResult<Self> {
        if threads == 0 {
            return Err(SimError::ZeroThreads);
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("qtsim-worker-{i}"))
            .build()?;

        info!("parallel driver: {threads} worker threads");
        Ok(Self { pool, threads })
    }

    /// One worker per hardware thread, falling back to a single worker when
    /// the platform cannot tell.
    pub fn with_available_parallelism() -> SimResult<Self> {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(threads)
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Particles per chunk. The last chunk may be shorter; no particle is
    /// left without a worker.
    pub fn chunk_len(&self, n: usize) -> usize {
        n.div_ceil(self.threads).max(1)
    }

    /// Contiguous index ranges, one per task, covering `0..n` exactly.
    pub fn chunk_ranges(&self, n: usize) -> Vec<Range<usize>> {
        let len = self.chunk_len(n);
        (0..n).step_by(len).map(|start| start..(start + len).min(n)).collect()
    }

    /// Advance every particle by one frame using the worker pool.
    /// Returns the number of resolved pairs.
    pub fn step_frame<B>(&self, particles: &mut [Particle], broad: &B, bounds: &ArenaBounds, dt: f64) -> usize
    where
        B: BroadPhase + Sync + ?Sized,
    {
        let n = particles.len();
        if n == 0 {
            return 0;
        }

        let ranges = self.chunk_ranges(n);

        // Phase 1: read-only contact gathering, one task per chunk
        let mut per_chunk: Vec<Vec<Contact>> = vec![Vec::new(); ranges.len()];
        {
            let shared: &[Particle] = particles;
            self.pool.scope(|s| {
                for (range, contacts) in ranges.iter().zip(per_chunk.iter_mut()) {
                    s.spawn(move |_| *contacts = gather_contacts(range.clone(), shared, broad));
                }
            });
        }

        // Phase 2: resolve each pair once, in index order
        let contacts = merge_contacts(per_chunk);
        let mut resolved = 0;
        for &(i, j) in &contacts {
            if let Some((a, b)) = pair_mut(particles, i, j) {
                if resolve_pair(a, b) {
                    resolved += 1;
                }
            }
        }

        // Phase 3: bounce + integrate disjoint chunks
        let len = self.chunk_len(n);
        self.pool.scope(|s| {
            for chunk in particles.chunks_mut(len) {
                s.spawn(move |_| {
                    for p in chunk.iter_mut() {
                        integrate_particle(p, bounds, dt);
                    }
                });
            }
        });

        trace!(
            "parallel step: {n} particles, {} chunks, {} contacts, {resolved} resolved",
            ranges.len(),
            contacts.len()
        );
        resolved
    }
}

/// Overlapping pairs seen from the particles in `range`, in the order the
/// particles and their candidates were visited.
pub fn gather_contacts<B>(range: Range<usize>, particles: &[Particle], broad: &B) -> Vec<Contact>
where
    B: BroadPhase + ?Sized,
{
    let mut contacts = Vec::new();
    let mut candidates = Vec::new();

    for i in range {
        candidates.clear();
        broad.candidates(i, particles, &mut candidates);

        for &j in &candidates {
            if j != i && particles[i].intersects(&particles[j]) {
                contacts.push((i.min(j), i.max(j)));
            }
        }
    }

    contacts
}

/// Flatten per-chunk lists into one sorted list without duplicate pairs.
pub fn merge_contacts(per_chunk: Vec<Vec<Contact>>) -> Vec<Contact> {
    let mut contacts: Vec<Contact> = per_chunk.into_iter().flatten().collect();
    contacts.sort_unstable();
    contacts.dedup();
    contacts
}
