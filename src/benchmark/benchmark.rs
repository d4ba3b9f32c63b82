use std::time::Instant;

use crate::error::SimResult;
use crate::simulation::collisions::BruteForce;
use crate::simulation::integrator::step_frame;
use crate::simulation::parallel::ParallelDriver;
use crate::simulation::quadtree::QuadTree;
use crate::simulation::states::{ArenaBounds, NVec2, Particle};

const CAPACITY: usize = 6;
const DT: f64 = 1.0 / 60.0;

/// Helper to build `n` particles spread over `bounds`
/// deterministic positions, no rand needed
fn make_particles(n: usize, bounds: &ArenaBounds) -> Vec<Particle> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            let position = NVec2::new(
                (i_f * 0.37).sin() * (bounds.half_width - 3.0),
                (i_f * 0.13).cos() * (bounds.half_height - 3.0),
            );
            let velocity = NVec2::new((i_f * 0.07).sin(), (i_f * 0.11).cos()) * 15.0;
            Particle::new(position, velocity, 3.0)
        })
        .collect()
}

/// Time `steps` frames of `frame` on a fresh copy of `template`, in ms per frame
fn time_frames<F>(template: &[Particle], steps: usize, mut frame: F) -> f64
where
    F: FnMut(&mut [Particle]),
{
    let mut particles = template.to_vec();

    // Warm up
    frame(&mut particles);

    let t0 = Instant::now();
    for _ in 0..steps {
        frame(&mut particles);
    }
    t0.elapsed().as_secs_f64() * 1000.0 / steps as f64
}

/// Brute force vs serial quadtree vs parallel quadtree, one frame each,
/// for a range of particle counts.
/// Paste output directly into a spreadsheet to graph
pub fn bench_broad_phase() -> SimResult<()> {
    let bounds = ArenaBounds::from_size(1280.0, 720.0);
    let driver = ParallelDriver::with_available_parallelism()?;

    println!("N,brute_ms,quadtree_ms,parallel_ms ({} threads)", driver.threads());

    for n in [1000, 2000, 4000, 8000, 15000, 30000] {
        let template = make_particles(n, &bounds);

        // brute force gets slow quickly, average over fewer frames
        let steps_brute = if n <= 4000 { 5 } else { 1 };
        let steps_tree = 20;

        let ms_brute = time_frames(&template, steps_brute, |ps| {
            step_frame(ps, &BruteForce, &bounds, DT);
        });

        let mut tree_error = None;
        let ms_tree = time_frames(&template, steps_tree, |ps| {
            match QuadTree::build(ps, NVec2::zeros(), bounds.root_half_extent(), CAPACITY) {
                Ok(tree) => {
                    step_frame(ps, &tree, &bounds, DT);
                }
                Err(e) => tree_error = Some(e),
            }
        });

        let ms_parallel = time_frames(&template, steps_tree, |ps| {
            match QuadTree::build(ps, NVec2::zeros(), bounds.root_half_extent(), CAPACITY) {
                Ok(tree) => {
                    driver.step_frame(ps, &tree, &bounds, DT);
                }
                Err(e) => tree_error = Some(e),
            }
        });

        if let Some(e) = tree_error {
            return Err(e);
        }

        println!("{},{:.6},{:.6},{:.6}", n, ms_brute, ms_tree, ms_parallel);
    }

    Ok(())
}

/// Parallel quadtree frame time against worker count, fixed particle count
pub fn bench_thread_scaling() -> SimResult<()> {
    let bounds = ArenaBounds::from_size(1280.0, 720.0);
    let template = make_particles(15000, &bounds);
    let max_threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);

    println!("threads,parallel_ms");

    let mut threads = 1;
    while threads <= max_threads {
        let driver = ParallelDriver::new(threads)?;
        let tree_half = bounds.root_half_extent();

        let ms = time_frames(&template, 20, |ps| {
            if let Ok(tree) = QuadTree::build(ps, NVec2::zeros(), tree_half, CAPACITY) {
                driver.step_frame(ps, &tree, &bounds, DT);
            }
        });

        println!("{},{:.6}", threads, ms);
        threads *= 2;
    }

    Ok(())
}
