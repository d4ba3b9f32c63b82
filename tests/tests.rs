use qtsim::simulation::collisions::{resolve, resolve_pair, BruteForce};
use qtsim::simulation::integrator::{integrate_particle, reflect_at_walls, step_frame};
use qtsim::simulation::parallel::ParallelDriver;
use qtsim::simulation::quadtree::{QuadTree, TOP_LEFT};
use qtsim::simulation::scenario::{generate_particles, Scenario};
use qtsim::simulation::states::{ArenaBounds, NVec2, Particle};
use qtsim::{ParticlesConfig, ScenarioConfig, SimError};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Build a particle from plain numbers
pub fn disk(x: f64, y: f64, vx: f64, vy: f64, r: f64) -> Particle {
    Particle::new(NVec2::new(x, y), NVec2::new(vx, vy), r)
}

/// Empty tree centred on the origin
pub fn tree(half: f64, capacity: usize) -> QuadTree {
    QuadTree::new(NVec2::zeros(), half, capacity).unwrap()
}

/// Random crowded particle set, the same for every call
pub fn crowd(n: usize, bounds: &ArenaBounds) -> Vec<Particle> {
    let cfg = ParticlesConfig {
        count: n,
        min_radius: 3.0,
        max_radius: 5.0,
        min_speed: 10,
        max_speed: 40,
    };
    let mut rng = StdRng::seed_from_u64(1234);
    generate_particles(&cfg, bounds, &mut rng)
}

/// Minimal scenario YAML with the engine block swapped in
pub fn scenario_yaml(engine: &str) -> String {
    format!(
        "engine:\n{engine}\narena:\n  width: 400.0\n  height: 300.0\nparameters:\n  dt: 0.02\n  frames: 10\n  seed: 3\nparticles:\n  count: 500\n  min_radius: 2.0\n  max_radius: 4.0\n  min_speed: 10\n  max_speed: 20\n"
    )
}

// ==================================================================================
// Quadtree tests
// ==================================================================================

#[test]
fn insert_succeeds_iff_inside_root() {
    let cases = [
        (disk(3.0, 4.0, 0.0, 0.0, 1.0), true),
        (disk(10.0, 10.0, 0.0, 0.0, 1.0), true),   // corner counts as inside
        (disk(-10.0, -10.0, 0.0, 0.0, 1.0), true),
        (disk(10.001, 0.0, 0.0, 0.0, 1.0), false),
        (disk(0.0, -10.5, 0.0, 0.0, 20.0), false), // radius is ignored
        (disk(-9.0, 9.0, 0.0, 0.0, 1.0), true),
        (disk(0.0, 0.0, 0.0, 0.0, 1.0), true),
        (disk(5.0, -5.0, 0.0, 0.0, 1.0), true),
    ];
    let particles: Vec<Particle> = cases.iter().map(|(p, _)| p.clone()).collect();

    // small capacity so later inserts have to go through children
    let mut t = tree(10.0, 2);
    for (i, (_, inside)) in cases.iter().enumerate() {
        assert_eq!(t.insert(i, &particles), *inside, "particle {i}");
    }
    assert_eq!(t.len(), cases.iter().filter(|(_, inside)| *inside).count());
}

#[test]
fn split_keeps_existing_elements_at_parent() {
    // all in the top-left quadrant of a 32x32 root
    let particles = vec![
        disk(-8.0, -8.0, 0.0, 0.0, 1.0),
        disk(-9.0, -7.0, 0.0, 0.0, 1.0),
        disk(-7.0, -9.0, 0.0, 0.0, 1.0),
        disk(-6.0, -6.0, 0.0, 0.0, 1.0),
    ];
    let mut t = tree(16.0, 3);

    for i in 0..3 {
        assert!(t.insert(i, &particles));
    }
    assert_eq!(t.node_count(), 1);

    assert!(t.insert(3, &particles));
    assert_eq!(t.node_count(), 5, "capacity + 1 insert should split the root");

    let root = &t.nodes[t.root];
    assert_eq!(root.elements, vec![0, 1, 2], "pre-split elements must stay at the root");

    let children = root.children.unwrap();
    assert_eq!(t.nodes[children[TOP_LEFT]].elements, vec![3]);
    for child in children {
        assert!(t.nodes[child].elements.len() <= t.capacity);
        assert_eq!(t.nodes[child].half_extent, 8.0);
    }
}

#[test]
fn query_returns_colliding_pair_from_cluster() {
    let particles = vec![
        disk(0.0, 0.0, 0.0, 0.0, 2.0),
        disk(3.0, 0.0, 0.0, 0.0, 2.0),
        disk(50.0, 50.0, 0.0, 0.0, 2.0),
    ];
    let t = QuadTree::build(&particles, NVec2::zeros(), 100.0, 1).unwrap();

    let mut found = Vec::new();
    t.query(0, &particles, &mut found);
    assert!(found.contains(&1), "overlapping neighbour missing: {found:?}");
    assert!(!found.contains(&0), "query must not report the particle itself");

    // the exact test narrows the superset down to the real pair
    let colliding: Vec<usize> = found.iter().copied().filter(|&j| particles[0].intersects(&particles[j])).collect();
    assert_eq!(colliding, vec![1]);

    let mut back = Vec::new();
    t.query(1, &particles, &mut back);
    assert!(back.contains(&0));
}

#[test]
fn wide_query_region_reaches_every_node() {
    let bounds = ArenaBounds::from_size(300.0, 200.0);
    let particles = crowd(800, &bounds);
    let t = QuadTree::build(&particles, NVec2::zeros(), bounds.root_half_extent(), 4).unwrap();
    assert!(t.node_count() > 1);

    // a radius covering the whole root passes every prune test
    let mut found = Vec::new();
    t.query_region(&NVec2::new(140.0, -90.0), 400.0, &particles, &mut found);
    found.sort_unstable();
    assert_eq!(found, (0..particles.len()).collect::<Vec<_>>());

    // and a far away point outside the expanded root finds nothing
    found.clear();
    t.query_region(&NVec2::new(1000.0, 0.0), 5.0, &particles, &mut found);
    assert!(found.is_empty());
}

// ==================================================================================
// Collision tests
// ==================================================================================

#[test]
fn head_on_equal_disks_swap_velocities() {
    let mut a = disk(-1.0, 0.0, 5.0, 0.0, 2.0);
    let mut b = disk(1.0, 0.0, -5.0, 0.0, 2.0);

    assert!(resolve_pair(&mut a, &mut b));

    assert!((a.velocity - NVec2::new(-5.0, 0.0)).norm() < 1e-12, "a: {:?}", a.velocity);
    assert!((b.velocity - NVec2::new(5.0, 0.0)).norm() < 1e-12, "b: {:?}", b.velocity);

    // pushed apart until just touching
    assert!((a.position.x + 2.0).abs() < 1e-12);
    assert!((b.position.x - 2.0).abs() < 1e-12);
}

#[test]
fn separated_pair_is_untouched() {
    let mut particles = vec![disk(0.0, 0.0, 1.0, 2.0, 1.0), disk(2.5, 0.0, -3.0, 0.5, 1.0)];
    let before = particles.clone();

    assert_eq!(resolve(&mut particles, 0, &[1]), 0);
    assert_eq!(particles, before);
}

#[test]
fn oblique_collision_keeps_weighted_momentum() {
    let mut a = disk(0.0, 0.0, 3.0, 1.0, 1.5);
    let mut b = disk(2.0, 1.0, -1.0, 0.0, 2.5);
    let before = a.radius * a.velocity + b.radius * b.velocity;

    assert!(resolve_pair(&mut a, &mut b));

    let after = a.radius * a.velocity + b.radius * b.velocity;
    assert!((after - before).norm() < 1e-9, "{before:?} -> {after:?}");
    assert!(((a.position - b.position).norm() - 4.0).abs() < 1e-9);
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn wall_bounce_is_exact() {
    let bounds = ArenaBounds::new(100.0, 50.0);
    let mut p = disk(95.0, 0.0, 10.0, 0.0, 5.0);

    reflect_at_walls(&mut p, &bounds);
    assert_eq!(p.velocity, NVec2::new(-10.0, 0.0));
    assert_eq!(p.position.x, 95.0);

    // a full step then moves it back into the arena
    let mut q = disk(95.0, 0.0, 10.0, 0.0, 5.0);
    integrate_particle(&mut q, &bounds, 0.5);
    assert_eq!(q.velocity, NVec2::new(-10.0, 0.0));
    assert_eq!(q.position.x, 90.0);
}

#[test]
fn wall_bounce_through_frame_step() {
    let bounds = ArenaBounds::new(100.0, 50.0);
    let mut particles = vec![disk(95.0, 0.0, 10.0, 0.0, 5.0)];
    let t = QuadTree::build(&particles, NVec2::zeros(), bounds.root_half_extent(), 4).unwrap();

    step_frame(&mut particles, &t, &bounds, 0.0);

    assert_eq!(particles[0].velocity, NVec2::new(-10.0, 0.0));
    assert_eq!(particles[0].position, NVec2::new(95.0, 0.0));
}

#[test]
fn overshoot_is_clamped_on_both_axes() {
    let bounds = ArenaBounds::new(20.0, 10.0);
    let mut p = disk(-30.0, 12.0, -4.0, 3.0, 2.0);

    reflect_at_walls(&mut p, &bounds);

    assert_eq!(p.position, NVec2::new(-18.0, 8.0));
    assert_eq!(p.velocity, NVec2::new(4.0, -3.0));
}

#[test]
fn brute_force_frame_resolves_pair_once() {
    let bounds = ArenaBounds::new(100.0, 100.0);
    let mut particles = vec![disk(-1.0, 0.0, 5.0, 0.0, 2.0), disk(1.0, 0.0, -5.0, 0.0, 2.0)];

    let contacts = step_frame(&mut particles, &BruteForce, &bounds, 0.0);

    assert_eq!(contacts, 1);
    assert!((particles[0].velocity.x + 5.0).abs() < 1e-12);
    assert!((particles[1].velocity.x - 5.0).abs() < 1e-12);
}

// ==================================================================================
// Parallel driver tests
// ==================================================================================

#[test]
fn parallel_result_does_not_depend_on_thread_count() {
    let bounds = ArenaBounds::from_size(400.0, 300.0);
    let template = crowd(2000, &bounds);

    let run = |threads: usize| {
        let driver = ParallelDriver::new(threads).unwrap();
        let mut particles = template.clone();
        for _ in 0..20 {
            let t = QuadTree::build(&particles, NVec2::zeros(), bounds.root_half_extent(), 6).unwrap();
            driver.step_frame(&mut particles, &t, &bounds, 1.0 / 60.0);
        }
        particles
    };

    let one = run(1);
    assert_eq!(one, run(3));
    assert_eq!(one, run(8));
    assert!(one.iter().all(|p| p.position.x.is_finite() && p.velocity.y.is_finite()));
}

#[test]
fn parallel_matches_serial_without_collisions() {
    let bounds = ArenaBounds::new(120.0, 120.0);

    // sparse grid, nobody can reach a neighbour within the run
    let mut template = Vec::new();
    for i in 0..10 {
        for j in 0..10 {
            let x = -100.0 + 20.0 * i as f64;
            let y = -100.0 + 20.0 * j as f64;
            template.push(disk(x, y, (i as f64 - 4.5) * 0.2, (j as f64 - 4.5) * 0.2, 1.0));
        }
    }

    let driver = ParallelDriver::new(4).unwrap();
    let mut serial = template.clone();
    let mut parallel = template;

    for _ in 0..10 {
        let t = QuadTree::build(&serial, NVec2::zeros(), bounds.root_half_extent(), 3).unwrap();
        assert_eq!(step_frame(&mut serial, &t, &bounds, 0.1), 0);

        let t = QuadTree::build(&parallel, NVec2::zeros(), bounds.root_half_extent(), 3).unwrap();
        assert_eq!(driver.step_frame(&mut parallel, &t, &bounds, 0.1), 0);
    }

    assert_eq!(serial, parallel);
}

#[test]
fn parallel_head_on_pair_across_chunks() {
    let bounds = ArenaBounds::new(100.0, 100.0);
    // one particle per chunk with two workers
    let mut particles = vec![disk(-1.0, 0.0, 5.0, 0.0, 2.0), disk(1.0, 0.0, -5.0, 0.0, 2.0)];
    let driver = ParallelDriver::new(2).unwrap();
    let t = QuadTree::build(&particles, NVec2::zeros(), 100.0, 4).unwrap();

    let contacts = driver.step_frame(&mut particles, &t, &bounds, 0.0);

    assert_eq!(contacts, 1, "the pair is seen from both chunks but resolved once");
    assert!((particles[0].velocity.x + 5.0).abs() < 1e-12);
    assert!((particles[1].velocity.x - 5.0).abs() < 1e-12);
}

// ==================================================================================
// Scenario / configuration tests
// ==================================================================================

#[test]
fn generated_particles_fit_the_arena() {
    let bounds = ArenaBounds::from_size(640.0, 360.0);
    let particles = crowd(1000, &bounds);

    assert_eq!(particles.len(), 1000);
    for p in &particles {
        assert!(p.position.x.abs() <= 320.0 - 5.0 && p.position.y.abs() <= 180.0 - 5.0);
        assert_eq!(p.position.x.fract(), 0.0);
        assert!((3.0..=5.0).contains(&p.radius));
        assert_eq!(p.radius.fract(), 0.0);

        let speed = p.velocity.norm();
        assert!(speed >= 10.0 - 1e-9 && speed <= 40.0 + 1e-9, "speed {speed}");
        assert!(p.color.iter().all(|c| (0.25..=1.0).contains(c)));
    }
}

#[test]
fn zero_threads_is_rejected_at_startup() {
    let cfg: ScenarioConfig =
        serde_yaml::from_str(&scenario_yaml("  parallel: true\n  threads: 0")).unwrap();
    assert!(matches!(cfg.validate(), Err(SimError::ZeroThreads)));
    assert!(matches!(Scenario::build_scenario(cfg), Err(SimError::ZeroThreads)));
}

#[test]
fn zero_capacity_is_rejected_at_startup() {
    let cfg: ScenarioConfig = serde_yaml::from_str(&scenario_yaml("  capacity: 0")).unwrap();
    assert!(matches!(Scenario::build_scenario(cfg), Err(SimError::ZeroCapacity)));
}

#[test]
fn non_finite_body_is_rejected_at_startup() {
    for body in ["x: [.nan, 0.0]\n    v: [0.0, 0.0]", "x: [0.0, 0.0]\n    v: [.inf, 0.0]"] {
        let yaml = format!("{}bodies:\n  - {body}\n    radius: 5.0\n", scenario_yaml("  parallel: false"));
        let cfg: ScenarioConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(cfg.validate(), Err(SimError::InvalidConfig(_))));
    }
}

#[test]
fn scenario_steps_serial_and_parallel() {
    for engine in [
        "  broad_phase: \"quadtree\"\n  parallel: false",
        "  broad_phase: \"quadtree\"\n  parallel: true\n  threads: 2",
        "  broad_phase: \"brute_force\"\n  parallel: true\n  threads: 2",
    ] {
        let cfg: ScenarioConfig = serde_yaml::from_str(&scenario_yaml(engine)).unwrap();
        let mut scenario = Scenario::build_scenario(cfg).unwrap();
        assert_eq!(scenario.system.particles.len(), 500);

        for _ in 0..scenario.parameters.frames {
            scenario.step(scenario.parameters.dt).unwrap();
        }

        assert!((scenario.system.t - 0.2).abs() < 1e-9);
        assert!(scenario.system.particles.iter().all(|p| p.position.norm().is_finite()));
    }
}

#[test]
fn shipped_scenarios_parse() {
    let dir = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios");
    for name in ["default.yaml", "serial_tree.yaml", "brute_force.yaml"] {
        let text = std::fs::read_to_string(dir.join(name)).unwrap();
        let cfg: ScenarioConfig = serde_yaml::from_str(&text).unwrap();
        cfg.validate().unwrap();
    }
}
