use bevy::log::error;
use bevy::prelude::*;
use bevy::sprite::{MaterialMesh2dBundle, Mesh2dHandle};
use bevy::math::primitives::Circle;
use bevy::window::{PresentMode, PrimaryWindow, WindowResolution};

use crate::simulation::scenario::Scenario;

#[derive(Component)]
struct ParticleIndex(pub usize);

/// Frame counter behind the window title, refreshed once per second
#[derive(Default)]
struct FpsCounter {
    elapsed: f64,
    frames: u32,
}

const WINDOW_TITLE: &str = "Collisions - Quadtree";

/// Open a window sized to the scenario arena and run it until closed.
/// One world unit is one logical pixel, origin at the window centre
pub fn run_2d(scenario: Scenario) {
    println!("run_2d: starting Bevy 2D viewer with {} particles", scenario.system.particles.len());

    let width = (scenario.arena.half_width * 2.0) as f32;
    let height = (scenario.arena.half_height * 2.0) as f32;

    App::new()
        .insert_resource(scenario)
        .insert_resource(ClearColor(Color::BLACK))
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: WINDOW_TITLE.to_string(),
                resolution: WindowResolution::new(width, height),
                present_mode: PresentMode::AutoNoVsync,
                ..Default::default()
            }),
            ..Default::default()
        }))
        .add_systems(Startup, setup_particles_system)
        .add_systems(Update, (physics_step_system, sync_transforms_system, draw_tree_system, title_system).chain())
        .run();
}

fn setup_particles_system(mut commands: Commands, scenario: Res<Scenario>, mut meshes: ResMut<Assets<Mesh>>, mut materials: ResMut<Assets<ColorMaterial>>) {
    // 2D camera
    commands.spawn(Camera2dBundle::default());

    // unit disk scaled per particle
    let disk = Mesh2dHandle(meshes.add(Circle::new(1.0)));

    for (i, p) in scenario.system.particles.iter().enumerate() {
        let [r, g, b] = p.color;
        let radius = p.radius as f32;

        commands.spawn((
            MaterialMesh2dBundle {
                mesh: disk.clone(),
                material: materials.add(ColorMaterial::from(Color::srgb(r, g, b))),
                transform: Transform::from_xyz(p.position.x as f32, p.position.y as f32, 0.0)
                    .with_scale(Vec3::new(radius, radius, 1.0)),
                ..Default::default()
            },
            ParticleIndex(i),
        ));
    }
}

fn physics_step_system(mut scenario: ResMut<Scenario>, time: Res<Time>, windows: Query<&Window, With<PrimaryWindow>>) {
    // arena follows the window
    if let Ok(window) = windows.get_single() {
        scenario.resize_arena(window.width() as f64, window.height() as f64);
    }

    if let Err(e) = scenario.step(time.delta_seconds_f64()) {
        error!("frame skipped: {e}");
    }
}

fn sync_transforms_system(scenario: Res<Scenario>, mut query: Query<(&ParticleIndex, &mut Transform)>) {
    for (ParticleIndex(i), mut transform) in &mut query {
        if let Some(p) = scenario.system.particles.get(*i) {
            transform.translation.x = p.position.x as f32;
            transform.translation.y = p.position.y as f32;
        }
    }
}

fn draw_tree_system(scenario: Res<Scenario>, mut gizmos: Gizmos) {
    if !scenario.engine.draw_tree {
        return;
    }
    let Some(tree) = &scenario.tree else {
        return;
    };

    for (center, half) in tree.squares() {
        let size = Vec2::splat((half * 2.0) as f32);
        gizmos.rect_2d(Vec2::new(center.x as f32, center.y as f32), 0.0, size, Color::WHITE);
    }
}

fn title_system(
    time: Res<Time>,
    scenario: Res<Scenario>,
    mut counter: Local<FpsCounter>,
    mut windows: Query<&mut Window, With<PrimaryWindow>>,
) {
    counter.elapsed += time.delta_seconds_f64();
    counter.frames += 1;

    if counter.elapsed < 1.0 {
        return;
    }

    if let Ok(mut window) = windows.get_single_mut() {
        window.title = format!(
            "{WINDOW_TITLE} - FPS: {} - Particles count: {}",
            counter.frames,
            scenario.system.particles.len()
        );
    }
    counter.elapsed = 0.0;
    counter.frames = 0;
}
