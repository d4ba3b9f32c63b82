pub mod states;
pub mod params;
pub mod engine;
pub mod quadtree;
pub mod collisions;
pub mod integrator;
pub mod parallel;
pub mod scenario;
