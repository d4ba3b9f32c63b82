//! High-level runtime engine settings
//!
//! Selects the broad phase, serial or parallel stepping, the worker count
//! and the quadtree bucket capacity used when running a `Scenario`

use crate::configuration::config::BroadPhaseConfig;

#[derive(Debug, Clone)]
pub struct Engine {
    pub broad_phase: BroadPhaseConfig, // quadtree or brute force
    pub parallel: bool,                // false = single thread, true = worker pool
    pub threads: usize,                // resolved worker count, always >= 1
    pub capacity: usize,               // quadtree bucket size
    pub draw_tree: bool,               // viewer draws node outlines
}
