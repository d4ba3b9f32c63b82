//! # Bucket Quadtree (2D)
//!
//! This module implements the spatial index used by the broad phase. A fresh
//! tree is built from the particle array at the start of every frame and
//! dropped at the end of it, so it never has to support removal, moving
//! elements or re-balancing.
//!
//! ## Core Concepts
//!
//! - Every node covers an axis-aligned **square** given by `center` and
//!   `half_extent`.
//! - Every node owns a bucket of at most `capacity` particle indices.
//! - When an insert reaches a full node, the node is split **once** into four
//!   quadrants (top-left, top-right, bottom-left, bottom-right). The particles
//!   already in the bucket stay where they are; only later inserts descend.
//! - "Top" is the −y half, "bottom" the +y half.
//!
//! The tree does not own particle data. Buckets store indices into the slice
//! the tree was built from, and every position test reads that slice, so the
//! tree must be queried with the same slice (possibly mutated in place) it was
//! built over.
//!
//! ## Query semantics
//!
//! Queries use two different predicates on purpose:
//!
//! - [`QuadNode::prune_test`]: the node square grown by the query radius must
//!   contain the query position, otherwise the whole subtree is skipped.
//! - [`QuadNode::member_test`]: a bucket element is reported only if its
//!   current position is inside the node square (no radius).
//!
//! The result is a superset of the real neighbours and is meant to be fed to
//! the exact circle test in [`crate::simulation::collisions`].

use log::warn;

use crate::error::{SimError, SimResult};
use crate::simulation::states::{NVec2, Particle};

/// Subdivision stops at this depth. Past it an insert is refused. A point on
/// the root centre lies in all four root quadrants and so can fill four chains,
/// which puts the refusal at `capacity * (1 + 4 * MAX_DEPTH)` coincident points.
pub const MAX_DEPTH: usize = 64;

/// Child order used for both insertion and query.
pub const TOP_LEFT: usize = 0;
pub const TOP_RIGHT: usize = 1;
pub const BOTTOM_LEFT: usize = 2;
pub const BOTTOM_RIGHT: usize = 3;

/// A single quadtree node.
///
/// A node is a leaf until its first overflow, after which `children` is set
/// for the rest of the tree's life. Its `elements` are never moved.
#[derive(Debug, Clone)]
pub struct QuadNode {
    pub center: NVec2,
    pub half_extent: f64,
    pub depth: usize,
    pub elements: Vec<usize>,           // indices into the particle slice
    pub children: Option<[usize; 4]>,   // indices into QuadTree::nodes
}

impl QuadNode {
    fn new(center: NVec2, half_extent: f64, depth: usize, capacity: usize) -> Self {
        Self {
            center,
            half_extent,
            depth,
            elements: Vec::with_capacity(capacity),
            children: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Closed point-in-square test against this node's region.
    ///
    /// Used for insertion and for bucket membership during a query.
    pub fn contains(&self, p: &NVec2) -> bool {
        p.x >= self.center.x - self.half_extent
            && p.x <= self.center.x + self.half_extent
            && p.y >= self.center.y - self.half_extent
            && p.y <= self.center.y + self.half_extent
    }

    /// Entry test of a query: the node square expanded by `radius` on all
    /// four sides must contain `p`.
    pub fn prune_test(&self, p: &NVec2, radius: f64) -> bool {
        let reach = self.half_extent + radius;
        p.x >= self.center.x - reach
            && p.x <= self.center.x + reach
            && p.y >= self.center.y - reach
            && p.y <= self.center.y + reach
    }

    /// Bucket membership test of a query: the element's current position
    /// must be inside the unexpanded node square.
    pub fn member_test(&self, element: &Particle) -> bool {
        self.contains(&element.position)
    }
}

/// A complete quadtree built over one frame's particle array.
///
/// Nodes live in a flat vector; `root` is always index 0 and children are
/// pushed as nodes split, so the vector length is the node count.
#[derive(Debug, Clone)]
pub struct QuadTree {
    pub nodes: Vec<QuadNode>,
    pub root: usize,
    pub capacity: usize,
}

impl QuadTree {
    /// Create an empty tree covering the square `center ± half_extent`.
    ///
    /// Fails for a zero capacity (every insert would split forever) and for a
    /// half extent that is not a positive finite number.
    pub fn new(center: NVec2, half_extent: f64, capacity: usize) -> SimResult<Self> {
        if capacity == 0 {
            return Err(SimError::ZeroCapacity);
        }
        if !(half_extent.is_finite() && half_extent > 0.0) {
            return Err(SimError::InvalidExtent(half_extent));
        }

        let root = QuadNode::new(center, half_extent, 0, capacity);
        Ok(QuadTree {
            nodes: vec![root],
            root: 0,
            capacity,
        })
    }

    /// Build a tree and insert every particle of `particles` in index order.
    ///
    /// Particles outside the root square are left out of the index for this
    /// frame (they can still find neighbours through their own query).
    /// Callers are expected to size the root to the arena.
    pub fn build(particles: &[Particle], center: NVec2, half_extent: f64, capacity: usize) -> SimResult<Self> {
        let mut tree = QuadTree::new(center, half_extent, capacity)?;

        let mut rejected = 0usize;
        for i in 0..particles.len() {
            if !tree.insert(i, particles) {
                rejected += 1;
            }
        }
        if rejected > 0 {
            warn!("quadtree: {rejected} of {} particles left out of the index", particles.len());
        }

        Ok(tree)
    }

    /// Insert particle `index` of `particles`. Returns `false` when its position
    /// lies outside the root square.
    pub fn insert(&mut self, index: usize, particles: &[Particle]) -> bool {
        let pos = particles[index].position;
        self.insert_at(self.root, index, &pos)
    }

    /// Collect candidate neighbours of particle `index` into `found`.
    ///
    /// `found` is appended to, not cleared. The particle itself is never
    /// reported.
    pub fn query(&self, index: usize, particles: &[Particle], found: &mut Vec<usize>) {
        let target = &particles[index];
        self.query_node(self.root, Some(index), &target.position, target.radius, particles, found);
    }

    /// Same as [`QuadTree::query`] for an arbitrary disk that is not part of
    /// the particle slice.
    pub fn query_region(&self, position: &NVec2, radius: f64, particles: &[Particle], found: &mut Vec<usize>) {
        self.query_node(self.root, None, position, radius, particles, found);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Index of the node whose bucket holds `element`, if it was inserted.
    pub fn node_holding(&self, element: usize) -> Option<usize> {
        self.nodes.iter().position(|n| n.elements.contains(&element))
    }

    /// Number of particle indices stored across all buckets.
    pub fn len(&self) -> usize {
        self.nodes.iter().map(|n| n.elements.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(center, half_extent)` of every node, for drawing the tree outline.
    pub fn squares(&self) -> impl Iterator<Item = (NVec2, f64)> + '_ {
        self.nodes.iter().map(|n| (n.center, n.half_extent))
    }

    // helpers ==============================================================================

    /// Insert `element` (located at `pos`) starting at `node_idx`.
    ///
    /// - outside the node square: refuse.
    /// - room left in the bucket: store it here.
    /// - bucket full and no children yet: split, keeping the bucket as is.
    /// - then offer it to the children in TL, TR, BL, BR order.
    ///
    /// Quadrants share their edges, so a point on an inner edge goes to the
    /// first quadrant in that order that contains it.
    fn insert_at(&mut self, node_idx: usize, element: usize, pos: &NVec2) -> bool {
        let node = &mut self.nodes[node_idx];
        if !node.contains(pos) {
            return false;
        }

        if node.elements.len() < self.capacity {
            node.elements.push(element);
            return true;
        }

        let (existing, depth) = (node.children, node.depth);
        let children = match existing {
            Some(children) => children,
            None if depth >= MAX_DEPTH => return false,
            None => self.subdivide(node_idx),
        };

        children
            .iter()
            .any(|&child| self.insert_at(child, element, pos))
    }

    /// Create the four quadrant children of `node_idx` and link them.
    ///
    /// Each child has half the parent's half extent and is centred at the
    /// parent centre offset by ± that amount on each axis.
    fn subdivide(&mut self, node_idx: usize) -> [usize; 4] {
        let parent_center = self.nodes[node_idx].center;
        let half = self.nodes[node_idx].half_extent / 2.0;
        let depth = self.nodes[node_idx].depth + 1;

        let offsets = [
            NVec2::new(-half, -half), // top left
            NVec2::new(half, -half),  // top right
            NVec2::new(-half, half),  // bottom left
            NVec2::new(half, half),   // bottom right
        ];

        let mut children = [0usize; 4];
        for (slot, offset) in children.iter_mut().zip(offsets.iter()) {
            *slot = self.nodes.len();
            self.nodes.push(QuadNode::new(parent_center + offset, half, depth, self.capacity));
        }

        self.nodes[node_idx].children = Some(children);
        children
    }

    /// Recursive query step.
    ///
    /// The prune test is evaluated once on entry to each node; a node that
    /// passes visits its own bucket and then all four children, each of which
    /// repeats the prune test for itself.
    fn query_node(
        &self,
        node_idx: usize,
        exclude: Option<usize>,
        pos: &NVec2,
        radius: f64,
        particles: &[Particle],
        found: &mut Vec<usize>,
    ) {
        let node = &self.nodes[node_idx];

        if !node.prune_test(pos, radius) {
            return;
        }

        for &element in &node.elements {
            if Some(element) == exclude {
                continue;
            }
            if node.member_test(&particles[element]) {
                found.push(element);
            }
        }

        if let Some(children) = node.children {
            for child in children {
                self.query_node(child, exclude, pos, radius, particles, found);
            }
        }
    }
}
