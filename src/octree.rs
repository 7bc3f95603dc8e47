//! Dynamic octree over moving points.
//!
//! The tree stores [`Entry`] values (agent id + position) and supports
//! insertion, identity-keyed removal, update and box/sphere range queries.
//! A leaf splits into eight octants once it holds more than `capacity`
//! entries, and an internal node folds back into a leaf when a removal
//! leaves its children empty enough to fit in one.
//!
//! # Concurrency
//!
//! Every operation takes `&self`. Each node guards its own state with a
//! [`parking_lot::RwLock`], and locks are only ever taken from the root
//! downwards:
//!
//! - traversal holds shared locks on the path it is walking
//! - a leaf is written under its own exclusive lock (push, remove, subdivide)
//! - a collapse takes the exclusive lock of the node being collapsed after
//!   its shared lock has been released, and re-checks its children
//!
//! Holding a node's exclusive lock therefore guarantees nobody else is inside
//! its subtree, which is what lets subdivide and collapse touch children
//! through `get_mut` without locking them.
//!
//! # Example
//!
//! ```
//! use octoflock::{Aabb, Octree, Vec3};
//!
//! let tree = Octree::new(Aabb::cube(5.0), 2);
//! tree.insert(0, Vec3::ZERO).unwrap();
//! tree.insert(1, Vec3::splat(5.0)).unwrap();
//! tree.insert(2, Vec3::splat(-5.0)).unwrap();
//!
//! assert_eq!(tree.count_nodes(), 9);
//! assert_eq!(tree.count_points(), 3);
//! ```

use glam::Vec3;
use parking_lot::RwLock;
use tracing::{error, trace, warn};

use crate::aabb::Aabb;
use crate::error::OctreeError;

/// Depth at which leaves stop subdividing.
///
/// Without a floor, `capacity + 1` coincident points would split forever.
pub const DEFAULT_MAX_DEPTH: u32 = 12;

/// A point stored in the tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Entry {
    /// Identity used to tell coincident points apart on removal.
    pub id: u32,
    /// Position the entry was inserted at.
    pub position: Vec3,
}

#[derive(Clone, Copy, Debug)]
struct Limits {
    capacity: usize,
    max_depth: u32,
}

enum NodeState {
    Leaf(Vec<Entry>),
    Internal(Box<[Node; 8]>),
}

struct Node {
    bounds: Aabb,
    depth: u32,
    state: RwLock<NodeState>,
}

/// Thread-safe octree keyed by entry id.
pub struct Octree {
    root: Node,
    limits: Limits,
}

impl Octree {
    /// Create an empty tree covering `bounds`.
    ///
    /// `capacity` is the number of entries a leaf may hold before it
    /// subdivides. A capacity of zero makes every occupied leaf split down to
    /// the depth limit.
    pub fn new(bounds: Aabb, capacity: usize) -> Self {
        Self::with_max_depth(bounds, capacity, DEFAULT_MAX_DEPTH)
    }

    /// Create an empty tree with an explicit depth limit (the root is depth 0).
    pub fn with_max_depth(bounds: Aabb, capacity: usize, max_depth: u32) -> Self {
        Self {
            root: Node::new(bounds, 0),
            limits: Limits { capacity, max_depth },
        }
    }

    /// Box covered by the root node.
    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.root.bounds
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.limits.capacity
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.limits.max_depth
    }

    /// Insert a point.
    ///
    /// Returns `Ok(false)` if `position` lies outside the tree. An `Err` means
    /// the octant geometry failed to place a point its parent contains.
    pub fn insert(&self, id: u32, position: Vec3) -> Result<bool, OctreeError> {
        self.root.insert(Entry { id, position }, self.limits)
    }

    /// Remove the entry `id` stored at exactly `position`.
    ///
    /// Returns `false` if `position` is outside the tree or the leaf holds no
    /// entry with that id at that position. Emptied subtrees are collapsed on
    /// the way back up.
    pub fn remove(&self, id: u32, position: Vec3) -> bool {
        self.root.remove(id, position, self.limits)
    }

    /// Move entry `id` from `old` to `new`.
    ///
    /// Returns `Ok(false)` without touching the tree when `new` is outside it
    /// or when `id` is not stored at `old`. The latter means the caller handed
    /// in a stale position; it is logged and not retried.
    pub fn update(&self, id: u32, old: Vec3, new: Vec3) -> Result<bool, OctreeError> {
        if !self.root.bounds.contains(new) {
            return Ok(false);
        }
        if !self.remove(id, old) {
            warn!(id, %old, %new, "update skipped, entry not found at its previous position");
            return Ok(false);
        }
        self.insert(id, new)
    }

    /// Every entry lying inside `range`.
    pub fn query(&self, range: &Aabb) -> Vec<Entry> {
        let mut out = Vec::new();
        self.query_into(range, &mut out);
        out
    }

    /// Like [`Octree::query`], appending into a caller-owned buffer.
    pub fn query_into(&self, range: &Aabb, out: &mut Vec<Entry>) {
        self.root.collect(range, true, out);
    }

    /// Every entry held by a leaf whose box intersects `range`.
    ///
    /// This is the unfiltered candidate set the range test runs over; it may
    /// include entries outside `range`.
    pub fn query_candidates(&self, range: &Aabb) -> Vec<Entry> {
        let mut out = Vec::new();
        self.root.collect(range, false, &mut out);
        out
    }

    /// Every entry within `radius` of `center`.
    pub fn query_sphere(&self, center: Vec3, radius: f32) -> Vec<Entry> {
        let mut out = Vec::new();
        self.query_sphere_into(center, radius, &mut out);
        out
    }

    /// Like [`Octree::query_sphere`], appending into a caller-owned buffer.
    pub fn query_sphere_into(&self, center: Vec3, radius: f32, out: &mut Vec<Entry>) {
        let start = out.len();
        let range = Aabb::from_center_half_extents(center, Vec3::splat(radius));
        self.root.collect(&range, true, out);

        let radius_sq = radius * radius;
        let mut keep = start;
        for i in start..out.len() {
            if out[i].position.distance_squared(center) <= radius_sq {
                out.swap(keep, i);
                keep += 1;
            }
        }
        out.truncate(keep);
    }

    /// Number of nodes, root included.
    pub fn count_nodes(&self) -> usize {
        let mut count = 0;
        self.root.visit(&mut |_, _| count += 1);
        count
    }

    /// Number of stored entries.
    pub fn count_points(&self) -> usize {
        let mut count = 0;
        self.root.visit(&mut |_, len| count += len);
        count
    }

    pub fn is_empty(&self) -> bool {
        self.count_points() == 0
    }

    /// Deepest node depth (0 for a lone root).
    pub fn depth(&self) -> u32 {
        let mut depth = 0;
        self.root.visit(&mut |node, _| depth = depth.max(node.depth));
        depth
    }

    /// Boxes of every node in pre-order, root first.
    ///
    /// Intended for debug overlays that draw the subdivision.
    pub fn node_bounds(&self) -> Vec<Aabb> {
        let mut bounds = Vec::new();
        self.root.visit(&mut |node, _| bounds.push(node.bounds));
        bounds
    }

    /// Drop every entry and collapse back to a single leaf.
    pub fn clear(&mut self) {
        *self.root.state.get_mut() = NodeState::Leaf(Vec::new());
    }
}

impl Node {
    fn new(bounds: Aabb, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            state: RwLock::new(NodeState::Leaf(Vec::new())),
        }
    }

    fn insert(&self, entry: Entry, limits: Limits) -> Result<bool, OctreeError> {
        if !self.bounds.contains(entry.position) {
            return Ok(false);
        }
        loop {
            {
                let state = self.state.read();
                if let NodeState::Internal(children) = &*state {
                    let child = &children[self.bounds.octant_of(entry.position)];
                    return match child.insert(entry, limits)? {
                        true => Ok(true),
                        false => Err(misplaced(self.bounds, entry)),
                    };
                }
            }
            let mut state = self.state.write();
            if matches!(&*state, NodeState::Leaf(_)) {
                push_exclusive(self.bounds, self.depth, &mut state, entry, limits)?;
                return Ok(true);
            }
            // Subdivided between dropping the read lock and taking the write lock
        }
    }

    fn remove(&self, id: u32, position: Vec3, limits: Limits) -> bool {
        if !self.bounds.contains(position) {
            return false;
        }
        loop {
            {
                let state = self.state.read();
                if let NodeState::Internal(children) = &*state {
                    let removed = children[self.bounds.octant_of(position)].remove(id, position, limits);
                    drop(state);
                    if removed {
                        self.collapse_if_empty(limits);
                    }
                    return removed;
                }
            }
            let mut state = self.state.write();
            if let NodeState::Leaf(entries) = &mut *state {
                return match entries.iter().position(|e| e.id == id && e.position == position) {
                    Some(index) => {
                        entries.remove(index);
                        true
                    }
                    None => false,
                };
            }
        }
    }

    /// Fold all-leaf children back into this node if their entries fit in one leaf.
    fn collapse_if_empty(&self, limits: Limits) {
        let mut state = self.state.write();
        let NodeState::Internal(children) = &mut *state else {
            return;
        };

        let mut total = 0;
        for child in children.iter_mut() {
            match child.state.get_mut() {
                NodeState::Leaf(entries) => total += entries.len(),
                NodeState::Internal(_) => return,
            }
            if total > limits.capacity {
                return;
            }
        }

        let mut merged = Vec::with_capacity(total);
        for child in children.iter_mut() {
            if let NodeState::Leaf(entries) = child.state.get_mut() {
                merged.append(entries);
            }
        }
        trace!(depth = self.depth, count = total, bounds = ?self.bounds, "collapsed");
        *state = NodeState::Leaf(merged);
    }

    fn collect(&self, range: &Aabb, exact: bool, out: &mut Vec<Entry>) {
        if !self.bounds.intersects(range) {
            return;
        }
        match &*self.state.read() {
            NodeState::Leaf(entries) => {
                out.extend(entries.iter().filter(|e| !exact || range.contains(e.position)));
            }
            NodeState::Internal(children) => {
                for child in children.iter() {
                    child.collect(range, exact, out);
                }
            }
        }
    }

    /// Pre-order walk; the callback gets each node and its leaf entry count.
    fn visit(&self, f: &mut dyn FnMut(&Node, usize)) {
        match &*self.state.read() {
            NodeState::Leaf(entries) => f(self, entries.len()),
            NodeState::Internal(children) => {
                f(self, 0);
                for child in children.iter() {
                    child.visit(f);
                }
            }
        }
    }
}

fn misplaced(bounds: Aabb, entry: Entry) -> OctreeError {
    error!(id = entry.id, position = %entry.position, ?bounds, "point fits no child octant");
    OctreeError::Misplaced {
        id: entry.id,
        position: entry.position,
        parent: bounds,
    }
}

/// Push into a node we hold exclusively, splitting leaves that overflow.
fn push_exclusive(
    bounds: Aabb,
    depth: u32,
    state: &mut NodeState,
    entry: Entry,
    limits: Limits,
) -> Result<(), OctreeError> {
    let overflow = match state {
        NodeState::Leaf(entries) => {
            entries.push(entry);
            entries.len() > limits.capacity && depth < limits.max_depth
        }
        NodeState::Internal(children) => {
            let child = &mut children[bounds.octant_of(entry.position)];
            if !child.bounds.contains(entry.position) {
                return Err(misplaced(bounds, entry));
            }
            return push_exclusive(child.bounds, child.depth, child.state.get_mut(), entry, limits);
        }
    };
    if overflow {
        subdivide(bounds, depth, state, limits)?;
    }
    Ok(())
}

/// Turn a leaf into eight children holding its entries.
///
/// The leaf is only replaced once every entry has been placed, so a failed
/// split leaves the node untouched.
fn subdivide(bounds: Aabb, depth: u32, state: &mut NodeState, limits: Limits) -> Result<(), OctreeError> {
    let NodeState::Leaf(entries) = state else {
        return Ok(());
    };
    let mut children: Box<[Node; 8]> = Box::new(std::array::from_fn(|i| Node::new(bounds.octant(i), depth + 1)));

    for &entry in entries.iter() {
        let child = &mut children[bounds.octant_of(entry.position)];
        if !child.bounds.contains(entry.position) {
            return Err(misplaced(bounds, entry));
        }
        push_exclusive(child.bounds, child.depth, child.state.get_mut(), entry, limits)?;
    }

    trace!(depth, count = entries.len(), ?bounds, "subdivided");
    *state = NodeState::Internal(children);
    Ok(())
}
