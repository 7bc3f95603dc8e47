//! # octoflock
//!
//! Boids flocking over a dynamic octree, stepped in parallel on the CPU.
//!
//! octoflock keeps every boid's position in a thread-safe [`Octree`] and
//! answers each boid's neighbor queries from it, so a tick costs roughly
//! `O(n log n)` instead of comparing every pair.
//!
//! ## Quick Start
//!
//! ```
//! use octoflock::prelude::*;
//!
//! let config = FlockConfig::default()
//!     .with_agent_count(500)
//!     .with_world_bounds(Aabb::cube(40.0));
//!
//! let mut flock = Flock::from_seed(config, Aabb::cube(10.0), 7).unwrap();
//! for _ in 0..60 {
//!     flock.step(1.0 / 60.0).unwrap();
//! }
//!
//! for agent in flock.agents() {
//!     assert!(Aabb::cube(40.0).contains(agent.position));
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### The index
//!
//! [`Octree`] stores `(id, position)` entries. A leaf splits into eight
//! octants once it holds more than its capacity and folds back when removals
//! leave its children sparse. All operations take `&self` and may be called
//! from many threads at once; see the [`octree`] module for the locking rules.
//!
//! ### Rules
//!
//! Each tick a boid sums four steering vectors (see [`rules`]):
//!
//! | Rule | Effect |
//! |------|--------|
//! | Separation | push away from boids inside `separation_radius` |
//! | Alignment | match the mean velocity of boids inside `neighbor_radius` |
//! | Cohesion | steer toward their center of mass |
//! | Containment | constant inward push near the world faces |
//!
//! ### Ticking
//!
//! [`Flock::step`] computes every boid's steering from a snapshot, then
//! integrates and moves index entries, both phases in parallel with rayon.
//! [`Flock::advance`] drives `step` from variable frame times through a
//! fixed-timestep [`SimClock`](time::SimClock).

pub mod aabb;
pub mod config;
pub mod error;
pub mod flock;
pub mod octree;
pub mod rules;
pub mod spawn;
pub mod time;

pub use aabb::Aabb;
pub use bytemuck;
pub use config::FlockConfig;
pub use error::{ConfigError, OctreeError, SimulationError};
pub use flock::{Agent, Flock, TickStats};
pub use glam::Vec3;
pub use octree::{Entry, Octree, DEFAULT_MAX_DEPTH};
pub use rules::Falloff;
pub use spawn::SpawnContext;

/// Convenient re-exports for common usage.
///
/// ```
/// use octoflock::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aabb::Aabb;
    pub use crate::config::FlockConfig;
    pub use crate::error::SimulationError;
    pub use crate::flock::{Agent, Flock, TickStats};
    pub use crate::octree::{Entry, Octree};
    pub use crate::rules::Falloff;
    pub use crate::spawn::SpawnContext;
    pub use crate::time::SimClock;
    pub use crate::Vec3;
}
