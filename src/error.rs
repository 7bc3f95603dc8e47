//! Error types for octoflock.
//!
//! Expected misses (a point outside the tree, an id that is no longer
//! stored) are plain `bool` results on the index API and never show up here.
//! The types in this module cover configuration mistakes and structural
//! defects that mean the index no longer agrees with the flock.

use glam::Vec3;
use thiserror::Error;

use crate::aabb::Aabb;

/// Structural defects inside the octree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OctreeError {
    /// A point inside a parent box was rejected by the child octant chosen for it.
    ///
    /// Only possible if the octant boxes do not partition the parent.
    #[error("point {position} (id {id}) fits no child octant of {parent:?}")]
    Misplaced {
        /// Identity of the entry being placed.
        id: u32,
        /// Position that failed to place.
        position: Vec3,
        /// Box of the internal node that could not place it.
        parent: Aabb,
    },
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A field holds a value the simulation cannot use.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
    /// Failed to (de)serialize a configuration document.
    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur while spawning or stepping a flock.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The index reported a structural defect.
    #[error("spatial index defect: {0}")]
    Index(#[from] OctreeError),
    /// An agent's previous position was not where the index had it.
    ///
    /// The update's remove step failed, so the index and the agent array
    /// disagreed before the tick started.
    #[error("agent {id} was not indexed at {position}")]
    StaleEntry {
        /// Identity of the agent.
        id: u32,
        /// Position the flock believed was indexed.
        position: Vec3,
    },
    /// An agent could not be placed in the index at all.
    #[error("agent {id} at {position} lies outside the world bounds")]
    Unindexed {
        /// Identity of the agent.
        id: u32,
        /// Position that was rejected.
        position: Vec3,
    },
}
