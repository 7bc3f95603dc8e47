//! Flock tuning parameters.
//!
//! [`FlockConfig`] is the whole configuration surface: neighbor radii, rule
//! weights, kinematic limits, world bounds and index parameters. It is a
//! plain value, so a UI can edit a copy and hand it back between ticks.
//!
//! # Example
//!
//! ```
//! use octoflock::{Aabb, FlockConfig};
//!
//! let config = FlockConfig::default()
//!     .with_agent_count(500)
//!     .with_radii(2.0, 6.0)
//!     .with_weights(1.5, 1.0, 0.8)
//!     .with_world_bounds(Aabb::cube(40.0));
//!
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::error::ConfigError;
use crate::octree::DEFAULT_MAX_DEPTH;
use crate::rules::Falloff;

/// Configuration for a [`Flock`](crate::Flock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockConfig {
    /// Number of boids spawned by [`Flock::spawn`](crate::Flock::spawn).
    pub agent_count: usize,
    /// Radius of the tight separation neighborhood.
    pub separation_radius: f32,
    /// Radius of the wider alignment/cohesion neighborhood.
    pub neighbor_radius: f32,
    pub separation_factor: f32,
    pub alignment_factor: f32,
    pub cohesion_factor: f32,
    /// Distance weighting applied to each separation neighbor.
    pub separation_falloff: Falloff,
    /// Speed cap applied after integrating steering (0 disables).
    pub max_speed: f32,
    /// Steering magnitude cap (0 disables).
    pub max_force: f32,
    /// Initial speeds are drawn from `0..spawn_speed`.
    pub spawn_speed: f32,
    /// World box; also the octree's root box.
    pub world_bounds: Aabb,
    /// Distance from a face at which containment starts pushing.
    pub boundary_threshold: f32,
    /// Strength of the containment push.
    pub boundary_factor: f32,
    /// Entries per octree leaf before it subdivides.
    pub node_capacity: usize,
    /// Octree depth limit.
    pub max_depth: u32,
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            agent_count: 1_000,
            separation_radius: 2.5,
            neighbor_radius: 7.5,
            separation_factor: 1.5,
            alignment_factor: 1.0,
            cohesion_factor: 1.0,
            separation_falloff: Falloff::Constant,
            max_speed: 12.0,
            max_force: 12.0,
            spawn_speed: 6.0,
            world_bounds: Aabb::cube(50.0),
            boundary_threshold: 5.0,
            boundary_factor: 8.0,
            node_capacity: 16,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl FlockConfig {
    /// Set the number of boids.
    pub fn with_agent_count(mut self, count: usize) -> Self {
        self.agent_count = count;
        self
    }

    /// Set the separation and alignment/cohesion radii.
    pub fn with_radii(mut self, separation: f32, neighbor: f32) -> Self {
        self.separation_radius = separation;
        self.neighbor_radius = neighbor;
        self
    }

    /// Set the separation, alignment and cohesion weights.
    pub fn with_weights(mut self, separation: f32, alignment: f32, cohesion: f32) -> Self {
        self.separation_factor = separation;
        self.alignment_factor = alignment;
        self.cohesion_factor = cohesion;
        self
    }

    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.separation_falloff = falloff;
        self
    }

    /// Set the speed and steering caps.
    pub fn with_limits(mut self, max_speed: f32, max_force: f32) -> Self {
        self.max_speed = max_speed;
        self.max_force = max_force;
        self
    }

    pub fn with_world_bounds(mut self, bounds: Aabb) -> Self {
        self.world_bounds = bounds;
        self
    }

    /// Set when and how hard boids are pushed back from the walls.
    pub fn with_boundary(mut self, threshold: f32, factor: f32) -> Self {
        self.boundary_threshold = threshold;
        self.boundary_factor = factor;
        self
    }

    /// Set the octree leaf capacity and depth limit.
    pub fn with_index(mut self, node_capacity: usize, max_depth: u32) -> Self {
        self.node_capacity = node_capacity;
        self.max_depth = max_depth;
        self
    }

    /// Check every field for values the simulation cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            self.separation_radius,
            self.neighbor_radius,
            self.max_speed,
            self.max_force,
            self.spawn_speed,
            self.boundary_threshold,
        ];
        if non_negative.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConfigError::Invalid("radii, limits and thresholds must be finite and non-negative"));
        }
        let factors = [
            self.separation_factor,
            self.alignment_factor,
            self.cohesion_factor,
            self.boundary_factor,
        ];
        if factors.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid("rule factors must be finite"));
        }
        if !self.world_bounds.is_valid() {
            return Err(ConfigError::Invalid("world_bounds must have positive size on every axis"));
        }
        if self.node_capacity == 0 {
            return Err(ConfigError::Invalid("node_capacity must be at least 1"));
        }
        if self.agent_count > u32::MAX as usize {
            return Err(ConfigError::Invalid("agent_count exceeds the id space"));
        }
        Ok(())
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
