//! Flocking steering rules.
//!
//! Each rule turns a boid's neighborhood into a steering vector. The flock
//! sums them every tick:
//!
//! - **Separation**: push away from boids inside the separation radius
//! - **Alignment**: match the average heading of nearby boids
//! - **Cohesion**: steer toward the center of nearby boids
//! - **Containment**: push back from the faces of the world box
//!
//! All rules are pure functions of a snapshot; none of them touch the flock
//! or the index, which is what lets the flock evaluate them in parallel.
//!
//! # Example
//!
//! ```
//! use octoflock::rules::{separation, Falloff};
//! use octoflock::Vec3;
//!
//! let push = separation(Vec3::ZERO, [Vec3::X], 2.0, Falloff::Constant, 1.0);
//! assert_eq!(push, Vec3::NEG_X);
//! ```

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;

/// Distance falloff functions for separation.
///
/// Controls how a neighbor's push changes with its distance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Falloff {
    /// Every neighbor pushes with its full offset regardless of distance.
    #[default]
    Constant,

    /// Linear falloff: weight decreases linearly to zero at the radius.
    Linear,

    /// Inverse falloff: weight = 1/distance (with softening).
    Inverse,

    /// Inverse-square falloff: weight = 1/distance².
    InverseSquare,

    /// Smooth falloff using smoothstep for gradual transitions.
    Smooth,
}

impl Falloff {
    /// Weight applied to a neighbor `dist` away, for a rule reaching `radius`.
    pub fn weight(&self, dist: f32, radius: f32) -> f32 {
        match self {
            Falloff::Constant => 1.0,
            Falloff::Linear => (1.0 - dist / radius).max(0.0),
            Falloff::Inverse => 1.0 / (dist + 0.01),
            Falloff::InverseSquare => 1.0 / (dist * dist + 0.0001),
            Falloff::Smooth => 1.0 - smoothstep(0.0, radius, dist),
        }
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Push away from every neighbor position, weighted by `falloff`.
///
/// Neighbors at exactly `position` contribute nothing, and an empty
/// neighborhood yields zero.
pub fn separation<I>(position: Vec3, neighbors: I, radius: f32, falloff: Falloff, factor: f32) -> Vec3
where
    I: IntoIterator<Item = Vec3>,
{
    let mut push = Vec3::ZERO;
    for other in neighbors {
        let away = position - other;
        let dist = away.length();
        if dist > 0.0 {
            push += away * falloff.weight(dist, radius);
        }
    }
    push * factor
}

/// Steer the current velocity toward the neighbors' average velocity.
pub fn alignment<I>(velocity: Vec3, neighbor_velocities: I, factor: f32) -> Vec3
where
    I: IntoIterator<Item = Vec3>,
{
    match mean(neighbor_velocities) {
        Some(average) => (average - velocity) * factor,
        None => Vec3::ZERO,
    }
}

/// Unit pull toward the neighbors' center of mass.
///
/// Zero when there are no neighbors or the center coincides with `position`.
pub fn cohesion<I>(position: Vec3, neighbor_positions: I, factor: f32) -> Vec3
where
    I: IntoIterator<Item = Vec3>,
{
    match mean(neighbor_positions) {
        Some(center) => (center - position).normalize_or_zero() * factor,
        None => Vec3::ZERO,
    }
}

/// Constant inward push from every face of `bounds` closer than `threshold`.
///
/// Boids in the interior get no contribution. A boid near a corner is pushed
/// by each face it is close to.
pub fn containment(position: Vec3, bounds: &Aabb, threshold: f32, factor: f32) -> Vec3 {
    let near_min = (position - bounds.min).cmplt(Vec3::splat(threshold));
    let near_max = (bounds.max - position).cmplt(Vec3::splat(threshold));
    let inward = Vec3::select(near_min, Vec3::ONE, Vec3::ZERO) - Vec3::select(near_max, Vec3::ONE, Vec3::ZERO);
    inward * factor
}

/// Scale `v` down to `max` length if it is longer. A non-positive `max` disables the limit.
#[inline]
pub fn limit(v: Vec3, max: f32) -> Vec3 {
    if max > 0.0 {
        v.clamp_length_max(max)
    } else {
        v
    }
}

fn mean<I>(values: I) -> Option<Vec3>
where
    I: IntoIterator<Item = Vec3>,
{
    let mut sum = Vec3::ZERO;
    let mut count = 0u32;
    for v in values {
        sum += v;
        count += 1;
    }
    (count > 0).then(|| sum / count as f32)
}
