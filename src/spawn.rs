//! Spawn context for boid initialization.
//!
//! Provides helper methods for placing boids and giving them an initial
//! heading. The random source is supplied by the caller, so a seeded rng
//! gives a reproducible flock.
//!
//! ```
//! use octoflock::{Aabb, Flock, FlockConfig};
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//!
//! let mut rng = SmallRng::seed_from_u64(7);
//! let config = FlockConfig::default().with_agent_count(64);
//! let flock = Flock::spawn_with(config, Aabb::cube(10.0), &mut rng, |ctx| {
//!     let position = ctx.circle_position(8.0);
//!     (position, ctx.tangent_velocity(position, 2.0))
//! })
//! .unwrap();
//! assert_eq!(flock.len(), 64);
//! ```

use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;

use crate::aabb::Aabb;

/// Context handed to spawner functions, one boid at a time.
pub struct SpawnContext<'a, R: Rng> {
    /// Index of the boid being spawned (0 to count-1).
    pub index: usize,
    /// Total number of boids being spawned.
    pub count: usize,
    /// Region boids should be spawned in.
    pub region: Aabb,
    rng: &'a mut R,
}

impl<'a, R: Rng> SpawnContext<'a, R> {
    pub(crate) fn new(index: usize, count: usize, region: Aabb, rng: &'a mut R) -> Self {
        Self {
            index,
            count,
            region,
            rng,
        }
    }

    /// Normalized progress through the spawn (0.0 to 1.0).
    #[inline]
    pub fn progress(&self) -> f32 {
        self.index as f32 / self.count.max(1) as f32
    }

    /// Random f32 in the given range.
    #[inline]
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    // ========== Position helpers ==========

    /// Uniform random point inside the spawn region.
    pub fn random_in_region(&mut self) -> Vec3 {
        let region = self.region;
        self.random_in_box(&region)
    }

    /// Uniform random point inside `bounds`.
    pub fn random_in_box(&mut self, bounds: &Aabb) -> Vec3 {
        Vec3::new(
            self.rng.gen_range(bounds.min.x..=bounds.max.x),
            self.rng.gen_range(bounds.min.y..=bounds.max.y),
            self.rng.gen_range(bounds.min.z..=bounds.max.z),
        )
    }

    /// Random point inside a sphere of given radius around the region center.
    ///
    /// Distribution is uniform throughout the volume.
    pub fn random_in_sphere(&mut self, radius: f32) -> Vec3 {
        // Cube root for uniform volume distribution
        let r = radius * self.rng.gen::<f32>().cbrt();
        self.region.center() + self.random_direction() * r
    }

    /// Position on a circle in the XZ plane through the region center.
    ///
    /// Boids are distributed evenly around the circle.
    pub fn circle_position(&self, radius: f32) -> Vec3 {
        let angle = self.progress() * TAU;
        self.region.center() + Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin())
    }

    // ========== Direction/velocity helpers ==========

    /// Random unit vector (uniformly distributed on the unit sphere).
    pub fn random_direction(&mut self) -> Vec3 {
        let theta = self.rng.gen_range(0.0..TAU);
        let cos_phi: f32 = self.rng.gen_range(-1.0..=1.0);
        let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
        Vec3::new(sin_phi * theta.cos(), sin_phi * theta.sin(), cos_phi)
    }

    /// Random heading with a speed drawn from `0..max_speed`.
    pub fn random_velocity(&mut self, max_speed: f32) -> Vec3 {
        let speed = self.random_range(0.0, max_speed);
        self.random_direction() * speed
    }

    /// Velocity tangent to the offset from the region center, in the XZ plane.
    ///
    /// Useful for starting a flock in a swirl.
    pub fn tangent_velocity(&self, position: Vec3, speed: f32) -> Vec3 {
        let offset = position - self.region.center();
        let tangent = Vec3::new(-offset.z, 0.0, offset.x);
        if tangent.length_squared() > 0.0001 {
            tangent.normalize() * speed
        } else {
            Vec3::new(speed, 0.0, 0.0)
        }
    }
}
