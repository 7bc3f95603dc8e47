//! Axis-aligned bounding boxes.
//!
//! Boxes are stored as min/max corners. The center + size form used by
//! callers (and by the octree's octant math) converts losslessly for the
//! power-of-two splits the tree performs.
//!
//! All containment and overlap tests use closed intervals, so a point lying
//! exactly on a face belongs to the box.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// An axis-aligned box in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Create a box from its two corners.
    ///
    /// Corners are reordered per axis, so any two opposite corners work.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Create a box centered at `center` with full edge lengths `size`.
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Create a box centered at `center` extending `half_extents` along each axis.
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::from_center_size(center, half_extents * 2.0)
    }

    /// Create a box from its minimum corner and full edge lengths.
    pub fn from_min_size(min: Vec3, size: Vec3) -> Self {
        Self::new(min, min + size)
    }

    /// Cube from `-half_size` to `+half_size` on every axis.
    pub fn cube(half_size: f32) -> Self {
        Self::from_center_half_extents(Vec3::ZERO, Vec3::splat(half_size))
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full edge lengths.
    #[inline]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        self.size() * 0.5
    }

    /// Whether `point` lies inside the box or on its surface.
    ///
    /// NaN coordinates are never contained.
    #[inline]
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Whether two boxes overlap on all three axes (touching counts).
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Index of the octant `point` falls in relative to the box center.
    ///
    /// Bit 0 selects the upper x half, bit 1 upper y, bit 2 upper z. Points on
    /// a splitting plane go to the upper half.
    #[inline]
    pub fn octant_of(&self, point: Vec3) -> usize {
        let c = self.center();
        (point.x >= c.x) as usize | ((point.y >= c.y) as usize) << 1 | ((point.z >= c.z) as usize) << 2
    }

    /// The sub-box for octant `index` (see [`Aabb::octant_of`]).
    ///
    /// Adjacent octants share the splitting plane exactly, so the eight
    /// octants cover the parent without gaps.
    pub fn octant(&self, index: usize) -> Aabb {
        let c = self.center();
        let pick = |bit: usize, lo: f32, mid: f32, hi: f32| {
            if index & bit == 0 {
                (lo, mid)
            } else {
                (mid, hi)
            }
        };
        let (x0, x1) = pick(1, self.min.x, c.x, self.max.x);
        let (y0, y1) = pick(2, self.min.y, c.y, self.max.y);
        let (z0, z1) = pick(4, self.min.z, c.z, self.max.z);
        Aabb {
            min: Vec3::new(x0, y0, z0),
            max: Vec3::new(x1, y1, z1),
        }
    }

    /// Nearest point inside the box.
    #[inline]
    pub fn clamp(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    /// Whether every edge has positive, finite length.
    pub fn is_valid(&self) -> bool {
        let size = self.size();
        size.is_finite() && size.cmpgt(Vec3::ZERO).all()
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::cube(1.0)
    }
}
