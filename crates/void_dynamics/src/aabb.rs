//! Axis-aligned bounding boxes for the broad phase

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Axis-Aligned Bounding Box
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Inverted box; the identity for [`Aabb::union`]
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    /// Create from min and max points
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create from center and half-extents
    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Create from a set of points
    pub fn from_points(points: &[Vec3]) -> Self {
        points
            .iter()
            .fold(Self::EMPTY, |aabb, &point| aabb.expand_to_include(point))
    }

    /// Get the center point
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the half-extents
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Surface area, used as the insertion cost heuristic of the dynamic tree
    #[inline]
    pub fn area(&self) -> f32 {
        let size = self.max - self.min;
        2.0 * (size.x * size.y + size.y * size.z + size.z * size.x)
    }

    /// Check if the AABB is valid (min <= max)
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Expand to include a point
    #[inline]
    pub fn expand_to_include(self, point: Vec3) -> Self {
        Self {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    /// Smallest box enclosing both boxes
    #[inline]
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Move every face inwards by `amount` per axis; negative values grow the box
    #[inline]
    pub fn inset(&self, amount: Vec3) -> Self {
        Self {
            min: self.min + amount,
            max: self.max - amount,
        }
    }

    /// Grow every face outwards by a uniform margin
    #[inline]
    pub fn outset(&self, margin: f32) -> Self {
        self.inset(Vec3::splat(-margin))
    }

    /// Check if a point is inside
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Check if another AABB is fully contained
    #[inline]
    pub fn contains(&self, other: &Aabb) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }

    /// Check if two AABBs intersect (touching faces count)
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Bounds of this box after rotating by `orn` and translating by `pos`
    pub fn transformed(&self, pos: Vec3, orn: Quat) -> Self {
        let center = orn * self.center();
        let he = self.half_extents();
        let axes = [orn * Vec3::X, orn * Vec3::Y, orn * Vec3::Z];
        let extent = axes[0].abs() * he.x + axes[1].abs() * he.y + axes[2].abs() * he.z;
        Self::from_center_half_extents(pos + center, extent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_intersects() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(0.5), Vec3::splat(1.5));
        let c = Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0));
        let touching = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert!(a.intersects(&touching));
    }

    #[test]
    fn test_aabb_inset_outset() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let fat = a.outset(0.1);
        assert!(fat.contains(&a));
        assert!(!a.contains(&fat));
        assert_eq!(fat.inset(Vec3::splat(0.1)).min, a.min);
    }

    #[test]
    fn test_aabb_area_and_union() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert_eq!(a.area(), 6.0);
        let u = a.union(&Aabb::new(Vec3::splat(2.0), Vec3::splat(3.0)));
        assert_eq!(u.min, Vec3::ZERO);
        assert_eq!(u.max, Vec3::splat(3.0));
        assert_eq!(Aabb::EMPTY.union(&a), a);
    }

    #[test]
    fn test_aabb_transformed_rotated() {
        let a = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::new(1.0, 0.5, 0.5));
        let r = a.transformed(Vec3::new(0.0, 2.0, 0.0), Quat::from_rotation_z(core::f32::consts::FRAC_PI_2));
        approx::assert_abs_diff_eq!(r.half_extents().y, 1.0, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(r.half_extents().x, 0.5, epsilon = 1e-5);
        approx::assert_abs_diff_eq!(r.center().y, 2.0, epsilon = 1e-5);
    }
}
