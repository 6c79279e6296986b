//! Rigid bodies taking part in contact resolution

use glam::{Mat3, Quat, Vec3};

use crate::aabb::Aabb;
use crate::arena::Handle;
use crate::error::{DynamicsError, Result};
use crate::material::Material;
use crate::math::{integrate_orientation, rotate_inertia, to_world_space};
use crate::shapes::Shape;
use crate::tree::{NodeId, NULL_NODE};

/// Handle to a rigid body in an island
pub type BodyHandle = Handle<RigidBody>;

/// Type of rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyKind {
    /// Never moves, infinite mass
    Static,
    /// Fully simulated
    #[default]
    Dynamic,
    /// Moved by its velocity only, infinite mass
    Kinematic,
}

/// Description for creating a rigid body
#[derive(Debug, Clone)]
pub struct RigidBodyDesc {
    /// Type of rigid body
    pub kind: BodyKind,
    /// World position of the center of mass
    pub position: Vec3,
    /// Initial orientation
    pub orientation: Quat,
    /// Initial linear velocity
    pub linear_velocity: Vec3,
    /// Initial angular velocity
    pub angular_velocity: Vec3,
    /// Mass, ignored for static and kinematic bodies
    pub mass: f32,
    /// Center of mass in the shape's frame
    pub center_of_mass: Vec3,
    /// Collision shape
    pub shape: Shape,
    /// Surface material
    pub material: Material,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self {
            kind: BodyKind::Dynamic,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
            center_of_mass: Vec3::ZERO,
            shape: Shape::Sphere { radius: 0.5 },
            material: Material::default(),
        }
    }
}

impl RigidBodyDesc {
    /// Create a static body description
    pub fn fixed(shape: Shape) -> Self {
        Self {
            kind: BodyKind::Static,
            shape,
            ..Default::default()
        }
    }

    /// Create a dynamic body description
    pub fn dynamic(shape: Shape, mass: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            shape,
            mass,
            ..Default::default()
        }
    }

    /// Create a kinematic body description
    pub fn kinematic(shape: Shape) -> Self {
        Self {
            kind: BodyKind::Kinematic,
            shape,
            ..Default::default()
        }
    }

    /// Set position
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vec3::new(x, y, z);
        self
    }

    /// Set orientation
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set linear velocity
    pub fn with_linear_velocity(mut self, x: f32, y: f32, z: f32) -> Self {
        self.linear_velocity = Vec3::new(x, y, z);
        self
    }

    /// Set angular velocity
    pub fn with_angular_velocity(mut self, x: f32, y: f32, z: f32) -> Self {
        self.angular_velocity = Vec3::new(x, y, z);
        self
    }

    /// Set the center of mass offset
    pub fn with_center_of_mass(mut self, com: Vec3) -> Self {
        self.center_of_mass = com;
        self
    }

    /// Set material
    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }
}

/// A rigid body: transform, velocities, mass properties and shape
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub kind: BodyKind,
    /// World position of the center of mass
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub inv_mass: f32,
    pub inv_inertia_local: Mat3,
    pub inv_inertia_world: Mat3,
    /// Center of mass in the shape's frame
    pub center_of_mass: Vec3,
    pub shape: Shape,
    pub material: Material,
    /// World-space bounds of the shape
    pub aabb: Aabb,
    pub(crate) proxy: NodeId,
}

impl RigidBody {
    /// Build a body from its description
    pub fn new(desc: RigidBodyDesc) -> Result<Self> {
        let (inv_mass, inv_inertia_local) = match desc.kind {
            BodyKind::Dynamic => {
                if !(desc.mass > 0.0 && desc.mass.is_finite()) {
                    return Err(DynamicsError::InvalidConfig(format!(
                        "dynamic body mass must be positive and finite, got {}",
                        desc.mass
                    )));
                }
                let inertia = desc.shape.inertia(desc.mass);
                (1.0 / desc.mass, Mat3::from_diagonal(inverse_or_zero(inertia)))
            }
            BodyKind::Static | BodyKind::Kinematic => (0.0, Mat3::ZERO),
        };

        let orientation = desc.orientation.normalize();

        let mut body = Self {
            kind: desc.kind,
            position: desc.position,
            orientation,
            linear_velocity: desc.linear_velocity,
            angular_velocity: desc.angular_velocity,
            inv_mass,
            inv_inertia_local,
            inv_inertia_world: rotate_inertia(inv_inertia_local, orientation),
            center_of_mass: desc.center_of_mass,
            shape: desc.shape,
            material: desc.material,
            aabb: Aabb::EMPTY,
            proxy: NULL_NODE,
        };
        body.update_aabb();

        Ok(body)
    }

    /// Broad-phase leaf of the body, [`NULL_NODE`] until added to an island
    pub fn proxy(&self) -> NodeId {
        self.proxy
    }

    /// Whether the body responds to forces
    pub fn is_dynamic(&self) -> bool {
        self.kind == BodyKind::Dynamic
    }

    /// World position of the shape's frame, i.e. the position offset by the
    /// center of mass
    pub fn origin(&self) -> Vec3 {
        to_world_space(-self.center_of_mass, self.position, self.orientation)
    }

    /// Recompute world bounds from the current transform
    pub fn update_aabb(&mut self) {
        self.aabb = self.shape.aabb(self.origin(), self.orientation);
    }

    /// Rotate the inverse inertia into the current orientation
    pub fn update_inertia(&mut self) {
        self.inv_inertia_world = rotate_inertia(self.inv_inertia_local, self.orientation);
    }

    /// Velocity of a world-space point attached to the body
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.position)
    }

    /// Advance position and orientation by `dt`
    pub fn integrate(&mut self, dt: f32) {
        if self.kind == BodyKind::Static {
            return;
        }

        self.position += self.linear_velocity * dt;
        self.orientation = integrate_orientation(self.orientation, self.angular_velocity * dt);
        self.update_inertia();
    }
}

fn inverse_or_zero(v: Vec3) -> Vec3 {
    let inv = |x: f32| if x > 0.0 && x.is_finite() { 1.0 / x } else { 0.0 };
    Vec3::new(inv(v.x), inv(v.y), inv(v.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_static_body_has_no_mass() {
        let body = RigidBody::new(RigidBodyDesc::fixed(Shape::Cuboid {
            half_extents: Vec3::ONE,
        }))
        .unwrap();
        assert_eq!(body.inv_mass, 0.0);
        assert_eq!(body.inv_inertia_world, Mat3::ZERO);
    }

    #[test]
    fn test_dynamic_body_requires_mass() {
        let desc = RigidBodyDesc::dynamic(Shape::Sphere { radius: 1.0 }, 0.0);
        assert!(RigidBody::new(desc).is_err());
    }

    #[test]
    fn test_origin_accounts_for_center_of_mass() {
        let desc = RigidBodyDesc::dynamic(Shape::Sphere { radius: 1.0 }, 1.0)
            .with_position(0.0, 1.0, 0.0)
            .with_center_of_mass(Vec3::new(0.5, 0.0, 0.0))
            .with_orientation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let body = RigidBody::new(desc).unwrap();
        // The com offset (0.5, 0, 0) rotates to (0, 0.5, 0).
        assert_abs_diff_eq!(body.origin().y, 0.5, epsilon = 1e-5);
        assert_abs_diff_eq!(body.aabb.center().y, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_integrate_moves_and_rotates() {
        let desc = RigidBodyDesc::dynamic(Shape::Cuboid { half_extents: Vec3::splat(0.5) }, 2.0)
            .with_linear_velocity(1.0, 0.0, 0.0)
            .with_angular_velocity(0.0, 1.0, 0.0);
        let mut body = RigidBody::new(desc).unwrap();
        body.integrate(0.1);
        assert_abs_diff_eq!(body.position.x, 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(body.orientation.length(), 1.0, epsilon = 1e-6);
        assert!(body.orientation.y > 0.0);
    }
}
