//! Contact materials defining surface response

use serde::{Deserialize, Serialize};

use crate::config::LARGE_SCALAR;

/// Surface properties of a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Friction coefficient
    pub friction: f32,
    /// Restitution/bounciness (0 = no bounce, 1 = perfect bounce)
    pub restitution: f32,
    /// Contact stiffness, [`LARGE_SCALAR`] for rigid contact
    pub stiffness: f32,
    /// Contact damping, [`LARGE_SCALAR`] for rigid contact
    pub damping: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
            stiffness: LARGE_SCALAR,
            damping: LARGE_SCALAR,
        }
    }
}

impl Material {
    /// Create a new rigid material
    pub fn new(friction: f32, restitution: f32) -> Self {
        Self {
            friction,
            restitution,
            ..Default::default()
        }
    }

    /// Frictionless ice-like material
    pub fn ice() -> Self {
        Self {
            friction: 0.05,
            ..Default::default()
        }
    }

    /// Bouncy rubber-like material
    pub fn rubber() -> Self {
        Self {
            friction: 0.8,
            restitution: 0.8,
            ..Default::default()
        }
    }

    /// Metal material
    pub fn metal() -> Self {
        Self {
            friction: 0.3,
            restitution: 0.2,
            ..Default::default()
        }
    }

    /// Set friction
    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction.max(0.0);
        self
    }

    /// Set restitution
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    /// Make the contact compliant with a spring-damper
    pub fn with_spring(mut self, stiffness: f32, damping: f32) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    /// Whether contacts against this material are treated as rigid
    pub fn is_rigid(&self) -> bool {
        self.stiffness >= LARGE_SCALAR
    }

    /// Friction of a contact between two materials, the product of both
    pub fn combine_friction(&self, other: &Material) -> f32 {
        self.friction * other.friction
    }

    /// Restitution of a contact between two materials, the product of both
    pub fn combine_restitution(&self, other: &Material) -> f32 {
        self.restitution * other.restitution
    }

    /// Combined stiffness and damping of a contact between two materials
    ///
    /// Compliances add when either side is soft; two rigid materials give a
    /// rigid contact.
    pub fn combine_spring(&self, other: &Material) -> (f32, f32) {
        if self.is_rigid() && other.is_rigid() {
            return (LARGE_SCALAR, LARGE_SCALAR);
        }

        let stiffness = 1.0 / (1.0 / self.stiffness + 1.0 / other.stiffness);
        let damping = 1.0 / (1.0 / self.damping + 1.0 / other.damping);
        (stiffness, damping)
    }
}
