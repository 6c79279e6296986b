//! Contact pipeline configuration

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{DynamicsError, Result};

/// Maximum number of contact points held by a manifold or a collision result.
pub const MAX_CONTACTS: usize = 4;

/// Sentinel stiffness/damping of a perfectly rigid contact.
pub const LARGE_SCALAR: f32 = 1e18;

/// Numeric parameters consumed by the contact pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    /// Separation beyond which contacts are not generated and persisted points are evicted
    pub breaking_threshold: f32,

    /// Distance under which a new candidate merges into an existing point
    pub caching_threshold: f32,

    /// Fraction of penetration corrected per position-solve pass
    pub position_correction_rate: f32,

    /// Position solving stops once the minimum contact distance reaches this value
    pub position_min_error: f32,

    /// Tolerance used to classify support features (vertex/edge/face)
    pub support_feature_tolerance: f32,

    /// Points per manifold (fixed)
    pub max_contacts: usize,

    /// Margin added around leaf AABBs in the dynamic tree
    pub aabb_margin: f32,

    /// Multiplier applied to the predicted displacement when fattening leaves
    pub displacement_factor: f32,

    /// AABB gap at which the pair tracker drops a manifold
    pub manifold_separation_threshold: f32,

    /// Velocity passes per step
    pub velocity_iterations: usize,

    /// Position-solve passes per step
    pub position_iterations: usize,

    /// Gravity applied to dynamic bodies
    pub gravity: Vec3,
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            breaking_threshold: 0.02,
            caching_threshold: 0.04,
            position_correction_rate: 0.2,
            position_min_error: -0.005,
            support_feature_tolerance: 0.01,
            max_contacts: MAX_CONTACTS,
            aabb_margin: 0.1,
            displacement_factor: 4.0,
            manifold_separation_threshold: 0.08,
            velocity_iterations: 8,
            position_iterations: 3,
            gravity: Vec3::new(0.0, -9.81, 0.0),
        }
    }
}

impl ContactConfig {
    /// Create a configuration for high-precision simulation
    pub fn high_precision() -> Self {
        Self {
            velocity_iterations: 16,
            position_iterations: 6,
            ..Default::default()
        }
    }

    /// Create a configuration for fast simulation (lower quality)
    pub fn fast() -> Self {
        Self {
            velocity_iterations: 4,
            position_iterations: 1,
            ..Default::default()
        }
    }

    /// Set gravity
    pub fn with_gravity(mut self, x: f32, y: f32, z: f32) -> Self {
        self.gravity = Vec3::new(x, y, z);
        self
    }

    /// Set solver iteration counts
    pub fn with_iterations(mut self, velocity: usize, position: usize) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self
    }

    /// Check that all parameters are usable
    pub fn validate(&self) -> Result<()> {
        if self.max_contacts != MAX_CONTACTS {
            return Err(DynamicsError::InvalidConfig(format!(
                "max_contacts must be {}, got {}",
                MAX_CONTACTS, self.max_contacts
            )));
        }

        let positive = [
            ("breaking_threshold", self.breaking_threshold),
            ("caching_threshold", self.caching_threshold),
            ("position_correction_rate", self.position_correction_rate),
            ("support_feature_tolerance", self.support_feature_tolerance),
            ("displacement_factor", self.displacement_factor),
        ];

        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(DynamicsError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        if !(self.aabb_margin.is_finite() && self.aabb_margin >= 0.0) {
            return Err(DynamicsError::InvalidConfig(format!(
                "aabb_margin must be non-negative, got {}",
                self.aabb_margin
            )));
        }

        if self.position_correction_rate > 1.0 {
            return Err(DynamicsError::InvalidConfig(format!(
                "position_correction_rate must not exceed 1, got {}",
                self.position_correction_rate
            )));
        }

        if self.position_min_error > 0.0 {
            return Err(DynamicsError::InvalidConfig(format!(
                "position_min_error must not be positive, got {}",
                self.position_min_error
            )));
        }

        if self.manifold_separation_threshold < self.breaking_threshold {
            return Err(DynamicsError::InvalidConfig(
                "manifold_separation_threshold must be at least breaking_threshold".into(),
            ));
        }

        if self.velocity_iterations == 0 {
            return Err(DynamicsError::InvalidConfig(
                "velocity_iterations must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ContactConfig::default().validate().is_ok());
        assert!(ContactConfig::high_precision().validate().is_ok());
        assert!(ContactConfig::fast().validate().is_ok());
    }

    #[test]
    fn test_rejects_wrong_capacity() {
        let config = ContactConfig {
            max_contacts: 8,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DynamicsError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        let config = ContactConfig {
            breaking_threshold: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_round_trip_keeps_values() {
        let config = ContactConfig::default().with_gravity(0.0, -1.62, 0.0);
        let json = serde_json::to_string(&config).unwrap();
        let back: ContactConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.gravity, config.gravity);
        assert_eq!(back.velocity_iterations, config.velocity_iterations);
    }
}
