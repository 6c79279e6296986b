//! Broad phase: one tree leaf per body

use glam::Vec3;

use crate::aabb::Aabb;
use crate::body::BodyHandle;
use crate::config::ContactConfig;
use crate::tree::{DynamicTree, NodeId};

/// Incremental broad phase over body AABBs
#[derive(Debug, Clone)]
pub struct BroadPhase {
    tree: DynamicTree<BodyHandle>,
}

impl BroadPhase {
    /// Create an empty broad phase using the tree parameters of `config`
    pub fn new(config: &ContactConfig) -> Self {
        Self {
            tree: DynamicTree::new(config.aabb_margin, config.displacement_factor),
        }
    }

    /// Add a body and return its leaf
    pub fn insert(&mut self, body: BodyHandle, aabb: &Aabb) -> NodeId {
        self.tree.create(aabb, body)
    }

    /// Remove a body's leaf
    pub fn remove(&mut self, proxy: NodeId) {
        self.tree.destroy(proxy);
    }

    /// Update a body's leaf after it moved, returns whether it was reinserted
    pub fn update(&mut self, proxy: NodeId, aabb: &Aabb, displacement: Vec3) -> bool {
        self.tree.move_leaf(proxy, aabb, displacement)
    }

    /// Bodies whose fat AABBs intersect `aabb`
    pub fn query<F: FnMut(BodyHandle)>(&self, aabb: &Aabb, mut visit: F) {
        self.tree.visit(aabb, |_, body| visit(body));
    }

    /// Candidate body pairs whose fat AABBs overlap, each reported once
    pub fn candidate_pairs(&self) -> Vec<(BodyHandle, BodyHandle)> {
        self.tree
            .overlapping_pairs()
            .into_iter()
            .filter_map(|(a, b)| Some((self.tree.payload(a)?, self.tree.payload(b)?)))
            .collect()
    }

    /// Underlying tree
    pub fn tree(&self) -> &DynamicTree<BodyHandle> {
        &self.tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_pairs_follow_movement() {
        let a = BodyHandle::new(0, 0);
        let b = BodyHandle::new(1, 0);

        let mut broad = BroadPhase::new(&ContactConfig::default());
        let unit = |c: Vec3| Aabb::from_center_half_extents(c, Vec3::splat(0.5));

        let pa = broad.insert(a, &unit(Vec3::ZERO));
        broad.insert(b, &unit(Vec3::new(5.0, 0.0, 0.0)));
        assert!(broad.candidate_pairs().is_empty());

        assert!(broad.update(pa, &unit(Vec3::new(4.5, 0.0, 0.0)), Vec3::ZERO));
        let pairs = broad.candidate_pairs();
        assert_eq!(pairs.len(), 1);
        assert!(pairs[0] == (a, b) || pairs[0] == (b, a));

        broad.remove(pa);
        assert!(broad.candidate_pairs().is_empty());
        assert_eq!(broad.tree().len(), 1);
    }
}
