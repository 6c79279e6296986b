//! Dynamic AABB tree
//!
//! Incremental bounding volume hierarchy over fattened leaf boxes. Nodes live
//! in an arena addressed by [`NodeId`]; freed nodes are recycled through an
//! intrusive free list. Insertion descends by a surface-area cost and every
//! ancestor is rebalanced with a single AVL-style rotation on the way back up.

use glam::Vec3;

use crate::aabb::Aabb;

/// Index of a node in the tree arena
pub type NodeId = u32;

/// Sentinel for "no node"
pub const NULL_NODE: NodeId = u32::MAX;

#[derive(Clone, Debug)]
struct TreeNode<T> {
    /// Fattened bounds (leaves) or union of children (internal)
    aabb: Aabb,
    parent: NodeId,
    child1: NodeId,
    child2: NodeId,
    /// Free-list link, only meaningful while `height == -1`
    next: NodeId,
    /// -1 = free, 0 = leaf, >0 = internal
    height: i32,
    payload: Option<T>,
}

impl<T> TreeNode<T> {
    fn is_leaf(&self) -> bool {
        self.child1 == NULL_NODE
    }
}

/// Dynamic bounding volume tree keyed by node id
#[derive(Clone, Debug)]
pub struct DynamicTree<T> {
    nodes: Vec<TreeNode<T>>,
    root: NodeId,
    free_list: NodeId,
    leaf_count: usize,
    margin: f32,
    displacement_factor: f32,
}

impl<T: Copy> DynamicTree<T> {
    /// Create an empty tree
    ///
    /// `margin` fattens every leaf box and `displacement_factor` scales the
    /// predicted displacement passed to [`DynamicTree::move_leaf`].
    pub fn new(margin: f32, displacement_factor: f32) -> Self {
        Self {
            nodes: Vec::new(),
            root: NULL_NODE,
            free_list: NULL_NODE,
            leaf_count: 0,
            margin,
            displacement_factor,
        }
    }

    /// Take a node from the free list, or grow the arena
    pub fn allocate(&mut self) -> NodeId {
        let fresh = TreeNode {
            aabb: Aabb::EMPTY,
            parent: NULL_NODE,
            child1: NULL_NODE,
            child2: NULL_NODE,
            next: NULL_NODE,
            height: 0,
            payload: None,
        };

        if self.free_list == NULL_NODE {
            let id = self.nodes.len() as NodeId;
            self.nodes.push(fresh);
            id
        } else {
            let id = self.free_list;
            self.free_list = self.nodes[id as usize].next;
            self.nodes[id as usize] = fresh;
            id
        }
    }

    /// Return a node to the free list
    pub fn free(&mut self, id: NodeId) {
        let node = &mut self.nodes[id as usize];
        debug_assert!(node.height >= 0, "double free of tree node {id}");
        node.next = self.free_list;
        node.height = -1;
        node.payload = None;
        self.free_list = id;
    }

    /// Insert a leaf for `aabb` and return its id
    pub fn create(&mut self, aabb: &Aabb, payload: T) -> NodeId {
        let id = self.allocate();
        let node = &mut self.nodes[id as usize];
        node.aabb = aabb.outset(self.margin);
        node.payload = Some(payload);
        self.insert(id);
        self.leaf_count += 1;
        id
    }

    /// Remove and free a leaf
    pub fn destroy(&mut self, id: NodeId) {
        assert!(
            self.is_live_leaf(id),
            "DynamicTree::destroy called on non-leaf node {id}"
        );
        self.remove(id);
        self.free(id);
        self.leaf_count -= 1;
    }

    /// Update the placement of a leaf
    ///
    /// Returns `false` when the tight `aabb` still fits the stored fat box and
    /// the fat box has not grown far larger than needed. Otherwise the leaf is
    /// reinserted with a new fat box extended along `displacement`.
    pub fn move_leaf(&mut self, id: NodeId, aabb: &Aabb, displacement: Vec3) -> bool {
        debug_assert!(self.is_live_leaf(id), "move_leaf on non-leaf node {id}");

        let mut fat = aabb.outset(self.margin);

        // Predict movement.
        let d = displacement * self.displacement_factor;
        for i in 0..3 {
            if d[i] < 0.0 {
                fat.min[i] += d[i];
            } else {
                fat.max[i] += d[i];
            }
        }

        let current = self.nodes[id as usize].aabb;

        if current.contains(aabb) {
            // Still enclosed; only reinsert if the stored box became too loose.
            let loose = fat.outset(self.margin * 4.0);
            if loose.contains(&current) {
                return false;
            }
        }

        self.remove(id);
        self.nodes[id as usize].aabb = fat;
        self.insert(id);

        true
    }

    /// Invoke `visit` for the payload of every leaf whose fat box intersects `aabb`
    pub fn visit<F: FnMut(NodeId, T)>(&self, aabb: &Aabb, mut visit: F) {
        if self.root == NULL_NODE {
            return;
        }

        let mut stack = Vec::with_capacity(64);
        stack.push(self.root);

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];

            if !node.aabb.intersects(aabb) {
                continue;
            }

            if node.is_leaf() {
                if let Some(payload) = node.payload {
                    visit(id, payload);
                }
            } else {
                stack.push(node.child1);
                stack.push(node.child2);
            }
        }
    }

    /// Invoke `visit` for every leaf
    pub fn visit_leaves<F: FnMut(NodeId, T)>(&self, mut visit: F) {
        for (id, node) in self.nodes.iter().enumerate() {
            if node.height == 0 {
                if let Some(payload) = node.payload {
                    visit(id as NodeId, payload);
                }
            }
        }
    }

    /// All unordered pairs of leaves whose fat boxes overlap, as node ids
    pub fn overlapping_pairs(&self) -> Vec<(NodeId, NodeId)> {
        let mut pairs = Vec::new();
        self.visit_leaves(|leaf, _| {
            let aabb = self.nodes[leaf as usize].aabb;
            self.visit(&aabb, |other, _| {
                if other > leaf {
                    pairs.push((leaf, other));
                }
            });
        });
        pairs
    }

    /// Payload stored in a leaf
    pub fn payload(&self, id: NodeId) -> Option<T> {
        self.nodes.get(id as usize).and_then(|n| n.payload)
    }

    /// Stored (fat) bounds of a node
    pub fn fat_aabb(&self, id: NodeId) -> Aabb {
        self.nodes[id as usize].aabb
    }

    /// Root node id, or [`NULL_NODE`] when empty
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Height of the tree (0 for a single leaf, -1 when empty)
    pub fn height(&self) -> i32 {
        if self.root == NULL_NODE {
            -1
        } else {
            self.nodes[self.root as usize].height
        }
    }

    /// Number of live leaves
    pub fn len(&self) -> usize {
        self.leaf_count
    }

    /// Whether the tree has no leaves
    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    fn is_live_leaf(&self, id: NodeId) -> bool {
        self.nodes
            .get(id as usize)
            .map(|n| n.height == 0 && n.is_leaf())
            .unwrap_or(false)
    }

    fn insert(&mut self, leaf: NodeId) {
        if self.root == NULL_NODE {
            self.root = leaf;
            self.nodes[leaf as usize].parent = NULL_NODE;
            return;
        }

        // Find the best sibling for the new leaf.
        let leaf_aabb = self.nodes[leaf as usize].aabb;
        let mut index = self.root;

        while !self.nodes[index as usize].is_leaf() {
            let node = &self.nodes[index as usize];
            let area = node.aabb.area();
            let enclosing_area = node.aabb.union(&leaf_aabb).area();

            // Cost of creating a new parent for this node and the new leaf.
            let cost = 2.0 * enclosing_area;

            // Minimum cost of pushing the leaf further down the tree.
            let inherit_cost = 2.0 * (enclosing_area - area);

            let cost1 = self.descend_cost(node.child1, &leaf_aabb) + inherit_cost;
            let cost2 = self.descend_cost(node.child2, &leaf_aabb) + inherit_cost;

            if cost < cost1 && cost < cost2 {
                break;
            }

            index = if cost1 < cost2 { node.child1 } else { node.child2 };
        }

        let sibling = index;
        let old_parent = self.nodes[sibling as usize].parent;
        let sibling_aabb = self.nodes[sibling as usize].aabb;
        let sibling_height = self.nodes[sibling as usize].height;

        let new_parent = self.allocate();
        {
            let parent = &mut self.nodes[new_parent as usize];
            parent.parent = old_parent;
            parent.aabb = sibling_aabb.union(&leaf_aabb);
            parent.height = sibling_height + 1;
            parent.child1 = sibling;
            parent.child2 = leaf;
        }

        if old_parent == NULL_NODE {
            self.root = new_parent;
        } else {
            self.replace_child(old_parent, sibling, new_parent);
        }

        self.nodes[sibling as usize].parent = new_parent;
        self.nodes[leaf as usize].parent = new_parent;

        // Walk back up the tree refitting AABBs.
        self.adjust_bounds(new_parent);
    }

    fn descend_cost(&self, child: NodeId, leaf_aabb: &Aabb) -> f32 {
        let node = &self.nodes[child as usize];
        let enclosing = node.aabb.union(leaf_aabb).area();
        if node.is_leaf() {
            enclosing
        } else {
            enclosing - node.aabb.area()
        }
    }

    fn remove(&mut self, leaf: NodeId) {
        if leaf == self.root {
            self.root = NULL_NODE;
            return;
        }

        let parent = self.nodes[leaf as usize].parent;
        let grandparent = self.nodes[parent as usize].parent;
        let sibling = {
            let p = &self.nodes[parent as usize];
            if p.child1 == leaf {
                p.child2
            } else {
                p.child1
            }
        };
        debug_assert!(sibling != NULL_NODE);

        if grandparent == NULL_NODE {
            self.root = sibling;
            self.nodes[sibling as usize].parent = NULL_NODE;
            self.free(parent);
        } else {
            // Destroy parent and connect sibling to grandparent.
            self.replace_child(grandparent, parent, sibling);
            self.nodes[sibling as usize].parent = grandparent;
            self.free(parent);
            self.adjust_bounds(grandparent);
        }

        self.nodes[leaf as usize].parent = NULL_NODE;
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        let p = &mut self.nodes[parent as usize];
        if p.child1 == old {
            p.child1 = new;
        } else {
            debug_assert_eq!(p.child2, old);
            p.child2 = new;
        }
    }

    fn adjust_bounds(&mut self, mut id: NodeId) {
        while id != NULL_NODE {
            id = self.balance(id);

            let (c1, c2) = {
                let n = &self.nodes[id as usize];
                (n.child1, n.child2)
            };
            debug_assert!(c1 != NULL_NODE && c2 != NULL_NODE);

            let aabb = self.nodes[c1 as usize].aabb.union(&self.nodes[c2 as usize].aabb);
            let height = self.nodes[c1 as usize].height.max(self.nodes[c2 as usize].height) + 1;

            let node = &mut self.nodes[id as usize];
            node.aabb = aabb;
            node.height = height;
            id = node.parent;
        }
    }

    /// Rotate the taller child of `a` up if the children's heights differ by
    /// more than one. Returns the id now at `a`'s former position.
    fn balance(&mut self, a: NodeId) -> NodeId {
        let node_a = &self.nodes[a as usize];

        if node_a.is_leaf() || node_a.height < 2 {
            return a;
        }

        let b = node_a.child1;
        let c = node_a.child2;
        let balance = self.nodes[c as usize].height - self.nodes[b as usize].height;

        if balance > 1 {
            self.rotate_up(a, c, b, false)
        } else if balance < -1 {
            self.rotate_up(a, b, c, true)
        } else {
            a
        }
    }

    /// Promote `up` (a child of `a`) above `a`. `other` is `a`'s remaining
    /// child; `up_was_child1` says which slot of `a` `up` occupied.
    fn rotate_up(&mut self, a: NodeId, up: NodeId, other: NodeId, up_was_child1: bool) -> NodeId {
        let (f, g) = {
            let n = &self.nodes[up as usize];
            (n.child1, n.child2)
        };

        // Swap `a` and `up`.
        let a_parent = self.nodes[a as usize].parent;
        self.nodes[up as usize].child1 = a;
        self.nodes[up as usize].parent = a_parent;
        self.nodes[a as usize].parent = up;

        if a_parent == NULL_NODE {
            self.root = up;
        } else {
            self.replace_child(a_parent, a, up);
        }

        // Keep the taller grandchild under `up`, hand the other one to `a`.
        let (keep, give) = if self.nodes[f as usize].height > self.nodes[g as usize].height {
            (f, g)
        } else {
            (g, f)
        };

        self.nodes[up as usize].child2 = keep;
        if up_was_child1 {
            self.nodes[a as usize].child1 = give;
        } else {
            self.nodes[a as usize].child2 = give;
        }
        self.nodes[give as usize].parent = a;

        let a_aabb = self.nodes[other as usize].aabb.union(&self.nodes[give as usize].aabb);
        let a_height = self.nodes[other as usize].height.max(self.nodes[give as usize].height) + 1;
        self.nodes[a as usize].aabb = a_aabb;
        self.nodes[a as usize].height = a_height;

        let up_aabb = a_aabb.union(&self.nodes[keep as usize].aabb);
        let up_height = a_height.max(self.nodes[keep as usize].height) + 1;
        self.nodes[up as usize].aabb = up_aabb;
        self.nodes[up as usize].height = up_height;

        up
    }

    /// Check structural invariants, returning a description of the first violation
    pub fn validate(&self) -> Result<(), String> {
        if self.root == NULL_NODE {
            return if self.leaf_count == 0 {
                Ok(())
            } else {
                Err(format!("empty root with {} leaves", self.leaf_count))
            };
        }

        if self.nodes[self.root as usize].parent != NULL_NODE {
            return Err("root has a parent".into());
        }

        let mut leaves = 0;
        let mut stack = vec![self.root];

        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];

            if node.height < 0 {
                return Err(format!("reachable node {id} is on the free list"));
            }

            if node.is_leaf() {
                if node.child2 != NULL_NODE || node.height != 0 || node.payload.is_none() {
                    return Err(format!("malformed leaf {id}"));
                }
                leaves += 1;
                continue;
            }

            if node.child2 == NULL_NODE {
                return Err(format!("internal node {id} has one child"));
            }

            let (c1, c2) = (&self.nodes[node.child1 as usize], &self.nodes[node.child2 as usize]);

            if c1.parent != id || c2.parent != id {
                return Err(format!("children of {id} do not point back to it"));
            }

            if node.aabb != c1.aabb.union(&c2.aabb) {
                return Err(format!("node {id} bounds do not match its children"));
            }

            if node.height != c1.height.max(c2.height) + 1 {
                return Err(format!("node {id} has a stale height"));
            }

            stack.push(node.child1);
            stack.push(node.child2);
        }

        if leaves != self.leaf_count {
            return Err(format!("{leaves} reachable leaves, expected {}", self.leaf_count));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct XorShift(u64);

    impl XorShift {
        fn next_f32(&mut self) -> f32 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            (self.0 % 10_000) as f32 / 10_000.0
        }
    }

    fn unit_box(center: Vec3) -> Aabb {
        Aabb::from_center_half_extents(center, Vec3::splat(0.5))
    }

    #[test]
    fn test_single_leaf_is_root() {
        let mut tree = DynamicTree::new(0.1, 4.0);
        let id = tree.create(&unit_box(Vec3::ZERO), 7u32);
        assert_eq!(tree.root(), id);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.payload(id), Some(7));
        assert!(tree.fat_aabb(id).contains(&unit_box(Vec3::ZERO)));
    }

    #[test]
    fn test_free_list_recycles_ids() {
        let mut tree = DynamicTree::new(0.1, 4.0);
        let a = tree.create(&unit_box(Vec3::ZERO), 0u32);
        let b = tree.create(&unit_box(Vec3::X * 5.0), 1u32);
        tree.destroy(b);
        tree.destroy(a);
        assert!(tree.is_empty());
        let nodes_before = tree.nodes.len();
        tree.create(&unit_box(Vec3::ZERO), 2u32);
        tree.create(&unit_box(Vec3::X * 5.0), 3u32);
        assert_eq!(tree.nodes.len(), nodes_before);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_visit_finds_overlapping_leaves() {
        let mut tree = DynamicTree::new(0.1, 4.0);
        for i in 0..10 {
            tree.create(&unit_box(Vec3::new(i as f32 * 3.0, 0.0, 0.0)), i);
        }

        let mut hits = Vec::new();
        tree.visit(&unit_box(Vec3::new(6.0, 0.0, 0.0)), |_, payload| hits.push(payload));
        assert_eq!(hits, vec![2]);
    }

    #[test]
    fn test_small_move_keeps_leaf() {
        let mut tree = DynamicTree::new(0.1, 4.0);
        let id = tree.create(&unit_box(Vec3::ZERO), 0u32);
        assert!(!tree.move_leaf(id, &unit_box(Vec3::splat(0.05)), Vec3::ZERO));
        assert!(tree.move_leaf(id, &unit_box(Vec3::X * 2.0), Vec3::X));
        let fat = tree.fat_aabb(id);
        assert!(fat.contains(&unit_box(Vec3::X * 2.0)));
        // Extended along the displacement.
        assert!(fat.max.x > 2.5 + 0.1 + 3.9);
    }

    #[test]
    #[should_panic]
    fn test_destroy_internal_node_panics() {
        let mut tree = DynamicTree::new(0.1, 4.0);
        tree.create(&unit_box(Vec3::ZERO), 0u32);
        tree.create(&unit_box(Vec3::X * 3.0), 1u32);
        let root = tree.root();
        tree.destroy(root);
    }

    #[test]
    fn test_random_churn_keeps_invariants() {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);
        let mut tree = DynamicTree::new(0.1, 4.0);
        let mut live: Vec<(NodeId, Aabb)> = Vec::new();

        for step in 0..2000u32 {
            let roll = rng.next_f32();
            if roll < 0.5 || live.len() < 8 {
                let c = Vec3::new(rng.next_f32(), rng.next_f32(), rng.next_f32()) * 100.0;
                let aabb = unit_box(c);
                live.push((tree.create(&aabb, step), aabb));
            } else if roll < 0.8 {
                let i = (rng.next_f32() * live.len() as f32) as usize % live.len();
                let d = Vec3::new(rng.next_f32() - 0.5, rng.next_f32() - 0.5, rng.next_f32() - 0.5) * 4.0;
                let aabb = Aabb::new(live[i].1.min + d, live[i].1.max + d);
                tree.move_leaf(live[i].0, &aabb, d);
                live[i].1 = aabb;
            } else {
                let i = (rng.next_f32() * live.len() as f32) as usize % live.len();
                let (id, _) = live.swap_remove(i);
                tree.destroy(id);
            }

            if step % 100 == 0 {
                assert_eq!(tree.validate(), Ok(()));
            }
        }

        assert_eq!(tree.validate(), Ok(()));
        for (id, tight) in &live {
            assert!(tree.fat_aabb(*id).contains(tight));
        }
    }

    #[test]
    fn test_height_is_logarithmic() {
        let mut tree = DynamicTree::new(0.1, 4.0);
        let n = 1024;
        for i in 0..n {
            // Sorted insertion along a line is the worst case for unbalanced trees.
            tree.create(&unit_box(Vec3::new(i as f32 * 2.0, 0.0, 0.0)), i);
        }
        assert_eq!(tree.validate(), Ok(()));
        // Rotations keep the height within a small multiple of log2(n).
        let bound = 2 * (n as f32).log2() as i32 + 2;
        assert!(tree.height() <= bound, "height {} > {}", tree.height(), bound);
    }

    #[test]
    fn test_overlapping_pairs_are_unique() {
        let mut tree = DynamicTree::new(0.0, 4.0);
        tree.create(&unit_box(Vec3::ZERO), 0u32);
        tree.create(&unit_box(Vec3::X * 0.8), 1u32);
        tree.create(&unit_box(Vec3::X * 10.0), 2u32);
        let pairs = tree.overlapping_pairs();
        assert_eq!(pairs.len(), 1);
    }
}
