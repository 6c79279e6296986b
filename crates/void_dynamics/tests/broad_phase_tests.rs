//! Broad-phase tree invariants under island churn

use void_dynamics::*;

struct XorShift(u64);

impl XorShift {
    fn next_u64(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        let unit = (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32;
        lo + (hi - lo) * unit
    }
}

fn check_leaves(island: &Island) {
    let tree = island.broad_phase().tree();
    tree.validate().unwrap();
    assert_eq!(tree.len(), island.body_count());

    for (handle, body) in island.bodies().iter() {
        assert_eq!(tree.payload(body.proxy()), Some(handle));
        assert!(
            tree.fat_aabb(body.proxy()).contains(&body.aabb),
            "leaf of {handle:?} does not enclose its body"
        );
    }
}

/// Adding, moving and removing bodies keeps every leaf enclosing its body
/// and every internal node enclosing its children
#[test]
fn test_island_churn_keeps_tree_valid() {
    let mut rng = XorShift(0x2545_F491_4F6C_DD1D);
    let config = ContactConfig::default().with_gravity(0.0, 0.0, 0.0);
    let mut island = Island::new(config).unwrap();
    let mut live = Vec::new();

    for round in 0..40 {
        for _ in 0..5 {
            let desc = RigidBodyDesc::dynamic(Shape::Sphere { radius: rng.range(0.1, 0.6) }, 1.0)
                .with_position(rng.range(-20.0, 20.0), rng.range(-20.0, 20.0), rng.range(-20.0, 20.0))
                .with_linear_velocity(rng.range(-5.0, 5.0), rng.range(-5.0, 5.0), rng.range(-5.0, 5.0));
            live.push(island.add_body(desc).unwrap());
        }

        if round % 3 == 2 {
            for _ in 0..4 {
                let index = (rng.next_u64() % live.len() as u64) as usize;
                let handle = live.swap_remove(index);
                island.remove_body(handle).unwrap();
            }
        }

        // Leaves lag one step behind the integrated bodies.
        island.step(1.0 / 60.0).unwrap();
        for &handle in &live {
            island.refresh_body(handle).unwrap();
        }
        check_leaves(&island);
    }

    let tree = island.broad_phase().tree();
    let n = tree.len() as f32;
    assert!((tree.height() as f32) <= 2.0 * n.log2() + 2.0);
}

/// A body that barely moves keeps its leaf; one that leaves its fat box is
/// reinserted
#[test]
fn test_slow_bodies_keep_leaves() {
    let config = ContactConfig::default().with_gravity(0.0, 0.0, 0.0);
    let mut island = Island::new(config).unwrap();

    island
        .add_body(RigidBodyDesc::dynamic(Shape::Sphere { radius: 0.5 }, 1.0).with_linear_velocity(0.0, 0.0, 0.01))
        .unwrap();
    island.step(1.0 / 60.0).unwrap();
    let stats = island.step(1.0 / 60.0).unwrap();
    assert_eq!(stats.proxies_moved, 0);

    let fast = island
        .add_body(RigidBodyDesc::dynamic(Shape::Sphere { radius: 0.5 }, 1.0).with_position(10.0, 0.0, 0.0))
        .unwrap();
    island.body_mut(fast).unwrap().linear_velocity = Vec3::new(60.0, 0.0, 0.0);
    island.step(1.0 / 60.0).unwrap();
    let stats = island.step(1.0 / 60.0).unwrap();
    assert_eq!(stats.proxies_moved, 1);
}
