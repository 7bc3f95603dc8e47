//! Integration tests for the octree index.
//!
//! These exercise the public API only: structural counts, identity-keyed
//! removal, update semantics, range queries and concurrent use from many
//! threads.

use octoflock::{Aabb, Octree, Vec3};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

fn random_points(n: usize, half: f32, seed: u64) -> Vec<Vec3> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            Vec3::new(
                rng.gen_range(-half..=half),
                rng.gen_range(-half..=half),
                rng.gen_range(-half..=half),
            )
        })
        .collect()
}

fn sorted_ids(entries: &[octoflock::Entry]) -> Vec<u32> {
    let mut ids: Vec<u32> = entries.iter().map(|e| e.id).collect();
    ids.sort_unstable();
    ids
}

// ============================================================================
// Structure
// ============================================================================

#[test]
fn test_fresh_tree_is_single_empty_leaf() {
    let tree = Octree::new(Aabb::cube(5.0), 2);
    assert_eq!(tree.count_nodes(), 1);
    assert_eq!(tree.count_points(), 0);
    assert!(tree.is_empty());
    assert_eq!(tree.depth(), 0);
}

#[test]
fn test_split_past_capacity() {
    let tree = Octree::new(Aabb::cube(5.0), 2);
    assert!(tree.insert(0, Vec3::ZERO).unwrap());
    assert!(tree.insert(1, Vec3::splat(5.0)).unwrap());
    assert_eq!(tree.count_nodes(), 1);

    assert!(tree.insert(2, Vec3::splat(-5.0)).unwrap());
    assert_eq!(tree.count_nodes(), 9);
    assert_eq!(tree.count_points(), 3);
    assert_eq!(tree.node_bounds()[0], Aabb::cube(5.0));
}

#[test]
fn test_point_on_boundary_is_accepted() {
    let tree = Octree::new(Aabb::cube(1.0), 4);
    assert!(tree.insert(0, Vec3::new(1.0, -1.0, 1.0)).unwrap());
    assert!(!tree.insert(1, Vec3::new(1.0001, 0.0, 0.0)).unwrap());
    assert_eq!(tree.count_points(), 1);
}

#[test]
fn test_count_points_matches_inserts() {
    let tree = Octree::new(Aabb::cube(100.0), 8);
    let points = random_points(2_000, 100.0, 11);
    for (i, p) in points.iter().enumerate() {
        assert!(tree.insert(i as u32, *p).unwrap());
    }
    assert_eq!(tree.count_points(), 2_000);
    assert!(tree.depth() > 1);
}

// ============================================================================
// Removal and update
// ============================================================================

#[test]
fn test_remove_everything_collapses_to_root() {
    let tree = Octree::new(Aabb::cube(10.0), 4);
    let points = random_points(500, 10.0, 12);
    for (i, p) in points.iter().enumerate() {
        tree.insert(i as u32, *p).unwrap();
    }
    for (i, p) in points.iter().enumerate() {
        assert!(tree.remove(i as u32, *p));
    }
    assert_eq!(tree.count_points(), 0);
    assert_eq!(tree.count_nodes(), 1);
}

#[test]
fn test_remove_twice_reports_missing() {
    let tree = Octree::new(Aabb::cube(10.0), 4);
    tree.insert(3, Vec3::ONE).unwrap();
    assert!(tree.remove(3, Vec3::ONE));
    assert!(!tree.remove(3, Vec3::ONE));
}

#[test]
fn test_remove_picks_entry_by_id() {
    let tree = Octree::new(Aabb::cube(10.0), 4);
    tree.insert(1, Vec3::ONE).unwrap();
    tree.insert(2, Vec3::ONE).unwrap();
    assert!(tree.remove(2, Vec3::ONE));

    let left = tree.query(&Aabb::cube(10.0));
    assert_eq!(sorted_ids(&left), vec![1]);
}

#[test]
fn test_update_moves_entry() {
    let tree = Octree::new(Aabb::cube(10.0), 1);
    let old = Vec3::new(-8.0, -8.0, -8.0);
    let new = Vec3::new(8.0, 8.0, 8.0);
    tree.insert(0, old).unwrap();
    tree.insert(1, Vec3::ZERO).unwrap();

    assert!(tree.update(0, old, new).unwrap());
    assert_eq!(tree.count_points(), 2);
    assert!(tree.query(&Aabb::from_center_size(old, Vec3::splat(1.0))).is_empty());
    assert_eq!(sorted_ids(&tree.query(&Aabb::from_center_size(new, Vec3::splat(1.0)))), vec![0]);
}

#[test]
fn test_update_to_outside_leaves_tree_alone() {
    let tree = Octree::new(Aabb::cube(10.0), 4);
    tree.insert(0, Vec3::ZERO).unwrap();
    assert!(!tree.update(0, Vec3::ZERO, Vec3::splat(20.0)).unwrap());
    assert_eq!(sorted_ids(&tree.query(&Aabb::cube(0.5))), vec![0]);
}

#[test]
fn test_update_with_stale_position_is_skipped() {
    let tree = Octree::new(Aabb::cube(10.0), 4);
    tree.insert(0, Vec3::ZERO).unwrap();
    assert!(!tree.update(0, Vec3::splat(5.0), Vec3::ONE).unwrap());
    assert_eq!(tree.count_points(), 1);
    assert!(tree.query(&Aabb::from_center_size(Vec3::ONE, Vec3::splat(0.5))).is_empty());
}

// ============================================================================
// Queries
// ============================================================================

#[test]
fn test_query_matches_brute_force() {
    let tree = Octree::new(Aabb::cube(50.0), 6);
    let points = random_points(1_500, 50.0, 13);
    for (i, p) in points.iter().enumerate() {
        tree.insert(i as u32, *p).unwrap();
    }

    let range = Aabb::new(Vec3::new(-20.0, -5.0, 0.0), Vec3::new(10.0, 30.0, 25.0));
    let expected: Vec<u32> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| range.contains(**p))
        .map(|(i, _)| i as u32)
        .collect();
    assert_eq!(sorted_ids(&tree.query(&range)), expected);

    let candidates = tree.query_candidates(&range);
    assert!(candidates.len() >= expected.len());
    let candidate_ids = sorted_ids(&candidates);
    assert!(expected.iter().all(|id| candidate_ids.binary_search(id).is_ok()));
}

#[test]
fn test_sphere_query_matches_brute_force() {
    let tree = Octree::new(Aabb::cube(50.0), 6);
    let points = random_points(1_500, 50.0, 14);
    for (i, p) in points.iter().enumerate() {
        tree.insert(i as u32, *p).unwrap();
    }

    let center = Vec3::new(3.0, -7.0, 12.0);
    let radius = 18.0;
    let expected: Vec<u32> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.distance_squared(center) <= radius * radius)
        .map(|(i, _)| i as u32)
        .collect();
    assert_eq!(sorted_ids(&tree.query_sphere(center, radius)), expected);
}

#[test]
fn test_query_disjoint_range_is_empty() {
    let tree = Octree::new(Aabb::cube(5.0), 2);
    for (i, p) in random_points(50, 5.0, 15).iter().enumerate() {
        tree.insert(i as u32, *p).unwrap();
    }
    let far = Aabb::from_center_size(Vec3::splat(100.0), Vec3::ONE);
    assert!(tree.query(&far).is_empty());
    assert!(tree.query_candidates(&far).is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_parallel_inserts() {
    let tree = Octree::new(Aabb::cube(20.0), 4);
    let points = random_points(5_000, 20.0, 16);
    points.par_iter().enumerate().for_each(|(i, p)| {
        assert!(tree.insert(i as u32, *p).unwrap());
    });
    assert_eq!(tree.count_points(), 5_000);
    assert_eq!(tree.query(&Aabb::cube(20.0)).len(), 5_000);
}

#[test]
fn test_parallel_updates_keep_every_entry() {
    let tree = Octree::new(Aabb::cube(20.0), 4);
    let start = random_points(3_000, 20.0, 17);
    let end = random_points(3_000, 20.0, 18);
    for (i, p) in start.iter().enumerate() {
        tree.insert(i as u32, *p).unwrap();
    }

    start.par_iter().zip(end.par_iter()).enumerate().for_each(|(i, (old, new))| {
        assert!(tree.update(i as u32, *old, *new).unwrap());
    });

    assert_eq!(tree.count_points(), 3_000);
    for (i, p) in end.iter().enumerate() {
        let hits = tree.query_sphere(*p, 0.0);
        assert!(hits.iter().any(|e| e.id == i as u32), "entry {i} lost");
    }
}

#[test]
fn test_parallel_remove_while_querying() {
    let tree = Octree::new(Aabb::cube(20.0), 4);
    let points = random_points(2_000, 20.0, 19);
    for (i, p) in points.iter().enumerate() {
        tree.insert(i as u32, *p).unwrap();
    }

    rayon::join(
        || {
            points.par_iter().enumerate().for_each(|(i, p)| {
                assert!(tree.remove(i as u32, *p));
            })
        },
        || {
            for p in points.iter().take(200) {
                let _ = tree.query_sphere(*p, 3.0);
            }
        },
    );

    assert!(tree.is_empty());
    assert_eq!(tree.count_nodes(), 1);
}
