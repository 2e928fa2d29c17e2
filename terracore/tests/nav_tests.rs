//! Planning and smoothing scenarios, from the single-chunk fast path up to
//! multi-chunk windows and the structured failure cases.

use glam::Vec3;
use terracore::errors::{PathEnd, PlanError};
use terracore::nav::{smoother, WindowPlanner};
use terracore::terrain::{ChunkedWorld, HeightField};

const CHUNK_SIZE: f32 = 64.0;

fn flat_chunk(world: &ChunkedWorld, ix: i32, iz: i32, res: usize) -> HeightField {
    let (ox, oz) = world.slot_origin(ix, iz);
    HeightField::from_parts(
        vec![0.0; res * res],
        vec![255; res * res],
        res as u32,
        res as u32,
        world.chunk_size(),
        ox,
        oz,
    )
    .unwrap()
}

/// One 64 m chunk centered on the origin, fully walkable.
fn open_world() -> ChunkedWorld {
    let mut world = ChunkedWorld::new(1, 1, CHUNK_SIZE, -32.0, -32.0);
    let chunk = flat_chunk(&world, 0, 0, 128);
    world.insert_chunk(0, 0, chunk);
    world
}

/// One 64 m chunk with a wall across x in [-1, 1], except a gap at
/// z in [5, 7].
fn walled_world() -> ChunkedWorld {
    let mut world = ChunkedWorld::new(1, 1, CHUNK_SIZE, -32.0, -32.0);
    let res = 128usize;
    let mut mask = vec![255u8; res * res];
    for tz in 0..res {
        let z = -32.0 + tz as f32 / (res - 1) as f32 * CHUNK_SIZE;
        if (5.0..=7.0).contains(&z) {
            continue;
        }
        for tx in 0..res {
            let x = -32.0 + tx as f32 / (res - 1) as f32 * CHUNK_SIZE;
            if (-1.0..=1.0).contains(&x) {
                mask[tz * res + tx] = 0;
            }
        }
    }
    let chunk = HeightField::from_parts(
        vec![0.0; res * res],
        mask,
        res as u32,
        res as u32,
        CHUNK_SIZE,
        -32.0,
        -32.0,
    )
    .unwrap();
    world.insert_chunk(0, 0, chunk);
    world
}

// ---------------------------------------------------------------------------
// S1: clear straight line, same chunk
// ---------------------------------------------------------------------------

#[test]
fn clear_line_uses_the_two_waypoint_fast_path() {
    let world = open_world();
    let mut planner = WindowPlanner::new();
    let start = Vec3::new(-20.0, 0.0, -10.0);
    let goal = Vec3::new(20.0, 0.0, 10.0);

    let path = planner.find_path(&world, start, goal).unwrap();
    assert_eq!(path.waypoints, vec![start, goal]);

    let smoothed = smoother::smooth(&world, &path);
    assert_eq!(smoothed.waypoints.len(), 2);
    assert!((path.length() - start.distance(goal)).abs() < 1e-4);
}

#[test]
fn start_equals_goal_yields_two_identical_waypoints() {
    let world = open_world();
    let mut planner = WindowPlanner::new();
    let p = Vec3::new(3.0, 0.0, -4.0);
    let path = planner.find_path(&world, p, p).unwrap();
    assert_eq!(path.waypoints, vec![p, p]);
}

// ---------------------------------------------------------------------------
// S2: wall detour through the gap
// ---------------------------------------------------------------------------

#[test]
fn wall_detour_routes_through_the_gap_and_stays_walkable() {
    let world = walled_world();
    let mut planner = WindowPlanner::new();
    let start = Vec3::new(-10.0, 0.0, 0.0);
    let goal = Vec3::new(10.0, 0.0, 0.0);

    let raw = planner.find_path(&world, start, goal).unwrap();
    assert!(raw.waypoints.len() > 2, "the wall must force a detour");
    let smoothed = smoother::smooth(&world, &raw);

    // Smoother correctness: every remaining segment survives the 0.2 m
    // raymarch on the full-resolution walkmask.
    for pair in smoothed.waypoints.windows(2) {
        assert!(
            smoother::segment_walkable(&world, pair[0], pair[1]),
            "unwalkable segment {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }

    // The smoother never lengthens the path.
    assert!(smoothed.length() <= raw.length() + 1e-4);

    // Wherever the route passes through the wall band, it does so inside
    // the gap.
    let mut crossed = false;
    for pair in smoothed.waypoints.windows(2) {
        let steps = 200;
        for s in 0..=steps {
            let p = pair[0].lerp(pair[1], s as f32 / steps as f32);
            if (-1.0..=1.0).contains(&p.x) {
                crossed = true;
                assert!(
                    (4.8..=7.3).contains(&p.z),
                    "crossed the wall outside the gap at {p:?}"
                );
            }
        }
    }
    assert!(crossed, "path never crossed the wall band");

    assert_eq!(*smoothed.waypoints.first().unwrap(), start);
    assert_eq!(*smoothed.waypoints.last().unwrap(), goal);
}

#[test]
fn identical_queries_return_identical_paths() {
    let world = walled_world();
    let mut planner = WindowPlanner::new();
    let start = Vec3::new(-10.0, 0.0, 0.0);
    let goal = Vec3::new(10.0, 0.0, 0.0);

    let first = planner.find_path(&world, start, goal).unwrap();
    let second = planner.find_path(&world, start, goal).unwrap();
    assert_eq!(first, second);
}

// ---------------------------------------------------------------------------
// S3: multi-chunk window
// ---------------------------------------------------------------------------

#[test]
fn multi_chunk_diagonal_plans_and_collapses_to_a_straight_line() {
    let mut world = ChunkedWorld::new(3, 3, CHUNK_SIZE, -96.0, -96.0);
    for iz in 0..3 {
        for ix in 0..3 {
            let chunk = flat_chunk(&world, ix, iz, 64);
            world.insert_chunk(ix, iz, chunk);
        }
    }
    let mut planner = WindowPlanner::new();
    let start = Vec3::new(-90.0, 0.0, -90.0);
    let goal = Vec3::new(90.0, 0.0, 90.0);

    let raw = planner.find_path(&world, start, goal).unwrap();
    assert_eq!(*raw.waypoints.first().unwrap(), start);
    assert_eq!(*raw.waypoints.last().unwrap(), goal);

    let smoothed = smoother::smooth(&world, &raw);
    assert_eq!(smoothed.waypoints.len(), 2);
    assert!((smoothed.length() - start.distance(goal)).abs() < 1e-3);
}

#[test]
fn endpoints_farther_than_the_window_cap_fail() {
    let mut world = ChunkedWorld::new(5, 1, CHUNK_SIZE, -160.0, -32.0);
    for ix in 0..5 {
        let chunk = flat_chunk(&world, ix, 0, 64);
        world.insert_chunk(ix, 0, chunk);
    }
    let mut planner = WindowPlanner::new();
    let result = planner.find_path(
        &world,
        Vec3::new(-150.0, 0.0, 0.0),
        Vec3::new(150.0, 0.0, 0.0),
    );
    assert_eq!(result.unwrap_err(), PlanError::NoRoute);
}

// ---------------------------------------------------------------------------
// S4 and friends: structured failures
// ---------------------------------------------------------------------------

#[test]
fn blocked_start_is_reported_as_such() {
    let mut world = ChunkedWorld::new(1, 1, CHUNK_SIZE, -32.0, -32.0);
    let res = 128usize;
    let mut mask = vec![255u8; res * res];
    // Blank out the texels around the start position (-20, -10).
    for tz in 0..res {
        let z = -32.0 + tz as f32 / (res - 1) as f32 * CHUNK_SIZE;
        for tx in 0..res {
            let x = -32.0 + tx as f32 / (res - 1) as f32 * CHUNK_SIZE;
            if (x + 20.0).abs() < 1.5 && (z + 10.0).abs() < 1.5 {
                mask[tz * res + tx] = 0;
            }
        }
    }
    let chunk = HeightField::from_parts(
        vec![0.0; res * res],
        mask,
        res as u32,
        res as u32,
        CHUNK_SIZE,
        -32.0,
        -32.0,
    )
    .unwrap();
    world.insert_chunk(0, 0, chunk);

    let mut planner = WindowPlanner::new();
    let result = planner.find_path(
        &world,
        Vec3::new(-20.0, 0.0, -10.0),
        Vec3::new(20.0, 0.0, 10.0),
    );
    assert_eq!(result.unwrap_err(), PlanError::Blocked(PathEnd::Start));

    // Same world, swapped ends: the goal is the blocked one now.
    let result = planner.find_path(
        &world,
        Vec3::new(20.0, 0.0, 10.0),
        Vec3::new(-20.0, 0.0, -10.0),
    );
    assert_eq!(result.unwrap_err(), PlanError::Blocked(PathEnd::Goal));
}

#[test]
fn goal_in_a_hole_chunk_is_blocked() {
    let mut world = ChunkedWorld::new(2, 1, CHUNK_SIZE, -64.0, -32.0);
    let chunk = flat_chunk(&world, 0, 0, 64);
    world.insert_chunk(0, 0, chunk);

    let mut planner = WindowPlanner::new();
    let result = planner.find_path(
        &world,
        Vec3::new(-32.0, 0.0, 0.0),
        Vec3::new(32.0, 0.0, 0.0),
    );
    assert_eq!(result.unwrap_err(), PlanError::Blocked(PathEnd::Goal));
}

#[test]
fn hole_chunk_in_the_middle_blocks_the_route() {
    let mut world = ChunkedWorld::new(3, 1, CHUNK_SIZE, -96.0, -32.0);
    for ix in [0, 2] {
        let chunk = flat_chunk(&world, ix, 0, 64);
        world.insert_chunk(ix, 0, chunk);
    }
    let mut planner = WindowPlanner::new();
    let result = planner.find_path(
        &world,
        Vec3::new(-64.0, 0.0, 0.0),
        Vec3::new(64.0, 0.0, 0.0),
    );
    assert_eq!(result.unwrap_err(), PlanError::NoRoute);
}

// ---------------------------------------------------------------------------
// Convenience wrapper
// ---------------------------------------------------------------------------

#[test]
fn find_smoothed_path_matches_manual_composition() {
    let world = walled_world();
    let mut planner = WindowPlanner::new();
    let start = Vec3::new(-10.0, 0.0, 0.0);
    let goal = Vec3::new(10.0, 0.0, 0.0);

    let manual = smoother::smooth(&world, &planner.find_path(&world, start, goal).unwrap());
    let combined = planner.find_smoothed_path(&world, start, goal).unwrap();
    assert_eq!(manual, combined);
}
