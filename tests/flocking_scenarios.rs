//! End-to-end flocking scenarios on the host backend.
//!
//! These drive [`FlockController`] exactly as an application would and check
//! the observable guarantees: fixed population, clamps, dispatch coverage,
//! seeding and initialization failures.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec3;
use shoal::cpu::run_grouped;
use shoal::prelude::*;
use shoal::{Agent, AgentStore, DispatchSize};

const DT: f32 = 1.0 / 60.0;
const EPS: f32 = 1e-4;

fn params(count: u32) -> FlockParams {
    FlockParams::new().with_agent_count(count).with_seed(42)
}

// ============================================================================
// Population
// ============================================================================

#[test]
fn test_agent_count_never_changes() {
    let mut flock = FlockController::cpu(params(300).with_target(Vec3::Y)).unwrap();
    for _ in 0..50 {
        flock.tick(DT).unwrap();
        assert_eq!(flock.backend().store().unwrap().len(), 300);
        assert_eq!(flock.read_published().unwrap().len(), 300);
    }
    assert_eq!(flock.ticks(), 50);
}

#[test]
fn test_default_flock_stays_finite() {
    let mut flock = FlockController::cpu(
        params(500)
            .with_target(Vec3::new(3.0, 1.0, 0.0))
            .with_obstacle(Obstacle::new(Vec3::new(0.0, 0.0, -10.0), 4.0)),
    )
    .unwrap();
    for _ in 0..120 {
        flock.tick(DT).unwrap();
    }
    assert!(flock.backend().store().unwrap().all_finite());
    assert!(flock.read_published().unwrap().all_finite());
}

// ============================================================================
// Zero-force case
// ============================================================================

#[test]
fn test_zero_force_moves_linearly() {
    let quiet = params(64)
        .with_weights(0.0, 0.0, 0.0)
        .with_bounds_avoid_weight(0.0)
        .with_max_speed(5.0);
    let mut flock = FlockController::cpu(quiet).unwrap();
    let start = flock.read_published().unwrap();

    let ticks = 10;
    for _ in 0..ticks {
        flock.tick(DT).unwrap();
    }
    let end = flock.read_published().unwrap();

    for i in 0..start.len() {
        assert_eq!(end.velocities()[i], start.velocities()[i]);
        let expected = start.positions()[i] + start.velocities()[i] * DT * ticks as f32;
        assert!(
            end.positions()[i].abs_diff_eq(expected, EPS),
            "agent {i}: {:?} vs {:?}",
            end.positions()[i],
            expected
        );
    }
}

#[test]
fn test_zero_force_with_zero_delta_holds_still() {
    let mut flock = FlockController::cpu(params(32).with_weights(0.0, 0.0, 0.0)).unwrap();
    let start = flock.read_published().unwrap();
    flock.tick(0.0).unwrap();
    assert_eq!(flock.read_published().unwrap().positions(), start.positions());
}

// ============================================================================
// Clamps
// ============================================================================

#[test]
fn test_forces_never_exceed_max_steering_force() {
    let max_force = 0.75;
    let mut flock = FlockController::cpu(
        params(200)
            .with_weights(50.0, 50.0, 50.0)
            .with_max_steering_force(max_force)
            .with_target(Vec3::new(0.0, 20.0, 0.0))
            .with_target_weight(100.0),
    )
    .unwrap();

    for _ in 0..5 {
        flock.tick(DT).unwrap();
        let forces = flock.backend().forces().unwrap();
        assert!(forces.iter().all(|f| f.length() <= max_force + EPS));
    }
}

#[test]
fn test_saturated_force_keeps_direction() {
    let max_force = 0.75;
    let target = Vec3::new(0.0, 20.0, 0.0);
    let mut flock = FlockController::cpu(
        params(50)
            .with_weights(0.0, 0.0, 0.0)
            .with_bounds_avoid_weight(0.0)
            .with_max_steering_force(max_force)
            .with_target(target)
            .with_target_weight(100.0),
    )
    .unwrap();
    let start = flock.read_published().unwrap();
    flock.tick(DT).unwrap();

    let forces = flock.backend().forces().unwrap();
    for (force, position) in forces.iter().zip(start.positions()) {
        assert!((force.length() - max_force).abs() < EPS);
        let expected = (target - *position).normalize();
        assert!(force.normalize().abs_diff_eq(expected, EPS));
    }
}

#[test]
fn test_velocity_clamped_to_max_speed() {
    let max_speed = 0.5;
    let mut flock = FlockController::cpu(
        params(100)
            .with_max_speed(max_speed)
            .with_max_steering_force(1000.0)
            .with_target(Vec3::new(100.0, 0.0, 0.0))
            .with_target_weight(1000.0),
    )
    .unwrap();

    for _ in 0..10 {
        flock.tick(DT).unwrap();
        let snapshot = flock.read_published().unwrap();
        assert!(snapshot.max_speed() <= max_speed + EPS);
    }
    let snapshot = flock.read_published().unwrap();
    for v in snapshot.velocities() {
        assert!((v.length() - max_speed).abs() < EPS);
        assert!(v.normalize().x > 0.5);
    }
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_uneven_dispatch_covers_every_agent_once() {
    let dispatch = DispatchSize::new(1000, 64).unwrap();
    assert_eq!(dispatch.groups(), 16);
    assert_eq!(dispatch.invocations(), 1024);

    let mut hits = vec![0u32; 1000];
    let total = AtomicU32::new(0);
    run_grouped(&dispatch, &mut hits, |_, slot| {
        *slot += 1;
        total.fetch_add(1, Ordering::Relaxed);
    });
    assert!(hits.iter().all(|&h| h == 1));
    assert_eq!(total.load(Ordering::Relaxed), 1000);
}

#[test]
fn test_uneven_dispatch_through_controller() {
    let mut flock = FlockController::new(params(1000), CpuBackend::with_group_size(64)).unwrap();
    assert_eq!(flock.dispatch().unwrap().groups(), 16);
    flock.tick(DT).unwrap();
    assert_eq!(flock.read_published().unwrap().len(), 1000);
    assert_eq!(flock.backend().forces().unwrap().len(), 1000);
}

// ============================================================================
// Seeding
// ============================================================================

#[test]
fn test_box_seeding_scenario() {
    let flock = FlockController::cpu(
        params(1000)
            .with_spawn_shape(SpawnShape::Box)
            .with_birth_radius(5.0)
            .with_bounds(Vec3::ZERO, Vec3::new(32.0, 32.0, 32.0)),
    )
    .unwrap();
    let snapshot = flock.read_published().unwrap();
    let origin = Vec3::new(0.0, 0.0, -16.0);
    for (p, v) in snapshot.positions().iter().zip(snapshot.velocities()) {
        assert!(p.distance(origin) <= 5.0 + EPS);
        assert_eq!(*v, Vec3::new(0.0, 0.0, 1.0));
    }
}

#[test]
fn test_seeded_flocks_are_reproducible() {
    let a = FlockController::cpu(params(64)).unwrap();
    let b = FlockController::cpu(params(64)).unwrap();
    assert_eq!(a.read_published().unwrap(), b.read_published().unwrap());
}

// ============================================================================
// Neighbor rules
// ============================================================================

#[test]
fn test_separation_only_pushes_away() {
    let store = AgentStore::from_agents(vec![
        Agent::new(Vec3::ZERO, Vec3::ZERO),
        Agent::new(Vec3::X, Vec3::ZERO),
    ]);
    let u = FlockParams::new()
        .with_agent_count(2)
        .with_radii(0.0, 0.0, 2.0)
        .with_weights(1.0, 1.0, 1.0)
        .to_uniforms();

    let mut backend = CpuBackend::with_group_size(1);
    backend.allocate(&store, DispatchSize::new(2, 1).unwrap()).unwrap();
    backend.step(&u).unwrap();

    let forces = backend.forces().unwrap();
    assert!(forces[0].abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), EPS));
    assert!(forces[1].abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), EPS));
}

#[test]
fn test_coincident_agents_stay_finite() {
    let store = AgentStore::from_agents(vec![Agent::new(Vec3::ONE, Vec3::ZERO); 8]);
    let u = FlockParams::new().with_agent_count(8).to_uniforms();

    let mut backend = CpuBackend::new();
    backend.allocate(&store, DispatchSize::new(8, 64).unwrap()).unwrap();
    backend.step(&u).unwrap();
    assert!(backend.store().unwrap().all_finite());
}

// ============================================================================
// Initialization failures
// ============================================================================

#[test]
fn test_zero_agents_is_degenerate() {
    let result = FlockController::cpu(params(0));
    assert!(matches!(
        result,
        Err(FlockError::DegenerateGroupSize { agent_count: 0, .. })
    ));
}

#[test]
fn test_zero_group_size_is_degenerate() {
    let result = FlockController::new(params(10), CpuBackend::with_group_size(0));
    assert!(matches!(
        result,
        Err(FlockError::DegenerateGroupSize { group_size: 0, .. })
    ));
}

#[test]
fn test_too_many_agents_is_configuration_error() {
    let result = FlockController::cpu(params(shoal::MAX_AGENT_COUNT + 1));
    assert!(matches!(result, Err(FlockError::Configuration(_))));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_double_release_is_harmless() {
    let mut flock = FlockController::cpu(params(16)).unwrap();
    flock.release();
    flock.release();
    assert!(!flock.is_active());
    assert!(matches!(flock.tick(DT), Err(FlockError::NotAllocated)));
}

#[test]
fn test_resize_then_tick() {
    let mut flock = FlockController::cpu(params(16)).unwrap();
    flock.tick(DT).unwrap();
    flock.resize(40).unwrap();
    flock.tick(DT).unwrap();
    assert_eq!(flock.render_view().particle_count, 40);
    assert_eq!(flock.read_published().unwrap().len(), 40);
}

#[test]
fn test_missing_target_and_obstacle_contribute_nothing() {
    let base = params(50).with_weights(0.0, 0.0, 0.0).with_bounds_avoid_weight(0.0);
    let mut flock = FlockController::cpu(base).unwrap();
    flock.tick(DT).unwrap();
    assert!(flock
        .backend()
        .forces()
        .unwrap()
        .iter()
        .all(|f| *f == Vec3::ZERO));
}

#[test]
fn test_config_round_trips_through_json() {
    let original = params(128)
        .with_target(Vec3::new(1.0, 2.0, 3.0))
        .with_obstacle(Obstacle::new(Vec3::Z, 2.5));
    let json = original.to_json_string().unwrap();
    let loaded = FlockParams::from_json_str(&json).unwrap();
    assert_eq!(loaded, original);
    assert!(FlockController::cpu(loaded).is_ok());
}
