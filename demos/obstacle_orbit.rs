//! # Obstacle Orbit
//!
//! Moves the target and an obstacle between ticks, the way a host
//! application would drive them from scene objects.
//!
//! Run with: `RUST_LOG=info cargo run --example obstacle_orbit --release`

use shoal::prelude::*;

const TICKS: u32 = 900;
const ORBIT_RADIUS: f32 = 10.0;

fn main() -> shoal::Result<()> {
    env_logger::init();

    let params = FlockParams::new()
        .with_agent_count(1024)
        .with_spawn_shape(SpawnShape::Target {
            point: Vec3::new(0.0, 0.0, 8.0),
        })
        .with_target_weight(1.5)
        .with_obstacle(Obstacle::new(Vec3::ZERO, 4.0))
        .with_obstacle_weight(12.0);

    let mut flock = FlockController::auto(params)?;
    let mut clock = TickClock::new().with_fixed_delta(1.0 / 60.0);

    for tick in 0..TICKS {
        let angle = tick as f32 * 0.01;
        let orbit = Vec3::new(angle.cos(), 0.0, angle.sin()) * ORBIT_RADIUS;

        // Target leads the obstacle by a quarter turn.
        flock.set_target(Vec3::new(-orbit.z, 2.0, orbit.x))?;
        flock.move_obstacle(orbit)?;
        flock.tick(clock.advance())?;

        if tick % 150 == 0 {
            let snapshot = flock.read_published()?;
            let inside = snapshot
                .positions()
                .iter()
                .filter(|p| p.distance(orbit) < 4.0)
                .count();
            println!(
                "tick {:>4}: centroid {:?}, {} agents inside the obstacle",
                tick,
                snapshot.centroid(),
                inside
            );
        }
    }

    if any_out_of_bounds(&flock)? {
        log::warn!("some agents ended outside the bounds");
    }
    Ok(())
}

fn any_out_of_bounds<B: FlockBackend>(flock: &FlockController<B>) -> shoal::Result<bool> {
    let view = flock.render_view();
    let half = view.bounds_size * 0.5;
    let snapshot = flock.read_published()?;
    Ok(snapshot
        .positions()
        .iter()
        .any(|p| (*p - view.bounds_center).abs().cmpgt(half).any()))
}
