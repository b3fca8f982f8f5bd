//! # Headless Flock
//!
//! Runs a flock without a window and logs where it goes.
//! Uses the GPU when one is available and falls back to the CPU otherwise.
//!
//! Run with: `RUST_LOG=info cargo run --example headless --release [params.json] [ticks]`
//!
//! The optional JSON file holds any subset of `FlockParams` fields, e.g.
//! `{ "agent_count": 4096, "target": [0.0, 6.0, 0.0] }`.

use shoal::prelude::*;

fn main() -> shoal::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let params = match args.next() {
        Some(path) => FlockParams::load(&path)?,
        None => FlockParams::new()
            .with_agent_count(2048)
            .with_target(Vec3::new(0.0, 6.0, 0.0)),
    };
    let ticks: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(600);

    println!("=== Shoal Headless ===");
    println!("Agents: {}", params.agent_count);
    println!("Ticks: {}", ticks);

    let mut flock = FlockController::auto(params)?;
    let mut clock = TickClock::new().with_fixed_delta(1.0 / 60.0);
    println!("Backend: {}", flock.backend().name());
    println!();

    let started = std::time::Instant::now();
    for _ in 0..ticks {
        flock.tick(clock.advance())?;

        if clock.ticks() % 120 == 0 {
            let snapshot = flock.read_published()?;
            log::info!(
                "t={:>6.2}s centroid={:?} mean speed={:.3} max speed={:.3}",
                clock.simulated(),
                snapshot.centroid(),
                snapshot.mean_speed(),
                snapshot.max_speed()
            );
        }
    }

    let snapshot = flock.read_published()?;
    let elapsed = started.elapsed();
    println!(
        "{} ticks in {:.2?} ({:.1} ticks/s)",
        ticks,
        elapsed,
        ticks as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );
    println!("Final centroid: {:?}", snapshot.centroid());
    println!("Finite: {}", snapshot.all_finite());

    flock.release();
    Ok(())
}
