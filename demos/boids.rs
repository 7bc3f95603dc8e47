//! # Headless Boids
//!
//! Runs a flock for a few simulated seconds and prints neighborhood
//! statistics and the index shape as it goes.
//!
//! Run with: `cargo run --example boids --release -- [count] [config.json]`
//!
//! Set `RUST_LOG=octoflock=debug` to see per-tick logging.

use octoflock::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let count: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(5_000);
    let config = match args.next() {
        Some(path) => FlockConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => FlockConfig::default(),
    }
    .with_agent_count(count);

    println!("=== octoflock boids ===");
    println!("Boids: {}", count);
    println!("World: {:?}", config.world_bounds);
    println!();

    let spawn_region = Aabb::from_center_size(config.world_bounds.center(), config.world_bounds.size() * 0.5);
    let mut flock = Flock::from_seed(config, spawn_region, 0x5eed)?;

    // Pretend to render at a jittery ~45 fps for ten seconds
    let frames = [1.0 / 40.0, 1.0 / 50.0, 1.0 / 45.0];
    let mut last_report = 0;
    for frame in 0..450 {
        flock.advance(frames[frame % frames.len()])?;

        let ticks = flock.ticks();
        if ticks / 60 != last_report / 60 {
            last_report = ticks;
            let speed = flock.velocities().map(|v| v.length()).sum::<f32>() / flock.len() as f32;
            println!(
                "t={:>5.2}s  ticks={:<5} nodes={:<6} depth={:<2} mean speed={:.2}",
                flock.clock().elapsed(),
                ticks,
                flock.index().count_nodes(),
                flock.index().depth(),
                speed,
            );
        }
    }

    Ok(())
}
