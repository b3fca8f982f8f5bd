//! # Shoal
//!
//! GPU-accelerated boid flocking with a small, declarative setup API.
//!
//! Shoal owns a fixed-size population of agents and advances it one tick at a
//! time with two compute passes: a steering pass that turns each agent's
//! neighborhood into a clamped force, and an integration pass that applies
//! the force, clamps speed and publishes positions and velocities for a
//! renderer to bind.
//!
//! ## Quick Start
//!
//! ```ignore
//! use shoal::prelude::*;
//!
//! fn main() -> shoal::Result<()> {
//!     let params = FlockParams::new()
//!         .with_agent_count(2048)
//!         .with_bounds(Vec3::ZERO, Vec3::splat(32.0))
//!         .with_target(Vec3::new(0.0, 4.0, 0.0));
//!
//!     let mut flock = FlockController::auto(params)?;
//!     let mut clock = TickClock::new().with_fixed_delta(1.0 / 60.0);
//!     for _ in 0..600 {
//!         flock.tick(clock.advance())?;
//!     }
//!     let snapshot = flock.read_published()?;
//!     println!("centroid {:?}", snapshot.centroid());
//!     Ok(())
//! }
//! ```
//!
//! ## Backends
//!
//! | Backend | Runs on | Notes |
//! |---------|---------|-------|
//! | [`GpuBackend`] | wgpu compute | Published buffers are bindable as vertex input |
//! | [`CpuBackend`] | rayon | Same dispatch geometry, usable without a device |
//!
//! Both implement [`FlockBackend`], so [`FlockController`] drives either one.
//!
//! ## Steering
//!
//! Every term is weighted, summed and then clamped to `max_steering_force`:
//!
//! - cohesion toward the neighbor centroid
//! - alignment with the neighbors' mean velocity
//! - separation by inverse-square distance
//! - a push back toward the bounds center once outside the box
//! - optional seek toward a target point
//! - optional flee from inside an obstacle sphere

pub mod agent;
pub mod backend;
pub mod controller;
pub mod cpu;
pub mod dispatch;
pub mod error;
pub mod gpu;
pub mod kernels;
pub mod params;
pub mod published;
pub mod shaders;
pub mod spawn;
pub mod time;

pub use bytemuck;
pub use glam::{Vec3, Vec4};

pub use agent::{Agent, AgentStore};
pub use backend::FlockBackend;
pub use controller::FlockController;
pub use cpu::CpuBackend;
pub use dispatch::DispatchSize;
pub use error::{FlockError, Result};
pub use gpu::{GpuBackend, GpuContext};
pub use params::{FlockParams, Obstacle, MAX_AGENT_COUNT};
pub use published::{PublishedSnapshot, RenderView};
pub use spawn::SpawnShape;
pub use time::TickClock;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use shoal::prelude::*;
/// ```
pub mod prelude {
    pub use crate::backend::FlockBackend;
    pub use crate::controller::FlockController;
    pub use crate::cpu::CpuBackend;
    pub use crate::error::FlockError;
    pub use crate::gpu::GpuBackend;
    pub use crate::params::{FlockParams, Obstacle};
    pub use crate::published::{PublishedSnapshot, RenderView};
    pub use crate::spawn::SpawnShape;
    pub use crate::time::TickClock;
    pub use crate::{Vec3, Vec4};
}
