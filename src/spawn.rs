//! Initial agent distribution.
//!
//! Two shapes are supported:
//!
//! - [`SpawnShape::Box`]: agents start in a sphere pushed back by half the
//!   bounds depth, all swimming forward along +Z.
//! - [`SpawnShape::Target`]: agents start in a sphere around the origin, each
//!   heading toward a fixed point.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::agent::{Agent, AgentStore};
use crate::error::{FlockError, Result};
use crate::params::FlockParams;

/// Direction every agent swims in when seeded with [`SpawnShape::Box`].
pub const BOX_FORWARD: Vec3 = Vec3::Z;

/// How agents are laid out when a flock is (re)initialized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum SpawnShape {
    #[default]
    Box,
    Target { point: Vec3 },
}

impl SpawnShape {
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            SpawnShape::Box => Ok(()),
            SpawnShape::Target { point } if point.is_finite() => Ok(()),
            SpawnShape::Target { .. } => Err(FlockError::config("spawn target point must be finite")),
        }
    }
}

/// Random helpers for seeding, one RNG shared across every slot.
pub struct SpawnContext {
    rng: SmallRng,
}

impl Default for SpawnContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SpawnContext {
    /// Seed from the clock so each run differs.
    pub fn new() -> Self {
        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42);
        Self::with_seed(seed)
    }

    /// Reproducible seeding.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Random point inside a sphere of given radius, centered at origin.
    ///
    /// Distribution is uniform throughout the volume.
    pub fn random_in_sphere(&mut self, radius: f32) -> Vec3 {
        if radius <= 0.0 {
            return Vec3::ZERO;
        }
        let theta = self.rng.gen_range(0.0..TAU);
        // Uniform in cos(phi), otherwise points bunch at the poles
        let cos_phi: f32 = self.rng.gen_range(-1.0..=1.0);
        let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
        let r = radius * self.rng.gen::<f32>().cbrt();

        Vec3::new(
            r * sin_phi * theta.cos(),
            r * sin_phi * theta.sin(),
            r * cos_phi,
        )
    }
}

/// Seed one agent for the given shape.
pub fn seed_agent(ctx: &mut SpawnContext, params: &FlockParams) -> Agent {
    match params.spawn_shape {
        SpawnShape::Box => {
            let back = Vec3::new(0.0, 0.0, -params.bounds_size.z * 0.5);
            Agent::new(ctx.random_in_sphere(params.birth_radius) + back, BOX_FORWARD)
        }
        SpawnShape::Target { point } => {
            let position = ctx.random_in_sphere(params.birth_radius);
            Agent::new(position, point - position)
        }
    }
}

/// Build a freshly seeded store of exactly `params.agent_count` agents.
pub fn seed_store(params: &FlockParams) -> AgentStore {
    let count = params.agent_count;
    let mut ctx = match params.seed {
        Some(seed) => SpawnContext::with_seed(seed),
        None => SpawnContext::new(),
    };
    let agents = (0..count).map(|_| seed_agent(&mut ctx, params)).collect();
    AgentStore::from_agents(agents)
}
