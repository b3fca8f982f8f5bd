//! Flock parameters.
//!
//! [`FlockParams`] holds every input the two kernels read. The owning
//! controller may change it between ticks; a tick always sees one consistent
//! copy, packed into [`FlockUniforms`] for the device.
//!
//! Parameters can be built in code:
//!
//! ```ignore
//! let params = FlockParams::new()
//!     .with_agent_count(2_000)
//!     .with_radii(4.0, 3.0, 1.5)
//!     .with_weights(1.0, 1.0, 1.5)
//!     .with_target(Vec3::new(0.0, 4.0, 0.0));
//! ```
//!
//! or loaded from JSON, where every missing field keeps its default:
//!
//! ```json
//! { "agent_count": 512, "max_speed": 8.0, "spawn_shape": "Box" }
//! ```

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{FlockError, Result};
use crate::spawn::SpawnShape;

/// Upper bound on the number of agents a flock may hold.
///
/// The steering pass is O(N²); past this the decorative effect costs more
/// than it is worth.
pub const MAX_AGENT_COUNT: u32 = 10_000;

/// Largest magnitude accepted for any steering weight.
///
/// A full neighborhood of separation pushes sums to at most
/// `MAX_AGENT_COUNT / MIN_SEPARATION_DISTANCE` before weighting, so weights
/// up to this bound keep every term finite.
pub const MAX_WEIGHT: f32 = 1.0e20;

/// Largest accepted `max_speed`.
pub const MAX_SPEED_LIMIT: f32 = 1.0e6;

/// Longest accepted tick, in seconds.
pub const MAX_DELTA_TIME: f32 = 1.0;

/// A spherical region agents are pushed out of.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub center: Vec3,
    pub radius: f32,
}

impl Obstacle {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Everything both compute passes read for a tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlockParams {
    pub agent_count: u32,
    pub spawn_shape: SpawnShape,
    /// Radius of the sphere agents are seeded in.
    pub birth_radius: f32,
    /// Fixed RNG seed for reproducible seeding. `None` seeds from the clock.
    pub seed: Option<u64>,

    pub cohesion_radius: f32,
    pub alignment_radius: f32,
    pub separation_radius: f32,
    pub cohesion_weight: f32,
    pub alignment_weight: f32,
    pub separation_weight: f32,

    pub max_speed: f32,
    pub max_steering_force: f32,

    pub bounds_center: Vec3,
    /// Full size of the simulation box (not half extents).
    pub bounds_size: Vec3,
    pub bounds_avoid_weight: f32,

    pub target: Option<Vec3>,
    pub target_weight: f32,
    pub obstacle: Option<Obstacle>,
    pub obstacle_weight: f32,

    /// Seconds advanced per tick.
    pub delta_time: f32,
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            agent_count: 1024,
            spawn_shape: SpawnShape::Box,
            birth_radius: 5.0,
            seed: None,
            cohesion_radius: 4.0,
            alignment_radius: 3.0,
            separation_radius: 1.5,
            cohesion_weight: 1.0,
            alignment_weight: 1.0,
            separation_weight: 1.5,
            max_speed: 5.0,
            max_steering_force: 2.0,
            bounds_center: Vec3::ZERO,
            bounds_size: Vec3::splat(32.0),
            bounds_avoid_weight: 2.0,
            target: None,
            target_weight: 1.0,
            obstacle: None,
            obstacle_weight: 10.0,
            delta_time: 1.0 / 60.0,
        }
    }
}

impl FlockParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse parameters from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read parameters from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_agent_count(mut self, count: u32) -> Self {
        self.agent_count = count;
        self
    }

    pub fn with_spawn_shape(mut self, shape: SpawnShape) -> Self {
        self.spawn_shape = shape;
        self
    }

    pub fn with_birth_radius(mut self, radius: f32) -> Self {
        self.birth_radius = radius;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set cohesion, alignment and separation radii.
    pub fn with_radii(mut self, cohesion: f32, alignment: f32, separation: f32) -> Self {
        self.cohesion_radius = cohesion;
        self.alignment_radius = alignment;
        self.separation_radius = separation;
        self
    }

    /// Set cohesion, alignment and separation weights.
    pub fn with_weights(mut self, cohesion: f32, alignment: f32, separation: f32) -> Self {
        self.cohesion_weight = cohesion;
        self.alignment_weight = alignment;
        self.separation_weight = separation;
        self
    }

    pub fn with_max_speed(mut self, speed: f32) -> Self {
        self.max_speed = speed;
        self
    }

    pub fn with_max_steering_force(mut self, force: f32) -> Self {
        self.max_steering_force = force;
        self
    }

    /// Set the simulation box by center and full size.
    pub fn with_bounds(mut self, center: Vec3, size: Vec3) -> Self {
        self.bounds_center = center;
        self.bounds_size = size;
        self
    }

    pub fn with_bounds_avoid_weight(mut self, weight: f32) -> Self {
        self.bounds_avoid_weight = weight;
        self
    }

    pub fn with_target(mut self, target: Vec3) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_target_weight(mut self, weight: f32) -> Self {
        self.target_weight = weight;
        self
    }

    pub fn with_obstacle(mut self, obstacle: Obstacle) -> Self {
        self.obstacle = Some(obstacle);
        self
    }

    pub fn with_obstacle_weight(mut self, weight: f32) -> Self {
        self.obstacle_weight = weight;
        self
    }

    pub fn with_delta_time(mut self, dt: f32) -> Self {
        self.delta_time = dt;
        self
    }

    /// Half the bounds size along each axis.
    #[inline]
    pub fn bounds_extents(&self) -> Vec3 {
        self.bounds_size * 0.5
    }

    /// Check every value the kernels depend on.
    ///
    /// An agent count of zero is not reported here; it surfaces as
    /// [`FlockError::DegenerateGroupSize`] when the dispatch is sized.
    pub fn validate(&self) -> Result<()> {
        if self.agent_count > MAX_AGENT_COUNT {
            return Err(FlockError::config(format!(
                "agent_count {} exceeds the maximum of {}",
                self.agent_count, MAX_AGENT_COUNT
            )));
        }

        let non_negative = [
            ("birth_radius", self.birth_radius),
            ("cohesion_radius", self.cohesion_radius),
            ("alignment_radius", self.alignment_radius),
            ("separation_radius", self.separation_radius),
            ("max_speed", self.max_speed),
            ("max_steering_force", self.max_steering_force),
            ("delta_time", self.delta_time),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(FlockError::config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        let weights = [
            ("cohesion_weight", self.cohesion_weight),
            ("alignment_weight", self.alignment_weight),
            ("separation_weight", self.separation_weight),
            ("bounds_avoid_weight", self.bounds_avoid_weight),
            ("target_weight", self.target_weight),
            ("obstacle_weight", self.obstacle_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value.abs() > MAX_WEIGHT {
                return Err(FlockError::config(format!(
                    "{name} must be finite and within ±{MAX_WEIGHT:e}, got {value}"
                )));
            }
        }

        if self.max_speed > MAX_SPEED_LIMIT {
            return Err(FlockError::config(format!(
                "max_speed must not exceed {MAX_SPEED_LIMIT:e}, got {}",
                self.max_speed
            )));
        }
        check_delta_time(self.delta_time)?;

        if !self.bounds_center.is_finite() {
            return Err(FlockError::config("bounds_center must be finite"));
        }
        if !self.bounds_size.is_finite() || self.bounds_size.min_element() < 0.0 {
            return Err(FlockError::config(
                "bounds_size must be finite and non-negative on every axis",
            ));
        }
        if let Some(target) = self.target {
            if !target.is_finite() {
                return Err(FlockError::config("target must be finite"));
            }
        }
        if let Some(obstacle) = self.obstacle {
            if !obstacle.center.is_finite() || !obstacle.radius.is_finite() || obstacle.radius < 0.0 {
                return Err(FlockError::config(
                    "obstacle needs a finite center and a finite, non-negative radius",
                ));
            }
        }
        self.spawn_shape.validate()?;

        Ok(())
    }

    /// Check a single parameter change on a copy, then apply it.
    pub(crate) fn try_update(&mut self, change: impl FnOnce(&mut FlockParams)) -> Result<()> {
        let mut next = self.clone();
        change(&mut next);
        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Pack into the uniform block the kernels read.
    pub fn to_uniforms(&self) -> FlockUniforms {
        let target = self.target.unwrap_or(Vec3::ZERO);
        let (obstacle_center, obstacle_radius) = self
            .obstacle
            .map(|o| (o.center, o.radius))
            .unwrap_or((Vec3::ZERO, 0.0));

        FlockUniforms {
            agent_count: self.agent_count,
            delta_time: self.delta_time,
            cohesion_radius: self.cohesion_radius,
            alignment_radius: self.alignment_radius,
            separation_radius: self.separation_radius,
            cohesion_weight: self.cohesion_weight,
            alignment_weight: self.alignment_weight,
            separation_weight: self.separation_weight,
            max_speed: self.max_speed,
            max_steering_force: self.max_steering_force,
            bounds_avoid_weight: self.bounds_avoid_weight,
            target_weight: self.target_weight,
            bounds_center: self.bounds_center.to_array(),
            has_target: self.target.is_some() as u32,
            bounds_extents: self.bounds_extents().to_array(),
            has_obstacle: self.obstacle.is_some() as u32,
            target_point: target.to_array(),
            obstacle_radius,
            obstacle_center: obstacle_center.to_array(),
            obstacle_weight: self.obstacle_weight,
        }
    }
}

/// A tick length must be finite, non-negative and at most [`MAX_DELTA_TIME`].
pub fn check_delta_time(dt: f32) -> Result<()> {
    if !dt.is_finite() || !(0.0..=MAX_DELTA_TIME).contains(&dt) {
        return Err(FlockError::config(format!(
            "delta time must be finite and within 0..={MAX_DELTA_TIME}, got {dt}"
        )));
    }
    Ok(())
}

/// Uniform block shared by both kernels.
///
/// Scalars come first; each vec3 is then paired with a trailing scalar so the
/// layout matches WGSL uniform rules without explicit padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct FlockUniforms {
    pub agent_count: u32,
    pub delta_time: f32,
    pub cohesion_radius: f32,
    pub alignment_radius: f32,
    pub separation_radius: f32,
    pub cohesion_weight: f32,
    pub alignment_weight: f32,
    pub separation_weight: f32,
    pub max_speed: f32,
    pub max_steering_force: f32,
    pub bounds_avoid_weight: f32,
    pub target_weight: f32,
    pub bounds_center: [f32; 3],
    pub has_target: u32,
    pub bounds_extents: [f32; 3],
    pub has_obstacle: u32,
    pub target_point: [f32; 3],
    pub obstacle_radius: f32,
    pub obstacle_center: [f32; 3],
    pub obstacle_weight: f32,
}

const _: () = assert!(
    std::mem::size_of::<FlockUniforms>() == 112,
    "size of FlockUniforms does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(FlockUniforms, bounds_center) == 48,
    "offset of FlockUniforms.bounds_center does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(FlockUniforms, obstacle_center) == 96,
    "offset of FlockUniforms.obstacle_center does not match WGSL"
);

/// WGSL definition matching [`FlockUniforms`].
pub const UNIFORMS_WGSL: &str = r#"struct Params {
    agent_count: u32,
    delta_time: f32,
    cohesion_radius: f32,
    alignment_radius: f32,
    separation_radius: f32,
    cohesion_weight: f32,
    alignment_weight: f32,
    separation_weight: f32,
    max_speed: f32,
    max_steering_force: f32,
    bounds_avoid_weight: f32,
    target_weight: f32,
    bounds_center: vec3<f32>,
    has_target: u32,
    bounds_extents: vec3<f32>,
    has_obstacle: u32,
    target_point: vec3<f32>,
    obstacle_radius: f32,
    obstacle_center: vec3<f32>,
    obstacle_weight: f32,
};"#;
