//! Host versions of the steering and integration kernels.
//!
//! These mirror the WGSL in [`crate::shaders`] line for line and are what the
//! CPU backend runs. Both take the packed [`FlockUniforms`] so host and device
//! see exactly the same inputs.

use glam::Vec3;

use crate::agent::Agent;
use crate::params::FlockUniforms;

/// Pairs closer than this are treated as coincident and skipped by
/// separation.
pub const MIN_SEPARATION_DISTANCE: f32 = 0.0001;

/// Unit vector along `v`, or zero for a zero or NaN vector.
///
/// Infinite components dominate: `(-inf, 3, 0)` points along -X. Finite
/// vectors are scaled by their largest component first so huge inputs still
/// normalize.
pub fn direction_or_zero(v: Vec3) -> Vec3 {
    if v.is_nan() {
        return Vec3::ZERO;
    }
    if !v.is_finite() {
        let infinite = v.abs().cmpeq(Vec3::INFINITY);
        return Vec3::select(infinite, v.signum(), Vec3::ZERO).normalize();
    }
    let scale = v.abs().max_element();
    if scale == 0.0 {
        return Vec3::ZERO;
    }
    (v / scale).normalize()
}

/// Clamp a vector's length to `max`, keeping its direction.
///
/// An overflowed vector saturates to `max` along its infinite components.
/// NaN yields zero.
pub fn limit_length(v: Vec3, max: f32) -> Vec3 {
    if v.is_nan() {
        return Vec3::ZERO;
    }
    if !v.is_finite() {
        return direction_or_zero(v) * max;
    }
    let scale = v.abs().max_element();
    if scale == 0.0 {
        return v;
    }
    let unit = v / scale;
    let len = unit.length() * scale;
    if len > max {
        unit.normalize() * max
    } else {
        v
    }
}

/// Steering force for agent `index`, computed against a read-only snapshot
/// of every agent.
pub fn steer(index: usize, agents: &[Agent], u: &FlockUniforms) -> Vec3 {
    let me = agents[index];

    let mut cohesion_sum = Vec3::ZERO;
    let mut cohesion_count = 0u32;
    let mut alignment_sum = Vec3::ZERO;
    let mut alignment_count = 0u32;
    let mut separation_sum = Vec3::ZERO;

    for (j, other) in agents.iter().enumerate() {
        if j == index {
            continue;
        }
        let offset = me.position - other.position;
        let dist = offset.length();

        if dist < u.cohesion_radius {
            cohesion_sum += other.position;
            cohesion_count += 1;
        }
        if dist < u.alignment_radius {
            alignment_sum += other.velocity;
            alignment_count += 1;
        }
        if dist < u.separation_radius && dist > MIN_SEPARATION_DISTANCE {
            // Unit direction away from the neighbor, scaled by 1/dist
            separation_sum += offset / (dist * dist);
        }
    }

    let mut force = Vec3::ZERO;

    if cohesion_count > 0 {
        let center = cohesion_sum / cohesion_count as f32;
        force += direction_or_zero(center - me.position) * u.cohesion_weight;
    }
    if alignment_count > 0 {
        let heading = alignment_sum / alignment_count as f32;
        force += (heading - me.velocity) * u.alignment_weight;
    }
    force += separation_sum * u.separation_weight;

    force += bounds_force(me.position, u);

    if u.has_target != 0 {
        let target = Vec3::from_array(u.target_point);
        force += direction_or_zero(target - me.position) * u.target_weight;
    }

    if u.has_obstacle != 0 {
        let away = me.position - Vec3::from_array(u.obstacle_center);
        if away.length() < u.obstacle_radius {
            force += direction_or_zero(away) * u.obstacle_weight;
        }
    }

    limit_length(force, u.max_steering_force)
}

/// Pull back toward the bounds center once an agent leaves the box.
fn bounds_force(position: Vec3, u: &FlockUniforms) -> Vec3 {
    let center = Vec3::from_array(u.bounds_center);
    let extents = Vec3::from_array(u.bounds_extents);
    let outside = (position - center).abs().cmpgt(extents).any();
    if outside {
        direction_or_zero(center - position) * u.bounds_avoid_weight
    } else {
        Vec3::ZERO
    }
}

/// Advance one agent by a tick using its steering force.
pub fn integrate(agent: Agent, force: Vec3, u: &FlockUniforms) -> Agent {
    let velocity = limit_length(agent.velocity + force * u.delta_time, u.max_speed);
    let position = agent.position + velocity * u.delta_time;
    Agent { position, velocity }
}
