//! WGSL for the two flock passes.
//!
//! The workgroup size is only known once the device has been queried, so the
//! sources are generated rather than loaded from disk. Both kernels return
//! early for invocations past `agent_count`.
//!
//! Bindings, group 0:
//!
//! | Pass      | 0        | 1                  | 2                 | 3                    | 4                     |
//! |-----------|----------|--------------------|-------------------|----------------------|-----------------------|
//! | steer     | `params` | `agents` (read)    | `forces` (write)  |                      |                       |
//! | integrate | `params` | `agents` (rw)      | `forces` (read)   | `out_positions` (rw) | `out_velocities` (rw) |

use crate::agent::AGENT_WGSL;
use crate::params::UNIFORMS_WGSL;

pub const STEER_ENTRY: &str = "steer";
pub const INTEGRATE_ENTRY: &str = "integrate";

const LIMIT_LENGTH_WGSL: &str = r#"
const MIN_SEPARATION_DISTANCE: f32 = 0.0001;
const INF_BITS: u32 = 0x7f800000u;

// Bit tests: the compiler may assume floats are finite, so isnan-style
// comparisons can be folded away.
fn magnitude_bits(v: vec3<f32>) -> vec3<u32> {
    return bitcast<vec3<u32>>(v) & vec3<u32>(0x7fffffffu);
}

fn has_nan(v: vec3<f32>) -> bool {
    return any(magnitude_bits(v) > vec3<u32>(INF_BITS));
}

fn infinite_mask(v: vec3<f32>) -> vec3<bool> {
    return magnitude_bits(v) == vec3<u32>(INF_BITS);
}

// Unit vector along the infinite components of an overflowed vector
fn overflow_direction(v: vec3<f32>) -> vec3<f32> {
    let negative = (bitcast<vec3<u32>>(v) & vec3<u32>(0x80000000u)) != vec3<u32>(0u);
    let signs = select(vec3<f32>(1.0), vec3<f32>(-1.0), negative);
    return normalize(select(vec3<f32>(0.0), signs, infinite_mask(v)));
}

fn direction_or_zero(v: vec3<f32>) -> vec3<f32> {
    if has_nan(v) {
        return vec3<f32>(0.0);
    }
    if any(infinite_mask(v)) {
        return overflow_direction(v);
    }
    let a = abs(v);
    let scale = max(a.x, max(a.y, a.z));
    if scale == 0.0 {
        return vec3<f32>(0.0);
    }
    return normalize(v / scale);
}

// Clamp length without overflowing on huge vectors
fn limit_length(v: vec3<f32>, max_len: f32) -> vec3<f32> {
    if has_nan(v) {
        return vec3<f32>(0.0);
    }
    if any(infinite_mask(v)) {
        return overflow_direction(v) * max_len;
    }
    let a = abs(v);
    let scale = max(a.x, max(a.y, a.z));
    if scale == 0.0 {
        return v;
    }
    let unit = v / scale;
    let len = length(unit) * scale;
    if len > max_len {
        return normalize(unit) * max_len;
    }
    return v;
}
"#;

/// Steering pass: one invocation per agent, writes `forces[i]`.
pub fn steer_wgsl(group_size: u32) -> String {
    format!(
        r#"{AGENT_WGSL}

{UNIFORMS_WGSL}
{LIMIT_LENGTH_WGSL}
@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> agents: array<Agent>;
@group(0) @binding(2) var<storage, read_write> forces: array<vec4<f32>>;

fn bounds_force(position: vec3<f32>) -> vec3<f32> {{
    let from_center = abs(position - params.bounds_center);
    if any(from_center > params.bounds_extents) {{
        return direction_or_zero(params.bounds_center - position) * params.bounds_avoid_weight;
    }}
    return vec3<f32>(0.0);
}}

@compute @workgroup_size({group_size})
fn {STEER_ENTRY}(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= params.agent_count {{
        return;
    }}

    let me = agents[index];

    var cohesion_sum = vec3<f32>(0.0);
    var cohesion_count = 0u;
    var alignment_sum = vec3<f32>(0.0);
    var alignment_count = 0u;
    var separation_sum = vec3<f32>(0.0);

    for (var j = 0u; j < params.agent_count; j += 1u) {{
        if j == index {{
            continue;
        }}
        let other = agents[j];
        let offset = me.position - other.position;
        let dist = length(offset);

        if dist < params.cohesion_radius {{
            cohesion_sum += other.position;
            cohesion_count += 1u;
        }}
        if dist < params.alignment_radius {{
            alignment_sum += other.velocity;
            alignment_count += 1u;
        }}
        if dist < params.separation_radius && dist > MIN_SEPARATION_DISTANCE {{
            separation_sum += offset / (dist * dist);
        }}
    }}

    var force = vec3<f32>(0.0);

    if cohesion_count > 0u {{
        let center = cohesion_sum / f32(cohesion_count);
        force += direction_or_zero(center - me.position) * params.cohesion_weight;
    }}
    if alignment_count > 0u {{
        let heading = alignment_sum / f32(alignment_count);
        force += (heading - me.velocity) * params.alignment_weight;
    }}
    force += separation_sum * params.separation_weight;

    force += bounds_force(me.position);

    if params.has_target != 0u {{
        force += direction_or_zero(params.target_point - me.position) * params.target_weight;
    }}

    if params.has_obstacle != 0u {{
        let away = me.position - params.obstacle_center;
        if length(away) < params.obstacle_radius {{
            force += direction_or_zero(away) * params.obstacle_weight;
        }}
    }}

    forces[index] = vec4<f32>(limit_length(force, params.max_steering_force), 0.0);
}}
"#
    )
}

/// Integration pass: advances agent `i`, then publishes it.
pub fn integrate_wgsl(group_size: u32) -> String {
    format!(
        r#"{AGENT_WGSL}

{UNIFORMS_WGSL}
{LIMIT_LENGTH_WGSL}
@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read_write> agents: array<Agent>;
@group(0) @binding(2) var<storage, read> forces: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read_write> out_positions: array<vec4<f32>>;
@group(0) @binding(4) var<storage, read_write> out_velocities: array<vec4<f32>>;

@compute @workgroup_size({group_size})
fn {INTEGRATE_ENTRY}(@builtin(global_invocation_id) global_id: vec3<u32>) {{
    let index = global_id.x;
    if index >= params.agent_count {{
        return;
    }}

    var agent = agents[index];
    let force = forces[index].xyz;

    agent.velocity = limit_length(agent.velocity + force * params.delta_time, params.max_speed);
    agent.position += agent.velocity * params.delta_time;

    agents[index] = agent;
    out_positions[index] = vec4<f32>(agent.position, 1.0);
    out_velocities[index] = vec4<f32>(agent.velocity, 0.0);
}}
"#
    )
}
