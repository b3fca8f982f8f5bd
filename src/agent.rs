//! Per-agent state and its GPU layout.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// One boid. Its identity is its slot in the [`AgentStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Agent {
    pub position: Vec3,
    pub velocity: Vec3,
}

impl Agent {
    pub fn new(position: Vec3, velocity: Vec3) -> Self {
        Self { position, velocity }
    }

    /// Both vectors are free of NaN and infinity.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }

    pub fn to_gpu(&self) -> AgentGpu {
        AgentGpu {
            position: self.position.to_array(),
            _pad0: 0.0,
            velocity: self.velocity.to_array(),
            _pad1: 0.0,
        }
    }

    pub fn from_gpu(gpu: &AgentGpu) -> Self {
        Self {
            position: Vec3::from_array(gpu.position),
            velocity: Vec3::from_array(gpu.velocity),
        }
    }
}

/// GPU-compatible agent. vec3 fields are 16-byte aligned in WGSL storage
/// buffers, so each one carries a trailing pad.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Pod, Zeroable)]
pub struct AgentGpu {
    pub position: [f32; 3],
    _pad0: f32,
    pub velocity: [f32; 3],
    _pad1: f32,
}

const _: () = assert!(
    std::mem::size_of::<AgentGpu>() == 32,
    "size of AgentGpu does not match WGSL"
);
const _: () = assert!(
    std::mem::offset_of!(AgentGpu, velocity) == 16,
    "offset of AgentGpu.velocity does not match WGSL"
);

/// WGSL definition matching [`AgentGpu`].
pub const AGENT_WGSL: &str = r#"struct Agent {
    position: vec3<f32>,
    velocity: vec3<f32>,
};"#;

/// Authoritative, fixed-length agent state.
///
/// The length is set when the store is built and there is no way to grow or
/// shrink it afterwards; resizing a flock means building a new store.
#[derive(Clone, Debug)]
pub struct AgentStore {
    agents: Box<[Agent]>,
}

impl AgentStore {
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        Self {
            agents: agents.into_boxed_slice(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    /// Mutable access to the slots. The slice cannot change length.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn get(&self, index: usize) -> Option<&Agent> {
        self.agents.get(index)
    }

    pub fn to_gpu(&self) -> Vec<AgentGpu> {
        self.agents.iter().map(Agent::to_gpu).collect()
    }

    pub fn all_finite(&self) -> bool {
        self.agents.iter().all(Agent::is_finite)
    }
}
