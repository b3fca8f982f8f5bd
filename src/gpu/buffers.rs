//! Device buffers for one flock allocation.
//!
//! Two ownership domains live here: the agent store and force buffer, which
//! only the kernels touch, and the published position/velocity buffers, which
//! the render front end may bind as read-only vertex or storage input.

use wgpu::util::DeviceExt;

use crate::agent::AgentStore;
use crate::params::FlockUniforms;

/// Bytes per published or force row (vec4<f32>).
pub const ROW_SIZE: u64 = 16;

pub struct FlockBuffers {
    pub agents: wgpu::Buffer,
    pub forces: wgpu::Buffer,
    pub positions: wgpu::Buffer,
    pub velocities: wgpu::Buffer,
    pub uniforms: wgpu::Buffer,
    positions_staging: wgpu::Buffer,
    velocities_staging: wgpu::Buffer,
    agent_count: u32,
}

impl FlockBuffers {
    pub fn new(device: &wgpu::Device, store: &AgentStore, uniforms: &FlockUniforms) -> Self {
        let agent_count = store.len() as u32;
        let row_bytes = agent_count as u64 * ROW_SIZE;

        let agents = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Agent Store"),
            contents: bytemuck::cast_slice(&store.to_gpu()),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let forces = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Force Buffer"),
            size: row_bytes,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });

        // Seeded state is published up front so a renderer has valid data
        // before the first tick.
        let initial_positions: Vec<[f32; 4]> = store
            .as_slice()
            .iter()
            .map(|a| a.position.extend(1.0).to_array())
            .collect();
        let initial_velocities: Vec<[f32; 4]> = store
            .as_slice()
            .iter()
            .map(|a| a.velocity.extend(0.0).to_array())
            .collect();

        let published_usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::VERTEX
            | wgpu::BufferUsages::COPY_SRC;

        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Published Positions"),
            contents: bytemuck::cast_slice(&initial_positions),
            usage: published_usage,
        });

        let velocities = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Published Velocities"),
            contents: bytemuck::cast_slice(&initial_velocities),
            usage: published_usage,
        });

        let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Flock Uniforms"),
            contents: bytemuck::bytes_of(uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let positions_staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Positions Staging"),
            size: row_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let velocities_staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Velocities Staging"),
            size: row_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            agents,
            forces,
            positions,
            velocities,
            uniforms,
            positions_staging,
            velocities_staging,
            agent_count,
        }
    }

    #[inline]
    pub fn agent_count(&self) -> u32 {
        self.agent_count
    }

    /// Size in bytes of one published buffer.
    #[inline]
    pub fn published_size(&self) -> u64 {
        self.agent_count as u64 * ROW_SIZE
    }

    /// Queue copies of the published buffers into the staging pair.
    pub fn encode_readback(&self, encoder: &mut wgpu::CommandEncoder) {
        let size = self.published_size();
        encoder.copy_buffer_to_buffer(&self.positions, 0, &self.positions_staging, 0, size);
        encoder.copy_buffer_to_buffer(&self.velocities, 0, &self.velocities_staging, 0, size);
    }

    pub fn staging(&self) -> (&wgpu::Buffer, &wgpu::Buffer) {
        (&self.positions_staging, &self.velocities_staging)
    }

    /// Free device memory now instead of waiting for drop. Work already
    /// submitted finishes first.
    pub fn destroy(&self) {
        self.agents.destroy();
        self.forces.destroy();
        self.positions.destroy();
        self.velocities.destroy();
        self.uniforms.destroy();
        self.positions_staging.destroy();
        self.velocities_staging.destroy();
    }
}
