mod buffers;

use std::sync::mpsc;

use log::{debug, info};

pub use buffers::FlockBuffers;

use crate::agent::AgentStore;
use crate::backend::{check_uniforms, FlockBackend};
use crate::dispatch::{group_size_from_limits, DispatchSize};
use crate::error::{FlockError, Result};
use crate::params::FlockUniforms;
use crate::published::PublishedSnapshot;
use crate::shaders::{integrate_wgsl, steer_wgsl, INTEGRATE_ENTRY, STEER_ENTRY};

/// Headless device and queue. No surface: rendering belongs to whoever
/// consumes the published buffers.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(FlockError::NoAdapter)?;

        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Flock Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Blocking wrapper around [`GpuContext::new`].
    pub fn new_blocking() -> Result<Self> {
        pollster::block_on(Self::new())
    }

    /// Workgroup size to compile the kernels with.
    pub fn group_size(&self) -> u32 {
        group_size_from_limits(&self.device.limits())
    }
}

struct FlockPipelines {
    steer: wgpu::ComputePipeline,
    integrate: wgpu::ComputePipeline,
    steer_layout: wgpu::BindGroupLayout,
    integrate_layout: wgpu::BindGroupLayout,
}

struct GpuFlock {
    buffers: FlockBuffers,
    steer_bind_group: wgpu::BindGroup,
    integrate_bind_group: wgpu::BindGroup,
    dispatch: DispatchSize,
}

/// Backend that keeps the flock in device buffers and runs both passes as
/// compute dispatches.
pub struct GpuBackend {
    context: GpuContext,
    group_size: u32,
    pipelines: Option<FlockPipelines>,
    flock: Option<GpuFlock>,
}

impl GpuBackend {
    pub fn new(context: GpuContext) -> Self {
        let group_size = context.group_size();
        info!(
            "gpu backend on {} ({:?}), workgroup size {}",
            context.adapter_info.name, context.adapter_info.backend, group_size
        );
        Self {
            context,
            group_size,
            pipelines: None,
            flock: None,
        }
    }

    /// Request an adapter and device, blocking until ready.
    pub fn new_blocking() -> Result<Self> {
        Ok(Self::new(GpuContext::new_blocking()?))
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Published positions (`vec4<f32>` per agent, w = 1).
    pub fn position_buffer(&self) -> Option<&wgpu::Buffer> {
        self.flock.as_ref().map(|f| &f.buffers.positions)
    }

    /// Published velocities (`vec4<f32>` per agent, w = 0).
    pub fn velocity_buffer(&self) -> Option<&wgpu::Buffer> {
        self.flock.as_ref().map(|f| &f.buffers.velocities)
    }
}

impl FlockBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn group_size(&self) -> u32 {
        self.group_size
    }

    fn allocate(&mut self, store: &AgentStore, dispatch: DispatchSize) -> Result<()> {
        if store.len() != dispatch.agent_count() as usize {
            return Err(FlockError::config(format!(
                "store holds {} agents but dispatch was sized for {}",
                store.len(),
                dispatch.agent_count()
            )));
        }
        if dispatch.group_size() != self.group_size {
            return Err(FlockError::config(format!(
                "dispatch sized for workgroups of {}, kernels compiled for {}",
                dispatch.group_size(),
                self.group_size
            )));
        }
        self.release();

        let device = &self.context.device;
        let pipelines = match self.pipelines.take() {
            Some(p) => p,
            None => create_pipelines(device, self.group_size)?,
        };

        let uniforms = FlockUniforms {
            agent_count: dispatch.agent_count(),
            ..Default::default()
        };
        let buffers = FlockBuffers::new(device, store, &uniforms);

        let steer_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Steer Bind Group"),
            layout: &pipelines.steer_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.agents.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.forces.as_entire_binding(),
                },
            ],
        });

        let integrate_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Integrate Bind Group"),
            layout: &pipelines.integrate_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffers.uniforms.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buffers.agents.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.forces.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.positions.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: buffers.velocities.as_entire_binding(),
                },
            ],
        });

        self.pipelines = Some(pipelines);
        self.flock = Some(GpuFlock {
            buffers,
            steer_bind_group,
            integrate_bind_group,
            dispatch,
        });

        info!(
            "gpu backend allocated {} agents ({} groups of {})",
            dispatch.agent_count(),
            dispatch.groups(),
            dispatch.group_size()
        );
        Ok(())
    }

    fn step(&mut self, uniforms: &FlockUniforms) -> Result<()> {
        let flock = self.flock.as_ref().ok_or(FlockError::NotAllocated)?;
        let pipelines = self.pipelines.as_ref().ok_or(FlockError::NotAllocated)?;
        check_uniforms(&flock.dispatch, uniforms)?;

        self.context
            .queue
            .write_buffer(&flock.buffers.uniforms, 0, bytemuck::bytes_of(uniforms));

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Flock Encoder"),
            });

        let (x, y, z) = flock.dispatch.workgroups();
        debug!("gpu step dt={} workgroups=({x}, {y}, {z})", uniforms.delta_time);

        // Separate passes: every force is written before any agent moves
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Steering Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipelines.steer);
            pass.set_bind_group(0, &flock.steer_bind_group, &[]);
            pass.dispatch_workgroups(x, y, z);
        }

        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Integration Pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipelines.integrate);
            pass.set_bind_group(0, &flock.integrate_bind_group, &[]);
            pass.dispatch_workgroups(x, y, z);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn read_published(&self) -> Result<PublishedSnapshot> {
        let flock = self.flock.as_ref().ok_or(FlockError::NotAllocated)?;
        let device = &self.context.device;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        flock.buffers.encode_readback(&mut encoder);
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let (positions_staging, velocities_staging) = flock.buffers.staging();
        let positions_slice = positions_staging.slice(..);
        let velocities_slice = velocities_staging.slice(..);

        let (tx1, rx1) = mpsc::channel();
        positions_slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx1.send(r);
        });
        let (tx2, rx2) = mpsc::channel();
        velocities_slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = tx2.send(r);
        });

        let _ = device.poll(wgpu::Maintain::Wait);

        rx1.recv()
            .map_err(|e| FlockError::BufferMapping(format!("position map result lost: {e}")))?
            .map_err(|e| FlockError::BufferMapping(format!("positions: {e}")))?;
        rx2.recv()
            .map_err(|e| FlockError::BufferMapping(format!("velocity map result lost: {e}")))?
            .map_err(|e| FlockError::BufferMapping(format!("velocities: {e}")))?;

        let snapshot = {
            let positions = positions_slice.get_mapped_range();
            let velocities = velocities_slice.get_mapped_range();
            PublishedSnapshot::from_rows(
                bytemuck::cast_slice(&positions),
                bytemuck::cast_slice(&velocities),
            )
        };

        positions_staging.unmap();
        velocities_staging.unmap();

        Ok(snapshot)
    }

    fn release(&mut self) -> bool {
        match self.flock.take() {
            Some(flock) => {
                flock.buffers.destroy();
                true
            }
            None => false,
        }
    }

    fn is_allocated(&self) -> bool {
        self.flock.is_some()
    }
}

impl Drop for GpuBackend {
    fn drop(&mut self) {
        self.release();
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_pipelines(device: &wgpu::Device, group_size: u32) -> Result<FlockPipelines> {
    if group_size == 0 {
        return Err(FlockError::DegenerateGroupSize {
            agent_count: 0,
            group_size,
        });
    }

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let steer_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Steer Bind Group Layout"),
        entries: &[uniform_entry(0), storage_entry(1, true), storage_entry(2, false)],
    });

    let integrate_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Integrate Bind Group Layout"),
        entries: &[
            uniform_entry(0),
            storage_entry(1, false),
            storage_entry(2, true),
            storage_entry(3, false),
            storage_entry(4, false),
        ],
    });

    let steer = compute_pipeline(device, "Steer", &steer_wgsl(group_size), STEER_ENTRY, &steer_layout);
    let integrate = compute_pipeline(
        device,
        "Integrate",
        &integrate_wgsl(group_size),
        INTEGRATE_ENTRY,
        &integrate_layout,
    );

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(FlockError::config(format!("failed to build flock kernels: {err}")));
    }

    Ok(FlockPipelines {
        steer,
        integrate,
        steer_layout,
        integrate_layout,
    })
}

fn compute_pipeline(
    device: &wgpu::Device,
    name: &str,
    source: &str,
    entry_point: &str,
    layout: &wgpu::BindGroupLayout,
) -> wgpu::ComputePipeline {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&format!("{name} Shader")),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{name} Pipeline Layout")),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(&format!("{name} Pipeline")),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: Some(entry_point),
        compilation_options: Default::default(),
        cache: None,
    })
}
