//! The owning controller: sets a flock up, ticks it, and tears it down.

use glam::Vec3;
use log::{debug, error, info, warn};

use crate::backend::FlockBackend;
use crate::cpu::CpuBackend;
use crate::dispatch::DispatchSize;
use crate::error::{FlockError, Result};
use crate::gpu::GpuBackend;
use crate::params::{check_delta_time, FlockParams, Obstacle};
use crate::published::{PublishedSnapshot, RenderView};
use crate::spawn::seed_store;

/// Drives one flock on a backend.
///
/// Construction validates parameters, sizes the dispatch, seeds agents and
/// allocates buffers; if any step fails the error is logged and returned and
/// nothing is dispatched. Parameter changes between ticks take effect on the
/// next [`tick`](Self::tick).
pub struct FlockController<B: FlockBackend> {
    params: FlockParams,
    backend: B,
    dispatch: Option<DispatchSize>,
    ticks: u64,
}

impl<B: FlockBackend> FlockController<B> {
    pub fn new(params: FlockParams, backend: B) -> Result<Self> {
        let mut controller = Self {
            params,
            backend,
            dispatch: None,
            ticks: 0,
        };
        controller
            .initialize()
            .inspect_err(|e| log_failure(controller.backend.name(), "start", e))?;
        Ok(controller)
    }

    fn initialize(&mut self) -> Result<()> {
        self.params.validate()?;
        let dispatch = DispatchSize::new(self.params.agent_count, self.backend.group_size())?;
        let store = seed_store(&self.params);
        self.backend.allocate(&store, dispatch)?;
        self.dispatch = Some(dispatch);
        self.ticks = 0;
        info!(
            "flock started on {}: {} agents, {} groups of {}",
            self.backend.name(),
            dispatch.agent_count(),
            dispatch.groups(),
            dispatch.group_size()
        );
        Ok(())
    }

    /// Advance the flock by `dt` seconds.
    ///
    /// Issues the steering and integration passes and returns without
    /// waiting for the device.
    pub fn tick(&mut self, dt: f32) -> Result<()> {
        if !self.is_active() {
            return Err(FlockError::NotAllocated);
        }
        check_delta_time(dt)?;
        self.params.delta_time = dt;
        self.backend.step(&self.params.to_uniforms())?;
        self.ticks += 1;
        debug!("tick {} dt={dt}", self.ticks);
        Ok(())
    }

    /// Seek `target` from the next tick on. A non-finite point is rejected
    /// and the previous target kept.
    pub fn set_target(&mut self, target: Vec3) -> Result<()> {
        self.params.try_update(|p| p.target = Some(target))
    }

    pub fn clear_target(&mut self) {
        self.params.target = None;
    }

    pub fn set_obstacle(&mut self, obstacle: Obstacle) -> Result<()> {
        self.params.try_update(|p| p.obstacle = Some(obstacle))
    }

    /// Move an existing obstacle; does nothing if none is configured.
    pub fn move_obstacle(&mut self, center: Vec3) -> Result<()> {
        self.params.try_update(|p| {
            if let Some(obstacle) = p.obstacle.as_mut() {
                obstacle.center = center;
            }
        })
    }

    pub fn clear_obstacle(&mut self) {
        self.params.obstacle = None;
    }

    /// Replace the parameters.
    ///
    /// A different agent count (or spawn setup) reallocates and reseeds;
    /// anything else applies on the next tick.
    pub fn update_params(&mut self, params: FlockParams) -> Result<()> {
        params.validate()?;
        let reseed = params.agent_count != self.params.agent_count
            || params.spawn_shape != self.params.spawn_shape
            || params.birth_radius != self.params.birth_radius
            || params.seed != self.params.seed;
        self.params = params;
        if reseed {
            self.reinitialize()
        } else {
            Ok(())
        }
    }

    /// Change the agent count. Buffers are reallocated and every agent is
    /// reseeded; there is no incremental resize.
    pub fn resize(&mut self, agent_count: u32) -> Result<()> {
        let previous = self.params.agent_count;
        self.params.try_update(|p| p.agent_count = agent_count)?;
        info!("resizing flock from {previous} to {agent_count} agents");
        self.reinitialize()
    }

    /// Reseed every agent in place, keeping the agent count.
    pub fn reseed(&mut self) -> Result<()> {
        self.reinitialize()
    }

    fn reinitialize(&mut self) -> Result<()> {
        self.backend.release();
        self.dispatch = None;
        self.initialize()
            .inspect_err(|e| log_failure(self.backend.name(), "restart", e))
    }

    /// Free every buffer. Safe to call more than once.
    pub fn release(&mut self) {
        if self.backend.release() {
            info!("flock released on {}", self.backend.name());
        } else {
            warn!("flock release requested but nothing is allocated");
        }
        self.dispatch = None;
    }

    /// Whether the flock has buffers and can tick.
    pub fn is_active(&self) -> bool {
        self.dispatch.is_some() && self.backend.is_allocated()
    }

    /// Metadata for the render front end.
    pub fn render_view(&self) -> RenderView {
        RenderView {
            particle_count: self.dispatch.map_or(0, |d| d.agent_count()),
            bounds_center: self.params.bounds_center,
            bounds_size: self.params.bounds_size,
        }
    }

    /// Copy the published buffers to the host.
    pub fn read_published(&self) -> Result<PublishedSnapshot> {
        self.backend.read_published()
    }

    pub fn params(&self) -> &FlockParams {
        &self.params
    }

    pub fn dispatch(&self) -> Option<DispatchSize> {
        self.dispatch
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ticks since the last (re)initialization.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl FlockController<CpuBackend> {
    /// Run on the host.
    pub fn cpu(params: FlockParams) -> Result<Self> {
        Self::new(params, CpuBackend::new())
    }
}

impl FlockController<GpuBackend> {
    /// Run on the first high-performance GPU adapter.
    pub fn gpu(params: FlockParams) -> Result<Self> {
        let backend = GpuBackend::new_blocking().inspect_err(|e| error!("no gpu for flock: {e}"))?;
        Self::new(params, backend)
    }
}

impl FlockController<Box<dyn FlockBackend>> {
    /// Prefer the GPU, fall back to the host when no device is available.
    pub fn auto(params: FlockParams) -> Result<Self> {
        let backend: Box<dyn FlockBackend> = match GpuBackend::new_blocking() {
            Ok(gpu) => Box::new(gpu),
            Err(e) => {
                warn!("falling back to cpu flock: {e}");
                Box::new(CpuBackend::new())
            }
        };
        Self::new(params, backend)
    }
}

fn log_failure(backend: &str, action: &str, err: &FlockError) {
    if err.is_fatal() {
        error!("flock failed to {action} on {backend}: {err}");
    } else {
        warn!("flock could not {action} on {backend}: {err}");
    }
}

impl<B: FlockBackend> Drop for FlockController<B> {
    fn drop(&mut self) {
        if self.backend.release() {
            debug!("flock buffers released on drop");
        }
    }
}
