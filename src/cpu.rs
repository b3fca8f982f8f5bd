//! Host backend.
//!
//! Runs both kernels with rayon, one task per workgroup, using the same
//! dispatch geometry and out-of-range guard as the device. The steering pass
//! only borrows the store immutably and the integration pass only starts once
//! every force is written, which is the pass barrier the device provides.

use glam::Vec3;
use log::{debug, info};
use rayon::prelude::*;

use crate::agent::AgentStore;
use crate::backend::{check_uniforms, FlockBackend};
use crate::dispatch::DispatchSize;
use crate::error::{FlockError, Result};
use crate::kernels::{integrate, steer};
use crate::params::FlockUniforms;
use crate::published::PublishedSnapshot;

/// Workgroup size the host backend reports.
pub const DEFAULT_CPU_GROUP_SIZE: u32 = 64;

/// Run `kernel` once for every in-range invocation of `dispatch`, one rayon
/// task per workgroup. `out` holds one slot per agent.
pub fn run_grouped<T, F>(dispatch: &DispatchSize, out: &mut [T], kernel: F)
where
    T: Send,
    F: Fn(usize, &mut T) + Sync,
{
    debug_assert_eq!(out.len(), dispatch.agent_count() as usize);
    let group_size = dispatch.group_size() as usize;

    out.par_chunks_mut(group_size)
        .enumerate()
        .for_each(|(group, slots)| {
            for local in 0..group_size {
                let index = group * group_size + local;
                if !dispatch.in_range(index as u64) {
                    return;
                }
                kernel(index, &mut slots[local]);
            }
        });
}

struct CpuBuffers {
    store: AgentStore,
    forces: Vec<Vec3>,
    published_positions: Vec<Vec3>,
    published_velocities: Vec<Vec3>,
    dispatch: DispatchSize,
}

impl CpuBuffers {
    fn steering_pass(&mut self, uniforms: &FlockUniforms) {
        let agents = self.store.as_slice();
        run_grouped(&self.dispatch, &mut self.forces, |index, force| {
            *force = steer(index, agents, uniforms);
        });
    }

    fn integration_pass(&mut self, uniforms: &FlockUniforms) {
        let dispatch = self.dispatch;
        let group_size = dispatch.group_size() as usize;
        let forces = &self.forces;

        self.store
            .as_mut_slice()
            .par_chunks_mut(group_size)
            .zip(self.published_positions.par_chunks_mut(group_size))
            .zip(self.published_velocities.par_chunks_mut(group_size))
            .enumerate()
            .for_each(|(group, ((agents, positions), velocities))| {
                for local in 0..group_size {
                    let index = group * group_size + local;
                    if !dispatch.in_range(index as u64) {
                        return;
                    }
                    let agent = integrate(agents[local], forces[index], uniforms);
                    agents[local] = agent;
                    positions[local] = agent.position;
                    velocities[local] = agent.velocity;
                }
            });
    }
}

/// Backend that keeps every buffer in host memory.
pub struct CpuBackend {
    group_size: u32,
    buffers: Option<CpuBuffers>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::with_group_size(DEFAULT_CPU_GROUP_SIZE)
    }

    /// Report a specific workgroup size.
    pub fn with_group_size(group_size: u32) -> Self {
        Self {
            group_size,
            buffers: None,
        }
    }

    /// Current agent store, for inspection in tests and tools.
    pub fn store(&self) -> Option<&AgentStore> {
        self.buffers.as_ref().map(|b| &b.store)
    }

    /// Forces written by the most recent steering pass.
    pub fn forces(&self) -> Option<&[Vec3]> {
        self.buffers.as_ref().map(|b| b.forces.as_slice())
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FlockBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
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
        self.release();

        let agents = store.as_slice();
        self.buffers = Some(CpuBuffers {
            store: store.clone(),
            forces: vec![Vec3::ZERO; agents.len()],
            published_positions: agents.iter().map(|a| a.position).collect(),
            published_velocities: agents.iter().map(|a| a.velocity).collect(),
            dispatch,
        });
        info!(
            "cpu backend allocated {} agents ({} groups of {})",
            dispatch.agent_count(),
            dispatch.groups(),
            dispatch.group_size()
        );
        Ok(())
    }

    fn step(&mut self, uniforms: &FlockUniforms) -> Result<()> {
        let buffers = self.buffers.as_mut().ok_or(FlockError::NotAllocated)?;
        check_uniforms(&buffers.dispatch, uniforms)?;
        debug!("cpu step dt={} groups={}", uniforms.delta_time, buffers.dispatch.groups());
        buffers.steering_pass(uniforms);
        buffers.integration_pass(uniforms);
        Ok(())
    }

    fn read_published(&self) -> Result<PublishedSnapshot> {
        let buffers = self.buffers.as_ref().ok_or(FlockError::NotAllocated)?;
        Ok(PublishedSnapshot::new(
            buffers.published_positions.clone(),
            buffers.published_velocities.clone(),
        ))
    }

    fn release(&mut self) -> bool {
        self.buffers.take().is_some()
    }

    fn is_allocated(&self) -> bool {
        self.buffers.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::params::FlockParams;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_run_grouped_covers_each_index_once() {
        let dispatch = DispatchSize::new(1000, 64).unwrap();
        let mut hits = vec![0u32; 1000];
        let calls = AtomicU32::new(0);
        run_grouped(&dispatch, &mut hits, |_, slot| {
            *slot += 1;
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert!(hits.iter().all(|&h| h == 1));
        assert_eq!(calls.load(Ordering::Relaxed), 1000);
    }

    #[test]
    fn test_run_grouped_passes_global_index() {
        let dispatch = DispatchSize::new(130, 64).unwrap();
        let mut ids = vec![usize::MAX; 130];
        run_grouped(&dispatch, &mut ids, |index, slot| *slot = index);
        assert!(ids.iter().enumerate().all(|(i, &id)| i == id));
    }

    #[test]
    fn test_step_before_allocate_fails() {
        let mut backend = CpuBackend::new();
        let u = FlockParams::new().to_uniforms();
        assert!(matches!(backend.step(&u), Err(FlockError::NotAllocated)));
        assert!(matches!(backend.read_published(), Err(FlockError::NotAllocated)));
    }

    #[test]
    fn test_allocate_publishes_seed() {
        let store = AgentStore::from_agents(vec![Agent::new(Vec3::ONE, Vec3::X); 3]);
        let mut backend = CpuBackend::new();
        backend.allocate(&store, DispatchSize::new(3, 64).unwrap()).unwrap();
        let snap = backend.read_published().unwrap();
        assert_eq!(snap.positions(), &[Vec3::ONE; 3]);
        assert_eq!(snap.velocities(), &[Vec3::X; 3]);
    }

    #[test]
    fn test_allocate_rejects_mismatched_dispatch() {
        let store = AgentStore::from_agents(vec![Agent::default(); 4]);
        let mut backend = CpuBackend::new();
        assert!(backend.allocate(&store, DispatchSize::new(5, 64).unwrap()).is_err());
        assert!(!backend.is_allocated());
    }

    #[test]
    fn test_release_twice_is_noop() {
        let store = AgentStore::from_agents(vec![Agent::default(); 2]);
        let mut backend = CpuBackend::new();
        backend.allocate(&store, DispatchSize::new(2, 64).unwrap()).unwrap();
        assert!(backend.release());
        assert!(!backend.release());
        assert!(!backend.is_allocated());
    }

    #[test]
    fn test_step_rejects_foreign_agent_count() {
        let store = AgentStore::from_agents(vec![Agent::new(Vec3::ZERO, Vec3::X); 2]);
        let mut backend = CpuBackend::new();
        backend.allocate(&store, DispatchSize::new(2, 64).unwrap()).unwrap();

        let u = FlockParams::new().with_agent_count(500).to_uniforms();
        assert!(matches!(backend.step(&u), Err(FlockError::Configuration(_))));
        assert_eq!(backend.store().unwrap().as_slice(), store.as_slice());
        assert_eq!(backend.read_published().unwrap().velocities(), &[Vec3::X; 2]);
    }

    #[test]
    fn test_steering_reads_pre_tick_snapshot() {
        // Agent 1 sits inside agent 0's alignment radius. If integration of
        // agent 1 leaked into steering of agent 0, the force would differ.
        let agents = vec![
            Agent::new(Vec3::ZERO, Vec3::ZERO),
            Agent::new(Vec3::new(0.5, 0.0, 0.0), Vec3::Y),
        ];
        let store = AgentStore::from_agents(agents.clone());
        let u = FlockParams::new()
            .with_agent_count(2)
            .with_radii(0.0, 1.0, 0.0)
            .with_weights(0.0, 1.0, 0.0)
            .with_max_steering_force(100.0)
            .with_bounds_avoid_weight(0.0)
            .to_uniforms();

        let mut backend = CpuBackend::with_group_size(1);
        backend.allocate(&store, DispatchSize::new(2, 1).unwrap()).unwrap();
        backend.step(&u).unwrap();

        let expected = steer(0, &agents, &u);
        assert_eq!(backend.forces().unwrap()[0], expected);
    }
}
