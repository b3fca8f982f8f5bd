//! Execution backends for the two-pass flock pipeline.
//!
//! A backend owns three things: the agent store, the force buffer, and the
//! published position/velocity buffers. The controller drives it through
//! this trait and never touches those buffers directly, so the same
//! controller runs on the GPU or, as a fallback, on the host.

use crate::agent::AgentStore;
use crate::dispatch::DispatchSize;
use crate::error::{FlockError, Result};
use crate::params::FlockUniforms;
use crate::published::PublishedSnapshot;

pub trait FlockBackend {
    /// Name of this backend (for logging)
    fn name(&self) -> &'static str;

    /// Workgroup size reported by the hardware. Queried once and fixed for
    /// the backend's lifetime.
    fn group_size(&self) -> u32;

    /// Allocate the store, force and published buffers for `store.len()`
    /// agents and publish the seeded state.
    ///
    /// Any previous allocation is released first.
    fn allocate(&mut self, store: &AgentStore, dispatch: DispatchSize) -> Result<()>;

    /// Run one tick: the full steering pass, then the full integration pass.
    ///
    /// May return before the device has finished; the published buffers are
    /// only observable once both passes complete. Fails with a configuration
    /// error if `uniforms.agent_count` differs from the allocated count.
    fn step(&mut self, uniforms: &FlockUniforms) -> Result<()>;

    /// Copy the published buffers back to the host.
    fn read_published(&self) -> Result<PublishedSnapshot>;

    /// Free every buffer. Returns `false` if nothing was allocated, which
    /// makes a second call a no-op.
    fn release(&mut self) -> bool;

    fn is_allocated(&self) -> bool;
}

/// Reject uniforms whose agent count disagrees with the allocation. The
/// kernels bound every loop by `agent_count`, so a larger value would read
/// past the end of the store.
pub(crate) fn check_uniforms(dispatch: &DispatchSize, uniforms: &FlockUniforms) -> Result<()> {
    if uniforms.agent_count != dispatch.agent_count() {
        return Err(FlockError::config(format!(
            "uniforms carry {} agents but {} are allocated",
            uniforms.agent_count,
            dispatch.agent_count()
        )));
    }
    Ok(())
}

impl<B: FlockBackend + ?Sized> FlockBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn group_size(&self) -> u32 {
        (**self).group_size()
    }

    fn allocate(&mut self, store: &AgentStore, dispatch: DispatchSize) -> Result<()> {
        (**self).allocate(store, dispatch)
    }

    fn step(&mut self, uniforms: &FlockUniforms) -> Result<()> {
        (**self).step(uniforms)
    }

    fn read_published(&self) -> Result<PublishedSnapshot> {
        (**self).read_published()
    }

    fn release(&mut self) -> bool {
        (**self).release()
    }

    fn is_allocated(&self) -> bool {
        (**self).is_allocated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::FlockParams;

    #[test]
    fn test_check_uniforms_matches_allocation() {
        let dispatch = DispatchSize::new(10, 4).unwrap();
        let mut u = FlockParams::new().with_agent_count(10).to_uniforms();
        assert!(check_uniforms(&dispatch, &u).is_ok());

        u.agent_count = 11;
        assert!(matches!(check_uniforms(&dispatch, &u), Err(FlockError::Configuration(_))));
        u.agent_count = 9;
        assert!(check_uniforms(&dispatch, &u).is_err());
    }
}
