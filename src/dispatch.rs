//! Workgroup sizing for the per-agent kernels.
//!
//! Both passes run one invocation per agent, launched as `groups` workgroups
//! of `group_size` invocations along X. The last group may overhang the agent
//! count; every kernel returns early for `index >= agent_count`.

use crate::error::{FlockError, Result};

/// Workgroup size we ask for when the device allows it.
pub const PREFERRED_GROUP_SIZE: u32 = 256;

/// Dispatch dimensions for a fixed agent count and workgroup size.
///
/// Computed once at initialization and again only when the agent count
/// changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchSize {
    agent_count: u32,
    group_size: u32,
    groups: u32,
}

impl DispatchSize {
    /// Size a dispatch so `groups * group_size >= agent_count` with the
    /// fewest groups.
    pub fn new(agent_count: u32, group_size: u32) -> Result<Self> {
        if agent_count == 0 || group_size == 0 {
            return Err(FlockError::DegenerateGroupSize {
                agent_count,
                group_size,
            });
        }
        Ok(Self {
            agent_count,
            group_size,
            groups: agent_count.div_ceil(group_size),
        })
    }

    #[inline]
    pub fn agent_count(&self) -> u32 {
        self.agent_count
    }

    #[inline]
    pub fn group_size(&self) -> u32 {
        self.group_size
    }

    /// Number of workgroups along X.
    #[inline]
    pub fn groups(&self) -> u32 {
        self.groups
    }

    /// `(x, y, z)` workgroup counts for `dispatch_workgroups`.
    #[inline]
    pub fn workgroups(&self) -> (u32, u32, u32) {
        (self.groups, 1, 1)
    }

    /// Total invocations launched, including the overhang. Can exceed
    /// `u32::MAX` when the last group overhangs a count near the top of the
    /// range.
    #[inline]
    pub fn invocations(&self) -> u64 {
        u64::from(self.groups) * u64::from(self.group_size)
    }

    /// Whether an invocation index maps to a real agent.
    #[inline]
    pub fn in_range(&self, index: u64) -> bool {
        index < u64::from(self.agent_count)
    }

    /// Global invocation ids of one workgroup.
    pub fn group_invocations(&self, group: u32) -> std::ops::Range<u64> {
        let start = u64::from(group) * u64::from(self.group_size);
        start..start + u64::from(self.group_size)
    }
}

/// Largest usable workgroup size given device limits, capped at
/// [`PREFERRED_GROUP_SIZE`].
pub fn group_size_from_limits(limits: &wgpu::Limits) -> u32 {
    PREFERRED_GROUP_SIZE
        .min(limits.max_compute_workgroup_size_x)
        .min(limits.max_compute_invocations_per_workgroup)
}
