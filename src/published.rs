//! What the render front end is allowed to see.
//!
//! Renderers get bounds metadata through [`RenderView`] and agent data
//! through the published buffers only, either on the device (see
//! [`GpuBackend::position_buffer`](crate::gpu::GpuBackend::position_buffer))
//! or as a host copy in [`PublishedSnapshot`]. Neither path can reach the
//! agent store or the force buffer.

use glam::Vec3;

/// Bounds and count metadata for culling and display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderView {
    pub particle_count: u32,
    pub bounds_center: Vec3,
    pub bounds_size: Vec3,
}

/// Host copy of the published position and velocity buffers.
///
/// Always taken after a full integration pass, so every slot comes from the
/// same tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PublishedSnapshot {
    positions: Vec<Vec3>,
    velocities: Vec<Vec3>,
}

impl PublishedSnapshot {
    pub(crate) fn new(positions: Vec<Vec3>, velocities: Vec<Vec3>) -> Self {
        debug_assert_eq!(positions.len(), velocities.len());
        Self {
            positions,
            velocities,
        }
    }

    /// Build from the vec4 rows the device writes.
    pub(crate) fn from_rows(positions: &[[f32; 4]], velocities: &[[f32; 4]]) -> Self {
        let xyz = |row: &[f32; 4]| Vec3::new(row[0], row[1], row[2]);
        Self::new(
            positions.iter().map(xyz).collect(),
            velocities.iter().map(xyz).collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    pub fn all_finite(&self) -> bool {
        self.positions.iter().chain(&self.velocities).all(|v| v.is_finite())
    }

    /// Average position, or zero for an empty snapshot.
    pub fn centroid(&self) -> Vec3 {
        if self.positions.is_empty() {
            return Vec3::ZERO;
        }
        self.positions.iter().copied().sum::<Vec3>() / self.positions.len() as f32
    }

    /// Average speed, or zero for an empty snapshot.
    pub fn mean_speed(&self) -> f32 {
        if self.velocities.is_empty() {
            return 0.0;
        }
        self.velocities.iter().map(|v| v.length()).sum::<f32>() / self.velocities.len() as f32
    }

    pub fn max_speed(&self) -> f32 {
        self.velocities.iter().map(|v| v.length()).fold(0.0, f32::max)
    }
}
