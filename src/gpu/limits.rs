//! Device limit checks performed before any upload or dispatch
//!
//! Storage bindings are capped by `max_storage_buffer_binding_size`, and the
//! kernels index elements with `u32`, so `N * F` and `E` must fit in 32 bits.

use super::GpuDevice;
use crate::error::SageError;

/// Largest workgroup count per dispatch dimension guaranteed by WebGPU
pub const MAX_WORKGROUPS_PER_DIM: u32 = 65_535;

/// Binding-size limits of one device
#[derive(Debug, Clone, Copy)]
pub struct DeviceLimits {
    /// Largest storage buffer binding (bytes)
    pub max_binding_bytes: u64,

    /// Largest workgroup count per dispatch dimension
    pub max_workgroups_per_dim: u32,
}

impl DeviceLimits {
    /// Read limits from the device
    #[must_use]
    pub fn detect(device: &GpuDevice) -> Self {
        let limits = device.device().limits();
        Self {
            max_binding_bytes: u64::from(limits.max_storage_buffer_binding_size),
            max_workgroups_per_dim: limits.max_compute_workgroups_per_dimension,
        }
    }

    /// Reject a binding of `len` 4-byte elements that the device cannot hold
    ///
    /// # Errors
    ///
    /// Returns `TooLarge` if `len` overflows `u32` indexing or the binding limit
    pub fn check_elements(&self, what: &'static str, len: usize) -> Result<(), SageError> {
        let len = len as u64;
        if len > u64::from(u32::MAX) {
            return Err(SageError::TooLarge {
                what,
                size: len * 4,
                limit: u64::from(u32::MAX) * 4,
            });
        }

        let bytes = len * 4;
        if bytes > self.max_binding_bytes {
            return Err(SageError::TooLarge {
                what,
                size: bytes,
                limit: self.max_binding_bytes,
            });
        }
        Ok(())
    }

    /// Fold `work_groups` into a 2-D grid no wider than the per-dimension cap
    #[must_use]
    pub fn grid(&self, work_groups: u32) -> (u32, u32) {
        let cap = self.max_workgroups_per_dim.clamp(1, MAX_WORKGROUPS_PER_DIM);
        let work_groups = work_groups.max(1);
        let x = work_groups.min(cap);
        (x, work_groups.div_ceil(x))
    }
}
