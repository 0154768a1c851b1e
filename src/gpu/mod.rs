//! GPU backend for mean aggregation
//!
//! # Architecture
//!
//! - `device`: wgpu device initialization and identity
//! - `buffer`: device-resident views, in-degree and feature matrices
//! - `limits`: binding-size and dispatch-grid limits
//! - `kernel`: pipeline and bind-group plumbing shared by both shaders
//! - `conv`: validated forward / backward launches
//!
//! # Feature Flag
//!
//! This module is only available with the `gpu` feature flag:
//! ```bash
//! cargo build --features gpu
//! ```

mod buffer;
mod conv;
mod device;
mod kernel;
mod limits;

pub use buffer::{GpuColumnView, GpuInDegree, GpuMatrix, GpuRowView, GpuSageGraph};
pub use conv::{gpu_backward, gpu_forward, GpuSageConv};
pub use device::{DeviceId, GpuDevice, GpuDeviceError};
pub use limits::{DeviceLimits, MAX_WORKGROUPS_PER_DIM};
