//! Compute pipeline plumbing shared by the forward and backward kernels
//!
//! Both shaders follow the same binding convention:
//! `@binding(0)` uniform params, then the read-only inputs in order, then the
//! read-write output as the last binding. Each shader exposes two entry
//! points, one per [`KernelStrategy`].

use super::limits::DeviceLimits;
use super::GpuDevice;
use crate::config::KernelStrategy;

/// Invocations per workgroup for `aggregate_per_channel`
pub(crate) const PER_CHANNEL_WORKGROUP: u32 = 256;

/// Kernel parameters (matches `struct Params` in both shaders)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct AggregateParams {
    pub(crate) num_nodes: u32,
    pub(crate) num_features: u32,
    pub(crate) grid_width: u32,
    _padding: u32,
}

/// Workgroup grid for one launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Launch {
    pub(crate) groups_x: u32,
    pub(crate) groups_y: u32,
    /// Row stride used by the shader to linearize its 2-D id
    pub(crate) grid_width: u32,
}

impl Launch {
    /// Grid covering `num_nodes` x `num_features` under `strategy`
    ///
    /// `strategy` must already be resolved (not `Auto`).
    pub(crate) fn plan(
        limits: &DeviceLimits,
        strategy: KernelStrategy,
        num_nodes: u32,
        num_features: u32,
    ) -> Self {
        match strategy {
            KernelStrategy::SplitNeighbors => {
                let (groups_x, groups_y) = limits.grid(num_nodes);
                Self {
                    groups_x,
                    groups_y,
                    grid_width: groups_x,
                }
            }
            KernelStrategy::PerChannel | KernelStrategy::Auto => {
                let invocations = num_nodes * num_features;
                let (groups_x, groups_y) =
                    limits.grid(invocations.div_ceil(PER_CHANNEL_WORKGROUP));
                Self {
                    groups_x,
                    groups_y,
                    grid_width: groups_x * PER_CHANNEL_WORKGROUP,
                }
            }
        }
    }

    pub(crate) fn params(&self, num_nodes: u32, num_features: u32) -> AggregateParams {
        AggregateParams {
            num_nodes,
            num_features,
            grid_width: self.grid_width,
            _padding: 0,
        }
    }
}

/// Both pipelines of one shader plus their shared bind group layout
#[derive(Debug)]
pub(crate) struct AggregateKernel {
    label: &'static str,
    layout: wgpu::BindGroupLayout,
    per_channel: wgpu::ComputePipeline,
    split: wgpu::ComputePipeline,
}

impl AggregateKernel {
    /// Compile `source` with `inputs` read-only storage bindings
    pub(crate) fn new(device: &GpuDevice, label: &'static str, source: &str, inputs: u32) -> Self {
        let shader_module = device
            .device()
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let mut entries = vec![layout_entry(0, wgpu::BufferBindingType::Uniform)];
        for binding in 1..=inputs {
            entries.push(layout_entry(
                binding,
                wgpu::BufferBindingType::Storage { read_only: true },
            ));
        }
        entries.push(layout_entry(
            inputs + 1,
            wgpu::BufferBindingType::Storage { read_only: false },
        ));

        let layout = device
            .device()
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &entries,
            });

        let pipeline_layout =
            device
                .device()
                .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                    label: Some(label),
                    bind_group_layouts: &[&layout],
                    push_constant_ranges: &[],
                });

        let pipeline = |entry_point: &str| {
            device
                .device()
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(label),
                    layout: Some(&pipeline_layout),
                    module: &shader_module,
                    entry_point,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                })
        };

        Self {
            label,
            per_channel: pipeline("aggregate_per_channel"),
            split: pipeline("aggregate_split"),
            layout,
        }
    }

    /// Encode and submit one launch
    ///
    /// `bindings` are the storage buffers after the params, output last.
    /// Returns without waiting for the GPU.
    pub(crate) fn launch(
        &self,
        device: &GpuDevice,
        strategy: KernelStrategy,
        launch: Launch,
        params: AggregateParams,
        bindings: &[&wgpu::Buffer],
    ) {
        let params_buffer = device.create_buffer_init(
            self.label,
            bytemuck::bytes_of(&params),
            wgpu::BufferUsages::UNIFORM,
        );

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: params_buffer.as_entire_binding(),
        }];
        for (binding, buffer) in (1_u32..).zip(bindings) {
            entries.push(wgpu::BindGroupEntry {
                binding,
                resource: buffer.as_entire_binding(),
            });
        }

        let bind_group = device
            .device()
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(self.label),
                layout: &self.layout,
                entries: &entries,
            });

        let pipeline = match strategy {
            KernelStrategy::SplitNeighbors => &self.split,
            KernelStrategy::PerChannel | KernelStrategy::Auto => &self.per_channel,
        };

        let mut encoder = device
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(self.label),
            });

        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(self.label),
                timestamp_writes: None,
            });

            compute_pass.set_pipeline(pipeline);
            compute_pass.set_bind_group(0, &bind_group, &[]);
            compute_pass.dispatch_workgroups(launch.groups_x, launch.groups_y, 1);
        }

        device.queue().submit(Some(encoder.finish()));
    }
}

fn layout_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
