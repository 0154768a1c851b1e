//! Device-resident operands
//!
//! Uploads the column view, row view, in-degree and feature matrices, and
//! reads output matrices back. Every buffer remembers the device it was
//! created on; the kernels refuse operands from another device.

use super::device::DeviceId;
use super::limits::DeviceLimits;
use super::GpuDevice;
use crate::error::{ensure_dim, SageError};
use crate::matrix::FeatureMatrix;
use crate::storage::{ColumnView, InDegree, RowView};
use anyhow::{Context, Result};

/// Upload a slice, padding empty data to one element
///
/// Zero-sized storage bindings are invalid, and an edgeless graph still needs
/// an index buffer bound.
fn upload<T: bytemuck::Pod + Default>(
    device: &GpuDevice,
    label: &str,
    data: &[T],
    usage: wgpu::BufferUsages,
) -> wgpu::Buffer {
    if data.is_empty() {
        device.create_buffer_init(label, bytemuck::bytes_of(&T::default()), usage)
    } else {
        device.create_buffer_init(label, bytemuck::cast_slice(data), usage)
    }
}

/// Reject an operand created on another device
pub(crate) fn ensure_resident(
    device: &GpuDevice,
    owner: DeviceId,
    what: &'static str,
) -> Result<(), SageError> {
    if device.id() == owner {
        Ok(())
    } else {
        Err(SageError::DeviceMismatch { what })
    }
}

/// Dense N×F `f32` matrix in device memory
#[derive(Debug)]
pub struct GpuMatrix {
    pub(crate) owner: DeviceId,
    rows: usize,
    cols: usize,
    pub(crate) buffer: wgpu::Buffer,
}

impl GpuMatrix {
    /// Copy a host matrix to the device
    ///
    /// # Errors
    ///
    /// Returns `TooLarge` if the matrix exceeds the device binding limit
    pub fn upload(device: &GpuDevice, matrix: &FeatureMatrix) -> Result<Self> {
        DeviceLimits::detect(device).check_elements("feature matrix", matrix.as_slice().len())?;

        let buffer = upload(
            device,
            "sage feature matrix",
            matrix.as_slice(),
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        );

        Ok(Self {
            owner: device.id(),
            rows: matrix.rows(),
            cols: matrix.cols(),
            buffer,
        })
    }

    /// Zero-filled output matrix
    pub(crate) fn zeroed(device: &GpuDevice, rows: usize, cols: usize) -> Self {
        let bytes = ((rows * cols).max(1) * std::mem::size_of::<f32>()) as u64;
        let buffer = device.create_buffer(
            "sage output matrix",
            bytes,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
        );

        Self {
            owner: device.id(),
            rows,
            cols,
            buffer,
        }
    }

    /// Number of rows (nodes)
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (feature channels)
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Copy the matrix back to the host
    ///
    /// Waits for all work queued on `device` before mapping.
    ///
    /// # Errors
    ///
    /// Returns `DeviceMismatch` for a foreign device, or an error if mapping fails
    pub async fn download(&self, device: &GpuDevice) -> Result<FeatureMatrix> {
        ensure_resident(device, self.owner, "matrix")?;

        let len = self.rows * self.cols;
        if len == 0 {
            return Ok(FeatureMatrix::zeros(self.rows, self.cols));
        }

        let data = read_f32(device, &self.buffer, len).await?;
        Ok(FeatureMatrix::new(self.rows, self.cols, data)?)
    }
}

/// Column view (forward pass) in device memory
#[derive(Debug)]
pub struct GpuColumnView {
    pub(crate) owner: DeviceId,
    num_nodes: usize,
    num_edges: usize,
    max_degree: u32,

    /// `col_starts` (size: `num_nodes` + 1)
    pub(crate) col_starts: wgpu::Buffer,

    /// `rows` (size: `num_edges`)
    pub(crate) rows: wgpu::Buffer,
}

impl GpuColumnView {
    /// Upload a validated column view
    ///
    /// # Errors
    ///
    /// Returns `TooLarge` if either array exceeds the device binding limit
    pub fn upload(device: &GpuDevice, view: &ColumnView) -> Result<Self> {
        let limits = DeviceLimits::detect(device);
        limits.check_elements("col_starts", view.col_starts().len())?;
        limits.check_elements("rows", view.rows().len())?;

        let usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;
        Ok(Self {
            owner: device.id(),
            num_nodes: view.num_nodes(),
            num_edges: view.num_edges(),
            max_degree: view.max_degree(),
            col_starts: upload(device, "sage col_starts", view.col_starts(), usage),
            rows: upload(device, "sage rows", view.rows(), usage),
        })
    }

    /// Number of nodes
    #[must_use]
    pub const fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of edges
    #[must_use]
    pub const fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Largest in-degree (drives `KernelStrategy::Auto`)
    #[must_use]
    pub const fn max_degree(&self) -> u32 {
        self.max_degree
    }
}

/// Row view (backward pass) in device memory
#[derive(Debug)]
pub struct GpuRowView {
    pub(crate) owner: DeviceId,
    num_nodes: usize,
    num_edges: usize,
    max_degree: u32,

    /// `row_starts` (size: `num_nodes` + 1)
    pub(crate) row_starts: wgpu::Buffer,

    /// `cols` (size: `num_edges`)
    pub(crate) cols: wgpu::Buffer,
}

impl GpuRowView {
    /// Upload a validated row view
    ///
    /// # Errors
    ///
    /// Returns `TooLarge` if either array exceeds the device binding limit
    pub fn upload(device: &GpuDevice, view: &RowView) -> Result<Self> {
        let limits = DeviceLimits::detect(device);
        limits.check_elements("row_starts", view.row_starts().len())?;
        limits.check_elements("cols", view.cols().len())?;

        let usage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;
        Ok(Self {
            owner: device.id(),
            num_nodes: view.num_nodes(),
            num_edges: view.num_edges(),
            max_degree: view.max_degree(),
            row_starts: upload(device, "sage row_starts", view.row_starts(), usage),
            cols: upload(device, "sage cols", view.cols(), usage),
        })
    }

    /// Number of nodes
    #[must_use]
    pub const fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Number of edges
    #[must_use]
    pub const fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Largest out-degree (drives `KernelStrategy::Auto`)
    #[must_use]
    pub const fn max_degree(&self) -> u32 {
        self.max_degree
    }
}

/// In-degree vector in device memory
#[derive(Debug)]
pub struct GpuInDegree {
    pub(crate) owner: DeviceId,
    len: usize,
    pub(crate) buffer: wgpu::Buffer,
}

impl GpuInDegree {
    /// Upload an in-degree vector
    ///
    /// # Errors
    ///
    /// Returns `TooLarge` if the vector exceeds the device binding limit
    pub fn upload(device: &GpuDevice, indeg: &InDegree) -> Result<Self> {
        DeviceLimits::detect(device).check_elements("in-degree", indeg.len())?;

        Ok(Self {
            owner: device.id(),
            len: indeg.len(),
            buffer: upload(
                device,
                "sage in-degree",
                indeg.as_slice(),
                wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            ),
        })
    }

    /// Number of nodes
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True for a graph with no nodes
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Everything one graph needs on the device, uploaded once and reused
#[derive(Debug)]
pub struct GpuSageGraph {
    /// Forward layout
    pub columns: GpuColumnView,
    /// Backward layout
    pub rows: GpuRowView,
    /// Backward normalization
    pub in_degree: GpuInDegree,
}

impl GpuSageGraph {
    /// Upload all three parts of a [`SageGraph`](crate::SageGraph)
    ///
    /// # Errors
    ///
    /// Returns `TooLarge` if any array exceeds the device binding limit
    pub fn upload(device: &GpuDevice, graph: &crate::SageGraph) -> Result<Self> {
        let columns = GpuColumnView::upload(device, graph.columns())?;
        let rows = GpuRowView::upload(device, graph.rows())?;
        let in_degree = GpuInDegree::upload(device, graph.in_degree())?;
        ensure_dim("in-degree length", columns.num_nodes(), in_degree.len())?;

        Ok(Self {
            columns,
            rows,
            in_degree,
        })
    }
}

/// Copy `len` floats out of a storage buffer through a staging buffer
async fn read_f32(device: &GpuDevice, source: &wgpu::Buffer, len: usize) -> Result<Vec<f32>> {
    let size = (len * std::mem::size_of::<f32>()) as u64;
    let staging_buffer = device.create_buffer(
        "sage staging",
        size,
        wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
    );

    let mut encoder = device
        .device()
        .create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
    encoder.copy_buffer_to_buffer(source, 0, &staging_buffer, 0, size);
    device.queue().submit(Some(encoder.finish()));

    let buffer_slice = staging_buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();

    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });

    device.synchronize();
    rx.receive()
        .await
        .context("Failed to receive map result")?
        .context("Buffer mapping failed")?;

    let data = buffer_slice.get_mapped_range();
    let values: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging_buffer.unmap();

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeId, SageGraph};

    #[tokio::test]
    async fn test_matrix_upload_download() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_matrix_upload_download: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let matrix = FeatureMatrix::from_fn(5, 3, |r, c| (r * 3 + c) as f32);

        let on_device = GpuMatrix::upload(&device, &matrix).unwrap();
        assert_eq!(on_device.rows(), 5);
        assert_eq!(on_device.cols(), 3);

        let back = on_device.download(&device).await.unwrap();
        assert_eq!(back, matrix);
    }

    #[tokio::test]
    async fn test_upload_edgeless_graph() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_upload_edgeless_graph: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let graph = SageGraph::from_edges(3, &[]).unwrap();

        let uploaded = GpuSageGraph::upload(&device, &graph).unwrap();
        assert_eq!(uploaded.columns.num_nodes(), 3);
        assert_eq!(uploaded.columns.num_edges(), 0);
        assert_eq!(uploaded.rows.max_degree(), 0);
    }

    #[tokio::test]
    async fn test_download_rejects_foreign_device() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_download_rejects_foreign_device: GPU not available");
            return;
        }

        let a = GpuDevice::new().await.unwrap();
        let b = GpuDevice::new().await.unwrap();
        let graph = SageGraph::from_edges(2, &[(NodeId(0), NodeId(1))]).unwrap();
        let matrix = GpuMatrix::upload(&a, &FeatureMatrix::zeros(graph.num_nodes(), 2)).unwrap();

        let err = matrix.download(&b).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<SageError>(),
            Some(&SageError::DeviceMismatch { what: "matrix" })
        );
    }
}
