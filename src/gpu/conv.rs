//! GPU host boundary for the mean-aggregation kernel pair
//!
//! Validates residency and shapes, resolves the kernel strategy, and
//! dispatches. A rejected call never reaches the device. Calls return as soon
//! as the work is submitted; [`GpuMatrix::download`] or
//! [`GpuDevice::synchronize`] waits for completion.

use super::buffer::{ensure_resident, GpuColumnView, GpuInDegree, GpuMatrix, GpuRowView};
use super::kernel::{AggregateKernel, Launch};
use super::limits::DeviceLimits;
use super::GpuDevice;
use crate::config::AggregateConfig;
use crate::error::ensure_dim;
use anyhow::Result;
use tracing::debug;

const FORWARD_SHADER: &str = include_str!("shaders/sage_forward.wgsl");
const BACKWARD_SHADER: &str = include_str!("shaders/sage_backward.wgsl");

/// Compiled forward and backward kernels for one device
///
/// Compile once, then call [`forward`](Self::forward) /
/// [`backward`](Self::backward) as often as needed. No state is carried
/// between calls.
///
/// # Example
///
/// ```ignore
/// # use sage_conv::gpu::{GpuDevice, GpuMatrix, GpuSageConv, GpuSageGraph};
/// # use sage_conv::{AggregateConfig, FeatureMatrix, NodeId, SageGraph};
/// # async fn example() -> anyhow::Result<()> {
/// let device = GpuDevice::new().await?;
/// let graph = SageGraph::from_edges(3, &[(NodeId(0), NodeId(2)), (NodeId(1), NodeId(2))])?;
/// let gpu_graph = GpuSageGraph::upload(&device, &graph)?;
/// let features = GpuMatrix::upload(&device, &FeatureMatrix::zeros(3, 16))?;
///
/// let conv = GpuSageConv::new(&device, AggregateConfig::default());
/// let out = conv.forward(&device, &features, &gpu_graph.columns)?;
/// let host = out.download(&device).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct GpuSageConv {
    owner: super::device::DeviceId,
    config: AggregateConfig,
    forward: AggregateKernel,
    backward: AggregateKernel,
}

impl GpuSageConv {
    /// Compile both kernels on `device`
    #[must_use]
    pub fn new(device: &GpuDevice, config: AggregateConfig) -> Self {
        Self {
            owner: device.id(),
            config,
            forward: AggregateKernel::new(device, "sage forward", FORWARD_SHADER, 3),
            backward: AggregateKernel::new(device, "sage backward", BACKWARD_SHADER, 4),
        }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// Mean of each node's source features
    ///
    /// # Errors
    ///
    /// Returns `DeviceMismatch` if any operand or these kernels belong to
    /// another device, `ShapeMismatch` if `features` does not have one row
    /// per node, or `TooLarge` if `N * F` exceeds 32-bit indexing or the
    /// binding limit
    #[allow(clippy::cast_possible_truncation)] // Sizes checked by check_elements
    pub fn forward(
        &self,
        device: &GpuDevice,
        features: &GpuMatrix,
        columns: &GpuColumnView,
    ) -> Result<GpuMatrix> {
        ensure_resident(device, self.owner, "forward kernel")?;
        ensure_resident(device, features.owner, "features")?;
        ensure_resident(device, columns.owner, "column view")?;
        ensure_dim("feature rows", columns.num_nodes(), features.rows())?;

        let num_nodes = features.rows();
        let num_features = features.cols();
        let limits = DeviceLimits::detect(device);
        limits.check_elements("output matrix", num_nodes * num_features)?;

        let output = GpuMatrix::zeroed(device, num_nodes, num_features);
        if num_nodes == 0 || num_features == 0 {
            return Ok(output);
        }

        let strategy = self
            .config
            .strategy
            .resolve(columns.max_degree(), self.config.split_threshold);
        let launch = Launch::plan(&limits, strategy, num_nodes as u32, num_features as u32);

        debug!(
            nodes = num_nodes,
            edges = columns.num_edges(),
            features = num_features,
            %strategy,
            groups_x = launch.groups_x,
            groups_y = launch.groups_y,
            "gpu sage forward"
        );

        self.forward.launch(
            device,
            strategy,
            launch,
            launch.params(num_nodes as u32, num_features as u32),
            &[
                &columns.col_starts,
                &columns.rows,
                &features.buffer,
                &output.buffer,
            ],
        );

        Ok(output)
    }

    /// Gradient of [`forward`](Self::forward) w.r.t. its features
    ///
    /// `features` is only shape-checked against `grad`.
    ///
    /// # Errors
    ///
    /// Returns `DeviceMismatch` if any operand belongs to another device,
    /// `ShapeMismatch` if `features`, `grad`, `indeg` and the row view
    /// disagree, or `TooLarge` if `N * F` exceeds the limits
    #[allow(clippy::cast_possible_truncation)]
    pub fn backward(
        &self,
        device: &GpuDevice,
        features: &GpuMatrix,
        grad: &GpuMatrix,
        indeg: &GpuInDegree,
        rows: &GpuRowView,
    ) -> Result<GpuMatrix> {
        ensure_resident(device, self.owner, "backward kernel")?;
        ensure_resident(device, features.owner, "features")?;
        ensure_resident(device, grad.owner, "gradient")?;
        ensure_resident(device, indeg.owner, "in-degree")?;
        ensure_resident(device, rows.owner, "row view")?;
        ensure_dim("feature rows", grad.rows(), features.rows())?;
        ensure_dim("feature columns", grad.cols(), features.cols())?;
        ensure_dim("gradient rows", rows.num_nodes(), grad.rows())?;
        ensure_dim("in-degree length", rows.num_nodes(), indeg.len())?;

        let num_nodes = grad.rows();
        let num_features = grad.cols();
        let limits = DeviceLimits::detect(device);
        limits.check_elements("output matrix", num_nodes * num_features)?;

        let output = GpuMatrix::zeroed(device, num_nodes, num_features);
        if num_nodes == 0 || num_features == 0 {
            return Ok(output);
        }

        let strategy = self
            .config
            .strategy
            .resolve(rows.max_degree(), self.config.split_threshold);
        let launch = Launch::plan(&limits, strategy, num_nodes as u32, num_features as u32);

        debug!(
            nodes = num_nodes,
            edges = rows.num_edges(),
            features = num_features,
            %strategy,
            groups_x = launch.groups_x,
            groups_y = launch.groups_y,
            "gpu sage backward"
        );

        self.backward.launch(
            device,
            strategy,
            launch,
            launch.params(num_nodes as u32, num_features as u32),
            &[
                &rows.row_starts,
                &rows.cols,
                &grad.buffer,
                &indeg.buffer,
                &output.buffer,
            ],
        );

        Ok(output)
    }
}

/// Compile, run forward once, and read the result back
///
/// # Errors
///
/// Same as [`GpuSageConv::forward`], plus readback failures
pub async fn gpu_forward(
    device: &GpuDevice,
    features: &crate::FeatureMatrix,
    columns: &crate::ColumnView,
    config: AggregateConfig,
) -> Result<crate::FeatureMatrix> {
    let conv = GpuSageConv::new(device, config);
    let features = GpuMatrix::upload(device, features)?;
    let columns = GpuColumnView::upload(device, columns)?;
    conv.forward(device, &features, &columns)?
        .download(device)
        .await
}

/// Compile, run backward once, and read the result back
///
/// # Errors
///
/// Same as [`GpuSageConv::backward`], plus readback failures
pub async fn gpu_backward(
    device: &GpuDevice,
    grad: &crate::FeatureMatrix,
    indeg: &crate::InDegree,
    rows: &crate::RowView,
    config: AggregateConfig,
) -> Result<crate::FeatureMatrix> {
    let conv = GpuSageConv::new(device, config);
    let grad = GpuMatrix::upload(device, grad)?;
    let indeg = GpuInDegree::upload(device, indeg)?;
    let rows = GpuRowView::upload(device, rows)?;
    conv.backward(device, &grad, &grad, &indeg, &rows)?
        .download(device)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelStrategy;
    use crate::{FeatureMatrix, NodeId, SageError, SageGraph};

    fn path_graph() -> SageGraph {
        SageGraph::from_edges(
            4,
            &[
                (NodeId(0), NodeId(1)),
                (NodeId(1), NodeId(2)),
                (NodeId(2), NodeId(3)),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_gpu_forward_path_graph() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_forward_path_graph: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let graph = path_graph();
        let features = FeatureMatrix::new(4, 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap();

        for strategy in [KernelStrategy::PerChannel, KernelStrategy::SplitNeighbors] {
            let config = AggregateConfig::default().with_strategy(strategy);
            let out = gpu_forward(&device, &features, graph.columns(), config)
                .await
                .unwrap();
            assert_eq!(out.as_slice(), &[0.0, 1.0, 2.0, 3.0], "{strategy}");
        }
    }

    #[tokio::test]
    async fn test_gpu_backward_path_graph() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_gpu_backward_path_graph: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let graph = path_graph();
        let grad = FeatureMatrix::new(4, 1, vec![10.0, 20.0, 30.0, 40.0]).unwrap();

        for strategy in [KernelStrategy::PerChannel, KernelStrategy::SplitNeighbors] {
            let config = AggregateConfig::default().with_strategy(strategy);
            let out = gpu_backward(&device, &grad, graph.in_degree(), graph.rows(), config)
                .await
                .unwrap();
            assert_eq!(out.as_slice(), &[20.0, 30.0, 40.0, 0.0], "{strategy}");
        }
    }

    #[tokio::test]
    async fn test_forward_rejects_row_mismatch() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_forward_rejects_row_mismatch: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let graph = path_graph();
        let conv = GpuSageConv::new(&device, AggregateConfig::default());
        let columns = GpuColumnView::upload(&device, graph.columns()).unwrap();
        let features = GpuMatrix::upload(&device, &FeatureMatrix::zeros(3, 2)).unwrap();

        let err = conv.forward(&device, &features, &columns).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SageError>(),
            Some(&SageError::ShapeMismatch {
                what: "feature rows",
                expected: 4,
                found: 3
            })
        );
    }

    #[tokio::test]
    async fn test_forward_rejects_foreign_features() {
        if !GpuDevice::is_gpu_available().await {
            eprintln!("⚠️  Skipping test_forward_rejects_foreign_features: GPU not available");
            return;
        }

        let device = GpuDevice::new().await.unwrap();
        let other = GpuDevice::new().await.unwrap();
        let graph = path_graph();
        let conv = GpuSageConv::new(&device, AggregateConfig::default());
        let columns = GpuColumnView::upload(&device, graph.columns()).unwrap();
        let features = GpuMatrix::upload(&other, &FeatureMatrix::zeros(4, 2)).unwrap();

        let err = conv.forward(&device, &features, &columns).unwrap_err();
        assert_eq!(
            err.downcast_ref::<SageError>(),
            Some(&SageError::DeviceMismatch { what: "features" })
        );
    }
}
