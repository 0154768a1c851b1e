//! GPU vs CPU parity for the aggregation kernels
//!
//! Every test skips gracefully when no GPU adapter is available. Tests run
//! serially so concurrent device creation does not exhaust drivers.

#![cfg(feature = "gpu")]

use sage_conv::gpu::{GpuDevice, GpuMatrix, GpuSageConv, GpuSageGraph};
use sage_conv::{
    mean_aggregate, mean_aggregate_backward, AggregateConfig, FeatureMatrix, KernelStrategy,
    NodeId, SageError, SageGraph,
};
use serial_test::serial;

/// Deterministic pseudo-random graph with a few hubs
fn skewed_graph(num_nodes: u32, edges_per_node: u32) -> SageGraph {
    let mut edges = Vec::new();
    let mut rng_state = 12345_u64; // Simple LCG for reproducibility

    for node in 0..num_nodes {
        for _ in 0..edges_per_node {
            rng_state = rng_state.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let target = (rng_state % u64::from(num_nodes)) as u32;
            edges.push((NodeId(node), NodeId(target)));
        }
        // Every node also feeds hub 0
        edges.push((NodeId(node), NodeId(0)));
    }

    SageGraph::from_edges(num_nodes as usize, &edges).unwrap()
}

fn features(rows: usize, cols: usize, seed: u32) -> FeatureMatrix {
    FeatureMatrix::from_fn(rows, cols, |r, c| {
        let x = (r as u32).wrapping_mul(2_654_435_761).wrapping_add(c as u32 * 97 + seed);
        (x % 2001) as f32 / 100.0 - 10.0
    })
}

fn assert_matrices_close(gpu: &FeatureMatrix, cpu: &FeatureMatrix, label: &str) {
    assert_eq!(gpu.rows(), cpu.rows(), "{label}: rows");
    assert_eq!(gpu.cols(), cpu.cols(), "{label}: cols");
    for (i, (g, c)) in gpu.as_slice().iter().zip(cpu.as_slice()).enumerate() {
        let tolerance = 1e-4 * c.abs().max(1.0);
        assert!((g - c).abs() <= tolerance, "{label}: element {i}: gpu {g} cpu {c}");
    }
}

#[tokio::test]
#[serial]
async fn test_forward_parity_all_strategies() {
    if !GpuDevice::is_gpu_available().await {
        eprintln!("⚠️  Skipping test_forward_parity_all_strategies: GPU not available");
        return;
    }

    let device = GpuDevice::new().await.unwrap();
    let graph = skewed_graph(500, 4);
    let host_features = features(500, 33, 1);

    let gpu_graph = GpuSageGraph::upload(&device, &graph).unwrap();
    let gpu_features = GpuMatrix::upload(&device, &host_features).unwrap();

    for strategy in [
        KernelStrategy::PerChannel,
        KernelStrategy::SplitNeighbors,
        KernelStrategy::Auto,
    ] {
        let config = AggregateConfig::default().with_strategy(strategy);
        let conv = GpuSageConv::new(&device, config);

        let gpu_out = conv
            .forward(&device, &gpu_features, &gpu_graph.columns)
            .unwrap()
            .download(&device)
            .await
            .unwrap();
        let cpu_out = mean_aggregate(&host_features, graph.columns(), &config).unwrap();

        assert_matrices_close(&gpu_out, &cpu_out, &format!("forward {strategy}"));
    }
}

#[tokio::test]
#[serial]
async fn test_backward_parity_all_strategies() {
    if !GpuDevice::is_gpu_available().await {
        eprintln!("⚠️  Skipping test_backward_parity_all_strategies: GPU not available");
        return;
    }

    let device = GpuDevice::new().await.unwrap();
    let graph = skewed_graph(400, 3);
    let host_features = features(400, 17, 2);
    let host_grad = features(400, 17, 3);

    let gpu_graph = GpuSageGraph::upload(&device, &graph).unwrap();
    let gpu_features = GpuMatrix::upload(&device, &host_features).unwrap();
    let gpu_grad = GpuMatrix::upload(&device, &host_grad).unwrap();

    for strategy in [KernelStrategy::PerChannel, KernelStrategy::SplitNeighbors] {
        let config = AggregateConfig::default().with_strategy(strategy);
        let conv = GpuSageConv::new(&device, config);

        let gpu_out = conv
            .backward(
                &device,
                &gpu_features,
                &gpu_grad,
                &gpu_graph.in_degree,
                &gpu_graph.rows,
            )
            .unwrap()
            .download(&device)
            .await
            .unwrap();
        let cpu_out =
            mean_aggregate_backward(&host_grad, graph.in_degree(), graph.rows(), &config)
                .unwrap();

        assert_matrices_close(&gpu_out, &cpu_out, &format!("backward {strategy}"));
    }
}

#[tokio::test]
#[serial]
async fn test_star_graph_hub() {
    if !GpuDevice::is_gpu_available().await {
        eprintln!("⚠️  Skipping test_star_graph_hub: GPU not available");
        return;
    }

    // 1000 leaves → hub 0, wider than one 64-lane workgroup pass
    let device = GpuDevice::new().await.unwrap();
    let edges: Vec<_> = (1..=1000).map(|leaf| (NodeId(leaf), NodeId(0))).collect();
    let graph = SageGraph::from_edges(1001, &edges).unwrap();
    let host_features = FeatureMatrix::from_fn(1001, 2, |r, c| if c == 0 { 1.0 } else { r as f32 });

    let gpu_graph = GpuSageGraph::upload(&device, &graph).unwrap();
    let gpu_features = GpuMatrix::upload(&device, &host_features).unwrap();
    let conv = GpuSageConv::new(
        &device,
        AggregateConfig::default().with_strategy(KernelStrategy::SplitNeighbors),
    );

    let out = conv
        .forward(&device, &gpu_features, &gpu_graph.columns)
        .unwrap()
        .download(&device)
        .await
        .unwrap();

    assert_eq!(out.row(0)[0], 1.0);
    assert!((out.row(0)[1] - 500.5).abs() < 1e-3);
    for leaf in 1..=1000 {
        assert_eq!(out.row(leaf), &[0.0, 0.0]);
    }
}

#[tokio::test]
#[serial]
async fn test_repeated_forward_is_bit_identical() {
    if !GpuDevice::is_gpu_available().await {
        eprintln!("⚠️  Skipping test_repeated_forward_is_bit_identical: GPU not available");
        return;
    }

    let device = GpuDevice::new().await.unwrap();
    let graph = skewed_graph(300, 5);
    let gpu_graph = GpuSageGraph::upload(&device, &graph).unwrap();
    let gpu_features = GpuMatrix::upload(&device, &features(300, 8, 4)).unwrap();
    let conv = GpuSageConv::new(&device, AggregateConfig::default());

    let first = conv
        .forward(&device, &gpu_features, &gpu_graph.columns)
        .unwrap()
        .download(&device)
        .await
        .unwrap();
    let second = conv
        .forward(&device, &gpu_features, &gpu_graph.columns)
        .unwrap()
        .download(&device)
        .await
        .unwrap();

    let bits = |m: &FeatureMatrix| m.as_slice().iter().map(|v| v.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&first), bits(&second));
}

#[tokio::test]
#[serial]
async fn test_operands_from_another_device_are_rejected() {
    if !GpuDevice::is_gpu_available().await {
        eprintln!("⚠️  Skipping test_operands_from_another_device_are_rejected: GPU not available");
        return;
    }

    let device = GpuDevice::new().await.unwrap();
    let other = GpuDevice::new().await.unwrap();
    let graph = skewed_graph(10, 2);

    let gpu_graph = GpuSageGraph::upload(&other, &graph).unwrap();
    let gpu_grad = GpuMatrix::upload(&device, &features(10, 4, 5)).unwrap();
    let conv = GpuSageConv::new(&device, AggregateConfig::default());

    let err = conv
        .backward(
            &device,
            &gpu_grad,
            &gpu_grad,
            &gpu_graph.in_degree,
            &gpu_graph.rows,
        )
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<SageError>(),
        Some(&SageError::DeviceMismatch { what: "in-degree" })
    );
}

#[tokio::test]
#[serial]
async fn test_zero_width_features() {
    if !GpuDevice::is_gpu_available().await {
        eprintln!("⚠️  Skipping test_zero_width_features: GPU not available");
        return;
    }

    let device = GpuDevice::new().await.unwrap();
    let graph = skewed_graph(20, 2);
    let gpu_graph = GpuSageGraph::upload(&device, &graph).unwrap();
    let gpu_features = GpuMatrix::upload(&device, &FeatureMatrix::zeros(20, 0)).unwrap();
    let conv = GpuSageConv::new(&device, AggregateConfig::default());

    let out = conv
        .forward(&device, &gpu_features, &gpu_graph.columns)
        .unwrap()
        .download(&device)
        .await
        .unwrap();
    assert_eq!(out.rows(), 20);
    assert_eq!(out.cols(), 0);
}
