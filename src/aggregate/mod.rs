//! CPU backend for the mean-aggregation kernel pair
//!
//! Every output row is a disjoint `par_chunks_mut` slice owned by exactly
//! one rayon task, mirroring the exclusive-writer partitioning of the GPU
//! kernels. A node whose degree reaches the split threshold has its neighbor
//! range cut into chunks summed in parallel and combined pairwise in chunk
//! order before the row is finalized.

pub mod backward;
pub mod forward;
pub mod raw;

pub use backward::mean_aggregate_backward;
pub use forward::mean_aggregate;
pub use raw::{backward_raw, forward_raw};

use crate::config::{AggregateConfig, KernelStrategy};
use rayon::prelude::*;

/// Degree at which a node's neighbors are split, `None` when splitting is off
fn split_threshold(config: &AggregateConfig) -> Option<usize> {
    match config.strategy {
        KernelStrategy::PerChannel => None,
        KernelStrategy::SplitNeighbors | KernelStrategy::Auto => {
            Some(config.split_threshold.max(1) as usize)
        }
    }
}

/// Shared row driver for both passes
///
/// `term(neighbor, acc)` adds one neighbor's contribution into `acc`;
/// `finish(node, row)` runs once on the completed row.
fn aggregate_rows<'a, N, T, F>(
    num_nodes: usize,
    width: usize,
    neighbors: N,
    split: Option<usize>,
    term: T,
    finish: F,
) -> Vec<f32>
where
    N: Fn(usize) -> &'a [u32] + Sync,
    T: Fn(u32, &mut [f32]) + Sync,
    F: Fn(usize, &mut [f32]) + Sync,
{
    let mut out = vec![0.0_f32; num_nodes * width];
    if width == 0 {
        return out;
    }

    out.par_chunks_mut(width)
        .enumerate()
        .for_each(|(node, row)| {
            let list = neighbors(node);
            match split {
                Some(chunk) if list.len() >= chunk => {
                    row.copy_from_slice(&split_sum(list, width, chunk, &term));
                }
                _ => {
                    for &neighbor in list {
                        term(neighbor, row);
                    }
                }
            }
            finish(node, row);
        });

    out
}

/// Sum one node's neighbor range in chunks, combining partials pairwise
///
/// Partials are collected in chunk order and folded as a fixed binary tree,
/// so the result does not depend on how rayon schedules the chunks.
fn split_sum<T>(list: &[u32], width: usize, chunk: usize, term: &T) -> Vec<f32>
where
    T: Fn(u32, &mut [f32]) + Sync,
{
    let mut partials: Vec<Vec<f32>> = list
        .par_chunks(chunk)
        .map(|part| {
            let mut acc = vec![0.0_f32; width];
            for &neighbor in part {
                term(neighbor, &mut acc);
            }
            acc
        })
        .collect();

    while partials.len() > 1 {
        partials = partials
            .chunks_mut(2)
            .map(|pair| {
                let (left, right) = pair.split_at_mut(1);
                let mut acc = std::mem::take(&mut left[0]);
                if let Some(right) = right.first() {
                    for (l, r) in acc.iter_mut().zip(right) {
                        *l += r;
                    }
                }
                acc
            })
            .collect();
    }

    partials.pop().unwrap_or_else(|| vec![0.0_f32; width])
}

/// Number of nodes whose neighbor range will be split
fn count_split_nodes(num_nodes: usize, degree: impl Fn(usize) -> u32, split: Option<usize>) -> usize {
    split.map_or(0, |chunk| {
        (0..num_nodes)
            .filter(|&node| degree(node) as usize >= chunk)
            .count()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_threshold_by_strategy() {
        let config = AggregateConfig::default().with_split_threshold(16);
        assert_eq!(split_threshold(&config), Some(16));
        assert_eq!(
            split_threshold(&config.with_strategy(KernelStrategy::PerChannel)),
            None
        );
    }

    #[test]
    fn test_split_sum_matches_sequential() {
        let list: Vec<u32> = (0..100).collect();
        let term = |n: u32, acc: &mut [f32]| {
            acc[0] += n as f32;
            acc[1] += 1.0;
        };
        let sum = split_sum(&list, 2, 7, &term);
        assert_eq!(sum, vec![4950.0, 100.0]);
    }

    #[test]
    fn test_count_split_nodes() {
        let degrees = [0_u32, 5, 10, 20];
        assert_eq!(count_split_nodes(4, |n| degrees[n], Some(10)), 2);
        assert_eq!(count_split_nodes(4, |n| degrees[n], None), 0);
    }
}
