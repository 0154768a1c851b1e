//! Aggregation parameters
//!
//! Both backends read the same [`AggregateConfig`]. Defaults suit
//! citation-style graphs; skewed graphs with large hubs benefit from a lower
//! `split_threshold`.
//!
//! Environment overrides:
//! - `SAGE_CONV_STRATEGY`: `per-channel`, `split` or `auto`
//! - `SAGE_CONV_SPLIT_THRESHOLD`: degree at which a node's neighbors are split

use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Default degree at which a node's neighbor range is split across workers
pub const DEFAULT_SPLIT_THRESHOLD: u32 = 64;

/// Environment variable selecting the kernel strategy
pub const STRATEGY_ENV: &str = "SAGE_CONV_STRATEGY";

/// Environment variable overriding the split threshold
pub const SPLIT_THRESHOLD_ENV: &str = "SAGE_CONV_SPLIT_THRESHOLD";

/// How work is assigned to workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelStrategy {
    /// One worker per (node, channel) pair, sequential neighbor sum
    PerChannel,
    /// One cooperating group per node; lanes split the neighbor range and
    /// combine partial sums with a tree reduction
    SplitNeighbors,
    /// `SplitNeighbors` when the maximum degree reaches the split threshold,
    /// `PerChannel` otherwise
    #[default]
    Auto,
}

impl KernelStrategy {
    /// Resolve `Auto` against a graph's maximum degree
    #[must_use]
    pub const fn resolve(self, max_degree: u32, split_threshold: u32) -> Self {
        match self {
            Self::Auto if max_degree >= split_threshold => Self::SplitNeighbors,
            Self::Auto => Self::PerChannel,
            other => other,
        }
    }
}

impl fmt::Display for KernelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PerChannel => "per-channel",
            Self::SplitNeighbors => "split",
            Self::Auto => "auto",
        })
    }
}

impl FromStr for KernelStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-channel" | "per_channel" | "channel" => Ok(Self::PerChannel),
            "split" | "split-neighbors" | "split_neighbors" => Ok(Self::SplitNeighbors),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown kernel strategy '{other}'")),
        }
    }
}

/// Aggregation parameters shared by the CPU and GPU backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateConfig {
    /// Work assignment strategy
    pub strategy: KernelStrategy,

    /// Degree at which one node's neighbors are split across workers
    pub split_threshold: u32,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            strategy: KernelStrategy::Auto,
            split_threshold: DEFAULT_SPLIT_THRESHOLD,
        }
    }
}

impl AggregateConfig {
    /// Set the strategy
    #[must_use]
    pub const fn with_strategy(mut self, strategy: KernelStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the split threshold (clamped to at least 1)
    #[must_use]
    pub fn with_split_threshold(mut self, split_threshold: u32) -> Self {
        self.split_threshold = split_threshold.max(1);
        self
    }

    /// Defaults overridden by `SAGE_CONV_STRATEGY` / `SAGE_CONV_SPLIT_THRESHOLD`
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(STRATEGY_ENV) {
            match raw.parse() {
                Ok(strategy) => config.strategy = strategy,
                Err(e) => warn!(var = STRATEGY_ENV, error = %e, "keeping default strategy"),
            }
        }

        if let Some(raw) = lookup(SPLIT_THRESHOLD_ENV) {
            match raw.trim().parse::<u32>() {
                Ok(threshold) => config = config.with_split_threshold(threshold),
                Err(e) => {
                    warn!(var = SPLIT_THRESHOLD_ENV, value = %raw, error = %e, "keeping default split threshold");
                }
            }
        }

        config
    }
}
