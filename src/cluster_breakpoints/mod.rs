//! Single-linkage clustering of sorted breakpoint records
//!

mod cluster_engine;
mod clusterable;
mod union_find;

pub use cluster_engine::*;
pub use clusterable::*;

use serde::{Deserialize, Serialize};

/// Parameters of the pairwise clusterable test
///
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClusterSettings {
    /// Maximum distance between matching breakpoints of two clustered records
    pub dist: i64,

    /// Minimum reciprocal overlap for intra-chromosomal DEL, DUP and INV records
    pub frac: f64,

    /// Cluster records regardless of their strand pairs
    pub ignore_strands: bool,

    /// Maximum distance a confidence interval can extend the position of a breakpoint on either
    /// side. Zero disables confidence interval widening.
    pub max_ci_padding: i64,
}

impl ClusterSettings {
    /// Maximum breakpoint A distance at which two records can still cluster
    ///
    /// Records further apart than this on the same chromosome never need to be compared.
    ///
    pub fn window_horizon(&self) -> i64 {
        self.dist + 2 * self.max_ci_padding
    }
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            dist: 500,
            frac: 0.0,
            ignore_strands: false,
            max_ci_padding: 250,
        }
    }
}
