//! Track stats for the whole run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

pub const RUN_STATS_FILENAME: &str = "run.stats.json";

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct StandardizeStats {
    pub input_record_count: usize,

    /// Records describing a breakend already reported by another record
    pub secondary_record_count: usize,

    /// Records which could not be standardized, only non-zero when invalid records are skipped
    pub invalid_record_count: usize,

    /// Records on contigs excluded from the output
    pub excluded_contig_record_count: usize,

    pub below_min_size_record_count: usize,

    /// Records without a non-reference genotype in any sample
    pub reference_site_record_count: usize,

    pub output_record_count: usize,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ClusterStats {
    pub input_record_count: usize,

    /// Records removed by the SV type, secondary and chromosome filters before clustering
    pub filtered_record_count: usize,

    pub cluster_count: usize,
    pub multi_member_cluster_count: usize,
    pub max_cluster_size: usize,
}

impl ClusterStats {
    pub fn add_cluster(&mut self, member_count: usize) {
        self.cluster_count += 1;
        if member_count > 1 {
            self.multi_member_cluster_count += 1;
        }
        self.max_cluster_size = std::cmp::max(self.max_cluster_size, member_count);
    }

    pub fn merge(&mut self, other: &Self) {
        self.input_record_count += other.input_record_count;
        self.filtered_record_count += other.filtered_record_count;
        self.cluster_count += other.cluster_count;
        self.multi_member_cluster_count += other.multi_member_cluster_count;
        self.max_cluster_size = std::cmp::max(self.max_cluster_size, other.max_cluster_size);
    }
}

#[derive(Deserialize, Serialize)]
pub struct StandardizeRunStats {
    pub caller: String,
    pub standardize_stats: StandardizeStats,
}

#[derive(Deserialize, Serialize)]
pub struct ClusterRunStats {
    pub input_file_count: usize,
    pub partition_count: usize,
    pub cluster_stats: ClusterStats,
}

/// Write run_stats structure out in json format
pub fn write_run_stats<T: Serialize>(output_dir: &Utf8Path, run_stats: &T) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}
