//! Split clustering into independent genome partitions which can run in parallel
//!

use std::sync::mpsc::channel;

use camino::Utf8Path;
use log::debug;

use super::filter::{ClusterInputFilter, FilteredRecordSource};
use crate::aggregate_cluster::{MergeSettings, aggregate_cluster};
use crate::bcf_utils::VcfRawReader;
use crate::breakpoint::BreakpointRecord;
use crate::cli;
use crate::cluster_breakpoints::{ClusterSettings, cluster_records};
use crate::errors::PipelineError;
use crate::genome_segment::GenomeSegment;
use crate::record_source::{MergedRecordSource, RecordSource, StandardizedRecordSource};
use crate::run_stats::ClusterStats;
use crate::standardize::CanonicalStandardizer;

/// Settings and derived values shared by every partition
///
pub struct PartitionContext {
    pub cluster_settings: ClusterSettings,
    pub merge_settings: MergeSettings,
    pub filter: ClusterInputFilter,

    /// Sample names of the output, in order
    pub sample_names: Vec<String>,
}

pub struct PartitionResult {
    /// Merged records, one per cluster, without IDs
    pub records: Vec<BreakpointRecord>,
    pub stats: ClusterStats,
}

/// Get the partitions to cluster independently
///
/// None represents a single sequential pass over all input records. Clusters never span
/// chromosomes, so each chromosome can be clustered separately when the input is indexed.
///
/// # Arguments
/// * `chroms` - Chromosome names of all inputs, in output order
///
pub fn get_partitions(
    region: Option<&str>,
    chroms: &[String],
    is_indexed: bool,
    thread_count: usize,
) -> Result<Vec<Option<GenomeSegment>>, PipelineError> {
    if let Some(region) = region {
        if !is_indexed {
            return Err(PipelineError::Input(
                "Clustering a region requires an index for every input variant file".to_string(),
            ));
        }
        let segment = GenomeSegment::from_region_str(region)
            .map_err(|e| PipelineError::Input(e.to_string()))?;
        Ok(vec![Some(segment)])
    } else if thread_count > 1 && is_indexed && !chroms.is_empty() {
        Ok(chroms
            .iter()
            .map(|x| Some(GenomeSegment::from_chrom(x)))
            .collect())
    } else {
        Ok(vec![None])
    }
}

/// Cluster all records from `source` and merge each cluster into one record
///
pub fn cluster_record_source(
    source: Box<dyn RecordSource + '_>,
    context: &PartitionContext,
) -> Result<PartitionResult, PipelineError> {
    let mut source = FilteredRecordSource::new(source, &context.filter);

    let mut records = Vec::new();
    let mut stats = ClusterStats::default();
    let record_count = cluster_records(&mut source, &context.cluster_settings, |cluster| {
        stats.add_cluster(cluster.members.len());
        records.push(aggregate_cluster(
            &cluster.members,
            &context.merge_settings,
            &context.sample_names,
        ));
    })?;

    stats.filtered_record_count = source.filtered_record_count();
    stats.input_record_count = record_count + stats.filtered_record_count;
    Ok(PartitionResult { records, stats })
}

/// Cluster one partition of the input
///
/// Each partition opens its own readers, so that partitions share nothing but the context.
///
fn cluster_partition(
    vcf_filenames: &[String],
    partition: Option<&GenomeSegment>,
    context: &PartitionContext,
) -> Result<PartitionResult, PipelineError> {
    let standardizer = CanonicalStandardizer;
    let indexed = partition.is_some();

    let mut sources = Vec::<Box<dyn RecordSource + '_>>::new();
    for vcf_filename in vcf_filenames.iter() {
        let reader = VcfRawReader::from_path(Utf8Path::new(vcf_filename), indexed)?;
        sources.push(Box::new(StandardizedRecordSource::new(reader, &standardizer)));
    }
    let mut merged = MergedRecordSource::new(sources);
    if let Some(partition) = partition {
        merged.fetch(partition)?;
    }

    let result = cluster_record_source(Box::new(merged), context)?;

    if let Some(partition) = partition {
        debug!(
            "Partition {} produced {} clusters",
            partition.to_region_str(),
            result.stats.cluster_count
        );
    }
    Ok(result)
}

/// Cluster all partitions, using a worker pool when there is more than one partition
///
/// Results are returned in partition order.
///
pub fn cluster_all_partitions(
    shared_settings: &cli::SharedSettings,
    vcf_filenames: &[String],
    partitions: &[Option<GenomeSegment>],
    context: &PartitionContext,
) -> Result<Vec<PartitionResult>, PipelineError> {
    if partitions.len() == 1 || shared_settings.thread_count == 1 {
        return partitions
            .iter()
            .map(|x| cluster_partition(vcf_filenames, x.as_ref(), context))
            .collect();
    }

    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(shared_settings.thread_count)
        .build()
        .unwrap();

    let (tx, rx) = channel();

    worker_pool.scope(move |scope| {
        for (partition_index, partition) in partitions.iter().enumerate() {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = cluster_partition(vcf_filenames, partition.as_ref(), context);
                tx.send((partition_index, result)).unwrap();
            });
        }
    });

    let mut results = rx.into_iter().collect::<Vec<_>>();
    results.sort_by_key(|x| x.0);
    results.into_iter().map(|(_, x)| x).collect()
}
