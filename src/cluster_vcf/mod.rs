//! Cluster command: merge standardized SV calls which describe the same event
//!

mod filter;
mod partitions;

use std::collections::BTreeSet;

use camino::Utf8Path;
use log::info;
use thousands::Separable;

use self::filter::ClusterInputFilter;
use self::partitions::{PartitionContext, cluster_all_partitions, get_partitions};
use crate::bcf_utils::{ContigInfo, VcfRawReader};
use crate::breakpoint::{
    BreakpointRecord, EV_FORMAT_KEY, GQ_FORMAT_KEY, GT_FORMAT_KEY, compare_breakpoint_records,
};
use crate::chrom_order::compare_chroms;
use crate::cli;
use crate::errors::PipelineError;
use crate::large_variant_output::{
    get_output_contigs, get_sv_vcf_header, write_indexed_sv_vcf_file,
};
use crate::run_stats::{ClusterRunStats, ClusterStats, write_run_stats};

pub const CLUSTERED_VCF_FILENAME: &str = "clustered.vcf.gz";

/// Header content gathered over all input files
///
struct InputSummary {
    /// Sorted union of sample names
    sample_names: Vec<String>,

    /// Union of contigs, in karyotype order
    contigs: Vec<ContigInfo>,

    /// Sorted union of caller tags with a per-sample FORMAT flag
    source_tags: Vec<String>,

    /// True if every input has a tabix or csi index
    is_indexed: bool,
}

fn has_index(vcf_filename: &str) -> bool {
    ["tbi", "csi"]
        .iter()
        .any(|ext| Utf8Path::new(&format!("{vcf_filename}.{ext}")).is_file())
}

/// Caller tags are the FORMAT keys of a standardized file other than the shared sample fields
fn is_source_format_key(key: &str) -> bool {
    ![GT_FORMAT_KEY, GQ_FORMAT_KEY, EV_FORMAT_KEY].contains(&key)
}

fn get_input_summary(vcf_filenames: &[String]) -> Result<InputSummary, PipelineError> {
    let mut sample_names = BTreeSet::new();
    let mut source_tags = BTreeSet::new();
    let mut contigs = Vec::<ContigInfo>::new();
    let mut is_indexed = true;

    for vcf_filename in vcf_filenames.iter() {
        let reader = VcfRawReader::from_path(Utf8Path::new(vcf_filename), false)?;
        sample_names.extend(reader.sample_names().iter().cloned());
        source_tags.extend(
            reader
                .format_keys()
                .filter(|x| is_source_format_key(x))
                .map(|x| x.to_string()),
        );
        for contig in reader.contigs() {
            if !contigs.iter().any(|x| x.name == contig.name) {
                contigs.push(contig.clone());
            }
        }
        is_indexed &= has_index(vcf_filename);
    }
    contigs.sort_by(|a, b| compare_chroms(&a.name, &b.name));

    Ok(InputSummary {
        sample_names: sample_names.into_iter().collect(),
        contigs,
        source_tags: source_tags.into_iter().collect(),
        is_indexed,
    })
}

/// Sort merged records into output order and name them PREFIX_SVTYPE_N
///
fn finalize_merged_records(records: &mut [BreakpointRecord], prefix: &str) {
    records.sort_by(compare_breakpoint_records);
    for (index, record) in records.iter_mut().enumerate() {
        record.ids = vec![format!("{prefix}_{}_{}", record.sv_type, index + 1)];
    }
}

pub fn run_cluster(
    shared_settings: &cli::SharedSettings,
    settings: &cli::ClusterVcfSettings,
) -> Result<(), PipelineError> {
    cli::write_cluster_settings(&settings.output_dir, settings);

    let input = get_input_summary(&settings.vcf_filenames)?;
    info!(
        "Clustering SV calls from {} input files with {} samples",
        settings.vcf_filenames.len(),
        input.sample_names.len()
    );

    let chroms = input
        .contigs
        .iter()
        .map(|x| x.name.clone())
        .collect::<Vec<_>>();
    let partitions = get_partitions(
        settings.region.as_deref(),
        &chroms,
        input.is_indexed,
        shared_settings.thread_count,
    )?;
    if partitions.len() > 1 {
        info!("Clustering {} chromosome partitions", partitions.len());
    }

    let context = PartitionContext {
        cluster_settings: settings.cluster_settings(),
        merge_settings: settings.merge_settings(),
        filter: ClusterInputFilter::from_settings(settings)?,
        sample_names: input.sample_names.clone(),
    };

    let results = cluster_all_partitions(
        shared_settings,
        &settings.vcf_filenames,
        &partitions,
        &context,
    )?;

    let mut stats = ClusterStats::default();
    let mut records = Vec::new();
    for result in results {
        stats.merge(&result.stats);
        records.extend(result.records);
    }
    finalize_merged_records(&mut records, &settings.prefix);

    info!(
        "Merged {} input records into {} clusters",
        stats.input_record_count.separate_with_commas(),
        stats.cluster_count.separate_with_commas()
    );

    let source_tags = if settings.single_source {
        Vec::new()
    } else {
        input.source_tags.clone()
    };
    let raw_records = records
        .iter()
        .map(|x| x.to_raw_record(&source_tags))
        .collect::<Vec<_>>();

    let contigs = get_output_contigs(&input.contigs, &raw_records);
    let header = get_sv_vcf_header(&contigs, &input.sample_names, &source_tags);

    let output_filename = settings.output_dir.join(CLUSTERED_VCF_FILENAME);
    write_indexed_sv_vcf_file(shared_settings, &output_filename, &header, &raw_records)?;

    let run_stats = ClusterRunStats {
        input_file_count: settings.vcf_filenames.len(),
        partition_count: partitions.len(),
        cluster_stats: stats,
    };
    write_run_stats(&settings.output_dir, &run_stats);

    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use regex::Regex;

    use super::partitions::cluster_record_source;
    use super::*;
    use crate::aggregate_cluster::{MergeSettings, MergedPosition};
    use crate::breakpoint::test_utils::get_test_record;
    use crate::breakpoint::{MEMBERS_INFO_KEY, RMSSTD_INFO_KEY, SvType};
    use crate::cluster_breakpoints::ClusterSettings;
    use crate::raw_record::{FieldValue, RawRecord};
    use crate::record_source::{MergedRecordSource, VecRecordSource};
    use crate::standardize::StandardizerRegistry;

    fn get_lumpy_deletion(id: &str, pos: i64, end: i64) -> RawRecord {
        RawRecord::new("chr1", pos, id, "N", "<DEL>")
            .with_info("SVTYPE", FieldValue::from_str_value("DEL"))
            .with_info("END", FieldValue::Integer(vec![end as i32]))
            .with_info("STRANDS", FieldValue::from_str_value("+-:4"))
            .with_sample("s1", &[("GT", FieldValue::from_str_value("0/1"))])
    }

    fn get_test_context(merged_position: MergedPosition) -> PartitionContext {
        PartitionContext {
            cluster_settings: ClusterSettings::default(),
            merge_settings: MergeSettings {
                merged_position,
                single_source: false,
            },
            filter: ClusterInputFilter::new(
                vec![
                    SvType::Deletion,
                    SvType::Duplication,
                    SvType::Inversion,
                    SvType::Breakend,
                    SvType::Insertion,
                ],
                Regex::new(r"^(chr)?([1-9]|1[0-9]|2[0-2]|X|Y)$").unwrap(),
            ),
            sample_names: vec!["s1".to_string()],
        }
    }

    fn get_standardized_lumpy_records() -> Vec<BreakpointRecord> {
        let registry = StandardizerRegistry::default();
        let mut records = [
            get_lumpy_deletion("1", 1000, 2000),
            get_lumpy_deletion("2", 1005, 1995),
            get_lumpy_deletion("3", 998, 2010),
        ]
        .iter()
        .map(|x| registry.standardize(x, "lumpy").unwrap())
        .collect::<Vec<_>>();
        records.sort_by(compare_breakpoint_records);
        records
    }

    fn cluster_test_records(
        records: Vec<BreakpointRecord>,
        merged_position: MergedPosition,
    ) -> (Vec<BreakpointRecord>, ClusterStats) {
        let context = get_test_context(merged_position);
        let source = Box::new(VecRecordSource::new(records));
        let mut result = cluster_record_source(source, &context).unwrap();
        finalize_merged_records(&mut result.records, "svcluster");
        (result.records, result.stats)
    }

    #[test]
    fn test_standardize_and_cluster_median() {
        let (records, stats) =
            cluster_test_records(get_standardized_lumpy_records(), MergedPosition::Median);
        assert_eq!(stats.cluster_count, 1);
        assert_eq!(records.len(), 1);

        let merged = &records[0];
        assert_eq!(merged.label(), "svcluster_DEL_1");
        assert_eq!(merged.pos_a, 1000);
        assert_eq!(merged.pos_b, 2000);
        assert_eq!(merged.sources, vec!["lumpy"]);
        match &merged.info[MEMBERS_INFO_KEY] {
            FieldValue::String(x) => {
                let mut members = x.clone();
                members.sort();
                assert_eq!(members, vec!["1", "2", "3"]);
            }
            _ => panic!("unexpected MEMBERS type"),
        }
        assert_eq!(merged.samples["s1"].genotype.to_string(), "0/1");

        match &merged.info[RMSSTD_INFO_KEY] {
            FieldValue::Float(x) => {
                assert_eq!(x.len(), 2);
                assert_abs_diff_eq!(x[0] as f64, (29.0f64 / 3.0).sqrt(), epsilon = 1e-4);
                assert_abs_diff_eq!(x[1] as f64, (125.0f64 / 3.0).sqrt(), epsilon = 1e-4);
            }
            _ => panic!("unexpected RMSSTD type"),
        }
    }

    #[test]
    fn test_standardize_and_cluster_mean() {
        let (records, _) =
            cluster_test_records(get_standardized_lumpy_records(), MergedPosition::Mean);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pos_a, 1001);
        assert_eq!(records[0].pos_b, 2001);
    }

    #[test]
    fn test_merged_record_round_trip() {
        let (records, _) =
            cluster_test_records(get_standardized_lumpy_records(), MergedPosition::Median);
        let source_tags = vec!["lumpy".to_string()];
        let raw = records[0].to_raw_record(&source_tags);
        let registry = StandardizerRegistry::default();
        let restandardized = registry.standardize(&raw, "canonical").unwrap();
        assert_eq!(restandardized.pos_a, records[0].pos_a);
        assert_eq!(restandardized.pos_b, records[0].pos_b);
        assert_eq!(restandardized.ids, records[0].ids);
        match &restandardized.info[RMSSTD_INFO_KEY] {
            FieldValue::Float(x) => {
                assert_abs_diff_eq!(x[0] as f64, (29.0f64 / 3.0).sqrt(), epsilon = 1e-4)
            }
            _ => panic!("unexpected RMSSTD type"),
        }
    }

    #[test]
    fn test_cluster_output_is_input_order_independent() {
        let get_ids = |records: &[BreakpointRecord]| {
            records
                .iter()
                .map(|x| (x.label(), x.pos_a, x.pos_b))
                .collect::<Vec<_>>()
        };

        let records = vec![
            get_test_record_pair("a", 1000, 5000),
            get_test_record_pair("b", 1200, 5100),
            get_test_record_pair("c", 20000, 30000),
            get_test_record_pair("d", 20100, 30050),
        ];

        // Split the same records over two sources in different ways, then merge
        let mut merged_results = Vec::new();
        for split in [vec![0, 2], vec![1, 3], vec![0, 1, 2, 3]] {
            let (s1, s2): (Vec<_>, Vec<_>) = records
                .iter()
                .enumerate()
                .partition(|(i, _)| split.contains(i));
            let s1 = s1.into_iter().map(|(_, x)| x.clone()).collect();
            let s2 = s2.into_iter().map(|(_, x)| x.clone()).collect();
            let merged = MergedRecordSource::new(vec![
                Box::new(VecRecordSource::new(s1)),
                Box::new(VecRecordSource::new(s2)),
            ]);
            let context = get_test_context(MergedPosition::Median);
            let mut result = cluster_record_source(Box::new(merged), &context).unwrap();
            finalize_merged_records(&mut result.records, "svcluster");
            merged_results.push(get_ids(&result.records));
        }
        assert_eq!(merged_results[0], merged_results[1]);
        assert_eq!(merged_results[0], merged_results[2]);
        assert_eq!(merged_results[0].len(), 2);
    }

    fn get_test_record_pair(id: &str, pos_a: i64, pos_b: i64) -> BreakpointRecord {
        get_test_record(id, SvType::Deletion, "chr2", pos_a, "chr2", pos_b)
    }

    #[test]
    fn test_source_format_keys() {
        assert!(is_source_format_key("lumpy"));
        assert!(!is_source_format_key("GT"));
        assert!(!is_source_format_key("EV"));
    }
}
