//! Reduction of one finalized cluster into a single merged breakpoint record
//!

use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

use crate::breakpoint::{
    BreakpointRecord, ConfidenceInterval, INTERCHROMOSOMAL_INFO_KEY, MEMBERS_INFO_KEY,
    RMSSTD_INFO_KEY, SECONDARY_INFO_KEY, SampleCall, StrandPair,
};
use crate::raw_record::FieldValue;

/// Central tendency used to place the merged breakpoints
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum)]
pub enum MergedPosition {
    #[default]
    Median,
    Mean,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MergeSettings {
    pub merged_position: MergedPosition,

    /// Keep only the first source tag of each merged record
    pub single_source: bool,
}

/// How the values of one INFO key are combined across the members of a cluster
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InfoMergePolicy {
    Sum,
    Max,
    Union,
    Any,

    /// The key is rebuilt from the merged record, so member values are dropped
    Drop,
}

/// Merge policy for each INFO annotation key
///
/// | key              | policy                      |
/// |------------------|-----------------------------|
/// | PE, SR           | sum                         |
/// | INTERCHROMOSOMAL | flag set if set in any      |
/// | MEMBERS, RMSSTD  | rebuilt for the new cluster |
/// | SECONDARY        | dropped                     |
/// | other integer    | max                         |
/// | other float      | max                         |
/// | other string     | sorted union                |
/// | other flag       | flag set if set in any      |
///
/// Geometry keys are not annotations: SVLEN is the max over members, SOURCES is the sorted union,
/// STRANDS is the most frequent strand pair and SVTYPE/CHR2 come from the first member.
///
pub fn get_info_merge_policy(key: &str, value: &FieldValue) -> InfoMergePolicy {
    match key {
        "PE" | "SR" => InfoMergePolicy::Sum,
        INTERCHROMOSOMAL_INFO_KEY => InfoMergePolicy::Any,
        MEMBERS_INFO_KEY | RMSSTD_INFO_KEY | SECONDARY_INFO_KEY => InfoMergePolicy::Drop,
        _ => match value {
            FieldValue::Flag => InfoMergePolicy::Any,
            FieldValue::Integer(_) | FieldValue::Float(_) => InfoMergePolicy::Max,
            FieldValue::String(_) => InfoMergePolicy::Union,
        },
    }
}

fn merge_field_values(policy: InfoMergePolicy, v1: &FieldValue, v2: &FieldValue) -> FieldValue {
    use FieldValue::*;
    match (policy, v1, v2) {
        (InfoMergePolicy::Sum, Integer(x1), Integer(x2)) => {
            Integer(vec![x1.iter().sum::<i32>() + x2.iter().sum::<i32>()])
        }
        (InfoMergePolicy::Max, Integer(x1), Integer(x2)) => {
            Integer(x1.iter().chain(x2.iter()).max().into_iter().copied().collect())
        }
        (InfoMergePolicy::Max, Float(x1), Float(x2)) => Float(
            x1.iter()
                .chain(x2.iter())
                .copied()
                .reduce(f32::max)
                .into_iter()
                .collect(),
        ),
        (InfoMergePolicy::Union, String(x1), String(x2)) => String(
            x1.iter()
                .chain(x2.iter())
                .cloned()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
        ),
        // Values of mismatched types keep the first value
        _ => v1.clone(),
    }
}

fn merge_info(members: &[BreakpointRecord]) -> BTreeMap<String, FieldValue> {
    let mut info = BTreeMap::new();
    for member in members.iter() {
        for (key, value) in member.info.iter() {
            let policy = get_info_merge_policy(key, value);
            if policy == InfoMergePolicy::Drop {
                continue;
            }
            let merged = match info.get(key) {
                Some(x) => merge_field_values(policy, x, value),
                None => value.clone(),
            };
            info.insert(key.clone(), merged);
        }
    }
    info
}

/// Central position of a list of breakpoint positions
///
/// Non-integer results are rounded down.
///
pub fn get_merged_position(positions: &[i64], merged_position: MergedPosition) -> i64 {
    let values = positions.iter().map(|&x| x as f64).collect::<Vec<_>>();
    let center = match merged_position {
        MergedPosition::Median => Data::new(values).median(),
        MergedPosition::Mean => values.iter().mean(),
    };
    center.floor() as i64
}

/// Root-mean-square deviation of breakpoint positions around the merged position
///
pub fn get_rmsstd(positions: &[i64], merged_pos: i64) -> f64 {
    if positions.is_empty() {
        return 0.0;
    }
    let ss = positions
        .iter()
        .map(|&x| {
            let d = (x - merged_pos) as f64;
            d * d
        })
        .sum::<f64>();
    (ss / positions.len() as f64).sqrt()
}

/// Smallest confidence interval around `merged_pos` which covers every member interval
///
pub fn get_merged_ci(
    positions: &[i64],
    cis: &[ConfidenceInterval],
    merged_pos: i64,
) -> ConfidenceInterval {
    let start = positions
        .iter()
        .zip(cis.iter())
        .map(|(&pos, ci)| pos + ci.start)
        .min()
        .unwrap_or(merged_pos);
    let end = positions
        .iter()
        .zip(cis.iter())
        .map(|(&pos, ci)| pos + ci.end)
        .max()
        .unwrap_or(merged_pos);
    ConfidenceInterval::from_pair(start - merged_pos, end - merged_pos)
}

/// Most frequent strand pair among the members, ties go to the earliest member
///
fn get_merged_strands(members: &[BreakpointRecord]) -> StrandPair {
    let counts = members.iter().map(|x| x.strands).counts();
    let mut best = members[0].strands;
    for member in members.iter() {
        if counts[&member.strands] > counts[&best] {
            best = member.strands;
        }
    }
    best
}

/// Order sample calls by quality, then evidence, treating missing values as lowest
fn is_better_call(call: &SampleCall, best: &SampleCall) -> bool {
    (call.quality, call.evidence) > (best.quality, best.evidence)
}

/// Select one call per sample from the members
///
/// The member call with the highest quality wins, with evidence as a tie breaker and the earliest
/// member winning full ties. Caller tags that called the sample are merged from all members.
/// Samples in `sample_names` which no member reports get the missing call.
///
fn merge_samples(
    members: &[BreakpointRecord],
    sample_names: &[String],
) -> BTreeMap<String, SampleCall> {
    let mut samples: BTreeMap<String, SampleCall> = BTreeMap::new();
    for member in members.iter() {
        for (name, call) in member.samples.iter() {
            match samples.get_mut(name) {
                Some(best) => {
                    let called_by = best.called_by.union(&call.called_by).cloned().collect();
                    if is_better_call(call, best) {
                        *best = call.clone();
                    }
                    best.called_by = called_by;
                }
                None => {
                    samples.insert(name.clone(), call.clone());
                }
            }
        }
    }
    for name in sample_names.iter() {
        samples
            .entry(name.clone())
            .or_insert_with(SampleCall::missing);
    }
    samples
}

/// Build the merged record for one cluster
///
/// Member records are only read. The merged record has no ID, these are assigned once the final
/// output order is known.
///
pub fn aggregate_cluster(
    members: &[BreakpointRecord],
    settings: &MergeSettings,
    sample_names: &[String],
) -> BreakpointRecord {
    assert!(!members.is_empty());
    let first = &members[0];

    let pos_a_list = members.iter().map(|x| x.pos_a).collect::<Vec<_>>();
    let pos_b_list = members.iter().map(|x| x.pos_b).collect::<Vec<_>>();
    let ci_a_list = members.iter().map(|x| x.ci_a).collect::<Vec<_>>();
    let ci_b_list = members.iter().map(|x| x.ci_b).collect::<Vec<_>>();

    let pos_a = get_merged_position(&pos_a_list, settings.merged_position);
    let pos_b = get_merged_position(&pos_b_list, settings.merged_position);

    let mut sources = members
        .iter()
        .flat_map(|x| x.sources.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    if settings.single_source {
        sources.truncate(1);
    }

    let mut info = merge_info(members);
    let member_ids = members
        .iter()
        .flat_map(|x| x.ids.iter().cloned())
        .collect::<Vec<_>>();
    info.insert(
        MEMBERS_INFO_KEY.to_string(),
        FieldValue::String(member_ids),
    );
    info.insert(
        RMSSTD_INFO_KEY.to_string(),
        FieldValue::Float(vec![
            get_rmsstd(&pos_a_list, pos_a) as f32,
            get_rmsstd(&pos_b_list, pos_b) as f32,
        ]),
    );

    let mut merged = BreakpointRecord {
        ids: Vec::new(),
        sources,
        chrom_a: first.chrom_a.clone(),
        pos_a,
        chrom_b: first.chrom_b.clone(),
        pos_b,
        strands: get_merged_strands(members),
        sv_type: first.sv_type,
        sv_len: members.iter().filter_map(|x| x.sv_len).max(),
        ci_a: get_merged_ci(&pos_a_list, &ci_a_list, pos_a),
        ci_b: get_merged_ci(&pos_b_list, &ci_b_list, pos_b),
        info,
        samples: merge_samples(members, sample_names),
    };

    // Central positions from breakends in different orientations can cross
    merged.orient();
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::test_utils::get_test_record;
    use crate::breakpoint::{Genotype, SvType};
    use approx::assert_ulps_eq;

    fn get_rmsstd_values(record: &BreakpointRecord) -> Vec<f32> {
        match &record.info[RMSSTD_INFO_KEY] {
            FieldValue::Float(x) => x.clone(),
            _ => panic!("unexpected RMSSTD type"),
        }
    }

    #[test]
    fn test_merged_position() {
        assert_eq!(get_merged_position(&[998, 1000, 1005], MergedPosition::Median), 1000);
        assert_eq!(get_merged_position(&[998, 1000, 1005], MergedPosition::Mean), 1001);
        assert_eq!(get_merged_position(&[1000, 1003], MergedPosition::Median), 1001);
        assert_eq!(get_merged_position(&[1000], MergedPosition::Mean), 1000);
    }

    #[test]
    fn test_rmsstd_zero_for_identical_members() {
        let members = vec![
            get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 2000),
            get_test_record("b", SvType::Deletion, "chr1", 1000, "chr1", 2000),
            get_test_record("c", SvType::Deletion, "chr1", 1000, "chr1", 2000),
        ];
        let merged = aggregate_cluster(&members, &MergeSettings::default(), &[]);
        assert_eq!(get_rmsstd_values(&merged), vec![0.0, 0.0]);
    }

    #[test]
    fn test_rmsstd() {
        assert_ulps_eq!(get_rmsstd(&[998, 1000, 1005], 1000), (29.0f64 / 3.0).sqrt());
    }

    #[test]
    fn test_ci_union() {
        let mut r1 = get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 2000);
        let mut r2 = get_test_record("b", SvType::Deletion, "chr1", 1000, "chr1", 2000);
        r1.ci_a = ConfidenceInterval::from_pair(-5, 5);
        r2.ci_a = ConfidenceInterval::from_pair(-2, 8);
        let merged = aggregate_cluster(&[r1, r2], &MergeSettings::default(), &[]);
        assert_eq!(merged.ci_a, ConfidenceInterval::from_pair(-5, 8));
        assert_eq!(merged.ci_b, ConfidenceInterval::default());
    }

    #[test]
    fn test_ci_union_relative_to_merged_position() {
        let mut r1 = get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 2000);
        let mut r2 = get_test_record("b", SvType::Deletion, "chr1", 1010, "chr1", 2000);
        r1.ci_a = ConfidenceInterval::from_pair(-5, 5);
        r2.ci_a = ConfidenceInterval::from_pair(-5, 5);
        let merged = aggregate_cluster(&[r1, r2], &MergeSettings::default(), &[]);
        assert_eq!(merged.pos_a, 1005);
        assert_eq!(merged.ci_a, ConfidenceInterval::from_pair(-10, 10));
    }

    #[test]
    fn test_info_merge() {
        let mut r1 = get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 2000);
        let mut r2 = get_test_record("b", SvType::Deletion, "chr1", 1002, "chr1", 2100);
        r1.sources = vec!["manta".to_string()];
        r1.info.insert("PE".to_string(), FieldValue::Integer(vec![4]));
        r2.info.insert("PE".to_string(), FieldValue::Integer(vec![6]));
        r2.info.insert("SR".to_string(), FieldValue::Integer(vec![3]));

        let merged = aggregate_cluster(&[r1.clone(), r2.clone()], &MergeSettings::default(), &[]);
        assert_eq!(merged.info["PE"], FieldValue::Integer(vec![10]));
        assert_eq!(merged.info["SR"], FieldValue::Integer(vec![3]));
        assert_eq!(
            merged.info[MEMBERS_INFO_KEY],
            FieldValue::String(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(merged.sources, vec!["lumpy", "manta"]);
        assert_eq!(merged.sv_len, Some(1098));
        assert!(merged.ids.is_empty());

        let single = MergeSettings {
            single_source: true,
            ..Default::default()
        };
        let merged = aggregate_cluster(&[r1, r2], &single, &[]);
        assert_eq!(merged.sources, vec!["lumpy"]);
    }

    #[test]
    fn test_sample_merge() {
        let call = |gt: &str, quality, evidence, source: &str| SampleCall {
            genotype: Genotype::parse(gt).unwrap(),
            quality,
            evidence,
            called_by: BTreeSet::from([source.to_string()]),
        };

        let mut r1 = get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 2000);
        let mut r2 = get_test_record("b", SvType::Deletion, "chr1", 1000, "chr1", 2000);
        r1.samples
            .insert("s1".to_string(), call("0/1", Some(20), Some(5), "lumpy"));
        r1.samples
            .insert("s2".to_string(), call("0/1", None, Some(9), "lumpy"));
        r2.samples
            .insert("s1".to_string(), call("1/1", Some(40), Some(2), "delly"));
        r2.samples
            .insert("s2".to_string(), call("1/1", Some(1), None, "delly"));

        let sample_names = ["s1", "s2", "s3"].map(|x| x.to_string());
        let merged = aggregate_cluster(&[r1, r2], &MergeSettings::default(), &sample_names);

        let s1 = &merged.samples["s1"];
        assert_eq!(s1.genotype.to_string(), "1/1");
        assert_eq!(s1.quality, Some(40));
        assert_eq!(s1.called_by.len(), 2);

        // A reported quality beats a missing quality
        assert_eq!(merged.samples["s2"].genotype.to_string(), "1/1");

        assert!(merged.samples["s3"].genotype.is_missing());
    }

    #[test]
    fn test_strand_majority() {
        let r1 = get_test_record("a", SvType::Inversion, "chr1", 1000, "chr1", 2000);
        let mut r2 = r1.clone();
        let mut r3 = r1.clone();
        r2.strands = "--".parse().unwrap();
        r3.strands = "--".parse().unwrap();
        let merged = aggregate_cluster(&[r1.clone(), r2.clone()], &MergeSettings::default(), &[]);
        assert_eq!(merged.strands.to_string(), "++");
        let merged = aggregate_cluster(&[r1, r2, r3], &MergeSettings::default(), &[]);
        assert_eq!(merged.strands.to_string(), "--");
    }
}
