use super::ClusterSettings;
use crate::breakpoint::{BreakpointRecord, ConfidenceInterval};
use crate::int_range::{IntRange, get_int_range_position_distance, get_overlap_range};

/// Position range of a breakpoint, widened by its confidence interval
///
fn get_breakpoint_range(pos: i64, ci: ConfidenceInterval, max_ci_padding: i64) -> IntRange {
    ci.to_padded_range(pos, max_ci_padding)
}

/// Distance between two breakpoints, zero if their widened ranges intersect
///
pub fn get_breakpoint_distance(
    pos1: i64,
    ci1: ConfidenceInterval,
    pos2: i64,
    ci2: ConfidenceInterval,
    max_ci_padding: i64,
) -> i64 {
    let r1 = get_breakpoint_range(pos1, ci1, max_ci_padding);
    let r2 = get_breakpoint_range(pos2, ci2, max_ci_padding);
    get_int_range_position_distance(&r1, &r2) as i64
}

/// Reference span of an intra-chromosomal record, at least one base long
fn get_span_range(record: &BreakpointRecord) -> IntRange {
    IntRange::from_pair(record.pos_a, std::cmp::max(record.pos_b, record.pos_a + 1))
}

/// Fraction of each record's span covered by the other record, whichever is smaller
///
pub fn get_reciprocal_overlap(r1: &BreakpointRecord, r2: &BreakpointRecord) -> f64 {
    let span1 = get_span_range(r1);
    let span2 = get_span_range(r2);
    match get_overlap_range(&span1, &span2) {
        Some(overlap) => {
            let overlap = overlap.size() as f64;
            f64::min(overlap / span1.size() as f64, overlap / span2.size() as f64)
        }
        None => 0.0,
    }
}

/// Test whether two records can be linked in the same cluster
///
/// The test is symmetric in its two arguments.
///
pub fn is_clusterable(
    r1: &BreakpointRecord,
    r2: &BreakpointRecord,
    settings: &ClusterSettings,
) -> bool {
    if r1.sv_type != r2.sv_type || r1.is_translocation() != r2.is_translocation() {
        return false;
    }

    if r1.chrom_a != r2.chrom_a || r1.chrom_b != r2.chrom_b {
        return false;
    }

    if !settings.ignore_strands && r1.strands != r2.strands {
        return false;
    }

    let pad = settings.max_ci_padding;
    let dist_a = get_breakpoint_distance(r1.pos_a, r1.ci_a, r2.pos_a, r2.ci_a, pad);
    let dist_b = get_breakpoint_distance(r1.pos_b, r1.ci_b, r2.pos_b, r2.ci_b, pad);
    if dist_a > settings.dist || dist_b > settings.dist {
        return false;
    }

    if settings.frac > 0.0
        && r1.sv_type.has_reference_span()
        && r1.chrom_a == r1.chrom_b
        && get_reciprocal_overlap(r1, r2) < settings.frac
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::SvType;
    use crate::breakpoint::test_utils::get_test_record;
    use approx::assert_ulps_eq;

    #[test]
    fn test_window_boundary() {
        let settings = ClusterSettings::default();
        let r1 = get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 5000);

        // Exactly at the window boundary clusters
        let r2 = get_test_record("b", SvType::Deletion, "chr1", 1500, "chr1", 5500);
        assert!(is_clusterable(&r1, &r2, &settings));
        assert!(is_clusterable(&r2, &r1, &settings));

        // One base beyond does not
        let r3 = get_test_record("c", SvType::Deletion, "chr1", 1501, "chr1", 5000);
        assert!(!is_clusterable(&r1, &r3, &settings));

        // Twice the window never clusters
        let r4 = get_test_record("d", SvType::Deletion, "chr1", 2000, "chr1", 6000);
        assert!(!is_clusterable(&r1, &r4, &settings));
    }

    #[test]
    fn test_ci_widening() {
        let settings = ClusterSettings::default();
        let mut r1 = get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 5000);
        let mut r2 = get_test_record("b", SvType::Deletion, "chr1", 1700, "chr1", 5000);
        assert!(!is_clusterable(&r1, &r2, &settings));

        // 700 apart, less 100 and 100 of confidence interval, leaves 500
        r1.ci_a = ConfidenceInterval::from_pair(-100, 100);
        r2.ci_a = ConfidenceInterval::from_pair(-100, 100);
        assert!(is_clusterable(&r1, &r2, &settings));

        // Padding caps how far each interval can reach
        let capped = ClusterSettings {
            max_ci_padding: 50,
            ..Default::default()
        };
        assert!(!is_clusterable(&r1, &r2, &capped));
    }

    #[test]
    fn test_type_and_strand_matching() {
        let settings = ClusterSettings::default();
        let del = get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 5000);
        let dup = get_test_record("b", SvType::Duplication, "chr1", 1000, "chr1", 5000);
        assert!(!is_clusterable(&del, &dup, &settings));

        let inv1 = get_test_record("c", SvType::Inversion, "chr1", 1000, "chr1", 5000);
        let mut inv2 = inv1.clone();
        inv2.strands = "--".parse().unwrap();
        assert!(!is_clusterable(&inv1, &inv2, &settings));

        let ignore = ClusterSettings {
            ignore_strands: true,
            ..Default::default()
        };
        assert!(is_clusterable(&inv1, &inv2, &ignore));
    }

    #[test]
    fn test_translocation_mate_chrom() {
        let settings = ClusterSettings::default();
        let tra1 = get_test_record("a", SvType::Breakend, "chr1", 1000, "chr2", 5000);
        let tra2 = get_test_record("b", SvType::Breakend, "chr1", 1010, "chr2", 5010);
        let tra3 = get_test_record("c", SvType::Breakend, "chr1", 1010, "chr3", 5010);
        assert!(is_clusterable(&tra1, &tra2, &settings));
        assert!(!is_clusterable(&tra1, &tra3, &settings));

        // Translocations never merge with intra-chromosomal records
        let del = get_test_record("d", SvType::Deletion, "chr1", 1000, "chr1", 5000);
        let bnd = get_test_record("e", SvType::Breakend, "chr1", 1000, "chr1", 5000);
        assert!(!is_clusterable(&tra1, &del, &settings));
        assert!(!is_clusterable(&tra1, &bnd, &settings));
    }

    #[test]
    fn test_reciprocal_overlap() {
        let r1 = get_test_record("a", SvType::Deletion, "chr1", 1000, "chr1", 2000);
        let r2 = get_test_record("b", SvType::Deletion, "chr1", 1400, "chr1", 2400);
        assert_ulps_eq!(get_reciprocal_overlap(&r1, &r2), 0.6);

        let strict = ClusterSettings {
            frac: 0.7,
            ..Default::default()
        };
        assert!(!is_clusterable(&r1, &r2, &strict));
        assert!(is_clusterable(&r1, &r2, &ClusterSettings::default()));

        // Breakends are exempt
        let b1 = get_test_record("c", SvType::Breakend, "chr1", 1000, "chr1", 2000);
        let b2 = get_test_record("d", SvType::Breakend, "chr1", 1400, "chr1", 2400);
        assert!(is_clusterable(&b1, &b2, &strict));
    }
}
